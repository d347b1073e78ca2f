//! In-memory repositories on DashMap.
//!
//! One shared [`MemStore`] implements both repo ports and emulates the
//! relational constraints of the Postgres store: unique username/email,
//! author foreign keys, and delete cascades. The test suites and the
//! database-free dev mode run on this.

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use domains::{
    AuthorCard, Comment, CommentRecord, DomainError, DomainResult, Page, Post, PostDetail,
    PostImage, PostQuery, PostRecord, PostRepo, User, UserRepo,
};

#[derive(Default)]
pub struct MemStore {
    users: DashMap<Uuid, User>,
    posts: DashMap<Uuid, Post>,
    comments: DashMap<Uuid, Vec<Comment>>,
    viewers: DashMap<Uuid, HashSet<Uuid>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn author_card(&self, id: Uuid) -> Option<AuthorCard> {
        self.users.get(&id).map(|user| AuthorCard::from(user.value()))
    }

    fn view_count(&self, post_id: Uuid) -> u64 {
        self.viewers
            .get(&post_id)
            .map(|set| set.len() as u64)
            .unwrap_or(0)
    }

    fn comment_count(&self, post_id: Uuid) -> u64 {
        self.comments
            .get(&post_id)
            .map(|list| list.len() as u64)
            .unwrap_or(0)
    }

    fn viewed_by(&self, post_id: Uuid, viewer: Option<Uuid>) -> bool {
        match viewer {
            Some(user) => self
                .viewers
                .get(&post_id)
                .is_some_and(|set| set.contains(&user)),
            None => false,
        }
    }

    fn record(&self, post: &Post, viewer: Option<Uuid>) -> Option<PostRecord> {
        let author = self.author_card(post.author_id)?;
        Some(PostRecord {
            post: post.clone(),
            author,
            view_count: self.view_count(post.id),
            comment_count: self.comment_count(post.id),
            viewed_by_requester: self.viewed_by(post.id, viewer),
        })
    }

    /// Creation-time descending with id as tiebreak, the same order the
    /// SQL store produces.
    fn sorted(&self, mut posts: Vec<Post>) -> Vec<Post> {
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        posts
    }
}

fn matches_query(post: &Post, query: &PostQuery) -> bool {
    if let Some(category) = query.category {
        if post.category != category {
            return false;
        }
    }
    if let Some(term) = &query.search {
        let term = term.to_lowercase();
        let hit = post.title.to_lowercase().contains(&term)
            || post.body.to_lowercase().contains(&term)
            || post.tags.iter().any(|tag| tag.to_lowercase().contains(&term));
        if !hit {
            return false;
        }
    }
    true
}

fn page_slice<T>(items: Vec<T>, page: Page) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect()
}

#[async_trait]
impl UserRepo for MemStore {
    async fn insert(&self, user: &User) -> DomainResult<()> {
        if self.users.iter().any(|entry| entry.email == user.email) {
            return Err(DomainError::validation("email", "Email already registered"));
        }
        if self.users.iter().any(|entry| entry.username == user.username) {
            return Err(DomainError::validation("username", "Username already taken"));
        }
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> DomainResult<Option<User>> {
        Ok(self.users.get(&id).map(|entry| entry.clone()))
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.email == email)
            .map(|entry| entry.clone()))
    }

    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.username == username)
            .map(|entry| entry.clone()))
    }

    async fn update(&self, user: &User) -> DomainResult<()> {
        match self.users.get_mut(&user.id) {
            Some(mut entry) => {
                *entry = user.clone();
                Ok(())
            }
            None => Err(DomainError::NotFound("User")),
        }
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        if self.users.remove(&id).is_none() {
            return Err(DomainError::NotFound("User"));
        }
        // Cascades, same as the foreign keys: the user's posts with their
        // sub-rows, their comments everywhere, their viewer entries.
        let owned: Vec<Uuid> = self
            .posts
            .iter()
            .filter(|post| post.author_id == id)
            .map(|post| post.id)
            .collect();
        for post_id in owned {
            self.posts.remove(&post_id);
            self.comments.remove(&post_id);
            self.viewers.remove(&post_id);
        }
        for mut entry in self.comments.iter_mut() {
            entry.retain(|comment| comment.author_id != id);
        }
        for mut entry in self.viewers.iter_mut() {
            entry.remove(&id);
        }
        Ok(())
    }

    async fn search<'a>(
        &self,
        term: Option<&'a str>,
        page: Page,
    ) -> DomainResult<(Vec<User>, u64)> {
        let term = term.map(str::to_lowercase);
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|entry| match &term {
                Some(t) => {
                    entry.username.to_lowercase().contains(t)
                        || entry.email.to_lowercase().contains(t)
                        || entry.first_name.to_lowercase().contains(t)
                        || entry.last_name.to_lowercase().contains(t)
                }
                None => true,
            })
            .map(|entry| entry.clone())
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = users.len() as u64;
        Ok((page_slice(users, page), total))
    }
}

#[async_trait]
impl PostRepo for MemStore {
    async fn insert(&self, post: &Post) -> DomainResult<()> {
        if !self.users.contains_key(&post.author_id) {
            return Err(DomainError::NotFound("User"));
        }
        self.posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> DomainResult<Option<PostDetail>> {
        let Some(post) = self.posts.get(&id).map(|entry| entry.clone()) else {
            return Ok(None);
        };
        let Some(author) = self.author_card(post.author_id) else {
            return Ok(None);
        };
        let comments = self
            .comments
            .get(&id)
            .map(|list| list.clone())
            .unwrap_or_default()
            .into_iter()
            .filter_map(|comment| {
                let author = self.author_card(comment.author_id)?;
                Some(CommentRecord { comment, author })
            })
            .collect();
        Ok(Some(PostDetail {
            view_count: self.view_count(id),
            post,
            author,
            comments,
        }))
    }

    async fn find_bare(&self, id: Uuid) -> DomainResult<Option<Post>> {
        Ok(self.posts.get(&id).map(|entry| entry.clone()))
    }

    async fn update(&self, post: &Post) -> DomainResult<()> {
        match self.posts.get_mut(&post.id) {
            Some(mut entry) => {
                *entry = post.clone();
                Ok(())
            }
            None => Err(DomainError::NotFound("Post")),
        }
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        if self.posts.remove(&id).is_none() {
            return Err(DomainError::NotFound("Post"));
        }
        self.comments.remove(&id);
        self.viewers.remove(&id);
        Ok(())
    }

    async fn list(
        &self,
        query: &PostQuery,
        page: Page,
        viewer: Option<Uuid>,
    ) -> DomainResult<(Vec<PostRecord>, u64)> {
        let filtered: Vec<Post> = self
            .posts
            .iter()
            .filter(|post| post.is_published && matches_query(post.value(), query))
            .map(|post| post.clone())
            .collect();
        let sorted = self.sorted(filtered);
        let total = sorted.len() as u64;
        let records = page_slice(sorted, page)
            .iter()
            .filter_map(|post| self.record(post, viewer))
            .collect();
        Ok((records, total))
    }

    async fn list_pinned(&self, limit: u32) -> DomainResult<Vec<PostRecord>> {
        let pinned: Vec<Post> = self
            .posts
            .iter()
            .filter(|post| post.is_pinned && post.is_published)
            .map(|post| post.clone())
            .collect();
        Ok(self
            .sorted(pinned)
            .into_iter()
            .take(limit as usize)
            .filter_map(|post| self.record(&post, None))
            .collect())
    }

    async fn list_by_author(
        &self,
        author_id: Uuid,
        page: Page,
    ) -> DomainResult<(Vec<PostRecord>, u64)> {
        let owned: Vec<Post> = self
            .posts
            .iter()
            .filter(|post| post.author_id == author_id && post.is_published)
            .map(|post| post.clone())
            .collect();
        let sorted = self.sorted(owned);
        let total = sorted.len() as u64;
        let records = page_slice(sorted, page)
            .iter()
            .filter_map(|post| self.record(post, None))
            .collect();
        Ok((records, total))
    }

    async fn register_view(&self, post_id: Uuid, viewer: Uuid) -> DomainResult<bool> {
        if !self.posts.contains_key(&post_id) {
            return Err(DomainError::NotFound("Post"));
        }
        Ok(self.viewers.entry(post_id).or_default().insert(viewer))
    }

    async fn register_views(&self, post_ids: &[Uuid], viewer: Uuid) -> DomainResult<()> {
        for id in post_ids {
            if self.posts.contains_key(id) {
                self.viewers.entry(*id).or_default().insert(viewer);
            }
        }
        Ok(())
    }

    async fn add_comment(&self, post_id: Uuid, comment: &Comment) -> DomainResult<()> {
        if !self.posts.contains_key(&post_id) {
            return Err(DomainError::NotFound("Post"));
        }
        self.comments.entry(post_id).or_default().push(comment.clone());
        Ok(())
    }

    async fn find_comment(&self, post_id: Uuid, comment_id: Uuid) -> DomainResult<Option<Comment>> {
        Ok(self.comments.get(&post_id).and_then(|list| {
            list.iter().find(|comment| comment.id == comment_id).cloned()
        }))
    }

    async fn delete_comment(&self, post_id: Uuid, comment_id: Uuid) -> DomainResult<bool> {
        match self.comments.get_mut(&post_id) {
            Some(mut list) => {
                let before = list.len();
                list.retain(|comment| comment.id != comment_id);
                Ok(list.len() < before)
            }
            None => Ok(false),
        }
    }

    async fn images_by_author(&self, author_id: Uuid) -> DomainResult<Vec<PostImage>> {
        Ok(self
            .posts
            .iter()
            .filter(|post| post.author_id == author_id)
            .flat_map(|post| post.images.clone())
            .collect())
    }

    async fn delete_by_author(&self, author_id: Uuid) -> DomainResult<u64> {
        let owned: Vec<Uuid> = self
            .posts
            .iter()
            .filter(|post| post.author_id == author_id)
            .map(|post| post.id)
            .collect();
        let count = owned.len() as u64;
        for id in owned {
            self.posts.remove(&id);
            self.comments.remove(&id);
            self.viewers.remove(&id);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use domains::{NewPost, Registration};

    fn user(name: &str) -> User {
        let mut registration = Registration {
            username: name.into(),
            email: format!("{name}@club.test"),
            password: "secret1".into(),
            first_name: "Test".into(),
            last_name: "User".into(),
        };
        registration.validate().unwrap();
        registration.into_user("$argon2$hash".into())
    }

    fn post(author: Uuid, title: &str) -> Post {
        let mut input = NewPost {
            title: title.into(),
            body: format!("{title} body"),
            ..NewPost::default()
        };
        input.validate().unwrap();
        input.into_post(author, Vec::new())
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_like_the_unique_index() {
        let store = MemStore::new();
        let first = user("alpha");
        UserRepo::insert(&store, &first).await.unwrap();

        let mut clash = user("beta");
        clash.email = first.email.clone();
        let err = UserRepo::insert(&store, &clash).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: "email", .. }));
    }

    #[tokio::test]
    async fn register_view_reports_first_add_only() {
        let store = MemStore::new();
        let author = user("author");
        UserRepo::insert(&store, &author).await.unwrap();
        let post = post(author.id, "Endgame studies");
        PostRepo::insert(&store, &post).await.unwrap();

        let viewer = Uuid::now_v7();
        assert!(store.register_view(post.id, viewer).await.unwrap());
        assert!(!store.register_view(post.id, viewer).await.unwrap());
        assert_eq!(store.view_count(post.id), 1);
    }

    #[tokio::test]
    async fn register_view_on_missing_post_is_not_found() {
        let store = MemStore::new();
        let err = store
            .register_view(Uuid::now_v7(), Uuid::now_v7())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound("Post")));
    }

    #[tokio::test]
    async fn listing_filters_search_over_title_body_and_tags() {
        let store = MemStore::new();
        let author = user("writer");
        UserRepo::insert(&store, &author).await.unwrap();

        let mut tagged = post(author.id, "Weekly roundup");
        tagged.tags = vec!["sicilian".into()];
        PostRepo::insert(&store, &tagged).await.unwrap();
        PostRepo::insert(&store, &post(author.id, "Sicilian defense deep dive"))
            .await
            .unwrap();
        PostRepo::insert(&store, &post(author.id, "Club news"))
            .await
            .unwrap();

        let query = PostQuery::new(None, Some("sicilian".into()));
        let (records, total) = store
            .list(&query, Page::new(1, 10).unwrap(), None)
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn unpublished_posts_never_appear_in_listings() {
        let store = MemStore::new();
        let author = user("drafter");
        UserRepo::insert(&store, &author).await.unwrap();

        let mut draft = post(author.id, "Draft");
        draft.is_published = false;
        PostRepo::insert(&store, &draft).await.unwrap();
        PostRepo::insert(&store, &post(author.id, "Public"))
            .await
            .unwrap();

        let (records, total) = store
            .list(&PostQuery::default(), Page::new(1, 10).unwrap(), None)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(records[0].post.title, "Public");
    }

    #[tokio::test]
    async fn delete_by_author_takes_comments_and_viewers_along() {
        let store = MemStore::new();
        let author = user("leaver");
        let reader = user("reader");
        UserRepo::insert(&store, &author).await.unwrap();
        UserRepo::insert(&store, &reader).await.unwrap();

        let post = post(author.id, "Goodbye");
        PostRepo::insert(&store, &post).await.unwrap();
        store
            .add_comment(post.id, &Comment::new(reader.id, "so long".into()))
            .await
            .unwrap();
        store.register_view(post.id, reader.id).await.unwrap();

        assert_eq!(store.delete_by_author(author.id).await.unwrap(), 1);
        assert!(store.find_bare(post.id).await.unwrap().is_none());
        assert_eq!(store.comment_count(post.id), 0);
        assert_eq!(store.view_count(post.id), 0);
    }

    #[tokio::test]
    async fn user_delete_cascades_their_comments_on_other_posts() {
        let store = MemStore::new();
        let author = user("host");
        let guest = user("guest");
        UserRepo::insert(&store, &author).await.unwrap();
        UserRepo::insert(&store, &guest).await.unwrap();

        let post = post(author.id, "Open thread");
        PostRepo::insert(&store, &post).await.unwrap();
        store
            .add_comment(post.id, &Comment::new(guest.id, "first".into()))
            .await
            .unwrap();

        UserRepo::delete(&store, guest.id).await.unwrap();
        assert_eq!(store.comment_count(post.id), 0);
        assert!(store.find_bare(post.id).await.unwrap().is_some());
    }
}
