//! Image stores: a sharded local filesystem store and an S3 store.
//!
//! Both share one key scheme: `{folder}/{aa}/{bb}/{hash12}-{uuid}.{ext}`,
//! where `aa`/`bb` are the first bytes of the content hash. The hash prefix
//! spreads the tree; the uuid keeps every key unique per upload, so
//! releasing one post's image can never touch another's.

#[cfg(feature = "media-local")]
mod local;
#[cfg(feature = "media-s3")]
mod s3;

#[cfg(feature = "media-local")]
pub use local::LocalMediaStore;
#[cfg(feature = "media-s3")]
pub use s3::S3MediaStore;

#[cfg(any(feature = "media-local", feature = "media-s3"))]
fn storage_key(data: &[u8], folder: &str, content_type: &mime::Mime) -> String {
    use sha2::{Digest, Sha256};

    let hash = hex::encode(Sha256::digest(data));
    let name = format!(
        "{}-{}.{}",
        &hash[..12],
        uuid::Uuid::now_v7().simple(),
        extension(content_type)
    );
    format!("{folder}/{}/{}/{name}", &hash[..2], &hash[2..4])
}

#[cfg(any(feature = "media-local", feature = "media-s3"))]
fn extension(content_type: &mime::Mime) -> &str {
    match content_type.subtype().as_str() {
        "jpeg" => "jpg",
        "svg+xml" => "svg",
        other => other,
    }
}

#[cfg(all(test, any(feature = "media-local", feature = "media-s3")))]
mod tests {
    use super::storage_key;

    #[test]
    fn keys_are_sharded_and_unique_per_upload() {
        let mime: mime::Mime = "image/png".parse().unwrap();
        let first = storage_key(b"same bytes", "posts", &mime);
        let second = storage_key(b"same bytes", "posts", &mime);

        assert!(first.starts_with("posts/"));
        assert!(first.ends_with(".png"));
        // Same content shares the shard directories but never the file.
        let dir = |key: &str| key.rsplit_once('/').map(|(dir, _)| dir.to_owned());
        assert_eq!(dir(&first), dir(&second));
        assert_ne!(first, second);
    }

    #[test]
    fn jpeg_maps_to_the_conventional_extension() {
        let mime: mime::Mime = "image/jpeg".parse().unwrap();
        assert!(storage_key(b"x", "profiles", &mime).ends_with(".jpg"));
    }
}
