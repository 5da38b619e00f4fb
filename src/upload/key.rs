//! Storage keys
//!
//! A key is `<namespace>/<random id><extension>`, where the random id is 32
//! CSPRNG bytes in URL-safe base64 without padding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use std::fmt;

use crate::media::OrientationBucket;

/// Number of random bytes behind every key
pub const RANDOM_ID_BYTES: usize = 32;

/// Namespace for thumbnails, which are never probed
pub const THUMBNAIL_NAMESPACE: &str = "thumbnails";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKey {
    namespace: &'static str,
    random_id: String,
    extension: &'static str,
}

impl StorageKey {
    pub fn namespace(&self) -> &str {
        self.namespace
    }

    pub fn random_id(&self) -> &str {
        &self.random_id
    }

    pub fn extension(&self) -> &str {
        self.extension
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}{}", self.namespace, self.random_id, self.extension)
    }
}

/// File extension for an accepted content type essence
pub fn extension_for(essence: &str) -> &'static str {
    match essence {
        "video/mp4" => ".mp4",
        "video/quicktime" => ".mov",
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        _ => ".bin",
    }
}

/// Generates collision-resistant keys
///
/// Taking the bucket by value means a video key can only exist once the
/// classifier has produced one.
pub struct KeyNamespacer;

impl KeyNamespacer {
    pub fn video_key(bucket: OrientationBucket, content_type: &str) -> StorageKey {
        Self::build(bucket.as_str(), content_type)
    }

    pub fn thumbnail_key(content_type: &str) -> StorageKey {
        Self::build(THUMBNAIL_NAMESPACE, content_type)
    }

    fn build(namespace: &'static str, content_type: &str) -> StorageKey {
        StorageKey {
            namespace,
            random_id: random_id(),
            extension: extension_for(content_type),
        }
    }
}

fn random_id() -> String {
    let mut bytes = [0u8; RANDOM_ID_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
