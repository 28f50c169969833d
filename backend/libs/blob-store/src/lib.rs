/// Blob storage shared by posting-service attachment paths
///
/// Provides the `BlobStore` contract (put / delete plus the key <-> URL scheme),
/// an S3-backed implementation, and object key generation.
use async_trait::async_trait;
use bytes::Bytes;

pub mod config;
mod error;
pub mod key;
pub mod s3;

pub use config::S3Config;
pub use error::BlobStoreError;
pub use key::object_key;
pub use s3::S3BlobStore;

/// Binary object storage addressed by key, readable by URL.
///
/// Implementations must keep `object_url` and `key_from_url` inverse to each
/// other for every key they hand out, so callers can recover the key of a
/// stored URL when the owning record is deleted.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key` and return the URL the object is served from.
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str)
        -> Result<String, BlobStoreError>;

    /// Remove the object stored under `key`.
    async fn delete(&self, key: &str) -> Result<(), BlobStoreError>;

    /// URL an object stored under `key` is (or will be) served from.
    fn object_url(&self, key: &str) -> String;

    /// Recover the object key from a URL produced by `object_url`.
    ///
    /// Returns `None` for URLs that do not point into this store.
    fn key_from_url(&self, url: &str) -> Option<String>;
}
