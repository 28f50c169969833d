//! Error types for blob store operations.

use thiserror::Error;

/// Errors returned by a `BlobStore`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlobStoreError {
    /// Credentials were rejected by the store
    #[error("S3 auth failed (403): check AWS credentials")]
    AuthFailed,

    /// Configured bucket does not exist
    #[error("S3 bucket not found: {0}")]
    BucketNotFound(String),

    /// Object write failed
    #[error("upload of {key} failed: {message}")]
    PutFailed { key: String, message: String },

    /// Object delete failed
    #[error("delete of {key} failed: {message}")]
    DeleteFailed { key: String, message: String },

    /// Store could not be reached or listed
    #[error("blob store unavailable: {0}")]
    Unavailable(String),
}
