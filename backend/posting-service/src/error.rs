/// Error types for Posting Service
///
/// Every failure the attachment core can report is a variant here. Errors
/// are converted to JSON HTTP responses for whichever API layer fronts the
/// service.
use crate::models::{ContentKind, ParentRef};
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use blob_store::BlobStoreError;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Result type for posting-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Parent, owner or recipient missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// A content description has zero or several kind keys, or no usable value
    #[error("Malformed content at position {position}: {reason}")]
    MalformedContent { position: usize, reason: String },

    /// File extension outside the recognized image/video set
    #[error("Unsupported media type: {file_name}")]
    UnsupportedMediaType { file_name: String },

    /// A file part that cannot be placed in the content sequence
    #[error("Invalid attachment '{field_name}': {reason}")]
    InvalidAttachment { field_name: String, reason: String },

    /// Blob store write failed; nothing was persisted
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// Stored variant tag differs from the one an operation expected
    #[error("Tag mismatch for content {content_id}: stored {stored}, expected {expected}")]
    TagMismatch {
        content_id: Uuid,
        stored: ContentKind,
        expected: ContentKind,
    },

    /// Stale items or blobs were not fully reclaimed. The parent's committed
    /// state is unaffected.
    #[error("Cleanup incomplete for {parent}: {} item(s) not reclaimed", .failures.len())]
    PartialCleanupFailure {
        parent: ParentRef,
        failures: Vec<CleanupFailure>,
    },

    /// Database operation failed
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Blob store operation failed outside the upload path
    #[error("Blob store error: {0}")]
    BlobStore(#[from] BlobStoreError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// What a failed cleanup step was trying to remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupTarget {
    /// A content record (and its blob, if any)
    Item { content_id: Uuid, kind: ContentKind },
    /// A blob whose record was kept but re-pointed at a new URL
    Blob { key: String },
}

impl fmt::Display for CleanupTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupTarget::Item { content_id, kind } => write!(f, "{} content {}", kind, content_id),
            CleanupTarget::Blob { key } => write!(f, "blob {}", key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupFailure {
    pub target: CleanupTarget,
    pub reason: String,
}

impl fmt::Display for CleanupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.reason)
    }
}

impl AppError {
    /// Stable machine-readable code for API clients
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::MalformedContent { .. } => "MALFORMED_CONTENT",
            AppError::UnsupportedMediaType { .. } => "UNSUPPORTED_MEDIA_TYPE",
            AppError::InvalidAttachment { .. } => "INVALID_ATTACHMENT",
            AppError::UploadFailed(_) => "UPLOAD_FAILED",
            AppError::TagMismatch { .. } => "TAG_MISMATCH",
            AppError::PartialCleanupFailure { .. } => "PARTIAL_CLEANUP_FAILURE",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::BlobStore(_) => "BLOB_STORE_ERROR",
            AppError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MalformedContent { .. } | AppError::InvalidAttachment { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::UploadFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::TagMismatch { .. }
            | AppError::PartialCleanupFailure { .. }
            | AppError::DatabaseError(_)
            | AppError::BlobStore(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        HttpResponse::build(status).json(serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
            "code": self.code(),
        }))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
