//! Content items: the text / image / video records a parent attaches.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Variant tag of a content item. Fixed for the item's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Image,
    Video,
}

impl ContentKind {
    /// Convert to string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Image => "image",
            ContentKind::Video => "video",
        }
    }

    /// Whether items of this kind reference an object in the blob store.
    pub fn carries_blob(&self) -> bool {
        !matches!(self, ContentKind::Text)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ContentKind::Text),
            "image" => Ok(ContentKind::Image),
            "video" => Ok(ContentKind::Video),
            _ => Err(format!("Unknown content kind: {}", s)),
        }
    }
}

/// Payload of a content item, one variant per tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentPayload {
    Text { value: String },
    Image { url: String },
    Video { url: String },
}

impl ContentPayload {
    pub fn text(value: impl Into<String>) -> Self {
        ContentPayload::Text {
            value: value.into(),
        }
    }

    pub fn image(url: impl Into<String>) -> Self {
        ContentPayload::Image { url: url.into() }
    }

    pub fn video(url: impl Into<String>) -> Self {
        ContentPayload::Video { url: url.into() }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            ContentPayload::Text { .. } => ContentKind::Text,
            ContentPayload::Image { .. } => ContentKind::Image,
            ContentPayload::Video { .. } => ContentKind::Video,
        }
    }

    /// Stored column value: the text itself, or the blob URL.
    pub fn body(&self) -> &str {
        match self {
            ContentPayload::Text { value } => value,
            ContentPayload::Image { url } | ContentPayload::Video { url } => url,
        }
    }

    /// Rebuild a payload from its stored `(kind, body)` columns.
    pub fn from_parts(kind: ContentKind, body: String) -> Self {
        match kind {
            ContentKind::Text => ContentPayload::Text { value: body },
            ContentKind::Image => ContentPayload::Image { url: body },
            ContentKind::Video => ContentPayload::Video { url: body },
        }
    }

    /// URL into the blob store, for image and video payloads.
    pub fn blob_url(&self) -> Option<&str> {
        match self {
            ContentPayload::Text { .. } => None,
            ContentPayload::Image { url } | ContentPayload::Video { url } => Some(url),
        }
    }
}

/// A persisted content record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentItem {
    pub id: Uuid,
    #[serde(flatten)]
    pub payload: ContentPayload,
}

impl ContentItem {
    pub fn kind(&self) -> ContentKind {
        self.payload.kind()
    }
}
