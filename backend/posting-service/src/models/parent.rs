//! Parent entities that own an attachment sequence.

use super::attachment::Attachment;
use super::content::ContentItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentKind {
    Post,
    Message,
}

impl ParentKind {
    /// First segment of blob keys for files attached to this kind of parent.
    pub fn key_prefix(&self) -> &'static str {
        match self {
            ParentKind::Post => "posts",
            ParentKind::Message => "messages",
        }
    }
}

impl fmt::Display for ParentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentKind::Post => f.write_str("post"),
            ParentKind::Message => f.write_str("message"),
        }
    }
}

/// Identifies a parent in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParentRef {
    pub kind: ParentKind,
    pub id: Uuid,
}

impl ParentRef {
    pub fn new(kind: ParentKind, id: Uuid) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub category: String,
    pub attachments: Json<Vec<Attachment>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments.0
    }

    pub fn parent_ref(&self) -> ParentRef {
        ParentRef::new(ParentKind::Post, self.id)
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: Uuid,
    pub title: String,
    pub category: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub attachments: Json<Vec<Attachment>>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments.0
    }

    pub fn parent_ref(&self) -> ParentRef {
        ParentRef::new(ParentKind::Message, self.id)
    }
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub attachments: Vec<Attachment>,
}

/// A post with its attachments resolved to content items, in display order.
///
/// Attachments whose record has vanished are left out.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub contents: Vec<ContentItem>,
}

/// A message with its attachments resolved to content items, in display order.
///
/// Attachments whose record has vanished are left out.
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub contents: Vec<ContentItem>,
}
