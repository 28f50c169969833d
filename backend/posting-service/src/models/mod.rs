/// Data models for posting-service
///
/// This module defines structures for:
/// - ContentItem: a text, image or video record, tagged by `ContentKind`
/// - Attachment: a `(content_id, kind)` entry of a parent's ordered sequence
/// - ContentDescription: one submitted slot of a create/edit request
/// - Post / Message: parents that own an attachment sequence
pub mod attachment;
pub mod content;
pub mod description;
pub mod parent;

pub use attachment::Attachment;
pub use content::{ContentItem, ContentKind, ContentPayload};
pub use description::{parse_descriptions, ContentDescription};
pub use parent::{
    Message, MessageView, NewMessage, NewPost, ParentKind, ParentRef, Post, PostView,
};
