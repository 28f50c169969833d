use super::content::{ContentItem, ContentKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry of a parent's attachment sequence.
///
/// Position in the sequence is display order; `kind` always matches the tag
/// of the referenced content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attachment {
    pub content_id: Uuid,
    pub kind: ContentKind,
}

impl From<&ContentItem> for Attachment {
    fn from(item: &ContentItem) -> Self {
        Self {
            content_id: item.id,
            kind: item.kind(),
        }
    }
}
