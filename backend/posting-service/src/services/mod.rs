/// Business logic layer for posting-service
///
/// - Upload mapper: file parts to blob URLs placed by slot
/// - Attachment engine: create / reconcile / cascade-delete of content sequences
/// - Post and message services: parent flows built on the two above
pub mod messages;
pub mod posts;
pub mod reconciliation;
pub mod uploads;

pub use messages::MessageService;
pub use posts::{PostDraft, PostService};
pub use reconciliation::{plan_reconciliation, AttachmentEngine, Reconciliation, SlotAction};
pub use uploads::{IncomingFile, UploadMapper, UploadOverlay};

use crate::error::Result;
use crate::models::{ContentDescription, ContentItem};
use uploads::UploadBatch;

/// Upload a prepared batch and create a record for every slot of the merged
/// sequence.
///
/// Blobs uploaded here are discarded if record creation fails. The returned
/// overlay lets the caller do the same if its own parent write fails.
pub(crate) async fn create_sequence(
    uploads: &UploadMapper,
    engine: &AttachmentEngine,
    batch: UploadBatch,
    descriptions: Vec<ContentDescription>,
) -> Result<(Vec<ContentItem>, UploadOverlay)> {
    let (payloads, overlay) = uploads.resolve_sequence(batch, descriptions).await?;

    match engine.create_attachments(&payloads).await {
        Ok(items) => Ok((items, overlay)),
        Err(e) => {
            uploads.discard(&overlay).await;
            Err(e)
        }
    }
}
