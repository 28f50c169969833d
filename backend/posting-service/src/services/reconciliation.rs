//! Attachment reconciliation: keeps content records and blobs in step with
//! a parent's ordered attachment sequence across create, edit and delete.
//!
//! Edits are planned position by position against the parent's current
//! sequence, executed concurrently, and only then committed to the parent
//! by the caller. Stale records and blobs are reclaimed after the commit;
//! anything that cannot be reclaimed is reported and left for the orphan
//! sweeper.

use crate::db::ContentItemStore;
use crate::error::{AppError, CleanupFailure, CleanupTarget, Result};
use crate::metrics::attachments as metrics;
use crate::models::{Attachment, ContentItem, ContentPayload, ParentRef};
use blob_store::BlobStore;
use futures::future::{join_all, try_join_all};
use std::collections::HashSet;
use std::sync::Arc;

/// What happens to one position of the sequence during an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotAction {
    /// Same payload as before: no write
    Keep { current: ContentItem },
    /// Same media kind, new URL: the record is updated in place
    UpdateUrl {
        current: ContentItem,
        payload: ContentPayload,
    },
    /// Changed text or changed kind: a new record replaces the old one
    Replace {
        stale: ContentItem,
        payload: ContentPayload,
    },
    /// Nothing was here before
    Create { payload: ContentPayload },
    /// The submission no longer covers this position
    Drop { stale: ContentItem },
}

impl SlotAction {
    pub fn label(&self) -> &'static str {
        match self {
            SlotAction::Keep { .. } => "keep",
            SlotAction::UpdateUrl { .. } => "update_url",
            SlotAction::Replace { .. } => "replace",
            SlotAction::Create { .. } => "create",
            SlotAction::Drop { .. } => "drop",
        }
    }
}

/// Decide, per position, how `existing` turns into `submitted`.
///
/// `existing` holds `None` where an attachment's record has vanished; such
/// slots are treated as empty. Positions that are empty on both sides yield
/// no action.
pub fn plan_reconciliation(
    existing: &[Option<ContentItem>],
    submitted: &[ContentPayload],
) -> Vec<SlotAction> {
    let len = existing.len().max(submitted.len());
    let mut actions = Vec::with_capacity(len);

    for position in 0..len {
        let current = existing.get(position).cloned().flatten();
        let payload = submitted.get(position).cloned();

        let action = match (current, payload) {
            (Some(current), Some(payload)) if current.payload == payload => {
                SlotAction::Keep { current }
            }
            (Some(current), Some(payload))
                if current.kind() == payload.kind() && payload.kind().carries_blob() =>
            {
                SlotAction::UpdateUrl { current, payload }
            }
            (Some(stale), Some(payload)) => SlotAction::Replace { stale, payload },
            (Some(stale), None) => SlotAction::Drop { stale },
            (None, Some(payload)) => SlotAction::Create { payload },
            (None, None) => continue,
        };
        actions.push(action);
    }

    actions
}

/// Outcome of an edit, before the parent is written.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// The parent's new attachment sequence, in order
    pub new_sequence: Vec<Attachment>,
    /// The records behind `new_sequence`, in the same order
    pub contents: Vec<ContentItem>,
    /// Records orphaned by the edit, to reclaim after the parent commit
    pub to_delete: Vec<ContentItem>,
    /// Blob URLs replaced by in-place URL updates
    pub superseded_urls: Vec<String>,
}

impl Reconciliation {
    /// Whether the parent still needs to be written (the sequence changed).
    pub fn changes_sequence(&self, existing: &[Attachment]) -> bool {
        self.new_sequence != existing
    }
}

/// Drives content item and blob lifecycles for parents.
#[derive(Clone)]
pub struct AttachmentEngine {
    contents: Arc<dyn ContentItemStore>,
    blobs: Arc<dyn BlobStore>,
}

impl AttachmentEngine {
    pub fn new(contents: Arc<dyn ContentItemStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { contents, blobs }
    }

    /// Persist a fresh record for every payload, concurrently.
    ///
    /// The result is in input order and becomes the new parent's sequence.
    pub async fn create_attachments(&self, sequence: &[ContentPayload]) -> Result<Vec<ContentItem>> {
        let items = try_join_all(sequence.iter().map(|payload| self.contents.create(payload))).await?;

        metrics::record_slot_actions("create", items.len());
        Ok(items)
    }

    /// Fetch the record behind every attachment, in order.
    ///
    /// Vanished records come back as `None`. A record whose stored kind
    /// disagrees with the attachment is a `TagMismatch`.
    pub async fn load_sequence(&self, attachments: &[Attachment]) -> Result<Vec<Option<ContentItem>>> {
        let items = try_join_all(attachments.iter().map(|a| self.contents.get(a.content_id))).await?;

        attachments
            .iter()
            .zip(items)
            .map(|(attachment, item)| match item {
                Some(item) if item.kind() != attachment.kind => Err(AppError::TagMismatch {
                    content_id: item.id,
                    stored: item.kind(),
                    expected: attachment.kind,
                }),
                Some(item) => Ok(Some(item)),
                None => {
                    tracing::warn!(
                        content_id = %attachment.content_id,
                        kind = %attachment.kind,
                        "Attachment references a missing content item"
                    );
                    Ok(None)
                }
            })
            .collect()
    }

    /// Resolve a sequence for display.
    ///
    /// A vanished record is skipped, so later items move up one position.
    /// The stored sequence keeps the dangling attachment until the next
    /// edit heals it.
    pub async fn resolve_contents(&self, attachments: &[Attachment]) -> Result<Vec<ContentItem>> {
        Ok(self
            .load_sequence(attachments)
            .await?
            .into_iter()
            .flatten()
            .collect())
    }

    /// Apply `submitted` over the parent's `existing` sequence.
    ///
    /// Creates and in-place updates run concurrently. Nothing is deleted
    /// here: the caller commits `new_sequence` and then calls [`cleanup`].
    ///
    /// [`cleanup`]: AttachmentEngine::cleanup
    pub async fn reconcile(
        &self,
        existing: &[Attachment],
        submitted: &[ContentPayload],
    ) -> Result<Reconciliation> {
        let current = self.load_sequence(existing).await?;
        let actions = plan_reconciliation(&current, submitted);

        let applied = try_join_all(actions.iter().map(|action| self.apply(action))).await?;

        let mut reconciliation = Reconciliation::default();
        for (action, item) in actions.into_iter().zip(applied) {
            metrics::record_slot_action(action.label());

            match action {
                SlotAction::Replace { stale, .. } | SlotAction::Drop { stale } => {
                    reconciliation.to_delete.push(stale)
                }
                SlotAction::UpdateUrl { current, .. } => {
                    if let Some(url) = current.payload.blob_url() {
                        reconciliation.superseded_urls.push(url.to_string());
                    }
                }
                SlotAction::Keep { .. } | SlotAction::Create { .. } => {}
            }

            if let Some(item) = item {
                reconciliation.new_sequence.push(Attachment::from(&item));
                reconciliation.contents.push(item);
            }
        }

        tracing::debug!(
            kept_or_written = reconciliation.new_sequence.len(),
            to_delete = reconciliation.to_delete.len(),
            superseded = reconciliation.superseded_urls.len(),
            "Reconciled attachment sequence"
        );

        Ok(reconciliation)
    }

    async fn apply(&self, action: &SlotAction) -> Result<Option<ContentItem>> {
        match action {
            SlotAction::Keep { current } => Ok(Some(current.clone())),
            SlotAction::UpdateUrl { current, payload } => {
                self.contents.update(current.id, payload).await?;
                Ok(Some(ContentItem {
                    id: current.id,
                    payload: payload.clone(),
                }))
            }
            SlotAction::Replace { payload, .. } | SlotAction::Create { payload } => {
                self.contents.create(payload).await.map(Some)
            }
            SlotAction::Drop { .. } => Ok(None),
        }
    }

    /// Reclaim what an edit left behind, after the parent commit.
    ///
    /// Blobs still referenced by the new sequence are never deleted, even if
    /// their old record is.
    pub async fn cleanup(&self, parent: ParentRef, reconciliation: &Reconciliation) -> Result<()> {
        let live_urls: HashSet<&str> = reconciliation
            .contents
            .iter()
            .filter_map(|item| item.payload.blob_url())
            .collect();

        let items = join_all(
            reconciliation
                .to_delete
                .iter()
                .map(|item| self.reclaim_item(item, &live_urls)),
        );
        let blobs = join_all(
            reconciliation
                .superseded_urls
                .iter()
                .filter(|url| !live_urls.contains(url.as_str()))
                .map(|url| self.reclaim_blob(url)),
        );
        let (items, blobs) = futures::join!(items, blobs);

        let failures: Vec<CleanupFailure> = items
            .into_iter()
            .chain(blobs)
            .filter_map(|result| result.err())
            .collect();

        self.report(parent, "edit", failures)
    }

    /// Delete every record (and blob) a parent references.
    ///
    /// Every attachment is attempted independently. On any failure the
    /// caller must keep the parent: its sequence is the only path a retry
    /// has to the leftovers. Records already gone count as reclaimed.
    pub async fn delete_all_attachments(
        &self,
        parent: ParentRef,
        attachments: &[Attachment],
    ) -> Result<()> {
        let none_live = HashSet::new();

        let results = join_all(attachments.iter().map(|attachment| {
            let none_live = &none_live;
            async move {
                match self.contents.get(attachment.content_id).await {
                    Ok(Some(item)) => self.reclaim_item(&item, none_live).await,
                    Ok(None) => Ok(()),
                    Err(e) => Err(CleanupFailure {
                        target: CleanupTarget::Item {
                            content_id: attachment.content_id,
                            kind: attachment.kind,
                        },
                        reason: e.to_string(),
                    }),
                }
            }
        }))
        .await;

        let failures = results.into_iter().filter_map(|r| r.err()).collect();
        self.report(parent, "cascade", failures)
    }

    /// Reclaim unreferenced items found outside any request.
    ///
    /// Blobs at `urls_in_use` are left alone; only the records go. Returns
    /// the items that could not be reclaimed.
    pub async fn reclaim(
        &self,
        items: &[ContentItem],
        urls_in_use: &HashSet<String>,
    ) -> Vec<CleanupFailure> {
        let live_urls: HashSet<&str> = urls_in_use.iter().map(String::as_str).collect();
        join_all(items.iter().map(|item| self.reclaim_item(item, &live_urls)))
            .await
            .into_iter()
            .filter_map(|r| r.err())
            .collect()
    }

    /// Blob first, then record, so a failed blob delete leaves the URL
    /// reachable for the next attempt.
    async fn reclaim_item(
        &self,
        item: &ContentItem,
        live_urls: &HashSet<&str>,
    ) -> std::result::Result<(), CleanupFailure> {
        let failure = |reason: String| CleanupFailure {
            target: CleanupTarget::Item {
                content_id: item.id,
                kind: item.kind(),
            },
            reason,
        };

        if let Some(url) = item.payload.blob_url() {
            if !live_urls.contains(url) {
                if let Some(key) = self.blobs.key_from_url(url) {
                    self.blobs
                        .delete(&key)
                        .await
                        .map_err(|e| failure(e.to_string()))?;
                }
            }
        }

        self.contents
            .delete(item.id)
            .await
            .map(|_| ())
            .map_err(|e| failure(e.to_string()))
    }

    async fn reclaim_blob(&self, url: &str) -> std::result::Result<(), CleanupFailure> {
        let Some(key) = self.blobs.key_from_url(url) else {
            return Ok(());
        };

        self.blobs.delete(&key).await.map_err(|e| CleanupFailure {
            target: CleanupTarget::Blob { key: key.clone() },
            reason: e.to_string(),
        })
    }

    fn report(&self, parent: ParentRef, path: &str, failures: Vec<CleanupFailure>) -> Result<()> {
        if failures.is_empty() {
            return Ok(());
        }

        metrics::record_cleanup_failures(path, failures.len());
        for failure in &failures {
            tracing::warn!(parent = %parent, path, failure = %failure, "Attachment cleanup failed");
        }

        Err(AppError::PartialCleanupFailure { parent, failures })
    }
}
