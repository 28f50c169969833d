//! Upload mapping: binary file parts to positioned blob URLs.
//!
//! A create/edit request carries its content sequence as JSON plus any
//! number of file parts. Each file part names its target slot in its field
//! name (`contents[2]`, `file[2][video]`, ...). The mapper validates the
//! whole batch, uploads every file concurrently and returns an overlay of
//! `{image|video: url}` descriptions keyed by slot, which wins over whatever
//! placeholder the JSON carried at that slot.

use crate::error::{AppError, Result};
use crate::metrics::attachments as metrics;
use crate::models::{parse_descriptions, ContentDescription, ContentKind, ContentPayload, ParentKind};
use blob_store::{object_key, BlobStore};
use bytes::Bytes;
use futures::future::join_all;
use mime::Mime;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

static SLOT_INDEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d+)\]").expect("slot index pattern is valid"));

/// A binary part received with a create/edit request.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    /// Multipart field name, carries the target slot as `[n]`
    pub field_name: String,
    /// Client-supplied file name, used to sniff the content type
    pub file_name: String,
    pub bytes: Bytes,
}

impl IncomingFile {
    pub fn new(field_name: impl Into<String>, file_name: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            field_name: field_name.into(),
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Content type sniffed from a file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContentType {
    pub mime: Mime,
    /// Lower-cased, with the leading dot
    pub extension: String,
}

/// Resolve a file name to its MIME type by extension (case-insensitive).
///
/// Returns `None` for anything outside the supported image and video set.
pub fn resolve_content_type(file_name: &str) -> Option<ResolvedContentType> {
    let extension = Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();

    let mime = match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tiff" => "image/tiff",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "wmv" => "video/x-ms-wmv",
        _ => return None,
    };

    Some(ResolvedContentType {
        mime: mime.parse().ok()?,
        extension: format!(".{}", extension),
    })
}

/// Kinds of content that are backed by a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn from_mime(mime: &Mime) -> Option<Self> {
        let top = mime.type_();
        if top == mime::IMAGE {
            Some(MediaKind::Image)
        } else if top == mime::VIDEO {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    pub fn content_kind(&self) -> ContentKind {
        match self {
            MediaKind::Image => ContentKind::Image,
            MediaKind::Video => ContentKind::Video,
        }
    }

    fn describe(&self, url: String) -> ContentDescription {
        match self {
            MediaKind::Image => ContentDescription::image(url),
            MediaKind::Video => ContentDescription::video(url),
        }
    }

    /// Kind named in a field name such as `file[0][imageContent]`, if any.
    fn declared_in(field_name: &str) -> Result<Option<Self>> {
        let lowered = field_name.to_ascii_lowercase();
        match (lowered.contains("image"), lowered.contains("video")) {
            (true, false) => Ok(Some(MediaKind::Image)),
            (false, true) => Ok(Some(MediaKind::Video)),
            (false, false) => Ok(None),
            (true, true) => Err(AppError::InvalidAttachment {
                field_name: field_name.to_string(),
                reason: "field declares both image and video".to_string(),
            }),
        }
    }
}

/// Slot index encoded in a field name: the first bracketed integer.
pub fn slot_position(field_name: &str) -> Option<usize> {
    SLOT_INDEX
        .captures(field_name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// A stored blob and the slot it fills.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedBlob {
    pub kind: MediaKind,
    pub key: String,
    pub url: String,
}

/// Slot-addressed blob URLs to merge into a submitted sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOverlay {
    slots: BTreeMap<usize, UploadedBlob>,
}

impl UploadOverlay {
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, position: usize) -> Option<&UploadedBlob> {
        self.slots.get(&position)
    }

    pub fn blobs(&self) -> impl Iterator<Item = &UploadedBlob> {
        self.slots.values()
    }

    /// Write each overlay entry over the description at its position.
    ///
    /// A position just past the end extends the sequence. Anything further
    /// out would leave a gap, which is `MalformedContent` at the first
    /// unfilled slot.
    pub fn merge_into(
        &self,
        mut descriptions: Vec<ContentDescription>,
    ) -> Result<Vec<ContentDescription>> {
        // Slots iterate in ascending order, so a gap can't be filled later
        for (&position, blob) in &self.slots {
            let description = blob.kind.describe(blob.url.clone());
            match position.cmp(&descriptions.len()) {
                Ordering::Less => descriptions[position] = description,
                Ordering::Equal => descriptions.push(description),
                Ordering::Greater => {
                    return Err(AppError::MalformedContent {
                        position: descriptions.len(),
                        reason: format!("no content before uploaded slot {}", position),
                    })
                }
            }
        }
        Ok(descriptions)
    }
}

/// A validated file, ready to be put under its key.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub position: usize,
    pub kind: MediaKind,
    pub key: String,
    /// URL the store will serve the object from once written
    pub url: String,
    pub content_type: Mime,
    pub file_name: String,
    pub bytes: Bytes,
}

/// A fully validated batch. Nothing has been written yet.
#[derive(Debug, Clone, Default)]
pub struct UploadBatch {
    uploads: Vec<PendingUpload>,
}

impl UploadBatch {
    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty()
    }

    pub fn uploads(&self) -> &[PendingUpload] {
        &self.uploads
    }

    /// The overlay this batch will produce if every upload succeeds.
    pub fn overlay(&self) -> UploadOverlay {
        let slots = self
            .uploads
            .iter()
            .map(|u| {
                (
                    u.position,
                    UploadedBlob {
                        kind: u.kind,
                        key: u.key.clone(),
                        url: u.url.clone(),
                    },
                )
            })
            .collect();
        UploadOverlay { slots }
    }
}

/// Turns incoming file parts into stored blobs and a positional overlay.
#[derive(Clone)]
pub struct UploadMapper {
    store: Arc<dyn BlobStore>,
}

impl UploadMapper {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Validate every file and assign its key. Issues no I/O.
    pub fn prepare(
        &self,
        parent: ParentKind,
        owner_id: Uuid,
        files: Vec<IncomingFile>,
    ) -> Result<UploadBatch> {
        let mut seen = HashSet::new();
        let mut uploads = Vec::with_capacity(files.len());

        for file in files {
            let invalid = |reason: &str| AppError::InvalidAttachment {
                field_name: file.field_name.clone(),
                reason: reason.to_string(),
            };

            let position =
                slot_position(&file.field_name).ok_or_else(|| invalid("no [n] slot index"))?;

            let resolved = resolve_content_type(&file.file_name).ok_or_else(|| {
                AppError::UnsupportedMediaType {
                    file_name: file.file_name.clone(),
                }
            })?;
            let kind = MediaKind::from_mime(&resolved.mime).ok_or_else(|| {
                AppError::UnsupportedMediaType {
                    file_name: file.file_name.clone(),
                }
            })?;

            if let Some(declared) = MediaKind::declared_in(&file.field_name)? {
                if declared != kind {
                    return Err(invalid(&format!(
                        "declared {} but file is {}",
                        declared.content_kind(),
                        resolved.mime
                    )));
                }
            }

            if !seen.insert(position) {
                return Err(invalid(&format!("slot {} already has a file", position)));
            }

            let key = object_key(parent.key_prefix(), owner_id, &resolved.extension);
            let url = self.store.object_url(&key);

            uploads.push(PendingUpload {
                position,
                kind,
                key,
                url,
                content_type: resolved.mime,
                file_name: file.file_name,
                bytes: file.bytes,
            });
        }

        Ok(UploadBatch { uploads })
    }

    /// Upload the whole batch concurrently.
    ///
    /// If any upload fails, the blobs that did land are deleted (best effort)
    /// and `UploadFailed` is returned.
    pub async fn upload(&self, batch: UploadBatch) -> Result<UploadOverlay> {
        if batch.is_empty() {
            return Ok(UploadOverlay::default());
        }

        let started = Instant::now();
        let results = join_all(batch.uploads.iter().map(|upload| async move {
            let result = self
                .store
                .put(&upload.key, upload.bytes.clone(), upload.content_type.as_ref())
                .await;
            (upload, result)
        }))
        .await;
        metrics::record_upload_batch_duration(started.elapsed());

        let mut slots = BTreeMap::new();
        let mut failures = Vec::new();

        for (upload, result) in results {
            let kind = upload.kind.content_kind();
            match result {
                Ok(url) => {
                    metrics::record_upload(kind.as_str(), "success");
                    tracing::debug!(key = %upload.key, position = upload.position, "Uploaded attachment");
                    slots.insert(
                        upload.position,
                        UploadedBlob {
                            kind: upload.kind,
                            key: upload.key.clone(),
                            url,
                        },
                    );
                }
                Err(e) => {
                    metrics::record_upload(kind.as_str(), "error");
                    tracing::warn!(
                        key = %upload.key,
                        file_name = %upload.file_name,
                        error = %e,
                        "Attachment upload failed"
                    );
                    failures.push(format!("{}: {}", upload.file_name, e));
                }
            }
        }

        if failures.is_empty() {
            return Ok(UploadOverlay { slots });
        }

        self.discard(&UploadOverlay { slots }).await;
        Err(AppError::UploadFailed(failures.join("; ")))
    }

    /// `mapUploads`: validate, then upload, then hand back the overlay.
    pub async fn map_uploads(
        &self,
        parent: ParentKind,
        owner_id: Uuid,
        files: Vec<IncomingFile>,
    ) -> Result<UploadOverlay> {
        let batch = self.prepare(parent, owner_id, files)?;
        self.upload(batch).await
    }

    /// Merge a prepared batch into the submitted descriptions and parse them.
    ///
    /// The merged sequence is parsed once before uploading, so malformed
    /// input fails without touching the store.
    pub async fn resolve_sequence(
        &self,
        batch: UploadBatch,
        descriptions: Vec<ContentDescription>,
    ) -> Result<(Vec<ContentPayload>, UploadOverlay)> {
        parse_descriptions(batch.overlay().merge_into(descriptions.clone())?)?;

        let overlay = self.upload(batch).await?;
        let payloads = parse_descriptions(overlay.merge_into(descriptions)?)?;
        Ok((payloads, overlay))
    }

    /// Best-effort delete of every blob in `overlay`.
    pub async fn discard(&self, overlay: &UploadOverlay) {
        let results = join_all(overlay.blobs().map(|blob| async move {
            (blob, self.store.delete(&blob.key).await)
        }))
        .await;

        for (blob, result) in results {
            if let Err(e) = result {
                tracing::warn!(key = %blob.key, error = %e, "Failed to discard uploaded blob");
            }
        }
    }
}
