//! Submitted content descriptions and their strict parsing.
//!
//! A client submits the content sequence as JSON, one element per slot:
//! `{"text": "..."}`, `{"image": "<url>"}` or `{"video": "<url>"}`. Slots
//! that a file upload fills may be sent as `null` or `{}`; the upload
//! overlay replaces them before parsing.

use super::content::ContentPayload;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// One element of a submitted content sequence, as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<DescriptionFields>")]
pub struct ContentDescription {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
}

#[derive(Deserialize)]
struct DescriptionFields {
    #[serde(default, alias = "textContent")]
    text: Option<String>,
    #[serde(default, alias = "imageContent")]
    image: Option<String>,
    #[serde(default, alias = "videoContent")]
    video: Option<String>,
}

impl From<Option<DescriptionFields>> for ContentDescription {
    fn from(fields: Option<DescriptionFields>) -> Self {
        match fields {
            Some(DescriptionFields { text, image, video }) => Self { text, image, video },
            None => Self::default(),
        }
    }
}

impl ContentDescription {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            text: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self {
            image: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn video(url: impl Into<String>) -> Self {
        Self {
            video: Some(url.into()),
            ..Self::default()
        }
    }

    /// Parse into a payload. Exactly one kind key must be present.
    pub fn into_payload(self, position: usize) -> Result<ContentPayload> {
        let malformed = |reason: &str| AppError::MalformedContent {
            position,
            reason: reason.to_string(),
        };

        match (self.text, self.image, self.video) {
            (Some(value), None, None) => Ok(ContentPayload::Text { value }),
            (None, Some(url), None) if url.trim().is_empty() => Err(malformed("empty image url")),
            (None, None, Some(url)) if url.trim().is_empty() => Err(malformed("empty video url")),
            (None, Some(url), None) => Ok(ContentPayload::Image { url }),
            (None, None, Some(url)) => Ok(ContentPayload::Video { url }),
            (None, None, None) => Err(malformed(
                "no content key (expected one of text, image, video)",
            )),
            _ => Err(malformed(
                "more than one content key (text, image, video are exclusive)",
            )),
        }
    }
}

/// Parse a whole submitted sequence, failing on the first malformed slot.
pub fn parse_descriptions(descriptions: Vec<ContentDescription>) -> Result<Vec<ContentPayload>> {
    descriptions
        .into_iter()
        .enumerate()
        .map(|(position, description)| description.into_payload(position))
        .collect()
}

impl From<&ContentPayload> for ContentDescription {
    fn from(payload: &ContentPayload) -> Self {
        match payload {
            ContentPayload::Text { value } => Self::text(value.clone()),
            ContentPayload::Image { url } => Self::image(url.clone()),
            ContentPayload::Video { url } => Self::video(url.clone()),
        }
    }
}
