use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::content::BlobContent;

pub const DEFAULT_ATTACHMENT_MIME_TYPE: &str = "text/plain";

/// A file handed to the agent alongside a user message.
///
/// The url, inline content and filepath are not mutually exclusive. When more
/// than one is set, [`Attachment::source`] decides which one is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
}

/// Where the bytes of an attachment come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentSource<'a> {
    Inline(&'a str),
    File(&'a Path),
    Url(&'a str),
}

impl Attachment {
    pub fn new(
        url: Option<String>,
        content: Option<String>,
        mime_type: Option<String>,
        filepath: Option<String>,
    ) -> Self {
        Self {
            url,
            content,
            mime_type: mime_type.unwrap_or_else(|| DEFAULT_ATTACHMENT_MIME_TYPE.to_string()),
            filepath,
        }
    }

    pub fn from_content<S: Into<String>>(content: S) -> Self {
        Self::new(None, Some(content.into()), None, None)
    }

    pub fn from_url<S: Into<String>>(url: S) -> Self {
        Self::new(Some(url.into()), None, None, None)
    }

    pub fn from_filepath<S: Into<String>>(filepath: S) -> Self {
        Self::new(None, None, None, Some(filepath.into()))
    }

    pub fn with_mime_type<S: Into<String>>(mut self, mime_type: S) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Inline content wins over a filepath, which wins over a url.
    pub fn source(&self) -> Option<AttachmentSource<'_>> {
        if let Some(content) = &self.content {
            return Some(AttachmentSource::Inline(content));
        }
        if let Some(filepath) = &self.filepath {
            return Some(AttachmentSource::File(Path::new(filepath)));
        }
        self.url.as_deref().map(AttachmentSource::Url)
    }

    /// Read the bytes behind this attachment once, so every model turn sees the same data.
    ///
    /// Files are read from the local disk and urls are downloaded with `client`. When
    /// the mime type was left at its default, a url's `Content-Type` replaces it.
    pub async fn load(&self, client: &Client) -> Result<Option<BlobContent>> {
        let (bytes, mime_type) = match self.source() {
            Some(AttachmentSource::Inline(content)) => {
                (content.as_bytes().to_vec(), self.mime_type.clone())
            }
            Some(AttachmentSource::File(path)) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| anyhow!("Failed to read attachment {}: {}", path.display(), e))?;
                (bytes, self.mime_type.clone())
            }
            Some(AttachmentSource::Url(url)) => {
                let response = client.get(url).send().await?;
                if !response.status().is_success() {
                    return Err(anyhow!(
                        "Failed to fetch attachment {}: {}",
                        url,
                        response.status()
                    ));
                }
                let served_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.split(';').next())
                    .map(|value| value.trim().to_string())
                    .filter(|value| !value.is_empty());
                let mime_type = match served_type {
                    Some(served) if self.mime_type == DEFAULT_ATTACHMENT_MIME_TYPE => served,
                    _ => self.mime_type.clone(),
                };
                (response.bytes().await?.to_vec(), mime_type)
            }
            None => return Ok(None),
        };

        Ok(Some(BlobContent {
            data: BASE64.encode(bytes),
            mime_type,
        }))
    }
}
