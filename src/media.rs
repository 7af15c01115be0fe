use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

// 1. MediaHost Contract
/// MediaHost
///
/// Abstract contract for the third-party image host. Handlers only see this
/// trait, so the Cloudinary client can be replaced by `MockMediaHost` in tests.
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Uploads an image given either a data URI / base64 payload or a remote URL.
    ///
    /// # Arguments
    /// * `source`: the data URI, base64 body or `http(s)` URL to ingest.
    /// * `folder`: target folder on the host (already sanitized).
    async fn upload(&self, source: &str, folder: &str) -> Result<UploadedMedia, MediaError>;
}

/// UploadedMedia
///
/// Where the host stored the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media host is not configured")]
    NotConfigured,
    #[error("media upload failed: {0}")]
    Upload(String),
}

/// Folder used when the client does not name one.
pub const DEFAULT_FOLDER: &str = "autoshop";

/// sanitize_folder
///
/// Strips directory navigation (`..`, `.`) and empty segments from a
/// client-supplied folder, falling back to `DEFAULT_FOLDER` when nothing is left.
pub fn sanitize_folder(folder: &str) -> String {
    let cleaned = folder
        .split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/");
    if cleaned.is_empty() {
        DEFAULT_FOLDER.to_string()
    } else {
        cleaned
    }
}

// 2. The Real Implementation (Cloudinary)
/// CloudinaryClient
///
/// Uploads through Cloudinary's unsigned upload-preset endpoint. Both the
/// cloud name and the preset must be configured; otherwise every upload
/// fails with `MediaError::NotConfigured`.
#[derive(Clone)]
pub struct CloudinaryClient {
    http: reqwest::Client,
    cloud_name: Option<String>,
    upload_preset: Option<String>,
}

#[derive(Deserialize)]
struct CloudinaryUploadResponse {
    secure_url: String,
    public_id: String,
}

impl CloudinaryClient {
    pub fn new(cloud_name: Option<String>, upload_preset: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            cloud_name,
            upload_preset,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.cloud_name.is_some() && self.upload_preset.is_some()
    }
}

#[async_trait]
impl MediaHost for CloudinaryClient {
    async fn upload(&self, source: &str, folder: &str) -> Result<UploadedMedia, MediaError> {
        let (Some(cloud_name), Some(preset)) = (&self.cloud_name, &self.upload_preset) else {
            return Err(MediaError::NotConfigured);
        };

        let endpoint = format!("https://api.cloudinary.com/v1_1/{cloud_name}/image/upload");
        let response = self
            .http
            .post(&endpoint)
            .form(&[
                ("upload_preset", preset.as_str()),
                ("folder", folder),
                ("file", source),
            ])
            .send()
            .await
            .map_err(|e| MediaError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(MediaError::Upload(if detail.is_empty() {
                format!("Cloudinary unsigned upload failed: {status}")
            } else {
                detail
            }));
        }

        let body: CloudinaryUploadResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Upload(e.to_string()))?;

        Ok(UploadedMedia {
            url: body.secure_url,
            public_id: body.public_id,
        })
    }
}

// 3. The Mock Implementation (For Tests)
/// MockMediaHost
///
/// Deterministic stand-in for the image host. Each upload gets a sequential id.
#[derive(Default)]
pub struct MockMediaHost {
    /// When true, all uploads return a simulated failure.
    pub should_fail: bool,
    counter: AtomicU64,
}

impl MockMediaHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl MediaHost for MockMediaHost {
    async fn upload(&self, _source: &str, folder: &str) -> Result<UploadedMedia, MediaError> {
        if self.should_fail {
            return Err(MediaError::Upload("Mock media error: simulation requested".to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let public_id = format!("{}/mock-{}", sanitize_folder(folder), n);
        Ok(UploadedMedia {
            url: format!("https://media.mock.local/{public_id}.jpg"),
            public_id,
        })
    }
}

/// MediaState
///
/// The shared handle to the media host stored in the application state.
pub type MediaState = Arc<dyn MediaHost>;
