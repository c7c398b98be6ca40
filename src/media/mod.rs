//! Forwarding of uploaded files to the hosted media provider.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::MediaConfig;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Media provider rejected the upload ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Media provider returned a non-JSON body: {0}")]
    Malformed(String),

    #[error("Invalid media provider configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// A validated file on its way to the provider.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub folder: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store the file and return the provider's JSON untouched.
    async fn store(&self, upload: MediaUpload) -> Result<Value, MediaError>;

    fn name(&self) -> &'static str;
}

/// Multipart POST to the provider's upload URL.
pub struct HttpMediaStore {
    provider_url: String,
    upload_preset: Option<String>,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpMediaStore {
    pub fn new(config: &MediaConfig) -> Result<Self, MediaError> {
        let provider_url = config
            .provider_url
            .clone()
            .ok_or_else(|| MediaError::Config("MEDIA_PROVIDER_URL is not set".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            provider_url,
            upload_preset: config.upload_preset.clone(),
            api_key: config.api_key.clone(),
            client,
        })
    }
}

#[async_trait]
impl MediaStore for HttpMediaStore {
    async fn store(&self, upload: MediaUpload) -> Result<Value, MediaError> {
        let mut part = reqwest::multipart::Part::bytes(upload.bytes).file_name(upload.file_name);
        if let Some(content_type) = &upload.content_type {
            part = part.mime_str(content_type)?;
        }

        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("folder", upload.folder);
        if let Some(preset) = &self.upload_preset {
            form = form.text("upload_preset", preset.clone());
        }
        if let Some(key) = &self.api_key {
            form = form.text("api_key", key.clone());
        }

        let response = self.client.post(&self.provider_url).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(MediaError::Rejected {
                status: status.as_u16(),
                message: body.chars().take(512).collect(),
            });
        }

        serde_json::from_str(&body).map_err(|e| MediaError::Malformed(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Keeps uploads in memory. Development and tests.
#[derive(Clone, Default)]
pub struct MemoryMediaStore {
    stored: Arc<RwLock<Vec<MediaUpload>>>,
    counter: Arc<AtomicUsize>,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn stored(&self) -> Vec<MediaUpload> {
        self.stored.read().await.clone()
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn store(&self, upload: MediaUpload) -> Result<Value, MediaError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let public_id = format!("{}/{}-{}", upload.folder, n, upload.file_name);
        let response = json!({
            "url": format!("memory://{}", public_id),
            "public_id": public_id,
            "bytes": upload.bytes.len(),
            "folder": upload.folder,
        });
        self.stored.write().await.push(upload);
        Ok(response)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

pub fn from_config(config: &MediaConfig) -> Result<Arc<dyn MediaStore>, MediaError> {
    if config.provider_url.is_some() {
        let store = HttpMediaStore::new(config)?;
        tracing::info!("Forwarding uploads to {}", store.provider_url);
        return Ok(Arc::new(store));
    }
    tracing::warn!("No media provider configured, keeping uploads in memory");
    Ok(Arc::new(MemoryMediaStore::new()))
}

/// Folder names are a flat path of `[A-Za-z0-9_-]` segments.
pub fn is_valid_folder(folder: &str) -> bool {
    !folder.is_empty()
        && folder.len() <= 128
        && !folder.starts_with('/')
        && folder
            .split('/')
            .all(|seg| !seg.is_empty() && seg != ".." && seg.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_validation() {
        assert!(is_valid_folder("receipts"));
        assert!(is_valid_folder("receipts/2024-03"));
        assert!(!is_valid_folder(""));
        assert!(!is_valid_folder("../etc"));
        assert!(!is_valid_folder("/abs"));
        assert!(!is_valid_folder("a//b"));
        assert!(!is_valid_folder("sp ace"));
    }

    #[tokio::test]
    async fn memory_store_returns_url_and_keeps_file() {
        let store = MemoryMediaStore::new();
        let value = store
            .store(MediaUpload {
                file_name: "r.png".into(),
                content_type: Some("image/png".into()),
                folder: "receipts".into(),
                bytes: vec![1, 2, 3],
            })
            .await
            .unwrap();
        assert_eq!(value["url"], "memory://receipts/1-r.png");
        assert_eq!(store.stored().await.len(), 1);
    }

    #[test]
    fn http_store_requires_provider_url() {
        let config = crate::config::AppConfig::development().media;
        assert!(matches!(HttpMediaStore::new(&config), Err(MediaError::Config(_))));
    }
}
