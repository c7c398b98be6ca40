//! Client-side upload helper.
//!
//! [`UploadClient::upload_file`] posts a single multipart request to the
//! portal's upload endpoint and hands back the provider response. There is
//! no retry: a failed upload is logged and returned to the caller, which
//! decides what the user sees. [`read_as_base64`] builds a local preview
//! without touching the network.

use base64::Engine;
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

/// Folder used when the caller does not name one.
pub const DEFAULT_FOLDER: &str = "receipts";

/// Path of the upload endpoint relative to the portal base URL.
pub const UPLOAD_PATH: &str = "/api/upload";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Upload failed with status {status}")]
    UploadFailed { status: u16, body: String },

    #[error("Upload request could not be sent: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Upload response was not usable: {0}")]
    InvalidResponse(String),

    #[error("Upload file is not usable: {0}")]
    InvalidFile(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Provider response, kept as the original JSON object. Only `url` is
/// checked; every other field is passed through as the provider sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadResponse {
    url: String,
    raw: Map<String, Value>,
}

impl UploadResponse {
    /// Validate an arbitrary provider payload.
    pub fn from_value(value: Value) -> Result<Self, UploadError> {
        let Value::Object(raw) = value else {
            return Err(UploadError::InvalidResponse("expected a JSON object".to_string()));
        };
        let url = match raw.get("url") {
            Some(Value::String(url)) if !url.trim().is_empty() => url.clone(),
            Some(Value::String(_)) | None => {
                return Err(UploadError::InvalidResponse("missing url".to_string()))
            }
            Some(other) => {
                return Err(UploadError::InvalidResponse(format!("url must be a string, got {}", other)))
            }
        };
        Ok(Self { url, raw })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Provider id of the stored asset, when it is a string.
    pub fn public_id(&self) -> Option<&str> {
        self.raw.get("public_id").and_then(Value::as_str)
    }

    /// Any provider field, untouched.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.raw.get(name)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.raw)
    }
}

/// A file held fully in memory.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(Self {
            content_type: mime_for_path(path).to_string(),
            name,
            bytes,
        })
    }
}

pub struct UploadClient {
    endpoint: String,
    session_token: Option<String>,
    client: reqwest::Client,
}

impl UploadClient {
    pub fn new(base_url: &str) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(UploadError::Network)?;
        Ok(Self {
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), UPLOAD_PATH),
            session_token: None,
            client,
        })
    }

    /// Send the session token along with uploads.
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Upload `file` into `folder` (default [`DEFAULT_FOLDER`]).
    pub async fn upload_file(&self, file: &UploadFile, folder: Option<&str>) -> Result<UploadResponse, UploadError> {
        let folder = folder.unwrap_or(DEFAULT_FOLDER);

        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| {
                error!("Refusing to upload {}: bad content type {:?}: {}", file.name, file.content_type, e);
                UploadError::InvalidFile(format!("invalid content type '{}'", file.content_type))
            })?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("folder", folder.to_string());

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(token) = &self.session_token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Error uploading {} to {}: {}", file.name, self.endpoint, e);
                return Err(UploadError::Network(e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Upload of {} failed with status {}", file.name, status);
            return Err(UploadError::UploadFailed {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = response.json().await.map_err(|e| {
            error!("Upload of {} returned an unreadable body: {}", file.name, e);
            UploadError::InvalidResponse(e.to_string())
        })?;
        UploadResponse::from_value(value).map_err(|e| {
            error!("Upload of {} returned an unusable response: {}", file.name, e);
            e
        })
    }
}

/// Read the whole file and encode it as a `data:` URL for previews.
pub async fn read_as_base64(path: impl AsRef<Path>) -> Result<String, std::io::Error> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    Ok(to_data_url(mime_for_path(path), &bytes))
}

pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{};base64,{}", mime, encoded)
}

/// Best-effort content type from the file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_round_trips_unknown_fields() {
        let original = json!({ "url": "https://cdn/x.png", "public_id": "receipts/x", "width": 640 });
        let response = UploadResponse::from_value(original.clone()).unwrap();
        assert_eq!(response.url(), "https://cdn/x.png");
        assert_eq!(response.public_id(), Some("receipts/x"));
        assert_eq!(response.field("width"), Some(&json!(640)));
        assert_eq!(response.into_value(), original);
    }

    #[test]
    fn response_keeps_null_and_non_string_fields() {
        for original in [
            json!({ "url": "https://cdn/x.png", "public_id": null }),
            json!({ "url": "https://cdn/x.png", "public_id": 42, "tags": [], "meta": { "w": 1 } }),
        ] {
            let response = UploadResponse::from_value(original.clone()).unwrap();
            assert_eq!(response.public_id(), None);
            assert_eq!(response.into_value(), original);
        }
    }

    #[test]
    fn response_without_url_is_rejected() {
        assert!(matches!(
            UploadResponse::from_value(json!({ "public_id": "x" })),
            Err(UploadError::InvalidResponse(_))
        ));
        assert!(matches!(
            UploadResponse::from_value(json!({ "url": "" })),
            Err(UploadError::InvalidResponse(_))
        ));
        assert!(matches!(
            UploadResponse::from_value(json!({ "url": 7 })),
            Err(UploadError::InvalidResponse(_))
        ));
        assert!(matches!(
            UploadResponse::from_value(json!(["https://cdn/x.png"])),
            Err(UploadError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn bad_content_type_fails_before_sending() {
        // Nothing listens here; reaching the network would be a Network error
        let client = UploadClient::new("http://127.0.0.1:9").unwrap();
        let file = UploadFile::new("r.png", "not a mime", vec![1]);
        let err = client.upload_file(&file, None).await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidFile(_)));
    }

    #[test]
    fn data_url_encoding() {
        assert_eq!(to_data_url("image/png", &[0, 1, 2]), "data:image/png;base64,AAEC");
    }

    #[test]
    fn mime_detection() {
        assert_eq!(mime_for_path(Path::new("r.PNG")), "image/png");
        assert_eq!(mime_for_path(Path::new("r.jpeg")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("r")), "application/octet-stream");
    }

    #[test]
    fn client_builds_fixed_endpoint() {
        let client = UploadClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.endpoint(), "http://localhost:3000/api/upload");
    }

    #[tokio::test]
    async fn read_as_base64_missing_file_propagates_io_error() {
        let err = read_as_base64("/definitely/not/here.png").await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
