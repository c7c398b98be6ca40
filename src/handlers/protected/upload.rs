// handlers/protected/upload.rs - POST /api/upload handler
//
// Accepts multipart `file` + optional `folder`, validates, and forwards to the
// configured media provider. The provider JSON is returned as-is.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde_json::Value;
use tracing::info;

use crate::app::SharedState;
use crate::error::ApiError;
use crate::media::{is_valid_folder, MediaUpload};
use crate::middleware::Subject;

pub async fn upload(
    State(state): State<SharedState>,
    Extension(Subject(user)): Extension<Subject>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let max_bytes = state.config.media.max_upload_bytes;

    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;
    let mut folder: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((file_name, content_type, bytes.to_vec()));
            }
            Some("folder") => {
                folder = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let Some((file_name, content_type, bytes)) = file else {
        return Err(ApiError::missing_parameter("file"));
    };
    if bytes.is_empty() {
        return Err(ApiError::bad_request("Uploaded file is empty"));
    }
    if bytes.len() > max_bytes {
        return Err(ApiError::payload_too_large(format!(
            "Uploaded file exceeds {} bytes",
            max_bytes
        )));
    }

    let folder = folder
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| state.config.media.default_folder.clone());
    if !is_valid_folder(&folder) {
        return Err(ApiError::bad_request(format!("Invalid folder '{}'", folder)));
    }

    info!(
        "Forwarding upload {} ({} bytes) to {}/{} for {}",
        file_name,
        bytes.len(),
        state.media.name(),
        folder,
        user.uid
    );

    let response = state
        .media
        .store(MediaUpload {
            file_name,
            content_type,
            folder,
            bytes,
        })
        .await?;

    Ok(Json(response))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("Upload exceeds the size limit")
    } else {
        ApiError::bad_request(format!("Invalid multipart body: {}", err.body_text()))
    }
}
