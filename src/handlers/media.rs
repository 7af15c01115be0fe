use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header},
};

use crate::{
    auth::AuthUser,
    error::ApiError,
    media::{MediaError, MediaState, sanitize_folder},
    models::{UploadRequest, UploadResponse},
};

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().contains("application/json"))
}

/// upload_image
///
/// [Authenticated Route] Pushes an image to the media host and returns where
/// it landed. The body names either a data URI / base64 `file` or a remote
/// `url`; `folder` defaults to `autoshop`.
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body = UploadRequest,
    responses(
        (status = 200, description = "Uploaded", body = UploadResponse),
        (status = 400, description = "Nothing to upload", body = crate::error::ErrorBody),
        (status = 415, description = "Not JSON", body = crate::error::ErrorBody),
        (status = 500, description = "Media host not configured", body = crate::error::ErrorBody),
        (status = 502, description = "Media host failed", body = crate::error::ErrorBody)
    )
)]
pub async fn upload_image(
    AuthUser { id: user_id, .. }: AuthUser,
    State(media): State<MediaState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    if !is_json(&headers) {
        return Err(ApiError::UnsupportedMediaType("Unsupported content type".to_string()));
    }
    let payload: UploadRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))?;

    let source = payload
        .file
        .or(payload.url)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("file (base64) or url required"))?;
    let folder = sanitize_folder(payload.folder.as_deref().unwrap_or_default());

    match media.upload(&source, &folder).await {
        Ok(uploaded) => {
            tracing::info!(%user_id, public_id = %uploaded.public_id, "image uploaded");
            Ok(Json(UploadResponse {
                url: uploaded.url,
                public_id: uploaded.public_id,
            }))
        }
        Err(MediaError::NotConfigured) => Err(ApiError::Internal(
            "Cloudinary is not configured. Set CLOUDINARY_CLOUD_NAME and CLOUDINARY_UPLOAD_PRESET."
                .to_string(),
        )),
        Err(MediaError::Upload(detail)) => {
            tracing::warn!(%user_id, error = %detail, "media host rejected upload");
            Err(ApiError::Upstream(detail))
        }
    }
}
