use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::{json_error, ApiError};
use stagebook_db::AppState;

/// SECURITY: Validate image magic bytes to prevent disguised file uploads
pub fn validate_image_magic_bytes(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    // JPEG
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return true;
    }
    // PNG
    if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return true;
    }
    // GIF
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return true;
    }
    // WebP (RIFF....WEBP)
    if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return true;
    }
    // AVIF / HEIC (ftyp box)
    if &data[4..8] == b"ftyp" && matches!(&data[8..12], b"avif" | b"heic" | b"heix" | b"mif1") {
        return true;
    }
    false
}

pub fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// An image part read from a multipart body.
#[derive(Debug, Clone)]
pub struct ImagePart {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Validates an image and hands it to blob storage. Returns its public URL.
pub async fn store_image(state: &AppState, image: &ImagePart) -> Result<String, ApiError> {
    if !validate_image_magic_bytes(&image.data) {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "File content does not match a recognized image format",
        ));
    }

    let url = state
        .blobs
        .put(&image.filename, image.content_type.as_deref(), &image.data)
        .await
        .map_err(|e| {
            tracing::error!(backend = state.blobs.backend_name(), "image storage error: {e}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to upload file")
        })?;

    tracing::info!(%url, size = image.data.len(), "image uploaded");
    Ok(url)
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// POST /api/upload — multipart image upload, field `file`
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<UploadResponse>, ApiError> {
    if !is_multipart(request.headers()) {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "Invalid content type. Expected multipart/form-data",
        ));
    }

    let mut multipart = Multipart::from_request(request, &state)
        .await
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, e.body_text()))?;

    let mut image: Option<ImagePart> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, format!("Read error: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| json_error(StatusCode::BAD_REQUEST, format!("Read error: {e}")))?;
        image = Some(ImagePart {
            filename,
            content_type,
            data,
        });
    }

    let image = image.filter(|i| !i.data.is_empty()).ok_or_else(|| {
        json_error(
            StatusCode::BAD_REQUEST,
            "No file provided or file is empty",
        )
    })?;

    let url = store_image(&state, &image).await?;
    Ok(Json(UploadResponse { url }))
}
