pub mod artists;
pub mod store;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use stagebook_db::{AppState, ArtistError};
use std::sync::Arc;

/// Largest accepted request body for routes that carry an image.
pub const MAX_IMAGE_BODY: usize = 5 * 1024 * 1024;

pub type ApiError = (StatusCode, Json<serde_json::Value>);

pub fn json_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(serde_json::json!({ "error": message.into() })))
}

/// Maps repository failures to HTTP responses. This is the only place where
/// artist errors become status codes.
pub fn error_response(err: ArtistError) -> ApiError {
    match err {
        ArtistError::Validation {
            message,
            missing_fields,
        } => {
            let mut body = serde_json::json!({ "error": message });
            if !missing_fields.is_empty() {
                body["missingFields"] = serde_json::json!(missing_fields);
            }
            (StatusCode::BAD_REQUEST, Json(body))
        }
        ArtistError::NotFound(id) => {
            tracing::debug!(%id, "artist not found");
            json_error(StatusCode::NOT_FOUND, "Artist not found")
        }
        err @ ArtistError::DuplicateEmail(_) => json_error(StatusCode::CONFLICT, err.to_string()),
        ArtistError::Store(e) => {
            tracing::error!("artist store error: {e}");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to access artist store: {e}"),
            )
        }
    }
}

/// Routes mounted under `/api`.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(
            Router::new()
                .route(
                    "/artists",
                    get(artists::list_artists)
                        .post(artists::create_artist)
                        .patch(artists::review_artist),
                )
                .route("/upload", post(upload::upload_image))
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BODY)),
        )
        .route("/artists/{id}", get(artists::get_artist))
        .route("/store/status", get(store::store_status))
        .route("/store/reset", post(store::reset_store))
}


#[cfg(test)]
mod tests {
    use super::*;
    use stagebook_store::StoreError;

    #[test]
    fn test_validation_error_lists_missing_fields() {
        let (status, Json(body)) = error_response(ArtistError::missing_fields(["name"]));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields");
        assert_eq!(body["missingFields"], serde_json::json!(["name"]));
    }

    #[test]
    fn test_invalid_error_has_no_missing_fields() {
        let (status, Json(body)) = error_response(ArtistError::invalid("bad email"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.get("missingFields").is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            error_response(ArtistError::NotFound("x".into())).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_response(ArtistError::DuplicateEmail("a@x.com".into())).0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            error_response(ArtistError::Store(StoreError::Remote("down".into()))).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
