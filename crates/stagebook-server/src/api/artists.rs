use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use stagebook_db::entities::artist::{self, parse_fee, parse_languages};
use stagebook_db::{
    AppState, ApprovalStatus, ArtistError, ArtistFilter, ArtistUpdate, NewArtist,
};
use std::sync::{Arc, LazyLock};

use super::upload::{is_multipart, store_image, ImagePart};
use super::{error_response, json_error, ApiError};

static EMAIL_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

fn missing_fields_error(fields: &[&str]) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": "Missing required fields",
            "missingFields": fields,
        })),
    )
}

/// GET /api/artists
pub async fn list_artists(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ArtistFilter>,
) -> Result<Json<Vec<artist::Model>>, ApiError> {
    let artists = state
        .artists
        .search(&filter)
        .await
        .map_err(error_response)?;
    Ok(Json(artists))
}

/// GET /api/artists/:id
pub async fn get_artist(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<artist::Model>, ApiError> {
    state
        .artists
        .get(&id)
        .await
        .map_err(error_response)?
        .map(Json)
        .ok_or_else(|| json_error(StatusCode::NOT_FOUND, "Artist not found"))
}

/// Reads the onboarding form. Text fields map onto [`NewArtist`]; repeated
/// `languages` fields accumulate.
async fn read_artist_form(
    mut multipart: Multipart,
) -> Result<(NewArtist, Option<ImagePart>), ApiError> {
    let mut new = NewArtist::default();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, format!("Read error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "image" {
            let filename = field.file_name().unwrap_or("image").to_string();
            let content_type = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| json_error(StatusCode::BAD_REQUEST, format!("Read error: {e}")))?;
            if !data.is_empty() {
                image = Some(ImagePart {
                    filename,
                    content_type,
                    data,
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| json_error(StatusCode::BAD_REQUEST, format!("Read error: {e}")))?;

        match name.as_str() {
            "name" => new.name = value,
            "email" => new.email = value,
            "phone" => new.phone = value,
            "category" => new.category = value,
            "city" => new.city = value,
            "bio" => new.bio = value,
            "experience" => new.experience = value,
            "languages" => new.languages.extend(parse_languages(&value)),
            "fee" => new.fee = parse_fee(&value),
            "imageUrl" => new.image_url = Some(value),
            _ => {}
        }
    }

    Ok((new, image))
}

/// POST /api/artists — JSON body or multipart onboarding form
pub async fn create_artist(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<artist::Model>), ApiError> {
    let (mut new, image) = if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| json_error(StatusCode::BAD_REQUEST, e.body_text()))?;
        read_artist_form(multipart).await?
    } else {
        let Json(new) = Json::<NewArtist>::from_request(request, &state)
            .await
            .map_err(|e| json_error(StatusCode::BAD_REQUEST, e.body_text()))?;
        (new, None)
    };

    let missing = new.missing_fields();
    if !missing.is_empty() {
        return Err(missing_fields_error(&missing));
    }
    if !EMAIL_RE.is_match(new.email.trim()) {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "Please enter a valid email",
        ));
    }

    // Duplicates are refused before anything reaches blob storage.
    let uploaded = match image {
        Some(image) => {
            if state
                .artists
                .email_registered(&new.email)
                .await
                .map_err(error_response)?
            {
                return Err(error_response(ArtistError::DuplicateEmail(
                    new.email.trim().to_string(),
                )));
            }
            let url = store_image(&state, &image).await?;
            new.image_url = Some(url.clone());
            Some(url)
        }
        None => None,
    };

    match state.artists.add(new).await {
        Ok(created) => Ok((StatusCode::CREATED, Json(created))),
        Err(e) => {
            if let Some(url) = uploaded {
                if let Err(err) = state.blobs.delete(&url).await {
                    tracing::warn!(%url, "failed to remove orphaned image: {err}");
                }
            }
            Err(error_response(e))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub reviewed_by: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// PATCH /api/artists — approve or reject an application
pub async fn review_artist(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<artist::Model>, ApiError> {
    let Json(body) = Json::<ReviewRequest>::from_request(request, &state)
        .await
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, e.body_text()))?;

    let (Some(id), Some(status)) = (present(&body.id), present(&body.status)) else {
        let mut missing = Vec::new();
        if present(&body.id).is_none() {
            missing.push("id");
        }
        if present(&body.status).is_none() {
            missing.push("status");
        }
        return Err(missing_fields_error(&missing));
    };

    let status: ApprovalStatus = status
        .parse()
        .map_err(|e: String| json_error(StatusCode::BAD_REQUEST, e))?;

    let rejection_reason = match status {
        ApprovalStatus::Rejected => match present(&body.rejection_reason) {
            Some(reason) => Some(reason.to_string()),
            None => return Err(missing_fields_error(&["rejectionReason"])),
        },
        _ => None,
    };

    let reviewer = present(&body.reviewed_by).unwrap_or(&state.reviewer);
    let changes = ArtistUpdate::review(status, rejection_reason, reviewer);

    let updated = state
        .artists
        .update(id, changes)
        .await
        .map_err(error_response)?;
    Ok(Json(updated))
}
