use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use stagebook_db::AppState;
use stagebook_store::{probe, ProbeReport, StoreInfo};
use std::sync::Arc;

use super::{error_response, json_error, ApiError};

#[derive(Debug, Serialize)]
pub struct StoreStatus {
    pub success: bool,
    pub store: StoreInfo,
    pub probe: ProbeReport,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: String,
}

/// GET /api/store/status — backend details plus a write/read/delete round trip
pub async fn store_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StoreStatus>, ApiError> {
    let checked = async {
        let report = probe(state.kv.as_ref()).await?;
        let info = state.kv.info().await?;
        Ok::<_, stagebook_store::StoreError>((report, info))
    }
    .await;

    match checked {
        Ok((probe, store)) => {
            if !probe.values_match {
                tracing::warn!(key = %probe.key, "store probe read back a different value");
            }
            Ok(Json(StoreStatus {
                success: true,
                store,
                probe,
            }))
        }
        Err(e) => {
            tracing::error!("store status check failed: {e}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "error": "Failed to access KV store",
                    "message": e.to_string(),
                })),
            ))
        }
    }
}

/// POST /api/store/reset — empties the artist collection outside production
pub async fn reset_store(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ResetResponse>, ApiError> {
    if state.is_production() {
        tracing::warn!("refused store reset in production");
        return Err(json_error(StatusCode::FORBIDDEN, "Not allowed in production"));
    }

    state.artists.reset().await.map_err(error_response)?;

    Ok(Json(ResetResponse {
        success: true,
        message: "Artist collection reset".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}
