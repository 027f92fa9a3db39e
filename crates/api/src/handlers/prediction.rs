//! `/predict_availability`, grounded in `allocation_controller.predict_availability`.

use std::sync::Arc;

use axum::{Json, extract::State};
use validator::Validate;

use room_allocator_domain::{ApiError, AvailabilityPredictionRequest, AvailabilityPredictionResponse};

use crate::AppState;
use crate::middleware::auth::RequireAdmin;

use super::validation_err;

pub async fn predict_availability(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Json(payload): Json<AvailabilityPredictionRequest>,
) -> Result<Json<AvailabilityPredictionResponse>, ApiError> {
    payload.validate().map_err(validation_err)?;
    let date = payload.date.format("%Y-%m-%d").to_string();
    let outcome = state
        .predictor
        .predict(payload.room_id, &date, &payload.time_slot, true)
        .await?;
    Ok(Json(AvailabilityPredictionResponse {
        idle_probability: outcome.idle_probability,
        confidence_score: outcome.confidence_score,
    }))
}
