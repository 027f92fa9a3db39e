//! Operator dashboard workflow surface, grounded in `dashboard_controller.py`.

use std::sync::Arc;

use axum::{Json, extract::State};
use validator::Validate;

use room_allocator_domain::{
    AllocateRequest, AllocateResponse, ApiError, ApproveResponse, DemoContextResponse,
    MetricsResponse, PredictRequest, PredictResponse,
};

use crate::AppState;
use crate::middleware::auth::RequireAdmin;

use super::validation_err;

pub async fn predict(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Json(payload): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiError> {
    payload.validate().map_err(validation_err)?;
    let date = payload.date.format("%Y-%m-%d").to_string();
    let response = state
        .workflow
        .predict(&date, &payload.time_slot, payload.room_ids)
        .await?;
    Ok(Json(response))
}

pub async fn allocate(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Json(payload): Json<AllocateRequest>,
) -> Result<Json<AllocateResponse>, ApiError> {
    payload.validate().map_err(validation_err)?;
    let requested_date = payload.requested_date.format("%Y-%m-%d").to_string();
    let response = state
        .workflow
        .preview_allocation(
            &requested_date,
            &payload.requested_time_slot,
            payload.idle_probability_threshold,
            payload.stakeholder_usage_cap,
        )
        .await?;
    Ok(Json(response))
}

pub async fn approve(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
) -> Result<Json<ApproveResponse>, ApiError> {
    let response = state.workflow.approve().await?;
    Ok(Json(response))
}

pub async fn metrics(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
) -> Result<Json<MetricsResponse>, ApiError> {
    let response = state.workflow.get_metrics().await?;
    Ok(Json(response))
}

/// Public: reachable before login so the operator dashboard can populate its
/// demo picker (test_dashboard_flow.py asserts this is unauthenticated).
pub async fn demo_context(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DemoContextResponse>, ApiError> {
    let response = state.workflow.get_demo_context().await?;
    Ok(Json(response))
}
