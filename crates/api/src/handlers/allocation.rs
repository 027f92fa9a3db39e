//! `/optimize_allocation`, grounded in `allocation_controller.optimize_allocation`.

use std::sync::Arc;

use axum::{Json, extract::State};
use validator::Validate;

use room_allocator_domain::{
    AllocationDecisionResponse, ApiError, OptimizeAllocationRequest, OptimizeAllocationResponse,
};

use crate::AppState;
use crate::middleware::auth::RequireAdmin;

use super::validation_err;

pub async fn optimize_allocation(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Json(payload): Json<OptimizeAllocationRequest>,
) -> Result<Json<OptimizeAllocationResponse>, ApiError> {
    payload.validate().map_err(validation_err)?;
    let requested_date = payload.requested_date.format("%Y-%m-%d").to_string();

    let result = state
        .allocator
        .optimize_allocation(
            &requested_date,
            &payload.requested_time_slot,
            payload.idle_probability_threshold,
            payload.stakeholder_usage_cap,
            &state.allocation_defaults,
            false,
        )
        .await?;

    Ok(Json(OptimizeAllocationResponse {
        allocations: result
            .allocations
            .into_iter()
            .map(|a| AllocationDecisionResponse {
                request_id: a.request_id,
                room_id: a.room_id,
                score: a.score,
            })
            .collect(),
        objective_value: result.objective_value,
        fairness_metric: result.fairness_metric,
    }))
}
