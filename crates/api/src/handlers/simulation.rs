//! `/simulate`, grounded in `allocation_controller.simulate_allocation`.
//!
//! Matches the original's precedence rule: top-level `idle_probability_threshold`
//! / `stakeholder_usage_cap` override the nested `temporary_constraints` fields
//! when both are supplied. [`room_allocator_workflow::Workflow::run_simulation`]
//! applies that precedence.

use std::sync::Arc;

use axum::{Json, extract::State};
use validator::Validate;

use room_allocator_domain::{ApiError, SimulateRequest, SimulateResponse, TemporaryConstraints};

use crate::AppState;
use crate::middleware::auth::RequireAdmin;

use super::validation_err;

pub async fn simulate(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Json(payload): Json<SimulateRequest>,
) -> Result<Json<SimulateResponse>, ApiError> {
    payload.validate().map_err(validation_err)?;

    let constraints = TemporaryConstraints {
        idle_threshold: payload.temporary_constraints.idle_threshold,
        stakeholder_cap: payload.temporary_constraints.stakeholder_cap,
        capacity_override: payload.temporary_constraints.capacity_override,
        priority_adjustment: payload.temporary_constraints.priority_adjustment,
    };

    let response = state
        .workflow
        .run_simulation(
            constraints,
            payload.stakeholder_priority_weight,
            payload.idle_probability_threshold,
            payload.stakeholder_usage_cap,
        )
        .await?;

    Ok(Json(response))
}
