//! HTTP request/response DTOs for the operator-facing surface (spec.md §6).
//!
//! Slot/date syntax and cross-field rules (e.g. `start_hour < end_hour`) are
//! re-validated by the component that owns the semantics (Predictor,
//! Allocator) using the configured regex, since that regex is a runtime
//! config value the `validator` derive cannot see. DTO-level `validator`
//! annotations only catch shape that never depends on config.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub admin_token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

impl LoginResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AvailabilityPredictionRequest {
    #[validate(range(min = 1))]
    pub room_id: i64,
    pub date: NaiveDate,
    pub time_slot: String,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityPredictionResponse {
    pub idle_probability: f64,
    pub confidence_score: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OptimizeAllocationRequest {
    pub requested_date: NaiveDate,
    pub requested_time_slot: String,
    #[validate(range(min = 0.0, max = 1.0))]
    pub idle_probability_threshold: Option<f64>,
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub stakeholder_usage_cap: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct AllocationDecisionResponse {
    pub request_id: i64,
    pub room_id: i64,
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct OptimizeAllocationResponse {
    pub allocations: Vec<AllocationDecisionResponse>,
    pub objective_value: f64,
    pub fairness_metric: f64,
}

#[derive(Debug, Deserialize, Validate, Default, Clone)]
pub struct TemporaryConstraintsRequest {
    #[validate(range(min = 0.0, max = 1.0))]
    pub idle_threshold: Option<f64>,
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub stakeholder_cap: Option<f64>,
    pub capacity_override: Option<HashMap<i64, i64>>,
    pub priority_adjustment: Option<HashMap<String, f64>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SimulateRequest {
    #[validate(nested)]
    #[serde(default)]
    pub temporary_constraints: TemporaryConstraintsRequest,
    #[validate(range(exclusive_min = 0.0))]
    pub stakeholder_priority_weight: Option<f64>,
    #[validate(range(min = 0.0, max = 1.0))]
    pub idle_probability_threshold: Option<f64>,
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub stakeholder_usage_cap: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SimulationMetricsResponse {
    pub utilization_rate: f64,
    pub requests_satisfied: usize,
    pub objective_value: f64,
    pub total_rooms_utilized: usize,
    pub average_idle_probability_utilized: f64,
    pub fairness_metric: f64,
}

#[derive(Debug, Serialize)]
pub struct SimulationDeltaResponse {
    pub utilization_change: f64,
    pub request_change: i64,
    pub objective_change: f64,
    pub total_rooms_utilized_change: i64,
    pub avg_idle_probability_change: f64,
    pub fairness_change: f64,
}

#[derive(Debug, Serialize)]
pub struct SimulateResponse {
    pub baseline: SimulationMetricsResponse,
    pub simulation: SimulationMetricsResponse,
    pub delta: SimulationDeltaResponse,
}

// --- Workflow surface DTOs ---

#[derive(Debug, Deserialize, Validate)]
pub struct PredictRequest {
    pub date: NaiveDate,
    pub time_slot: String,
    #[validate(custom(function = "validate_room_ids"))]
    pub room_ids: Option<Vec<i64>>,
}

fn validate_room_ids(value: &Option<Vec<i64>>) -> Result<(), validator::ValidationError> {
    let Some(ids) = value else {
        return Ok(());
    };
    if ids.is_empty() {
        return Err(validator::ValidationError::new(
            "room_ids must contain at least one room id when provided",
        ));
    }
    if ids.iter().any(|id| *id <= 0) {
        return Err(validator::ValidationError::new(
            "room_ids values must be positive integers",
        ));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct PredictRow {
    pub room_id: i64,
    pub date: NaiveDate,
    pub time_slot: String,
    pub predicted_idle_probability: f64,
    pub confidence_score: f64,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub predictions: Vec<PredictRow>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AllocateRequest {
    pub requested_date: NaiveDate,
    pub requested_time_slot: String,
    #[validate(range(min = 0.0, max = 1.0))]
    pub idle_probability_threshold: Option<f64>,
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub stakeholder_usage_cap: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct AllocationRow {
    pub room_id: Option<i64>,
    pub stakeholder: String,
    pub time_slot: String,
    pub allocation_score: f64,
    pub priority_weight: f64,
    pub constraint_status: String,
}

#[derive(Debug, Serialize)]
pub struct AllocateResponse {
    pub allocations: Vec<AllocationRow>,
    pub objective_value: f64,
    pub fairness_metric: f64,
    pub unassigned_request_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct ApproveResponse {
    pub status: String,
    pub approved_allocations_count: usize,
    pub objective_value: f64,
    pub fairness_metric: f64,
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub baseline_idle_activation_rate: f64,
    pub simulated_idle_activation_rate: f64,
    pub allocation_efficiency_score: f64,
    pub utilization_delta_percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct PendingWindowResponse {
    pub requested_date: NaiveDate,
    pub requested_time_slot: String,
    pub request_count: i64,
}

#[derive(Debug, Serialize)]
pub struct DemoContextResponse {
    pub default_date: Option<NaiveDate>,
    pub default_time_slot: Option<String>,
    pub pending_windows: Vec<PendingWindowResponse>,
    pub pending_request_count: i64,
}
