//! Persisted entities and the read-only value-type projections that the
//! Predictor, Allocator, Simulator, and Workflow exchange instead of a
//! database handle.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bookable room. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub room_id: i64,
    pub capacity: i64,
    pub room_type: String,
    pub location: Option<String>,
}

/// A historical occupancy observation for one (room, date, slot).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRecord {
    pub room_id: i64,
    pub date: String,
    pub time_slot: String,
    pub occupied: bool,
    pub room_type: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    Pending,
    Allocated,
}

/// An operator-submitted room request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub request_id: i64,
    pub requested_capacity: i64,
    pub requested_date: String,
    pub requested_time_slot: String,
    pub priority_weight: f64,
    pub stakeholder_id: String,
    pub status: RequestStatus,
}

/// The latest idle-probability estimate for a (room, date, slot).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlePrediction {
    pub prediction_id: i64,
    pub room_id: i64,
    pub date: String,
    pub time_slot: String,
    pub idle_probability: f64,
    pub created_at: DateTime<Utc>,
}

/// An append-only record of one approved (request, room) match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationLog {
    pub log_id: i64,
    pub request_id: i64,
    pub room_id: i64,
    pub allocation_score: f64,
    pub allocated_at: DateTime<Utc>,
}

/// Historical demand intensity for a time slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandForecast {
    pub time_slot: String,
    pub historical_count: i64,
    pub demand_intensity_score: f64,
}

/// Metadata recorded for the most recently trained model. Overwritten on
/// every training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_type: String,
    pub model_version: String,
    pub trained_at: DateTime<Utc>,
    pub training_rows: i64,
}

/// Owned projection of a [`Room`] used by Predictor/Allocator/Simulator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoomProjection {
    pub room_id: i64,
    pub capacity: i64,
}

impl From<&Room> for RoomProjection {
    fn from(room: &Room) -> Self {
        Self {
            room_id: room.room_id,
            capacity: room.capacity,
        }
    }
}

/// Owned projection of a [`BookingRecord`] row for feature engineering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRow {
    pub room_id: i64,
    pub date: String,
    pub time_slot: String,
    pub occupied: bool,
    pub room_type: String,
}

/// Owned projection of a pending [`Request`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRequestProjection {
    pub request_id: i64,
    pub requested_capacity: i64,
    pub requested_date: String,
    pub requested_time_slot: String,
    pub priority_weight: f64,
    pub stakeholder_id: String,
}

impl From<&Request> for AllocationRequestProjection {
    fn from(req: &Request) -> Self {
        Self {
            request_id: req.request_id,
            requested_capacity: req.requested_capacity,
            requested_date: req.requested_date.clone(),
            requested_time_slot: req.requested_time_slot.clone(),
            priority_weight: req.priority_weight,
            stakeholder_id: req.stakeholder_id.clone(),
        }
    }
}

/// Owned projection of an [`IdlePrediction`] used as Allocator/Simulator
/// input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IdlePredictionProjection {
    pub room_id: i64,
    pub idle_probability: f64,
}

/// One (room, request) match in a solved allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationDecision {
    pub request_id: i64,
    pub room_id: i64,
    pub score: f64,
    pub stakeholder_id: String,
    pub priority_weight: f64,
}

/// The full output of one Allocator solve.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OptimizationResult {
    pub allocations: Vec<AllocationDecision>,
    pub objective_value: f64,
    pub fairness_metric: f64,
    pub unassigned_request_ids: Vec<i64>,
}

/// Validated allocation solve configuration (spec.md §6, domain constraints).
#[derive(Debug, Clone, Copy)]
pub struct AllocationConfig {
    pub idle_probability_threshold: f64,
    pub stakeholder_usage_cap: f64,
    pub solver_max_time_seconds: f64,
    pub solver_random_seed: u64,
    pub objective_scale: f64,
    pub cp_sat_workers: usize,
}

impl AllocationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.idle_probability_threshold) {
            return Err("idle_probability_threshold must be between 0 and 1".to_string());
        }
        if !(self.stakeholder_usage_cap > 0.0 && self.stakeholder_usage_cap <= 1.0) {
            return Err("stakeholder_usage_cap must be in (0, 1]".to_string());
        }
        if self.solver_max_time_seconds <= 0.0 {
            return Err("solver_max_time_seconds must be > 0".to_string());
        }
        if self.objective_scale <= 0.0 {
            return Err("objective_scale must be > 0".to_string());
        }
        if self.cp_sat_workers == 0 {
            return Err("cp_sat_workers must be > 0".to_string());
        }
        Ok(())
    }
}

/// Optional what-if overrides for one Simulator run. Every field is
/// independently optional; omitted fields fall back to the production
/// allocation configuration.
#[derive(Debug, Clone, Default)]
pub struct TemporaryConstraints {
    pub idle_threshold: Option<f64>,
    pub stakeholder_cap: Option<f64>,
    pub capacity_override: Option<HashMap<i64, i64>>,
    pub priority_adjustment: Option<HashMap<String, f64>>,
}

/// One allocation decision produced inside a Simulator run, carrying the
/// (date, slot) it belongs to since a run spans every pending window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedAllocation {
    pub request_id: i64,
    pub room_id: i64,
    pub stakeholder_id: String,
    pub score: f64,
    pub requested_date: String,
    pub requested_time_slot: String,
}

/// The raw output of one baseline or scenario pass across every pending
/// window, before metrics are derived.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SimulationRunResult {
    pub allocations: Vec<SimulatedAllocation>,
    pub objective_value: f64,
    pub fairness_metric: f64,
    pub unassigned_request_ids: Vec<i64>,
}

/// Derived metrics for one baseline or scenario pass (spec.md §4.3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimulationMetrics {
    pub utilization_rate: f64,
    pub requests_satisfied: usize,
    pub objective_value: f64,
    pub total_rooms_utilized: usize,
    pub average_idle_probability_utilized: f64,
    pub fairness_metric: f64,
}

/// Element-wise `scenario - baseline` over [`SimulationMetrics`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimulationDelta {
    pub utilization_change: f64,
    pub request_change: i64,
    pub objective_change: f64,
    pub total_rooms_utilized_change: i64,
    pub avg_idle_probability_change: f64,
    pub fairness_change: f64,
}

/// The full `baseline`/`simulation`/`delta` payload returned by one
/// Simulator run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub baseline: SimulationMetrics,
    pub simulation: SimulationMetrics,
    pub delta: SimulationDelta,
}
