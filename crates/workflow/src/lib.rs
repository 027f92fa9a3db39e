//! Thin operator-workflow coordinator: predict -> allocate draft -> simulate
//! -> approve, grounded in `dashboard_service.DashboardWorkflowService`.
//!
//! Holds a single in-memory "latest draft" and "latest metrics" slot behind
//! one reentrant-friendly lock (spec.md §4.4/§5) so concurrent
//! `preview_allocation`/`approve` calls serialize on the draft rather than
//! racing each other.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Mutex;

use room_allocator_allocator::Allocator;
use room_allocator_config::AppConfig;
use room_allocator_domain::{
    AllocateResponse, AllocationConfig, AllocationRow, DemoContextResponse, MetricsResponse,
    PendingWindowResponse, PredictResponse, PredictRow, SimulateResponse, SimulationDeltaResponse,
    SimulationMetricsResponse, TemporaryConstraints, WorkflowError,
};
use room_allocator_predictor::Predictor;
use room_allocator_simulator::Simulator;
use room_allocator_storage::RoomRepository;

struct AllocationDraft {
    requested_date: String,
    requested_time_slot: String,
    idle_probability_threshold: Option<f64>,
    stakeholder_usage_cap: Option<f64>,
}

#[derive(Clone, Copy)]
struct MetricsSnapshot {
    baseline_idle_activation_rate: f64,
    simulated_idle_activation_rate: f64,
    allocation_efficiency_score: f64,
    utilization_delta_percentage: f64,
}

impl From<MetricsSnapshot> for MetricsResponse {
    fn from(m: MetricsSnapshot) -> Self {
        Self {
            baseline_idle_activation_rate: m.baseline_idle_activation_rate,
            simulated_idle_activation_rate: m.simulated_idle_activation_rate,
            allocation_efficiency_score: m.allocation_efficiency_score,
            utilization_delta_percentage: m.utilization_delta_percentage,
        }
    }
}

#[derive(Default)]
struct WorkflowState {
    draft: Option<AllocationDraft>,
    metrics: Option<MetricsSnapshot>,
}

pub struct Workflow {
    repo: RoomRepository,
    predictor: Arc<Predictor>,
    allocator: Allocator,
    simulator: Simulator,
    allocation_defaults: AllocationConfig,
    state: Mutex<WorkflowState>,
}

impl Workflow {
    pub fn new(
        repo: RoomRepository,
        predictor: Arc<Predictor>,
        allocator: Allocator,
        simulator: Simulator,
        config: &AppConfig,
    ) -> Self {
        let allocation_defaults = AllocationConfig {
            idle_probability_threshold: config.allocation_idle_probability_threshold,
            stakeholder_usage_cap: config.allocation_stakeholder_usage_cap,
            solver_max_time_seconds: config.allocation_solver_max_time_seconds,
            solver_random_seed: config.allocation_solver_random_seed,
            objective_scale: config.allocation_objective_scale,
            cp_sat_workers: config.allocation_cp_sat_workers,
        };
        Self {
            repo,
            predictor,
            allocator,
            simulator,
            allocation_defaults,
            state: Mutex::new(WorkflowState::default()),
        }
    }

    /// Predicts idle probability for each requested room (or every room when
    /// `room_ids` is omitted), persisting each prediction.
    pub async fn predict(
        &self,
        date: &str,
        time_slot: &str,
        room_ids: Option<Vec<i64>>,
    ) -> Result<PredictResponse, WorkflowError> {
        let target_rooms: Vec<i64> = match room_ids {
            Some(ids) => {
                let mut unique: Vec<i64> = ids;
                unique.sort_unstable();
                unique.dedup();
                unique
            }
            None => {
                let rooms = self.repo.list_rooms_for_allocation().await.map_err(db_err)?;
                rooms.into_iter().map(|r| r.room_id).collect()
            }
        };

        let mut predictions = Vec::with_capacity(target_rooms.len());
        for room_id in target_rooms {
            let outcome = self.predictor.predict(room_id, date, time_slot, true).await?;
            // `predict` above already validated the date format, so this
            // parse cannot fail.
            let parsed_date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|e| WorkflowError::Prediction(room_allocator_domain::PredictionError::Validation(e.to_string())))?;
            predictions.push(PredictRow {
                room_id,
                date: parsed_date,
                time_slot: time_slot.to_string(),
                predicted_idle_probability: outcome.idle_probability,
                confidence_score: outcome.confidence_score,
            });
        }

        Ok(PredictResponse { predictions })
    }

    /// Runs the Allocator with `persist_outputs=false`, annotates decisions
    /// with stakeholder/priority_weight, and stashes the exact parameters as
    /// the single in-memory draft for a subsequent `approve`.
    pub async fn preview_allocation(
        &self,
        requested_date: &str,
        requested_time_slot: &str,
        idle_probability_threshold: Option<f64>,
        stakeholder_usage_cap: Option<f64>,
    ) -> Result<AllocateResponse, WorkflowError> {
        let result = self
            .allocator
            .optimize_allocation(
                requested_date,
                requested_time_slot,
                idle_probability_threshold,
                stakeholder_usage_cap,
                &self.allocation_defaults,
                false,
            )
            .await?;

        let requests = self
            .repo
            .list_pending_requests(requested_date, requested_time_slot)
            .await
            .map_err(db_err)?;
        let request_by_id: HashMap<i64, _> = requests.into_iter().map(|r| (r.request_id, r)).collect();

        let mut rows = Vec::with_capacity(result.allocations.len() + result.unassigned_request_ids.len());
        for decision in &result.allocations {
            let Some(request) = request_by_id.get(&decision.request_id) else {
                continue;
            };
            rows.push(AllocationRow {
                room_id: Some(decision.room_id),
                stakeholder: request.stakeholder_id.clone(),
                time_slot: request.requested_time_slot.clone(),
                allocation_score: decision.score,
                priority_weight: request.priority_weight,
                constraint_status: "SATISFIED".to_string(),
            });
        }
        for request_id in &result.unassigned_request_ids {
            let Some(request) = request_by_id.get(request_id) else {
                continue;
            };
            rows.push(AllocationRow {
                room_id: None,
                stakeholder: request.stakeholder_id.clone(),
                time_slot: request.requested_time_slot.clone(),
                allocation_score: 0.0,
                priority_weight: request.priority_weight,
                constraint_status: "UNASSIGNED".to_string(),
            });
        }

        {
            let mut state = self.state.lock().await;
            state.draft = Some(AllocationDraft {
                requested_date: requested_date.to_string(),
                requested_time_slot: requested_time_slot.to_string(),
                idle_probability_threshold,
                stakeholder_usage_cap,
            });
        }

        Ok(AllocateResponse {
            allocations: rows,
            objective_value: result.objective_value,
            fairness_metric: result.fairness_metric,
            unassigned_request_ids: result.unassigned_request_ids,
        })
    }

    /// Folds an optional flat `stakeholder_priority_weight` multiplier into
    /// the explicit `priority_adjustment` map, applying it to every
    /// stakeholder with a pending request.
    async fn build_priority_adjustment(
        &self,
        stakeholder_priority_weight: Option<f64>,
        explicit: Option<HashMap<String, f64>>,
    ) -> Result<Option<HashMap<String, f64>>, WorkflowError> {
        let mut adjustments = explicit.unwrap_or_default();
        if let Some(weight) = stakeholder_priority_weight {
            let pending = self
                .repo
                .list_all_pending_requests()
                .await
                .map_err(db_err)?;
            let mut stakeholders: Vec<String> = pending.into_iter().map(|r| r.stakeholder_id).collect();
            stakeholders.sort();
            stakeholders.dedup();
            for stakeholder in stakeholders {
                let current = *adjustments.get(&stakeholder).unwrap_or(&1.0);
                adjustments.insert(stakeholder, current * weight);
            }
        }
        Ok(if adjustments.is_empty() { None } else { Some(adjustments) })
    }

    /// Forwards to the Simulator and caches the derived metrics payload for
    /// `get_metrics`.
    #[allow(clippy::too_many_arguments)]
    pub async fn run_simulation(
        &self,
        mut constraints: TemporaryConstraints,
        stakeholder_priority_weight: Option<f64>,
        idle_probability_threshold: Option<f64>,
        stakeholder_usage_cap: Option<f64>,
    ) -> Result<SimulateResponse, WorkflowError> {
        constraints.priority_adjustment = self
            .build_priority_adjustment(stakeholder_priority_weight, constraints.priority_adjustment)
            .await?;
        if let Some(threshold) = idle_probability_threshold {
            constraints.idle_threshold = Some(threshold);
        }
        if let Some(cap) = stakeholder_usage_cap {
            constraints.stakeholder_cap = Some(cap);
        }

        let outcome = self.simulator.run_simulation(constraints).await?;

        let snapshot = MetricsSnapshot {
            baseline_idle_activation_rate: outcome.baseline.utilization_rate,
            simulated_idle_activation_rate: outcome.simulation.utilization_rate,
            allocation_efficiency_score: outcome.simulation.objective_value,
            utilization_delta_percentage: outcome.delta.utilization_change * 100.0,
        };
        {
            let mut state = self.state.lock().await;
            state.metrics = Some(snapshot);
        }

        Ok(SimulateResponse {
            baseline: to_metrics_response(outcome.baseline),
            simulation: to_metrics_response(outcome.simulation),
            delta: SimulationDeltaResponse {
                utilization_change: outcome.delta.utilization_change,
                request_change: outcome.delta.request_change,
                objective_change: outcome.delta.objective_change,
                total_rooms_utilized_change: outcome.delta.total_rooms_utilized_change,
                avg_idle_probability_change: outcome.delta.avg_idle_probability_change,
                fairness_change: outcome.delta.fairness_change,
            },
        })
    }

    /// Requires a stashed draft; re-runs the Allocator with its exact
    /// parameters and `persist_outputs=true`, then clears the draft.
    pub async fn approve(&self) -> Result<room_allocator_domain::ApproveResponse, WorkflowError> {
        let draft = {
            let mut state = self.state.lock().await;
            state.draft.take()
        };
        let Some(draft) = draft else {
            return Err(WorkflowError::AllocationDraftNotFound);
        };

        let result = self
            .allocator
            .optimize_allocation(
                &draft.requested_date,
                &draft.requested_time_slot,
                draft.idle_probability_threshold,
                draft.stakeholder_usage_cap,
                &self.allocation_defaults,
                true,
            )
            .await?;

        Ok(room_allocator_domain::ApproveResponse {
            status: "APPROVED".to_string(),
            approved_allocations_count: result.allocations.len(),
            objective_value: result.objective_value,
            fairness_metric: result.fairness_metric,
        })
    }

    /// Returns the cached metrics from the last `run_simulation`, running a
    /// default (no constraints) simulation to seed the cache if none exists.
    pub async fn get_metrics(&self) -> Result<MetricsResponse, WorkflowError> {
        {
            let state = self.state.lock().await;
            if let Some(snapshot) = state.metrics {
                return Ok(snapshot.into());
            }
        }
        self.run_simulation(TemporaryConstraints::default(), None, None, None).await?;
        let state = self.state.lock().await;
        Ok(state.metrics.expect("run_simulation always populates metrics").into())
    }

    /// Pending (date, slot) windows with counts, for the operator dashboard's
    /// demo picker.
    pub async fn get_demo_context(&self) -> Result<DemoContextResponse, WorkflowError> {
        let windows = self.repo.list_pending_windows().await.map_err(db_err)?;
        let pending_request_count: i64 = windows.iter().map(|(_, _, count)| count).sum();
        let default_window = windows.first();
        let default_date = default_window.and_then(|(date, _, _)| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok());
        let default_time_slot = default_window.map(|(_, slot, _)| slot.clone());

        let pending_windows = windows
            .into_iter()
            .filter_map(|(date, slot, count)| {
                NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                    .ok()
                    .map(|requested_date| PendingWindowResponse {
                        requested_date,
                        requested_time_slot: slot,
                        request_count: count,
                    })
            })
            .collect();

        Ok(DemoContextResponse {
            default_date,
            default_time_slot,
            pending_windows,
            pending_request_count,
        })
    }
}

fn to_metrics_response(m: room_allocator_domain::SimulationMetrics) -> SimulationMetricsResponse {
    SimulationMetricsResponse {
        utilization_rate: m.utilization_rate,
        requests_satisfied: m.requests_satisfied,
        objective_value: m.objective_value,
        total_rooms_utilized: m.total_rooms_utilized,
        average_idle_probability_utilized: m.average_idle_probability_utilized,
        fairness_metric: m.fairness_metric,
    }
}

fn db_err(err: room_allocator_storage::StorageError) -> WorkflowError {
    WorkflowError::Allocation(room_allocator_domain::AllocationError::Database(err.to_string()))
}
