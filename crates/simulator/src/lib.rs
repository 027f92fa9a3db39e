//! Non-destructive baseline-versus-scenario comparison across every pending
//! (date, slot) window, grounded in `simulation_service.SimulationService`.
//!
//! Nothing in this crate writes to the Store. The Allocator's pure
//! [`room_allocator_allocator::Allocator::solve`] step is reused verbatim for
//! both passes so the optimization algorithm itself can never drift between
//! production allocation and simulation.

pub mod dataset;
pub mod metrics;

use std::collections::BTreeMap;
use std::sync::Arc;

use room_allocator_allocator::Allocator;
use room_allocator_config::AppConfig;
use room_allocator_domain::{
    AllocationConfig, AllocationDecision, AllocationRequestProjection, IdlePredictionProjection,
    RoomProjection, SimulatedAllocation, SimulationError, SimulationOutcome, SimulationRunResult,
    TemporaryConstraints,
};
use room_allocator_predictor::Predictor;
use room_allocator_storage::RoomRepository;

use dataset::ScenarioDataset;

pub struct Simulator {
    repo: RoomRepository,
    predictor: Arc<Predictor>,
    allocator: Allocator,
    idle_probability_threshold: f64,
    stakeholder_usage_cap: f64,
    solver_max_time_seconds: f64,
    solver_random_seed: u64,
    objective_scale: f64,
    cp_sat_workers: usize,
    fallback_idle_probability: f64,
}

impl Simulator {
    pub fn new(repo: RoomRepository, predictor: Arc<Predictor>, config: &AppConfig) -> Self {
        let allocator = Allocator::new(repo.clone(), predictor.clone(), config.allocation_forecast_history_days);
        Self {
            repo,
            predictor,
            allocator,
            idle_probability_threshold: config.allocation_idle_probability_threshold,
            stakeholder_usage_cap: config.allocation_stakeholder_usage_cap,
            solver_max_time_seconds: config.allocation_solver_max_time_seconds,
            solver_random_seed: config.simulation_solver_random_seed,
            objective_scale: config.allocation_objective_scale,
            cp_sat_workers: config.simulation_cp_sat_workers,
            fallback_idle_probability: 1.0 - config.prediction_default_occupancy_probability,
        }
    }

    fn build_config(&self, idle_threshold: Option<f64>, stakeholder_cap: Option<f64>) -> AllocationConfig {
        AllocationConfig {
            idle_probability_threshold: idle_threshold.unwrap_or(self.idle_probability_threshold),
            stakeholder_usage_cap: stakeholder_cap.unwrap_or(self.stakeholder_usage_cap),
            solver_max_time_seconds: self.solver_max_time_seconds,
            solver_random_seed: self.solver_random_seed,
            objective_scale: self.objective_scale,
            cp_sat_workers: self.cp_sat_workers,
        }
    }

    /// Loads every pending request grouped by (date, slot), along with the
    /// latest idle prediction per room, gap-filling missing predictions via
    /// the Predictor without persisting them.
    pub async fn load_dataset(&self) -> Result<ScenarioDataset, SimulationError> {
        let rooms: Vec<RoomProjection> = self
            .repo
            .list_rooms_for_allocation()
            .await
            .map_err(|e| SimulationError::Database(e.to_string()))?
            .iter()
            .map(RoomProjection::from)
            .collect();
        let room_ids: Vec<i64> = {
            let mut ids: Vec<i64> = rooms.iter().map(|r| r.room_id).collect();
            ids.sort_unstable();
            ids
        };

        let all_pending = self
            .repo
            .list_all_pending_requests()
            .await
            .map_err(|e| SimulationError::Database(e.to_string()))?;

        let mut requests_by_slot: BTreeMap<(String, String), Vec<AllocationRequestProjection>> = BTreeMap::new();
        for request in &all_pending {
            let key = (request.requested_date.clone(), request.requested_time_slot.clone());
            requests_by_slot
                .entry(key)
                .or_default()
                .push(AllocationRequestProjection::from(request));
        }

        let mut predictions_by_slot: BTreeMap<(String, String), Vec<IdlePredictionProjection>> = BTreeMap::new();
        for (requested_date, requested_time_slot) in requests_by_slot.keys().cloned().collect::<Vec<_>>() {
            let persisted = self
                .repo
                .list_idle_predictions(&requested_date, &requested_time_slot)
                .await
                .map_err(|e| SimulationError::Database(e.to_string()))?;
            let mut prediction_by_room: BTreeMap<i64, f64> =
                persisted.into_iter().map(|p| (p.room_id, p.idle_probability)).collect();

            let missing_room_ids: Vec<i64> = room_ids
                .iter()
                .copied()
                .filter(|room_id| !prediction_by_room.contains_key(room_id))
                .collect();
            if !missing_room_ids.is_empty() {
                tracing::info!(
                    date = requested_date,
                    time_slot = requested_time_slot,
                    missing_rooms = ?missing_room_ids,
                    "simulation prediction gap detected"
                );
                for room_id in missing_room_ids {
                    let idle_probability = match self
                        .predictor
                        .predict_without_persisting(room_id, &requested_date, &requested_time_slot)
                        .await
                    {
                        Ok(prediction) => prediction.idle_probability,
                        Err(_) => {
                            tracing::warn!(
                                room_id,
                                date = requested_date,
                                time_slot = requested_time_slot,
                                "simulation fallback prediction applied"
                            );
                            self.fallback_idle_probability
                        }
                    };
                    prediction_by_room.insert(room_id, idle_probability);
                }
            }

            predictions_by_slot.insert(
                (requested_date, requested_time_slot),
                prediction_by_room
                    .into_iter()
                    .map(|(room_id, idle_probability)| IdlePredictionProjection { room_id, idle_probability })
                    .collect(),
            );
        }

        Ok(ScenarioDataset {
            rooms,
            requests_by_slot,
            predictions_by_slot,
        })
    }

    /// Runs the Allocator's pure solve step over every pending window in
    /// sorted order and aggregates the result. Windows with no prediction
    /// coverage at all leave their requests unassigned rather than erroring.
    fn optimize_dataset(
        &self,
        dataset: &ScenarioDataset,
        config: &AllocationConfig,
    ) -> Result<SimulationRunResult, SimulationError> {
        let all_requests = dataset.requests();
        if dataset.rooms.is_empty() || all_requests.is_empty() {
            return Ok(SimulationRunResult {
                allocations: Vec::new(),
                objective_value: 0.0,
                fairness_metric: 0.0,
                unassigned_request_ids: all_requests.iter().map(|r| r.request_id).collect(),
            });
        }

        let mut allocations = Vec::new();
        let mut objective_value = 0.0;
        let mut unassigned_request_ids = Vec::new();

        for ((requested_date, requested_time_slot), slot_requests) in &dataset.requests_by_slot {
            if slot_requests.is_empty() {
                continue;
            }
            let empty = Vec::new();
            let slot_predictions = dataset
                .predictions_by_slot
                .get(&(requested_date.clone(), requested_time_slot.clone()))
                .unwrap_or(&empty);

            if slot_predictions.is_empty() {
                unassigned_request_ids.extend(slot_requests.iter().map(|r| r.request_id));
                continue;
            }

            let slot_result = self.allocator.solve(&dataset.rooms, slot_requests, slot_predictions, config)?;
            objective_value += slot_result.objective_value;
            unassigned_request_ids.extend(slot_result.unassigned_request_ids);

            for decision in slot_result.allocations {
                allocations.push(SimulatedAllocation {
                    request_id: decision.request_id,
                    room_id: decision.room_id,
                    stakeholder_id: decision.stakeholder_id,
                    score: decision.score,
                    requested_date: requested_date.clone(),
                    requested_time_slot: requested_time_slot.clone(),
                });
            }
        }

        unassigned_request_ids.sort_unstable();
        let fairness_metric = combined_fairness_metric(&all_requests, &allocations);

        Ok(SimulationRunResult {
            allocations,
            objective_value,
            fairness_metric,
            unassigned_request_ids,
        })
    }

    /// The full what-if flow: load, solve twice, derive metrics and delta.
    /// Never persists anything.
    pub async fn run_simulation(&self, constraints: TemporaryConstraints) -> Result<SimulationOutcome, SimulationError> {
        let dataset = self.load_dataset().await?;

        let baseline_config = self.build_config(None, None);
        baseline_config.validate().map_err(SimulationError::Validation)?;
        let baseline_result = self.optimize_dataset(&dataset, &baseline_config)?;
        let baseline_metrics = metrics::compute_metrics(&dataset, &baseline_result);

        let scenario_dataset = dataset::apply_temporary_constraints(&dataset, &constraints)?;
        let simulation_config = self.build_config(constraints.idle_threshold, constraints.stakeholder_cap);
        simulation_config.validate().map_err(SimulationError::Validation)?;
        let simulation_result = self.optimize_dataset(&scenario_dataset, &simulation_config)?;
        let simulation_metrics = metrics::compute_metrics(&scenario_dataset, &simulation_result);

        let delta = metrics::compare_results(&baseline_metrics, &simulation_metrics);

        tracing::info!(
            baseline_objective = baseline_metrics.objective_value,
            simulation_objective = simulation_metrics.objective_value,
            request_change = delta.request_change,
            utilization_change = delta.utilization_change,
            "simulation run completed"
        );

        Ok(SimulationOutcome {
            baseline: baseline_metrics,
            simulation: simulation_metrics,
            delta,
        })
    }
}

/// `jains_fairness_index` needs an `AllocationDecision` slice; the
/// `priority_weight` field is unused by the formula so it is filled with a
/// placeholder when converting from [`SimulatedAllocation`].
fn combined_fairness_metric(requests: &[AllocationRequestProjection], allocations: &[SimulatedAllocation]) -> f64 {
    let decisions: Vec<AllocationDecision> = allocations
        .iter()
        .map(|a| AllocationDecision {
            request_id: a.request_id,
            room_id: a.room_id,
            score: a.score,
            stakeholder_id: a.stakeholder_id.clone(),
            priority_weight: 1.0,
        })
        .collect();
    room_allocator_allocator::fairness::jains_fairness_index(requests, &decisions)
}

