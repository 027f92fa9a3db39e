//! Constrained room-assignment optimizer for a single (date, slot) window.
//!
//! Mirrors `matching_service.AllocationOptimizationService`: prune the room ×
//! request cross product, build and solve an integer program maximizing
//! idle-probability-weighted priority subject to exclusivity and a
//! stakeholder fairness cap, then optionally persist the result.

pub mod fairness;
pub mod forecast;
pub mod pruning;
pub mod solver;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;

use room_allocator_domain::{
    AllocationConfig, AllocationDecision, AllocationError, AllocationRequestProjection,
    IdlePredictionProjection, OptimizationResult, RoomProjection,
};
use room_allocator_predictor::Predictor;
use room_allocator_storage::RoomRepository;

use pruning::admit_pairs;
use solver::{greedy, ilp};

/// Which solving strategy [`Allocator::solve`] uses. `Unavailable` exists so
/// deployments (and tests) can exercise the `SolverDependencyError` path
/// without actually uninstalling the statically-linked HiGHS backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverBackend {
    Ilp,
    Greedy,
    Unavailable,
}

pub struct Allocator {
    repo: RoomRepository,
    predictor: Arc<Predictor>,
    backend: SolverBackend,
    allow_fallback: bool,
    forecast_history_days: i64,
}

impl Allocator {
    /// Default wiring: ILP first, falling back to the deterministic greedy
    /// procedure whenever the solver backend is unavailable (spec.md §4.2's
    /// "mandatory" fallback).
    pub fn new(repo: RoomRepository, predictor: Arc<Predictor>, forecast_history_days: i64) -> Self {
        Self {
            repo,
            predictor,
            backend: SolverBackend::Ilp,
            allow_fallback: true,
            forecast_history_days,
        }
    }

    pub fn with_backend(
        repo: RoomRepository,
        predictor: Arc<Predictor>,
        forecast_history_days: i64,
        backend: SolverBackend,
        allow_fallback: bool,
    ) -> Self {
        Self {
            repo,
            predictor,
            backend,
            allow_fallback,
            forecast_history_days,
        }
    }

    /// The pure solve step: no I/O, reused verbatim by the Simulator so
    /// baseline and scenario runs share the exact same algorithm.
    pub fn solve(
        &self,
        rooms: &[RoomProjection],
        requests: &[AllocationRequestProjection],
        predictions: &[IdlePredictionProjection],
        config: &AllocationConfig,
    ) -> Result<OptimizationResult, AllocationError> {
        config.validate().map_err(AllocationError::Validation)?;

        if rooms.is_empty() || requests.is_empty() {
            return Ok(OptimizationResult {
                allocations: Vec::new(),
                objective_value: 0.0,
                fairness_metric: 0.0,
                unassigned_request_ids: requests.iter().map(|r| r.request_id).collect(),
            });
        }

        let admitted = admit_pairs(rooms, requests, predictions, config);

        let selections: Vec<(usize, f64)> = match self.backend {
            SolverBackend::Unavailable => {
                if !self.allow_fallback {
                    return Err(AllocationError::SolverUnavailable(
                        "the ILP solver is not available in this runtime".to_string(),
                    ));
                }
                greedy::solve(&admitted, config)
                    .into_iter()
                    .map(|s| (s.pair_index, s.score))
                    .collect()
            }
            SolverBackend::Greedy => greedy::solve(&admitted, config)
                .into_iter()
                .map(|s| (s.pair_index, s.score))
                .collect(),
            SolverBackend::Ilp => ilp::solve(&admitted, config)
                .into_iter()
                .map(|s| (s.pair_index, s.score))
                .collect(),
        };

        let allocations: Vec<AllocationDecision> = selections
            .into_iter()
            .map(|(index, score)| {
                let pair = &admitted[index];
                AllocationDecision {
                    request_id: pair.request_id,
                    room_id: pair.room_id,
                    score,
                    stakeholder_id: pair.stakeholder_id.clone(),
                    priority_weight: pair.priority_weight,
                }
            })
            .collect();

        let allocated_ids: HashSet<i64> = allocations.iter().map(|a| a.request_id).collect();
        let unassigned_request_ids = requests
            .iter()
            .map(|r| r.request_id)
            .filter(|id| !allocated_ids.contains(id))
            .collect();
        let objective_value = allocations.iter().map(|a| a.score).sum();
        let fairness_metric = fairness::jains_fairness_index(requests, &allocations);

        Ok(OptimizationResult {
            allocations,
            objective_value,
            fairness_metric,
            unassigned_request_ids,
        })
    }

    /// Full flow: validates inputs, loads rooms/requests/predictions for one
    /// (date, slot), generates and persists a prediction for any room still
    /// missing one in that window, computes the demand forecast side output,
    /// solves, and optionally persists the allocation outputs in one
    /// transaction.
    #[allow(clippy::too_many_arguments)]
    pub async fn optimize_allocation(
        &self,
        requested_date: &str,
        requested_time_slot: &str,
        idle_probability_threshold: Option<f64>,
        stakeholder_usage_cap: Option<f64>,
        defaults: &AllocationConfig,
        persist: bool,
    ) -> Result<OptimizationResult, AllocationError> {
        validate_date(requested_date)?;
        validate_slot(requested_time_slot)?;

        let config = AllocationConfig {
            idle_probability_threshold: idle_probability_threshold
                .unwrap_or(defaults.idle_probability_threshold),
            stakeholder_usage_cap: stakeholder_usage_cap.unwrap_or(defaults.stakeholder_usage_cap),
            ..*defaults
        };
        config.validate().map_err(AllocationError::Validation)?;

        let rooms = self.repo.list_rooms_for_allocation().await.map_err(db_err)?;
        let requests = self
            .repo
            .list_pending_requests(requested_date, requested_time_slot)
            .await
            .map_err(db_err)?;
        let predictions = self
            .repo
            .list_idle_predictions(requested_date, requested_time_slot)
            .await
            .map_err(db_err)?;

        let room_projections: Vec<RoomProjection> = rooms.iter().map(RoomProjection::from).collect();
        let request_projections: Vec<AllocationRequestProjection> =
            requests.iter().map(AllocationRequestProjection::from).collect();
        let mut prediction_projections: Vec<IdlePredictionProjection> = predictions
            .iter()
            .map(|p| IdlePredictionProjection {
                room_id: p.room_id,
                idle_probability: p.idle_probability,
            })
            .collect();

        let covered: HashSet<i64> = prediction_projections.iter().map(|p| p.room_id).collect();
        let missing_room_ids: Vec<i64> = room_projections
            .iter()
            .map(|r| r.room_id)
            .filter(|room_id| !covered.contains(room_id))
            .collect();
        if !missing_room_ids.is_empty() {
            tracing::info!(
                date = requested_date,
                time_slot = requested_time_slot,
                missing_rooms = ?missing_room_ids,
                "allocation prediction gap detected, generating predictions"
            );
            for room_id in missing_room_ids {
                let outcome = self
                    .predictor
                    .predict(room_id, requested_date, requested_time_slot, true)
                    .await?;
                prediction_projections.push(IdlePredictionProjection {
                    room_id,
                    idle_probability: outcome.idle_probability,
                });
            }
        }

        let historical_counts = self
            .repo
            .get_historical_request_counts_by_slot(requested_date, self.forecast_history_days)
            .await
            .map_err(db_err)?;
        let forecasts = forecast::forecast_demand(&request_projections, &historical_counts);

        let result = self.solve(&room_projections, &request_projections, &prediction_projections, &config)?;

        if persist {
            self.repo
                .persist_allocation_outputs(requested_date, &forecasts, &result.allocations)
                .await
                .map_err(db_err)?;
        }

        tracing::info!(
            date = requested_date,
            time_slot = requested_time_slot,
            objective_value = result.objective_value,
            fairness_metric = result.fairness_metric,
            allocations = result.allocations.len(),
            unassigned = result.unassigned_request_ids.len(),
            persisted = persist,
            "allocation solve completed"
        );

        Ok(result)
    }
}

fn db_err(err: room_allocator_storage::StorageError) -> AllocationError {
    AllocationError::Database(err.to_string())
}

fn validate_date(date: &str) -> Result<(), AllocationError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| AllocationError::Validation("date must follow YYYY-MM-DD format".to_string()))
}

fn validate_slot(slot: &str) -> Result<(), AllocationError> {
    let (start, end) = slot
        .split_once('-')
        .ok_or_else(|| AllocationError::Validation("time_slot must follow HH-HH format".to_string()))?;
    let start_hour: u32 = start
        .parse()
        .map_err(|_| AllocationError::Validation("time_slot must follow HH-HH format".to_string()))?;
    let end_hour: u32 = end
        .parse()
        .map_err(|_| AllocationError::Validation("time_slot must follow HH-HH format".to_string()))?;
    if start_hour > 23 || end_hour > 23 || start_hour >= end_hour {
        return Err(AllocationError::Validation(
            "time_slot boundaries are invalid".to_string(),
        ));
    }
    Ok(())
}
