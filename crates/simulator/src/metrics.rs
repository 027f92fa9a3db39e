//! Per-scenario metrics and baseline/scenario delta, grounded in
//! `simulation_service.SimulationService.compute_metrics`/`compare_results`.

use std::collections::{HashMap, HashSet};

use room_allocator_domain::{SimulationDelta, SimulationMetrics, SimulationRunResult};

use crate::dataset::ScenarioDataset;

pub fn compute_metrics(dataset: &ScenarioDataset, result: &SimulationRunResult) -> SimulationMetrics {
    let total_rooms = dataset.rooms.len();
    let utilized_room_ids: HashSet<i64> = result.allocations.iter().map(|a| a.room_id).collect();
    let total_rooms_utilized = utilized_room_ids.len();
    let utilization_rate = if total_rooms > 0 {
        total_rooms_utilized as f64 / total_rooms as f64
    } else {
        0.0
    };

    let mut prediction_lookup: HashMap<(&str, &str, i64), f64> = HashMap::new();
    for ((date, slot), predictions) in &dataset.predictions_by_slot {
        for prediction in predictions {
            prediction_lookup.insert((date.as_str(), slot.as_str(), prediction.room_id), prediction.idle_probability);
        }
    }

    let idle_values: Vec<f64> = result
        .allocations
        .iter()
        .map(|allocation| {
            prediction_lookup
                .get(&(
                    allocation.requested_date.as_str(),
                    allocation.requested_time_slot.as_str(),
                    allocation.room_id,
                ))
                .copied()
                .unwrap_or(0.0)
        })
        .collect();
    let average_idle_probability_utilized = if idle_values.is_empty() {
        0.0
    } else {
        idle_values.iter().sum::<f64>() / idle_values.len() as f64
    };

    SimulationMetrics {
        utilization_rate,
        requests_satisfied: result.allocations.len(),
        objective_value: result.objective_value,
        total_rooms_utilized,
        average_idle_probability_utilized,
        fairness_metric: result.fairness_metric,
    }
}

pub fn compare_results(baseline: &SimulationMetrics, simulation: &SimulationMetrics) -> SimulationDelta {
    SimulationDelta {
        utilization_change: simulation.utilization_rate - baseline.utilization_rate,
        request_change: simulation.requests_satisfied as i64 - baseline.requests_satisfied as i64,
        objective_change: simulation.objective_value - baseline.objective_value,
        total_rooms_utilized_change: simulation.total_rooms_utilized as i64 - baseline.total_rooms_utilized as i64,
        avg_idle_probability_change: simulation.average_idle_probability_utilized
            - baseline.average_idle_probability_utilized,
        fairness_change: simulation.fairness_metric - baseline.fairness_metric,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use room_allocator_domain::{IdlePredictionProjection, RoomProjection, SimulatedAllocation};

    fn dataset() -> ScenarioDataset {
        let mut predictions_by_slot = BTreeMap::new();
        predictions_by_slot.insert(
            ("2026-03-01".to_string(), "09-11".to_string()),
            vec![
                IdlePredictionProjection { room_id: 1, idle_probability: 0.8 },
                IdlePredictionProjection { room_id: 2, idle_probability: 0.3 },
            ],
        );
        ScenarioDataset {
            rooms: vec![
                RoomProjection { room_id: 1, capacity: 10 },
                RoomProjection { room_id: 2, capacity: 10 },
            ],
            requests_by_slot: BTreeMap::new(),
            predictions_by_slot,
        }
    }

    #[test]
    fn empty_result_yields_zeroed_metrics() {
        let result = SimulationRunResult::default();
        let metrics = compute_metrics(&dataset(), &result);
        assert_eq!(metrics.utilization_rate, 0.0);
        assert_eq!(metrics.requests_satisfied, 0);
        assert_eq!(metrics.average_idle_probability_utilized, 0.0);
    }

    #[test]
    fn computes_utilization_and_average_idle_probability() {
        let result = SimulationRunResult {
            allocations: vec![SimulatedAllocation {
                request_id: 1,
                room_id: 1,
                stakeholder_id: "dept_a".to_string(),
                score: 0.8,
                requested_date: "2026-03-01".to_string(),
                requested_time_slot: "09-11".to_string(),
            }],
            objective_value: 0.8,
            fairness_metric: 1.0,
            unassigned_request_ids: vec![],
        };
        let metrics = compute_metrics(&dataset(), &result);
        assert_eq!(metrics.utilization_rate, 0.5);
        assert_eq!(metrics.requests_satisfied, 1);
        assert_eq!(metrics.average_idle_probability_utilized, 0.8);
    }

    #[test]
    fn delta_is_scenario_minus_baseline() {
        let baseline = SimulationMetrics {
            utilization_rate: 0.4,
            requests_satisfied: 2,
            objective_value: 10.0,
            total_rooms_utilized: 2,
            average_idle_probability_utilized: 0.6,
            fairness_metric: 0.8,
        };
        let simulation = SimulationMetrics {
            utilization_rate: 0.6,
            requests_satisfied: 3,
            objective_value: 15.0,
            total_rooms_utilized: 3,
            average_idle_probability_utilized: 0.7,
            fairness_metric: 0.9,
        };
        let delta = compare_results(&baseline, &simulation);
        assert!((delta.utilization_change - 0.2).abs() < 1e-9);
        assert_eq!(delta.request_change, 1);
        assert!((delta.objective_change - 5.0).abs() < 1e-9);
        assert_eq!(delta.total_rooms_utilized_change, 1);
        assert!((delta.fairness_change - 0.1).abs() < 1e-9);
    }
}
