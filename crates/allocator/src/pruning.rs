//! Pruning: narrows the room × request cross product down to the pairs a
//! solver is allowed to consider, mirroring `matching_service.build_model`'s
//! admission loop.

use std::collections::HashMap;

use room_allocator_domain::{AllocationConfig, AllocationRequestProjection, IdlePredictionProjection, RoomProjection};

/// One admitted (room, request) pair with its precomputed integer-scaled
/// objective coefficient.
#[derive(Debug, Clone)]
pub struct AdmittedPair {
    pub room_id: i64,
    pub request_id: i64,
    pub stakeholder_id: String,
    pub priority_weight: f64,
    pub idle_probability: f64,
    pub score_scaled: i64,
}

/// Applies both pruning rules: rooms at or below the idle threshold are
/// dropped entirely, then capacity mismatches are dropped per pair. Rooms
/// with no recorded prediction default to `idle_probability = 0.0` (never
/// admitted), matching `prediction_by_room.get(room.room_id, 0.0)`.
pub fn admit_pairs(
    rooms: &[RoomProjection],
    requests: &[AllocationRequestProjection],
    predictions: &[IdlePredictionProjection],
    config: &AllocationConfig,
) -> Vec<AdmittedPair> {
    let prediction_by_room: HashMap<i64, f64> = predictions
        .iter()
        .map(|p| (p.room_id, p.idle_probability))
        .collect();

    let mut admitted = Vec::new();
    for room in rooms {
        let idle_probability = prediction_by_room.get(&room.room_id).copied().unwrap_or(0.0);
        if idle_probability <= config.idle_probability_threshold {
            continue;
        }
        for request in requests {
            if room.capacity < request.requested_capacity {
                continue;
            }
            let coefficient = (idle_probability * request.priority_weight * config.objective_scale).round() as i64;
            admitted.push(AdmittedPair {
                room_id: room.room_id,
                request_id: request.request_id,
                stakeholder_id: request.stakeholder_id.clone(),
                priority_weight: request.priority_weight,
                idle_probability,
                score_scaled: coefficient.max(0),
            });
        }
    }
    admitted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: i64, capacity: i64) -> RoomProjection {
        RoomProjection { room_id: id, capacity }
    }

    fn request(id: i64, capacity: i64, stakeholder: &str, priority: f64) -> AllocationRequestProjection {
        AllocationRequestProjection {
            request_id: id,
            requested_capacity: capacity,
            requested_date: "2026-03-01".to_string(),
            requested_time_slot: "09-11".to_string(),
            priority_weight: priority,
            stakeholder_id: stakeholder.to_string(),
        }
    }

    fn prediction(room_id: i64, idle_probability: f64) -> IdlePredictionProjection {
        IdlePredictionProjection { room_id, idle_probability }
    }

    fn config() -> AllocationConfig {
        AllocationConfig {
            idle_probability_threshold: 0.5,
            stakeholder_usage_cap: 0.5,
            solver_max_time_seconds: 5.0,
            solver_random_seed: 42,
            objective_scale: 1000.0,
            cp_sat_workers: 1,
        }
    }

    #[test]
    fn excludes_rooms_at_or_below_threshold() {
        let rooms = vec![room(1, 10)];
        let requests = vec![request(1, 5, "dept_a", 1.0)];
        let predictions = vec![prediction(1, 0.5)];
        let admitted = admit_pairs(&rooms, &requests, &predictions, &config());
        assert!(admitted.is_empty());
    }

    #[test]
    fn excludes_pairs_below_capacity() {
        let rooms = vec![room(1, 4)];
        let requests = vec![request(1, 5, "dept_a", 1.0)];
        let predictions = vec![prediction(1, 0.9)];
        let admitted = admit_pairs(&rooms, &requests, &predictions, &config());
        assert!(admitted.is_empty());
    }

    #[test]
    fn missing_prediction_defaults_to_zero_and_is_never_admitted() {
        let rooms = vec![room(1, 10)];
        let requests = vec![request(1, 5, "dept_a", 1.0)];
        let admitted = admit_pairs(&rooms, &requests, &[], &config());
        assert!(admitted.is_empty());
    }

    #[test]
    fn admits_and_scales_score() {
        let rooms = vec![room(1, 10)];
        let requests = vec![request(1, 5, "dept_a", 2.0)];
        let predictions = vec![prediction(1, 0.9)];
        let admitted = admit_pairs(&rooms, &requests, &predictions, &config());
        assert_eq!(admitted.len(), 1);
        assert_eq!(admitted[0].score_scaled, 1800);
    }
}
