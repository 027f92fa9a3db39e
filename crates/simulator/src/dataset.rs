//! In-memory snapshot of rooms/requests/predictions across every pending
//! (date, slot) window, grounded in `simulation_service.ScenarioDataset`.

use std::collections::{BTreeMap, HashSet};

use room_allocator_domain::{
    AllocationRequestProjection, IdlePredictionProjection, RoomProjection, SimulationError,
    TemporaryConstraints,
};

/// Deep-copyable dataset the Simulator solves against twice (baseline and
/// scenario). `Clone` over owned value types is the structural deep copy: no
/// shared ownership exists to alias between the two passes.
#[derive(Debug, Clone)]
pub struct ScenarioDataset {
    pub rooms: Vec<RoomProjection>,
    pub requests_by_slot: BTreeMap<(String, String), Vec<AllocationRequestProjection>>,
    pub predictions_by_slot: BTreeMap<(String, String), Vec<IdlePredictionProjection>>,
}

impl ScenarioDataset {
    /// Every pending request across every window, in sorted-key order.
    pub fn requests(&self) -> Vec<AllocationRequestProjection> {
        self.requests_by_slot.values().flatten().cloned().collect()
    }
}

/// Validates temporary overrides against the dataset they will be applied
/// to, before any mutation happens.
pub fn validate_temporary_constraints(
    constraints: &TemporaryConstraints,
    dataset: &ScenarioDataset,
) -> Result<(), SimulationError> {
    if let Some(idle_threshold) = constraints.idle_threshold {
        if !(0.0..=1.0).contains(&idle_threshold) {
            return Err(SimulationError::Validation(
                "idle_threshold must be between 0 and 1".to_string(),
            ));
        }
    }
    if let Some(stakeholder_cap) = constraints.stakeholder_cap {
        if !(stakeholder_cap > 0.0 && stakeholder_cap <= 1.0) {
            return Err(SimulationError::Validation(
                "stakeholder_cap must be in (0, 1]".to_string(),
            ));
        }
    }

    let room_ids: HashSet<i64> = dataset.rooms.iter().map(|r| r.room_id).collect();
    if let Some(capacity_override) = &constraints.capacity_override {
        for (room_id, new_capacity) in capacity_override {
            if !room_ids.contains(room_id) {
                return Err(SimulationError::Validation(format!(
                    "capacity_override references unknown room_id={room_id}"
                )));
            }
            if *new_capacity <= 0 {
                return Err(SimulationError::Validation(format!(
                    "capacity_override for room_id={room_id} must be > 0"
                )));
            }
        }
    }

    let stakeholder_ids: HashSet<&str> = dataset
        .requests_by_slot
        .values()
        .flatten()
        .map(|r| r.stakeholder_id.as_str())
        .collect();
    if let Some(priority_adjustment) = &constraints.priority_adjustment {
        for (stakeholder_id, weight) in priority_adjustment {
            if !stakeholder_ids.contains(stakeholder_id.as_str()) {
                return Err(SimulationError::Validation(format!(
                    "priority_adjustment references unknown stakeholder='{stakeholder_id}'"
                )));
            }
            if *weight <= 0.0 {
                return Err(SimulationError::Validation(format!(
                    "priority_adjustment for stakeholder='{stakeholder_id}' must be > 0"
                )));
            }
        }
    }

    Ok(())
}

/// Applies validated overrides to a deep copy of `dataset`. Room capacity
/// overrides replace the room wholesale; priority adjustments multiply a
/// request's `priority_weight` by the stakeholder's configured factor,
/// leaving unmatched stakeholders untouched.
pub fn apply_temporary_constraints(
    dataset: &ScenarioDataset,
    constraints: &TemporaryConstraints,
) -> Result<ScenarioDataset, SimulationError> {
    validate_temporary_constraints(constraints, dataset)?;
    let mut mutated = dataset.clone();

    if let Some(capacity_override) = &constraints.capacity_override {
        for room in &mut mutated.rooms {
            if let Some(new_capacity) = capacity_override.get(&room.room_id) {
                room.capacity = *new_capacity;
            }
        }
    }

    if let Some(priority_adjustment) = &constraints.priority_adjustment {
        for requests in mutated.requests_by_slot.values_mut() {
            for request in requests.iter_mut() {
                if let Some(weight) = priority_adjustment.get(&request.stakeholder_id) {
                    request.priority_weight *= *weight;
                }
            }
        }
    }

    Ok(mutated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: i64, capacity: i64) -> RoomProjection {
        RoomProjection { room_id: id, capacity }
    }

    fn request(id: i64, stakeholder: &str, priority: f64) -> AllocationRequestProjection {
        AllocationRequestProjection {
            request_id: id,
            requested_capacity: 1,
            requested_date: "2026-03-01".to_string(),
            requested_time_slot: "09-11".to_string(),
            priority_weight: priority,
            stakeholder_id: stakeholder.to_string(),
        }
    }

    fn dataset() -> ScenarioDataset {
        let mut requests_by_slot = BTreeMap::new();
        requests_by_slot.insert(
            ("2026-03-01".to_string(), "09-11".to_string()),
            vec![request(1, "dept_a", 1.0)],
        );
        ScenarioDataset {
            rooms: vec![room(1, 10)],
            requests_by_slot,
            predictions_by_slot: BTreeMap::new(),
        }
    }

    #[test]
    fn rejects_capacity_override_for_unknown_room() {
        let mut capacity_override = std::collections::HashMap::new();
        capacity_override.insert(99, 5);
        let constraints = TemporaryConstraints {
            capacity_override: Some(capacity_override),
            ..Default::default()
        };
        assert!(validate_temporary_constraints(&constraints, &dataset()).is_err());
    }

    #[test]
    fn rejects_priority_adjustment_for_unknown_stakeholder() {
        let mut priority_adjustment = std::collections::HashMap::new();
        priority_adjustment.insert("dept_z".to_string(), 2.0);
        let constraints = TemporaryConstraints {
            priority_adjustment: Some(priority_adjustment),
            ..Default::default()
        };
        assert!(validate_temporary_constraints(&constraints, &dataset()).is_err());
    }

    #[test]
    fn applies_capacity_and_priority_overrides() {
        let mut capacity_override = std::collections::HashMap::new();
        capacity_override.insert(1, 20);
        let mut priority_adjustment = std::collections::HashMap::new();
        priority_adjustment.insert("dept_a".to_string(), 2.5);
        let constraints = TemporaryConstraints {
            capacity_override: Some(capacity_override),
            priority_adjustment: Some(priority_adjustment),
            ..Default::default()
        };
        let mutated = apply_temporary_constraints(&dataset(), &constraints).unwrap();
        assert_eq!(mutated.rooms[0].capacity, 20);
        let requests = mutated.requests();
        assert_eq!(requests[0].priority_weight, 2.5);
        assert_eq!(dataset().rooms[0].capacity, 10, "baseline must be untouched");
    }

    #[test]
    fn leaves_unmatched_stakeholder_priority_unchanged() {
        let mut priority_adjustment = std::collections::HashMap::new();
        priority_adjustment.insert("dept_other".to_string(), 2.0);
        let base = {
            let mut requests_by_slot = BTreeMap::new();
            requests_by_slot.insert(
                ("2026-03-01".to_string(), "09-11".to_string()),
                vec![request(1, "dept_a", 1.0), request(2, "dept_other", 1.0)],
            );
            ScenarioDataset {
                rooms: vec![room(1, 10)],
                requests_by_slot,
                predictions_by_slot: BTreeMap::new(),
            }
        };
        let constraints = TemporaryConstraints {
            priority_adjustment: Some(priority_adjustment),
            ..Default::default()
        };
        let mutated = apply_temporary_constraints(&base, &constraints).unwrap();
        let requests = mutated.requests();
        let dept_a = requests.iter().find(|r| r.stakeholder_id == "dept_a").unwrap();
        assert_eq!(dept_a.priority_weight, 1.0);
        let dept_other = requests.iter().find(|r| r.stakeholder_id == "dept_other").unwrap();
        assert_eq!(dept_other.priority_weight, 2.0);
    }
}
