//! Jain's fairness index over per-stakeholder allocation counts, grounded in
//! `matching_service.compute_fairness_metric`.

use std::collections::BTreeMap;

use room_allocator_domain::{AllocationDecision, AllocationRequestProjection};

/// `(Σxᵢ)² / (n · Σxᵢ²)` over every stakeholder present in `requests`,
/// including those allocated zero rooms. Returns 0 when there are no
/// allocations or no stakeholders.
pub fn jains_fairness_index(
    requests: &[AllocationRequestProjection],
    allocations: &[AllocationDecision],
) -> f64 {
    if allocations.is_empty() {
        return 0.0;
    }

    let mut counts: BTreeMap<&str, f64> = BTreeMap::new();
    for request in requests {
        counts.entry(request.stakeholder_id.as_str()).or_insert(0.0);
    }
    if counts.is_empty() {
        return 0.0;
    }
    for decision in allocations {
        *counts.entry(decision.stakeholder_id.as_str()).or_insert(0.0) += 1.0;
    }

    let values: Vec<f64> = counts.values().copied().collect();
    let numerator = values.iter().sum::<f64>().powi(2);
    let denominator = values.len() as f64 * values.iter().map(|v| v * v).sum::<f64>();
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: i64, stakeholder: &str) -> AllocationRequestProjection {
        AllocationRequestProjection {
            request_id: id,
            requested_capacity: 1,
            requested_date: "2026-03-01".to_string(),
            requested_time_slot: "09-11".to_string(),
            priority_weight: 1.0,
            stakeholder_id: stakeholder.to_string(),
        }
    }

    fn decision(request_id: i64, room_id: i64, stakeholder: &str) -> AllocationDecision {
        AllocationDecision {
            request_id,
            room_id,
            score: 0.5,
            stakeholder_id: stakeholder.to_string(),
            priority_weight: 1.0,
        }
    }

    #[test]
    fn returns_zero_with_no_allocations() {
        let requests = vec![request(1, "dept_a")];
        assert_eq!(jains_fairness_index(&requests, &[]), 0.0);
    }

    #[test]
    fn returns_one_with_perfectly_even_allocation() {
        let requests = vec![request(1, "dept_a"), request(2, "dept_b")];
        let allocations = vec![decision(1, 1, "dept_a"), decision(2, 2, "dept_b")];
        assert_eq!(jains_fairness_index(&requests, &allocations), 1.0);
    }

    #[test]
    fn accounts_for_stakeholders_with_zero_allocations() {
        let requests = vec![request(1, "dept_a"), request(2, "dept_b"), request(3, "dept_c")];
        let allocations = vec![decision(1, 1, "dept_a")];
        let index = jains_fairness_index(&requests, &allocations);
        assert!((index - (1.0 / 3.0)).abs() < 1e-9);
    }
}
