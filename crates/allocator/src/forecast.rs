//! Demand forecast side output, grounded in `matching_service.forecast_demand`.

use room_allocator_domain::{AllocationRequestProjection, DemandForecast};

/// Builds one [`DemandForecast`] per slot appearing in either the current
/// request batch or the historical counts, intensity-scaled against the
/// busiest historical slot.
pub fn forecast_demand(
    requests: &[AllocationRequestProjection],
    historical_counts_by_slot: &[(String, i64)],
) -> Vec<DemandForecast> {
    let mut all_slots: Vec<String> = historical_counts_by_slot
        .iter()
        .map(|(slot, _)| slot.clone())
        .chain(requests.iter().map(|r| r.requested_time_slot.clone()))
        .collect();
    all_slots.sort();
    all_slots.dedup();
    if all_slots.is_empty() {
        return Vec::new();
    }

    let count_for = |slot: &str| -> i64 {
        historical_counts_by_slot
            .iter()
            .find(|(s, _)| s == slot)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    };
    let max_historical = all_slots.iter().map(|slot| count_for(slot)).max().unwrap_or(0);

    all_slots
        .into_iter()
        .map(|slot| {
            let historical_count = count_for(&slot);
            let demand_intensity_score = if max_historical > 0 {
                historical_count as f64 / max_historical as f64
            } else {
                0.0
            };
            DemandForecast {
                time_slot: slot,
                historical_count,
                demand_intensity_score,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(slot: &str) -> AllocationRequestProjection {
        AllocationRequestProjection {
            request_id: 1,
            requested_capacity: 1,
            requested_date: "2026-03-01".to_string(),
            requested_time_slot: slot.to_string(),
            priority_weight: 1.0,
            stakeholder_id: "dept_a".to_string(),
        }
    }

    #[test]
    fn empty_inputs_produce_no_forecasts() {
        assert!(forecast_demand(&[], &[]).is_empty());
    }

    #[test]
    fn intensity_is_scaled_against_busiest_slot() {
        let requests = vec![request("09-11")];
        let historical = vec![("09-11".to_string(), 10), ("11-13".to_string(), 5)];
        let forecasts = forecast_demand(&requests, &historical);
        assert_eq!(forecasts.len(), 2);
        let morning = forecasts.iter().find(|f| f.time_slot == "09-11").unwrap();
        assert_eq!(morning.demand_intensity_score, 1.0);
        let midday = forecasts.iter().find(|f| f.time_slot == "11-13").unwrap();
        assert_eq!(midday.demand_intensity_score, 0.5);
    }

    #[test]
    fn slot_present_only_in_current_requests_gets_zero_historical_count() {
        let requests = vec![request("15-17")];
        let forecasts = forecast_demand(&requests, &[]);
        assert_eq!(forecasts.len(), 1);
        assert_eq!(forecasts[0].historical_count, 0);
        assert_eq!(forecasts[0].demand_intensity_score, 0.0);
    }
}
