//! Feature engineering: causal historical aggregates plus one-hot encoding.
//!
//! The causal prior-count/prior-sum computation is a manual running
//! aggregate over a sorted scan (room_id, time_slot, date ascending), not a
//! library windowed function — a windowed function risks including the
//! current row, which would leak the label into its own feature.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use room_allocator_domain::BookingRow;

/// One assembled feature row, ready for one-hot encoding.
#[derive(Debug, Clone)]
pub struct FeatureRow {
    pub day_of_week: i64,
    pub time_slot: String,
    pub room_type: String,
    pub historical_occupancy_frequency: f64,
    pub rolling_occupancy_average: f64,
}

/// Fixed vocabulary learned at training time; inference one-hot encodes
/// against it with unknown-category tolerance (unseen categories encode to
/// an all-zero block instead of failing).
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    time_slots: Vec<String>,
    room_types: Vec<String>,
}

impl Vocabulary {
    pub fn build(rows: &[BookingRow]) -> Self {
        let mut time_slots: Vec<String> = rows.iter().map(|r| r.time_slot.clone()).collect();
        time_slots.sort();
        time_slots.dedup();

        let mut room_types: Vec<String> = rows.iter().map(|r| r.room_type.clone()).collect();
        room_types.sort();
        room_types.dedup();

        Self {
            time_slots,
            room_types,
        }
    }

    /// Total encoded feature vector length: one-hot(time_slot) +
    /// one-hot(room_type) + [day_of_week, historical_freq, rolling_avg].
    pub fn dim(&self) -> usize {
        self.time_slots.len() + self.room_types.len() + 3
    }

    pub fn encode(&self, row: &FeatureRow) -> Vec<f64> {
        let mut vector = vec![0.0; self.dim()];
        if let Some(idx) = self.time_slots.iter().position(|s| s == &row.time_slot) {
            vector[idx] = 1.0;
        }
        if let Some(idx) = self.room_types.iter().position(|s| s == &row.room_type) {
            vector[self.time_slots.len() + idx] = 1.0;
        }
        let numeric_offset = self.time_slots.len() + self.room_types.len();
        vector[numeric_offset] = row.day_of_week as f64;
        vector[numeric_offset + 1] = row.historical_occupancy_frequency;
        vector[numeric_offset + 2] = row.rolling_occupancy_average;
        vector
    }
}

/// A training row with its causal features and label, produced by
/// [`build_causal_rows`].
pub struct TrainingRow {
    pub features: FeatureRow,
    pub occupied: bool,
}

/// Sort booking history into (room_id, time_slot) groups ordered by date
/// ascending, then compute causal historical-frequency and rolling-average
/// features using only rows strictly prior to the current one.
pub fn build_causal_rows(history: &[BookingRow], rolling_window_days: i64) -> Vec<TrainingRow> {
    if history.is_empty() {
        return Vec::new();
    }

    let global_occupancy_mean = {
        let occupied_count = history.iter().filter(|r| r.occupied).count();
        occupied_count as f64 / history.len() as f64
    };

    let mut sorted: Vec<&BookingRow> = history.iter().collect();
    sorted.sort_by(|a, b| {
        (a.room_id, &a.time_slot, &a.date).cmp(&(b.room_id, &b.time_slot, &b.date))
    });

    let mut group_history: BTreeMap<(i64, String), Vec<bool>> = BTreeMap::new();
    let mut rows = Vec::with_capacity(sorted.len());

    for record in sorted {
        let Ok(date) = NaiveDate::parse_from_str(&record.date, "%Y-%m-%d") else {
            continue;
        };
        let key = (record.room_id, record.time_slot.clone());
        let prior = group_history.entry(key).or_default();

        let prev_count = prior.len();
        let historical_occupancy_frequency = if prev_count > 0 {
            let prev_sum = prior.iter().filter(|occ| **occ).count();
            prev_sum as f64 / prev_count as f64
        } else {
            global_occupancy_mean
        };

        let window_start = prior.len().saturating_sub(rolling_window_days.max(1) as usize);
        let window = &prior[window_start..];
        let rolling_occupancy_average = if window.is_empty() {
            historical_occupancy_frequency
        } else {
            window.iter().filter(|occ| **occ).count() as f64 / window.len() as f64
        };

        rows.push(TrainingRow {
            features: FeatureRow {
                day_of_week: date.weekday().num_days_from_monday() as i64,
                time_slot: record.time_slot.clone(),
                room_type: record.room_type.clone(),
                historical_occupancy_frequency,
                rolling_occupancy_average,
            },
            occupied: record.occupied,
        });

        prior.push(record.occupied);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(room_id: i64, date: &str, slot: &str, occupied: bool) -> BookingRow {
        BookingRow {
            room_id,
            date: date.to_string(),
            time_slot: slot.to_string(),
            occupied,
            room_type: "meeting".to_string(),
        }
    }

    #[test]
    fn first_row_in_group_falls_back_to_global_mean() {
        let history = vec![
            row(1, "2026-01-01", "09-11", true),
            row(1, "2026-01-02", "09-11", false),
        ];
        let rows = build_causal_rows(&history, 7);
        assert_eq!(rows.len(), 2);
        // global mean = 0.5 (one true, one false)
        assert_eq!(rows[0].features.historical_occupancy_frequency, 0.5);
        assert_eq!(rows[0].features.rolling_occupancy_average, 0.5);
    }

    #[test]
    fn second_row_uses_only_strictly_prior_observation() {
        let history = vec![
            row(1, "2026-01-01", "09-11", true),
            row(1, "2026-01-02", "09-11", false),
        ];
        let rows = build_causal_rows(&history, 7);
        // second row's historical frequency is based on the single prior (true) row.
        assert_eq!(rows[1].features.historical_occupancy_frequency, 1.0);
    }

    #[test]
    fn rolling_window_excludes_rows_outside_window() {
        let mut history = Vec::new();
        for day in 1..=10 {
            history.push(row(1, &format!("2026-01-{:02}", day), "09-11", day % 2 == 0));
        }
        let rows = build_causal_rows(&history, 3);
        // the 10th row's rolling window covers the 3 rows immediately before it (days 7,8,9).
        let last = rows.last().unwrap();
        assert_eq!(last.features.rolling_occupancy_average, 2.0 / 3.0);
    }

    #[test]
    fn vocabulary_encodes_unknown_category_as_zero_block() {
        let history = vec![row(1, "2026-01-01", "09-11", true)];
        let vocab = Vocabulary::build(&history);
        let unknown = FeatureRow {
            day_of_week: 0,
            time_slot: "21-23".to_string(),
            room_type: "atrium".to_string(),
            historical_occupancy_frequency: 0.3,
            rolling_occupancy_average: 0.3,
        };
        let encoded = vocab.encode(&unknown);
        // both one-hot blocks (1 slot + 1 room type = 2 slots) are all zero for unknown categories.
        assert_eq!(encoded[0], 0.0);
        assert_eq!(encoded[1], 0.0);
    }
}
