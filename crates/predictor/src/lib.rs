//! Idle-probability predictor: trains a binary occupancy classifier from
//! booking history and serves single-point inferences.

pub mod features;
pub mod model;

use chrono::NaiveDate;
use regex::Regex;
use tokio::sync::RwLock;

use room_allocator_config::AppConfig;
use room_allocator_domain::{IdlePrediction, ModelMetadata, PredictionError, Room};
use room_allocator_storage::RoomRepository;

use features::{FeatureRow, Vocabulary, build_causal_rows};
use model::{TrainedClassifier, train_logistic, train_most_frequent};

/// Inference result before persistence, mirroring the HTTP response shape.
#[derive(Debug, Clone, Copy)]
pub struct PredictionOutcome {
    pub idle_probability: f64,
    pub confidence_score: f64,
}

struct ModelState {
    classifier: TrainedClassifier,
    vocabulary: Vocabulary,
    metadata: ModelMetadata,
}

/// Owning handle around the trained model. Training takes an exclusive write
/// lock; inference takes a shared read lock, so concurrent inferences are
/// permitted once training completes (spec.md §5/§9).
pub struct Predictor {
    repo: RoomRepository,
    time_slot_regex: Regex,
    rolling_window_days: i64,
    default_occupancy_probability: f64,
    min_training_rows: usize,
    model_max_iter: usize,
    random_state: u64,
    model_version: String,
    state: RwLock<Option<ModelState>>,
}

impl Predictor {
    pub fn new(repo: RoomRepository, config: &AppConfig) -> Result<Self, PredictionError> {
        let time_slot_regex = Regex::new(&config.prediction_time_slot_regex)
            .map_err(|e| PredictionError::Validation(format!("invalid time_slot regex: {e}")))?;
        Ok(Self {
            repo,
            time_slot_regex,
            rolling_window_days: config.prediction_rolling_window_days,
            default_occupancy_probability: config.prediction_default_occupancy_probability,
            min_training_rows: config.prediction_min_training_rows,
            model_max_iter: config.prediction_model_max_iter,
            random_state: config.prediction_random_state,
            model_version: config.prediction_model_version.clone(),
            state: RwLock::new(None),
        })
    }

    /// Trains the classifier from the entire booking history and caches it.
    /// Refuses when `training_rows < min_training_rows` (`ModelNotReady`).
    pub async fn train(&self) -> Result<ModelMetadata, PredictionError> {
        let history = self.repo.get_booking_history_for_training().await.map_err(db_err)?;
        let training_rows = history.len();
        if training_rows < self.min_training_rows {
            return Err(PredictionError::ModelNotReady(format!(
                "insufficient booking history for training: {training_rows} rows, need at least {}",
                self.min_training_rows
            )));
        }

        let vocabulary = Vocabulary::build(&history);
        let causal_rows = build_causal_rows(&history, self.rolling_window_days);
        if causal_rows.is_empty() {
            return Err(PredictionError::ModelNotReady(
                "training data is empty after feature engineering".to_string(),
            ));
        }

        let features: Vec<Vec<f64>> = causal_rows
            .iter()
            .map(|row| vocabulary.encode(&row.features))
            .collect();
        let labels: Vec<f64> = causal_rows
            .iter()
            .map(|row| if row.occupied { 1.0 } else { 0.0 })
            .collect();

        let has_both_classes = labels.iter().any(|&l| l == 1.0) && labels.iter().any(|&l| l == 0.0);
        let classifier = if has_both_classes {
            TrainedClassifier::Logistic(train_logistic(
                &features,
                &labels,
                self.model_max_iter,
                self.random_state,
            ))
        } else {
            tracing::warn!("training labels contained a single class; falling back to most-frequent-class predictor");
            train_most_frequent(&labels)
        };

        let trained_at = chrono::Utc::now();
        self.repo
            .save_model_metadata(classifier.model_type(), &self.model_version, training_rows as i64)
            .await
            .map_err(db_err)?;
        let metadata = ModelMetadata {
            model_type: classifier.model_type().to_string(),
            model_version: self.model_version.clone(),
            trained_at,
            training_rows: training_rows as i64,
        };

        let mut state = self.state.write().await;
        *state = Some(ModelState {
            classifier,
            vocabulary,
            metadata: metadata.clone(),
        });
        tracing::info!(
            rows = training_rows,
            model_type = metadata.model_type,
            version = metadata.model_version,
            "prediction training completed"
        );
        Ok(metadata)
    }

    pub async fn model_metadata(&self) -> Result<ModelMetadata, PredictionError> {
        if let Some(state) = self.state.read().await.as_ref() {
            return Ok(state.metadata.clone());
        }
        self.repo
            .get_model_metadata()
            .await
            .map_err(db_err)?
            .ok_or_else(|| PredictionError::ModelNotReady("model metadata is unavailable; train the model first".to_string()))
    }

    fn validate_inputs(&self, room_id: i64, date: &str, time_slot: &str) -> Result<NaiveDate, PredictionError> {
        if room_id <= 0 {
            return Err(PredictionError::Validation(
                "room_id must be a positive integer".to_string(),
            ));
        }
        let parsed_date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| PredictionError::Validation("date must follow YYYY-MM-DD format".to_string()))?;

        if !self.time_slot_regex.is_match(time_slot) {
            return Err(PredictionError::Validation(
                "time_slot must follow HH-HH format with 24-hour boundaries".to_string(),
            ));
        }
        let (start_hour, end_hour) = parse_slot_hours(time_slot)
            .ok_or_else(|| PredictionError::Validation("time_slot must follow HH-HH format".to_string()))?;
        if start_hour >= end_hour || start_hour > 23 || end_hour > 23 {
            return Err(PredictionError::Validation(
                "time_slot start hour must be less than end hour, both within 0-23".to_string(),
            ));
        }
        Ok(parsed_date)
    }

    async fn assemble_features(
        &self,
        room: &Room,
        parsed_date: NaiveDate,
        time_slot: &str,
    ) -> Result<FeatureRow, PredictionError> {
        let date = parsed_date.format("%Y-%m-%d").to_string();
        let global_frequency = self
            .repo
            .get_global_occupancy_frequency(self.default_occupancy_probability)
            .await
            .map_err(db_err)?;

        let historical_frequency = self
            .repo
            .get_historical_occupancy_frequency(room.room_id, time_slot)
            .await
            .map_err(db_err)?
            .unwrap_or(global_frequency);

        let rolling_average = self
            .repo
            .get_rolling_occupancy_average(room.room_id, time_slot, self.rolling_window_days, &date)
            .await
            .map_err(db_err)?
            .unwrap_or(historical_frequency);

        Ok(FeatureRow {
            day_of_week: weekday_index(parsed_date),
            time_slot: time_slot.to_string(),
            room_type: room.room_type.clone(),
            historical_occupancy_frequency: historical_frequency,
            rolling_occupancy_average: rolling_average,
        })
    }

    /// Runs inference for one (room, date, slot), optionally persisting the
    /// resulting prediction.
    pub async fn predict(
        &self,
        room_id: i64,
        date: &str,
        time_slot: &str,
        persist: bool,
    ) -> Result<PredictionOutcome, PredictionError> {
        let parsed_date = self.validate_inputs(room_id, date, time_slot)?;
        let room = self
            .repo
            .get_room(room_id)
            .await
            .map_err(db_err)?
            .ok_or(PredictionError::RoomNotFound(room_id))?;
        let feature_row = self.assemble_features(&room, parsed_date, time_slot).await?;

        let state_guard = self.state.read().await;
        let state = state_guard
            .as_ref()
            .ok_or_else(|| PredictionError::ModelNotReady("model is not trained; call train() first".to_string()))?;
        let encoded = state.vocabulary.encode(&feature_row);
        let occupancy_probability = state.classifier.predict_proba(&encoded);
        drop(state_guard);

        let idle_probability = (1.0 - occupancy_probability).clamp(0.0, 1.0);
        let confidence_score = (idle_probability - 0.5).abs() * 2.0;

        if persist {
            self.repo
                .save_prediction(room_id, date, time_slot, idle_probability)
                .await
                .map_err(db_err)?;
        }

        tracing::info!(
            room_id,
            date,
            time_slot,
            idle_probability,
            confidence_score,
            "prediction inference completed"
        );
        Ok(PredictionOutcome {
            idle_probability,
            confidence_score,
        })
    }

    /// Helper used by the Simulator to build an [`IdlePrediction`] value
    /// without touching the store.
    pub async fn predict_without_persisting(
        &self,
        room_id: i64,
        date: &str,
        time_slot: &str,
    ) -> Result<IdlePrediction, PredictionError> {
        let outcome = self.predict(room_id, date, time_slot, false).await?;
        Ok(IdlePrediction {
            prediction_id: 0,
            room_id,
            date: date.to_string(),
            time_slot: time_slot.to_string(),
            idle_probability: outcome.idle_probability,
            created_at: chrono::Utc::now(),
        })
    }
}

fn db_err(err: room_allocator_storage::StorageError) -> PredictionError {
    PredictionError::Database(err.to_string())
}

fn parse_slot_hours(slot: &str) -> Option<(u32, u32)> {
    let (start, end) = slot.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

fn weekday_index(date: NaiveDate) -> i64 {
    use chrono::Datelike;
    date.weekday().num_days_from_monday() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_slot_hours() {
        assert_eq!(parse_slot_hours("09-11"), Some((9, 11)));
    }

    #[test]
    fn rejects_malformed_slot() {
        assert_eq!(parse_slot_hours("not-a-slot"), None);
    }
}
