//! Configuration module for the room allocation service.

use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: String,
    pub app_name: String,
    pub app_version: String,
    pub log_level: String,
    pub bind_address: String,
    /// Enables the bearer-token guard on protected routes when non-empty.
    pub admin_token: String,

    pub synthetic_random_seed: u64,
    pub synthetic_seed_days: i64,
    pub synthetic_weekday_occupied_probability: f64,
    pub synthetic_weekend_occupied_probability: f64,
    pub synthetic_time_slots: Vec<String>,

    pub prediction_time_slot_regex: String,
    pub prediction_rolling_window_days: i64,
    pub prediction_default_occupancy_probability: f64,
    pub prediction_min_training_rows: usize,
    pub prediction_model_max_iter: usize,
    pub prediction_random_state: u64,
    pub prediction_model_version: String,

    pub allocation_idle_probability_threshold: f64,
    pub allocation_stakeholder_usage_cap: f64,
    pub allocation_solver_max_time_seconds: f64,
    pub allocation_solver_random_seed: u64,
    pub allocation_objective_scale: f64,
    pub allocation_cp_sat_workers: usize,
    pub allocation_forecast_history_days: i64,

    pub simulation_cp_sat_workers: usize,
    pub simulation_solver_random_seed: u64,
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to a
    /// `.env` file in the working directory if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_path: env_var_or("DATABASE_PATH", "./room_allocator.db"),
            app_name: env_var_or("APP_NAME", "room-allocator"),
            app_version: env_var_or("APP_VERSION", env!("CARGO_PKG_VERSION")),
            log_level: env_var_or("LOG_LEVEL", "info"),
            bind_address: env_var_or("BIND_ADDRESS", "0.0.0.0:8080"),
            admin_token: env_var_or("ADMIN_TOKEN", ""),

            synthetic_random_seed: parse_or("SYNTHETIC_RANDOM_SEED", 42)?,
            synthetic_seed_days: parse_or("SYNTHETIC_SEED_DAYS", 90)?,
            synthetic_weekday_occupied_probability: parse_or(
                "SYNTHETIC_WEEKDAY_OCCUPIED_PROBABILITY",
                0.65,
            )?,
            synthetic_weekend_occupied_probability: parse_or(
                "SYNTHETIC_WEEKEND_OCCUPIED_PROBABILITY",
                0.25,
            )?,
            synthetic_time_slots: list_or(
                "SYNTHETIC_TIME_SLOTS",
                &["09-11", "11-13", "13-15", "15-17"],
            ),

            prediction_time_slot_regex: env_var_or("PREDICTION_TIME_SLOT_REGEX", r"^\d{2}-\d{2}$"),
            prediction_rolling_window_days: parse_or("PREDICTION_ROLLING_WINDOW_DAYS", 7)?,
            prediction_default_occupancy_probability: parse_or(
                "PREDICTION_DEFAULT_OCCUPANCY_PROBABILITY",
                0.5,
            )?,
            prediction_min_training_rows: parse_or("PREDICTION_MIN_TRAINING_ROWS", 30)?,
            prediction_model_max_iter: parse_or("PREDICTION_MODEL_MAX_ITER", 200)?,
            prediction_random_state: parse_or("PREDICTION_RANDOM_STATE", 42)?,
            prediction_model_version: env_var_or("PREDICTION_MODEL_VERSION", "v1"),

            allocation_idle_probability_threshold: parse_or(
                "ALLOCATION_IDLE_PROBABILITY_THRESHOLD",
                0.5,
            )?,
            allocation_stakeholder_usage_cap: parse_or("ALLOCATION_STAKEHOLDER_USAGE_CAP", 0.4)?,
            allocation_solver_max_time_seconds: parse_or(
                "ALLOCATION_SOLVER_MAX_TIME_SECONDS",
                5.0,
            )?,
            allocation_solver_random_seed: parse_or("ALLOCATION_SOLVER_RANDOM_SEED", 42)?,
            allocation_objective_scale: parse_or("ALLOCATION_OBJECTIVE_SCALE", 1000.0)?,
            allocation_cp_sat_workers: parse_or("ALLOCATION_CP_SAT_WORKERS", 4)?,
            allocation_forecast_history_days: parse_or("ALLOCATION_FORECAST_HISTORY_DAYS", 30)?,

            simulation_cp_sat_workers: parse_or("SIMULATION_CP_SAT_WORKERS", 4)?,
            simulation_solver_random_seed: parse_or("SIMULATION_SOLVER_RANDOM_SEED", 7)?,
        })
    }
}

fn env_var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

fn list_or(name: &str, default: &[&str]) -> Vec<String> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.split(',').map(|s| s.trim().to_string()).collect()
        }
        _ => default.iter().map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_or_uses_default() {
        let val = env_var_or("NON_EXISTENT_VAR_12345", "default_value");
        assert_eq!(val, "default_value");
    }

    #[test]
    fn parse_or_rejects_invalid_values() {
        // SAFETY: test runs single-threaded within this process's env.
        unsafe { env::set_var("PARSE_OR_TEST_BAD_FLOAT", "not-a-number") };
        let result: Result<f64, ConfigError> = parse_or("PARSE_OR_TEST_BAD_FLOAT", 1.0);
        assert!(result.is_err());
        unsafe { env::remove_var("PARSE_OR_TEST_BAD_FLOAT") };
    }

    #[test]
    fn list_or_splits_on_comma() {
        unsafe { env::set_var("LIST_OR_TEST_SLOTS", "09-11, 11-13") };
        let slots = list_or("LIST_OR_TEST_SLOTS", &["default"]);
        assert_eq!(slots, vec!["09-11".to_string(), "11-13".to_string()]);
        unsafe { env::remove_var("LIST_OR_TEST_SLOTS") };
    }
}
