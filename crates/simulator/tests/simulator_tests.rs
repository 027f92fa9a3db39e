use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use room_allocator_config::AppConfig;
use room_allocator_domain::TemporaryConstraints;
use room_allocator_predictor::Predictor;
use room_allocator_simulator::Simulator;
use room_allocator_storage::RoomRepository;
use room_allocator_storage::schema::{SyntheticSeedConfig, init_schema, seed_synthetic_data};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

static COUNTER: AtomicU64 = AtomicU64::new(1);

fn test_config() -> AppConfig {
    AppConfig {
        database_path: ":memory:".to_string(),
        app_name: "test".to_string(),
        app_version: "0".to_string(),
        log_level: "info".to_string(),
        bind_address: "127.0.0.1:0".to_string(),
        admin_token: String::new(),
        synthetic_random_seed: 42,
        synthetic_seed_days: 30,
        synthetic_weekday_occupied_probability: 0.65,
        synthetic_weekend_occupied_probability: 0.2,
        synthetic_time_slots: vec!["09-11".to_string(), "11-13".to_string()],
        prediction_time_slot_regex: r"^\d{2}-\d{2}$".to_string(),
        prediction_rolling_window_days: 7,
        prediction_default_occupancy_probability: 0.5,
        prediction_min_training_rows: 1,
        prediction_model_max_iter: 200,
        prediction_random_state: 42,
        prediction_model_version: "v1".to_string(),
        allocation_idle_probability_threshold: 0.5,
        allocation_stakeholder_usage_cap: 0.4,
        allocation_solver_max_time_seconds: 5.0,
        allocation_solver_random_seed: 42,
        allocation_objective_scale: 1000.0,
        allocation_cp_sat_workers: 1,
        allocation_forecast_history_days: 30,
        simulation_cp_sat_workers: 1,
        simulation_solver_random_seed: 123,
    }
}

async fn seeded_pool() -> SqlitePool {
    let unique = COUNTER.fetch_add(1, Ordering::Relaxed);
    let db_path: PathBuf = std::env::temp_dir().join(format!(
        "room-allocator-simulator-test-{}-{}.db",
        std::process::id(),
        unique
    ));
    let _ = std::fs::remove_file(&db_path);

    let options = SqliteConnectOptions::new().filename(&db_path).create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(1).connect_with(options).await.unwrap();
    init_schema(&pool).await.unwrap();
    seed_synthetic_data(
        &pool,
        &SyntheticSeedConfig {
            random_seed: 42,
            seed_days: 30,
            weekday_occupied_probability: 0.65,
            weekend_occupied_probability: 0.2,
            time_slots: vec!["09-11".to_string(), "11-13".to_string()],
        },
    )
    .await
    .unwrap();
    pool
}

async fn build_simulator(pool: SqlitePool, config: &AppConfig) -> (Simulator, RoomRepository) {
    let repo = RoomRepository::new(pool);
    let predictor = Predictor::new(repo.clone(), config).unwrap();
    predictor.train().await.unwrap();
    let simulator = Simulator::new(repo.clone(), Arc::new(predictor), config);
    (simulator, repo)
}

async fn seed_requests_and_predictions(repo: &RoomRepository, date: &str, slot: &str) -> Vec<i64> {
    for room_id in 1..=10 {
        repo.save_prediction(room_id, date, slot, if room_id <= 6 { 0.85 } else { 0.40 }).await.unwrap();
    }
    let a = repo.create_request(18, date, slot, "dept_a", 1.4).await.unwrap();
    let b = repo.create_request(22, date, slot, "dept_b", 1.1).await.unwrap();
    let c = repo.create_request(10, date, slot, "dept_a", 0.9).await.unwrap();
    vec![a, b, c]
}

#[tokio::test]
async fn simulation_never_persists_side_effects() {
    let config = test_config();
    let pool = seeded_pool().await;
    let (simulator, repo) = build_simulator(pool, &config).await;

    let date = "2026-02-25";
    let slot = "09-11";
    let request_ids = seed_requests_and_predictions(&repo, date, slot).await;

    let before_allocation_logs = repo.count_allocation_logs().await.unwrap();
    let before_forecast_logs = repo.count_forecast_logs().await.unwrap();
    let before_predictions = repo.count_predictions().await.unwrap();

    let mut capacity_override = HashMap::new();
    capacity_override.insert(1, 35);
    capacity_override.insert(2, 55);
    let mut priority_adjustment = HashMap::new();
    priority_adjustment.insert("dept_a".to_string(), 1.2);

    let outcome = simulator
        .run_simulation(TemporaryConstraints {
            idle_threshold: Some(0.55),
            stakeholder_cap: Some(0.70),
            capacity_override: Some(capacity_override),
            priority_adjustment: Some(priority_adjustment),
        })
        .await
        .unwrap();

    assert!(outcome.simulation.objective_value >= 0.0);
    assert_eq!(repo.count_allocation_logs().await.unwrap(), before_allocation_logs);
    assert_eq!(repo.count_forecast_logs().await.unwrap(), before_forecast_logs);
    assert_eq!(repo.count_predictions().await.unwrap(), before_predictions);
    for request_id in request_ids {
        let status = repo.get_request_status(request_id).await.unwrap().unwrap();
        assert_eq!(status, room_allocator_domain::RequestStatus::Pending);
    }
}

#[tokio::test]
async fn simulation_is_deterministic_for_identical_inputs() {
    let config = test_config();
    let pool = seeded_pool().await;
    let (simulator, repo) = build_simulator(pool, &config).await;

    let date = "2026-02-26";
    let slot = "11-13";
    seed_requests_and_predictions(&repo, date, slot).await;

    let mut capacity_override = HashMap::new();
    capacity_override.insert(3, 50);
    let mut priority_adjustment = HashMap::new();
    priority_adjustment.insert("dept_b".to_string(), 1.5);
    let constraints = TemporaryConstraints {
        idle_threshold: Some(0.60),
        stakeholder_cap: Some(0.65),
        capacity_override: Some(capacity_override),
        priority_adjustment: Some(priority_adjustment),
    };

    let first = simulator.run_simulation(constraints.clone()).await.unwrap();
    let second = simulator.run_simulation(constraints).await.unwrap();

    assert_eq!(first.baseline.objective_value, second.baseline.objective_value);
    assert_eq!(first.simulation.objective_value, second.simulation.objective_value);
    assert_eq!(first.delta.request_change, second.delta.request_change);
}

#[tokio::test]
async fn unknown_capacity_override_room_is_rejected() {
    let config = test_config();
    let pool = seeded_pool().await;
    let (simulator, repo) = build_simulator(pool, &config).await;

    let date = "2026-02-27";
    let slot = "14-16";
    seed_requests_and_predictions(&repo, date, slot).await;

    let mut capacity_override = HashMap::new();
    capacity_override.insert(9999, 25);

    let result = simulator
        .run_simulation(TemporaryConstraints {
            idle_threshold: None,
            stakeholder_cap: None,
            capacity_override: Some(capacity_override),
            priority_adjustment: None,
        })
        .await;

    assert!(matches!(result, Err(room_allocator_domain::SimulationError::Validation(_))));
}

#[tokio::test]
async fn empty_dataset_yields_zeroed_outcome() {
    let config = test_config();
    let pool = seeded_pool().await;
    let (simulator, _repo) = build_simulator(pool, &config).await;

    let outcome = simulator.run_simulation(TemporaryConstraints::default()).await.unwrap();
    assert_eq!(outcome.baseline.requests_satisfied, 0);
    assert_eq!(outcome.simulation.requests_satisfied, 0);
    assert_eq!(outcome.delta.request_change, 0);
}
