use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use room_allocator_config::AppConfig;
use room_allocator_predictor::Predictor;
use room_allocator_storage::schema::{SyntheticSeedConfig, init_schema, seed_synthetic_data};
use room_allocator_storage::RoomRepository;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

static COUNTER: AtomicU64 = AtomicU64::new(1);

async fn seeded_pool() -> SqlitePool {
    let unique = COUNTER.fetch_add(1, Ordering::Relaxed);
    let db_path: PathBuf = std::env::temp_dir().join(format!(
        "room-allocator-predictor-test-{}-{}.db",
        std::process::id(),
        unique
    ));
    let _ = std::fs::remove_file(&db_path);

    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();
    seed_synthetic_data(
        &pool,
        &SyntheticSeedConfig {
            random_seed: 42,
            seed_days: 60,
            weekday_occupied_probability: 0.65,
            weekend_occupied_probability: 0.2,
            time_slots: vec!["09-11".to_string(), "11-13".to_string()],
        },
    )
    .await
    .unwrap();
    pool
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::from_env().expect("default config");
    config.prediction_min_training_rows = 10;
    config
}

#[tokio::test]
async fn predict_without_training_fails_model_not_ready() {
    let pool = seeded_pool().await;
    let predictor = Predictor::new(RoomRepository::new(pool), &test_config()).unwrap();
    let result = predictor.predict(1, "2026-03-01", "09-11", false).await;
    assert!(matches!(
        result,
        Err(room_allocator_domain::PredictionError::ModelNotReady(_))
    ));
}

#[tokio::test]
async fn predict_rejects_invalid_time_slot() {
    let pool = seeded_pool().await;
    let predictor = Predictor::new(RoomRepository::new(pool), &test_config()).unwrap();
    let result = predictor.predict(1, "2026-03-01", "not-a-slot", false).await;
    assert!(matches!(
        result,
        Err(room_allocator_domain::PredictionError::Validation(_))
    ));
}

#[tokio::test]
async fn predict_rejects_unknown_room() {
    let pool = seeded_pool().await;
    let predictor = Predictor::new(RoomRepository::new(pool), &test_config()).unwrap();
    predictor.train().await.unwrap();
    let result = predictor.predict(9999, "2026-03-01", "09-11", false).await;
    assert!(matches!(
        result,
        Err(room_allocator_domain::PredictionError::RoomNotFound(9999))
    ));
}

#[tokio::test]
async fn trained_model_produces_bounded_outputs() {
    let pool = seeded_pool().await;
    let predictor = Predictor::new(RoomRepository::new(pool), &test_config()).unwrap();
    predictor.train().await.unwrap();

    let outcome = predictor
        .predict(1, "2026-03-02", "09-11", false)
        .await
        .unwrap();
    assert!((0.0..=1.0).contains(&outcome.idle_probability));
    assert!((0.0..=1.0).contains(&outcome.confidence_score));

    let expected_confidence = (outcome.idle_probability - 0.5).abs() * 2.0;
    assert!((outcome.confidence_score - expected_confidence).abs() < 1e-9);
}

#[tokio::test]
async fn two_trainings_on_identical_data_produce_identical_predictions() {
    let pool_a = seeded_pool().await;
    let pool_b = seeded_pool().await;

    let predictor_a = Predictor::new(RoomRepository::new(pool_a), &test_config()).unwrap();
    let predictor_b = Predictor::new(RoomRepository::new(pool_b), &test_config()).unwrap();
    predictor_a.train().await.unwrap();
    predictor_b.train().await.unwrap();

    let a = predictor_a
        .predict(1, "2026-03-05", "09-11", false)
        .await
        .unwrap();
    let b = predictor_b
        .predict(1, "2026-03-05", "09-11", false)
        .await
        .unwrap();
    assert_eq!(a.idle_probability, b.idle_probability);
}

#[tokio::test]
async fn persisting_a_prediction_increments_prediction_count() {
    let pool = seeded_pool().await;
    let repo = RoomRepository::new(pool.clone());
    let predictor = Predictor::new(repo.clone(), &test_config()).unwrap();
    predictor.train().await.unwrap();

    let before = repo.count_predictions().await.unwrap();
    predictor
        .predict(1, "2026-03-02", "09-11", true)
        .await
        .unwrap();
    let after = repo.count_predictions().await.unwrap();
    assert_eq!(after, before + 1);
}
