use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use room_allocator_storage::schema::{SyntheticSeedConfig, init_schema, seed_synthetic_data};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

static COUNTER: AtomicU64 = AtomicU64::new(1);

pub struct SqliteTestDb {
    pub pool: SqlitePool,
    pub db_path: PathBuf,
    keep_db: bool,
}

impl Drop for SqliteTestDb {
    fn drop(&mut self) {
        if self.keep_db {
            return;
        }
        let _ = std::fs::remove_file(&self.db_path);
    }
}

pub async fn setup_test_db() -> Result<SqliteTestDb, sqlx::Error> {
    let keep_db = std::env::var("TEST_KEEP_DB").ok().as_deref() == Some("1");
    let unique = COUNTER.fetch_add(1, Ordering::Relaxed);
    let db_path = std::env::temp_dir().join(format!(
        "room-allocator-sqlite-test-{}-{}.db",
        std::process::id(),
        unique
    ));

    if db_path.exists() {
        let _ = std::fs::remove_file(&db_path);
    }

    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    init_schema(&pool)
        .await
        .map_err(|e| sqlx::Error::Protocol(format!("schema init failed: {e}")))?;

    Ok(SqliteTestDb {
        pool,
        db_path,
        keep_db,
    })
}

pub async fn seed_synthetic_fixtures(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let config = SyntheticSeedConfig {
        random_seed: 42,
        seed_days: 14,
        weekday_occupied_probability: 0.65,
        weekend_occupied_probability: 0.25,
        time_slots: vec![
            "09-11".to_string(),
            "11-13".to_string(),
            "13-15".to_string(),
            "15-17".to_string(),
        ],
    };
    seed_synthetic_data(pool, &config)
        .await
        .map_err(|e| sqlx::Error::Protocol(format!("seed failed: {e}")))
}
