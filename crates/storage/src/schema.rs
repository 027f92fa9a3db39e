//! Inline schema initialization and synthetic data seeding.
//!
//! The retrieval pack carries no `.sql` migration files for this system (the
//! original's `initialize_database()` runs raw `CREATE TABLE IF NOT EXISTS`
//! statements directly against SQLite), so this module mirrors that approach
//! instead of reaching for `sqlx::migrate!`.

use chrono::{Datelike, Duration, Utc, Weekday};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use sqlx::SqlitePool;

use crate::error::StorageError;

const CREATE_ROOMS: &str = "
CREATE TABLE IF NOT EXISTS Rooms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    capacity INTEGER NOT NULL CHECK (capacity > 0),
    room_type TEXT NOT NULL,
    location TEXT,
    created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
)";

const CREATE_BOOKING_HISTORY: &str = "
CREATE TABLE IF NOT EXISTS BookingHistory (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    room_id INTEGER NOT NULL REFERENCES Rooms(id),
    date TEXT NOT NULL,
    time_slot TEXT NOT NULL,
    occupied INTEGER NOT NULL CHECK (occupied IN (0, 1))
)";

const CREATE_REQUESTS: &str = "
CREATE TABLE IF NOT EXISTS Requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    requested_capacity INTEGER NOT NULL CHECK (requested_capacity > 0),
    requested_date TEXT NOT NULL,
    requested_time_slot TEXT NOT NULL,
    stakeholder_id TEXT NOT NULL DEFAULT 'UNKNOWN',
    priority_weight REAL NOT NULL DEFAULT 1.0,
    status TEXT NOT NULL DEFAULT 'PENDING'
)";

const CREATE_ALLOCATION_LOGS: &str = "
CREATE TABLE IF NOT EXISTS AllocationLogs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    request_id INTEGER NOT NULL REFERENCES Requests(id),
    room_id INTEGER NOT NULL REFERENCES Rooms(id),
    allocation_score REAL NOT NULL,
    allocated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
)";

const CREATE_PREDICTIONS: &str = "
CREATE TABLE IF NOT EXISTS Predictions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    room_id INTEGER NOT NULL REFERENCES Rooms(id),
    date TEXT NOT NULL,
    time_slot TEXT NOT NULL,
    idle_probability REAL NOT NULL,
    created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
)";

const CREATE_DEMAND_FORECAST_LOGS: &str = "
CREATE TABLE IF NOT EXISTS DemandForecastLogs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    forecast_date TEXT NOT NULL,
    time_slot TEXT NOT NULL,
    historical_count INTEGER NOT NULL,
    demand_intensity_score REAL NOT NULL,
    created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
)";

// Not present in the retrieved `data_repository.py` (its save_model_metadata /
// get_model_metadata call sites have no matching table definition in the
// pack); added here to satisfy spec.md's model-metadata requirement. Single
// logical row, overwritten on every successful training run.
const CREATE_MODEL_METADATA: &str = "
CREATE TABLE IF NOT EXISTS ModelMetadata (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    model_type TEXT NOT NULL,
    model_version TEXT NOT NULL,
    trained_at TEXT NOT NULL,
    training_rows INTEGER NOT NULL
)";

const CREATE_INDEX_REQUESTS: &str =
    "CREATE INDEX IF NOT EXISTS idx_requests_date_slot_status ON Requests(requested_date, requested_time_slot, status)";
const CREATE_INDEX_BOOKING: &str =
    "CREATE INDEX IF NOT EXISTS idx_booking_room_slot_date ON BookingHistory(room_id, time_slot, date)";
const CREATE_INDEX_PREDICTIONS: &str =
    "CREATE INDEX IF NOT EXISTS idx_predictions_room_date_slot ON Predictions(room_id, date, time_slot)";

pub async fn init_schema(pool: &SqlitePool) -> Result<(), StorageError> {
    for statement in [
        CREATE_ROOMS,
        CREATE_BOOKING_HISTORY,
        CREATE_REQUESTS,
        CREATE_ALLOCATION_LOGS,
        CREATE_PREDICTIONS,
        CREATE_DEMAND_FORECAST_LOGS,
        CREATE_MODEL_METADATA,
        CREATE_INDEX_REQUESTS,
        CREATE_INDEX_BOOKING,
        CREATE_INDEX_PREDICTIONS,
    ] {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(StorageError::Schema)?;
    }

    ensure_stakeholder_id_column(pool).await?;
    Ok(())
}

/// Idempotent column migration, mirroring the original's `PRAGMA table_info`
/// check before `ALTER TABLE Requests ADD COLUMN stakeholder_id`.
async fn ensure_stakeholder_id_column(pool: &SqlitePool) -> Result<(), StorageError> {
    let columns: Vec<(i64, String)> = sqlx::query_as("SELECT cid, name FROM pragma_table_info('Requests')")
        .fetch_all(pool)
        .await
        .map_err(StorageError::Schema)?;

    let has_column = columns.iter().any(|(_, name)| name == "stakeholder_id");
    if !has_column {
        sqlx::query("ALTER TABLE Requests ADD COLUMN stakeholder_id TEXT NOT NULL DEFAULT 'UNKNOWN'")
            .execute(pool)
            .await
            .map_err(StorageError::Schema)?;
    }
    Ok(())
}

struct SeedRoom {
    name: &'static str,
    capacity: i64,
    room_type: &'static str,
    location: &'static str,
}

const SEED_ROOMS: [SeedRoom; 10] = [
    SeedRoom { name: "Room A", capacity: 4, room_type: "huddle", location: "Floor 1" },
    SeedRoom { name: "Room B", capacity: 6, room_type: "meeting", location: "Floor 1" },
    SeedRoom { name: "Room C", capacity: 8, room_type: "meeting", location: "Floor 2" },
    SeedRoom { name: "Room D", capacity: 12, room_type: "conference", location: "Floor 2" },
    SeedRoom { name: "Room E", capacity: 2, room_type: "phone_booth", location: "Floor 1" },
    SeedRoom { name: "Room F", capacity: 20, room_type: "conference", location: "Floor 3" },
    SeedRoom { name: "Room G", capacity: 4, room_type: "huddle", location: "Floor 3" },
    SeedRoom { name: "Room H", capacity: 6, room_type: "meeting", location: "Floor 3" },
    SeedRoom { name: "Room I", capacity: 10, room_type: "conference", location: "Floor 1" },
    SeedRoom { name: "Room J", capacity: 2, room_type: "phone_booth", location: "Floor 2" },
];

pub struct SyntheticSeedConfig {
    pub random_seed: u64,
    pub seed_days: i64,
    pub weekday_occupied_probability: f64,
    pub weekend_occupied_probability: f64,
    pub time_slots: Vec<String>,
}

/// Seeds Rooms and BookingHistory exactly once. Mirrors `seed_synthetic_data`
/// in the original, which no-ops whenever `Rooms` already has rows.
pub async fn seed_synthetic_data(
    pool: &SqlitePool,
    config: &SyntheticSeedConfig,
) -> Result<(), StorageError> {
    let (room_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM Rooms")
        .fetch_one(pool)
        .await
        .map_err(StorageError::Query)?;
    if room_count > 0 {
        return Ok(());
    }

    let mut tx = pool.begin().await.map_err(StorageError::Query)?;
    let mut room_ids = Vec::with_capacity(SEED_ROOMS.len());
    for room in &SEED_ROOMS {
        let result = sqlx::query(
            "INSERT INTO Rooms (name, capacity, room_type, location) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(room.name)
        .bind(room.capacity)
        .bind(room.room_type)
        .bind(room.location)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::Query)?;
        room_ids.push(result.last_insert_rowid());
    }

    let mut rng = StdRng::seed_from_u64(config.random_seed);
    let today = Utc::now().date_naive();
    let start = today - Duration::days(config.seed_days);

    for day_offset in 0..config.seed_days {
        let date = start + Duration::days(day_offset);
        let is_weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
        let occupied_probability = if is_weekend {
            config.weekend_occupied_probability
        } else {
            config.weekday_occupied_probability
        };

        for &room_id in &room_ids {
            for time_slot in &config.time_slots {
                let occupied = rng.gen_bool(occupied_probability.clamp(0.0, 1.0));
                sqlx::query(
                    "INSERT INTO BookingHistory (room_id, date, time_slot, occupied) VALUES (?1, ?2, ?3, ?4)",
                )
                .bind(room_id)
                .bind(date.format("%Y-%m-%d").to_string())
                .bind(time_slot)
                .bind(occupied as i64)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::Query)?;
            }
        }
    }

    tx.commit().await.map_err(StorageError::Query)?;
    tracing::info!(rooms = room_ids.len(), days = config.seed_days, "seeded synthetic data");
    Ok(())
}
