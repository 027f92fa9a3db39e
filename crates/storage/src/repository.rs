//! Query methods grounded in `data_repository.py`'s `DataRepository` class,
//! one method per call site used by the Predictor, Allocator, Simulator, and
//! Workflow.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use room_allocator_domain::{
    AllocationDecision, BookingRow, DemandForecast, IdlePrediction, ModelMetadata, Request,
    RequestStatus, Room,
};

use crate::error::StorageError;

#[derive(Clone)]
pub struct RoomRepository {
    pool: SqlitePool,
}

impl RoomRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn get_room(&self, room_id: i64) -> Result<Option<Room>, StorageError> {
        let row = sqlx::query("SELECT id, capacity, room_type, location FROM Rooms WHERE id = ?1")
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| Room {
            room_id: r.get("id"),
            capacity: r.get("capacity"),
            room_type: r.get("room_type"),
            location: r.get("location"),
        }))
    }

    pub async fn list_rooms_for_allocation(&self) -> Result<Vec<Room>, StorageError> {
        let rows = sqlx::query("SELECT id, capacity, room_type, location FROM Rooms ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| Room {
                room_id: r.get("id"),
                capacity: r.get("capacity"),
                room_type: r.get("room_type"),
                location: r.get("location"),
            })
            .collect())
    }

    /// All booking history ordered for causal (room, time_slot) grouping:
    /// the Predictor relies on ascending date within each group to compute
    /// `prev_count`/`prev_sum` without peeking at the current row.
    pub async fn get_booking_history_for_training(&self) -> Result<Vec<BookingRow>, StorageError> {
        let rows = sqlx::query(
            "SELECT b.room_id, b.date, b.time_slot, b.occupied, r.room_type
             FROM BookingHistory b
             JOIN Rooms r ON r.id = b.room_id
             ORDER BY b.room_id, b.time_slot, b.date",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| {
                let occupied: i64 = r.get("occupied");
                BookingRow {
                    room_id: r.get("room_id"),
                    date: r.get("date"),
                    time_slot: r.get("time_slot"),
                    occupied: occupied != 0,
                    room_type: r.get("room_type"),
                }
            })
            .collect())
    }

    pub async fn get_historical_occupancy_frequency(
        &self,
        room_id: i64,
        time_slot: &str,
    ) -> Result<Option<f64>, StorageError> {
        let row = sqlx::query(
            "SELECT AVG(CAST(occupied AS REAL)) as freq, COUNT(*) as n
             FROM BookingHistory WHERE room_id = ?1 AND time_slot = ?2",
        )
        .bind(room_id)
        .bind(time_slot)
        .fetch_one(&self.pool)
        .await?;
        let n: i64 = row.get("n");
        if n == 0 {
            return Ok(None);
        }
        Ok(row.get("freq"))
    }

    pub async fn get_rolling_occupancy_average(
        &self,
        room_id: i64,
        time_slot: &str,
        window_days: i64,
        before_date: &str,
    ) -> Result<Option<f64>, StorageError> {
        let row = sqlx::query(
            "SELECT AVG(CAST(occupied AS REAL)) as avg_occupied
             FROM (
                 SELECT occupied FROM BookingHistory
                 WHERE room_id = ?1 AND time_slot = ?2 AND date < ?3
                 ORDER BY date DESC
                 LIMIT ?4
             )",
        )
        .bind(room_id)
        .bind(time_slot)
        .bind(before_date)
        .bind(window_days)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("avg_occupied"))
    }

    pub async fn get_global_occupancy_frequency(
        &self,
        default_occupancy_probability: f64,
    ) -> Result<f64, StorageError> {
        let row = sqlx::query("SELECT AVG(CAST(occupied AS REAL)) as freq FROM BookingHistory")
            .fetch_one(&self.pool)
            .await?;
        let freq: Option<f64> = row.get("freq");
        Ok(freq.unwrap_or(default_occupancy_probability))
    }

    pub async fn list_known_time_slots(&self) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query("SELECT DISTINCT time_slot FROM BookingHistory ORDER BY time_slot")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.get("time_slot")).collect())
    }

    pub async fn save_prediction(
        &self,
        room_id: i64,
        date: &str,
        time_slot: &str,
        idle_probability: f64,
    ) -> Result<i64, StorageError> {
        let result = sqlx::query(
            "INSERT INTO Predictions (room_id, date, time_slot, idle_probability) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(room_id)
        .bind(date)
        .bind(time_slot)
        .bind(idle_probability)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn count_predictions(&self) -> Result<i64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) as n FROM Predictions")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    pub async fn list_pending_requests(
        &self,
        requested_date: &str,
        requested_time_slot: &str,
    ) -> Result<Vec<Request>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, requested_capacity, requested_date, requested_time_slot,
                    priority_weight, stakeholder_id, status
             FROM Requests
             WHERE requested_date = ?1 AND requested_time_slot = ?2 AND status = 'PENDING'
             ORDER BY id",
        )
        .bind(requested_date)
        .bind(requested_time_slot)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_request).collect())
    }

    pub async fn list_all_pending_requests(&self) -> Result<Vec<Request>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, requested_capacity, requested_date, requested_time_slot,
                    priority_weight, stakeholder_id, status
             FROM Requests WHERE status = 'PENDING'
             ORDER BY requested_date, requested_time_slot, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_request).collect())
    }

    /// Most recent prediction per room for a (date, time_slot), resolved via
    /// a `MAX(id)` subquery so a re-predicted room supersedes its own stale row.
    pub async fn list_idle_predictions(
        &self,
        requested_date: &str,
        requested_time_slot: &str,
    ) -> Result<Vec<IdlePrediction>, StorageError> {
        let rows = sqlx::query(
            "SELECT p.id, p.room_id, p.date, p.time_slot, p.idle_probability, p.created_at
             FROM Predictions p
             JOIN (
                 SELECT room_id, MAX(id) as max_id
                 FROM Predictions
                 WHERE date = ?1 AND time_slot = ?2
                 GROUP BY room_id
             ) latest ON latest.max_id = p.id
             ORDER BY p.room_id",
        )
        .bind(requested_date)
        .bind(requested_time_slot)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| {
                let created_at: String = r.get("created_at");
                IdlePrediction {
                    prediction_id: r.get("id"),
                    room_id: r.get("room_id"),
                    date: r.get("date"),
                    time_slot: r.get("time_slot"),
                    idle_probability: r.get("idle_probability"),
                    created_at: parse_sqlite_timestamp(&created_at),
                }
            })
            .collect())
    }

    /// Request counts grouped by slot over the `lookback_days` window strictly
    /// before `target_date`, feeding demand-forecast intensity scoring.
    pub async fn get_historical_request_counts_by_slot(
        &self,
        target_date: &str,
        lookback_days: i64,
    ) -> Result<Vec<(String, i64)>, StorageError> {
        let rows = sqlx::query(
            "SELECT requested_time_slot as time_slot, COUNT(*) as n
             FROM Requests
             WHERE requested_date < ?1 AND requested_date >= date(?1, ?2)
             GROUP BY requested_time_slot
             ORDER BY requested_time_slot",
        )
        .bind(target_date)
        .bind(format!("-{lookback_days} day"))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| (r.get("time_slot"), r.get("n"))).collect())
    }

    pub async fn create_request(
        &self,
        requested_capacity: i64,
        requested_date: &str,
        requested_time_slot: &str,
        stakeholder_id: &str,
        priority_weight: f64,
    ) -> Result<i64, StorageError> {
        let result = sqlx::query(
            "INSERT INTO Requests (requested_capacity, requested_date, requested_time_slot, stakeholder_id, priority_weight)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(requested_capacity)
        .bind(requested_date)
        .bind(requested_time_slot)
        .bind(stakeholder_id)
        .bind(priority_weight)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn count_allocation_logs(&self) -> Result<i64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) as n FROM AllocationLogs")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    pub async fn count_forecast_logs(&self) -> Result<i64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) as n FROM DemandForecastLogs")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Distinct pending (date, slot) windows with their request counts,
    /// ordered chronologically. Feeds the `/demo_context` operator surface.
    pub async fn list_pending_windows(&self) -> Result<Vec<(String, String, i64)>, StorageError> {
        let rows = sqlx::query(
            "SELECT requested_date, requested_time_slot, COUNT(*) as n
             FROM Requests
             WHERE status = 'PENDING'
             GROUP BY requested_date, requested_time_slot
             ORDER BY requested_date, requested_time_slot",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| (r.get("requested_date"), r.get("requested_time_slot"), r.get("n")))
            .collect())
    }

    pub async fn get_request_status(
        &self,
        request_id: i64,
    ) -> Result<Option<RequestStatus>, StorageError> {
        let row = sqlx::query("SELECT status FROM Requests WHERE id = ?1")
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| {
            let status: String = r.get("status");
            match status.as_str() {
                "ALLOCATED" => RequestStatus::Allocated,
                _ => RequestStatus::Pending,
            }
        }))
    }

    /// Overwrites the single logical ModelMetadata row. Not present as a
    /// repository method in the retrieved original; added to satisfy the
    /// model metadata requirements implied by its call sites and spec.md.
    pub async fn save_model_metadata(
        &self,
        model_type: &str,
        model_version: &str,
        training_rows: i64,
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM ModelMetadata").execute(&mut *tx).await?;
        sqlx::query(
            "INSERT INTO ModelMetadata (model_type, model_version, trained_at, training_rows)
             VALUES (?1, ?2, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'), ?3)",
        )
        .bind(model_type)
        .bind(model_version)
        .bind(training_rows)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_model_metadata(&self) -> Result<Option<ModelMetadata>, StorageError> {
        let row = sqlx::query(
            "SELECT model_type, model_version, trained_at, training_rows
             FROM ModelMetadata ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| {
            let trained_at: String = r.get("trained_at");
            ModelMetadata {
                model_type: r.get("model_type"),
                model_version: r.get("model_version"),
                trained_at: parse_sqlite_timestamp(&trained_at),
                training_rows: r.get("training_rows"),
            }
        }))
    }

    pub async fn save_forecast_output(
        &self,
        forecast_date: &str,
        time_slot: &str,
        historical_count: i64,
        demand_intensity_score: f64,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO DemandForecastLogs (forecast_date, time_slot, historical_count, demand_intensity_score)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(forecast_date)
        .bind(time_slot)
        .bind(historical_count)
        .bind(demand_intensity_score)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// All-or-nothing write of one solved allocation: forecast rows, then
    /// allocation logs, then request-status flips, committed as a single
    /// transaction (spec.md §7 partial-failure policy).
    pub async fn persist_allocation_outputs(
        &self,
        forecast_date: &str,
        forecasts: &[DemandForecast],
        allocations: &[AllocationDecision],
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        for forecast in forecasts {
            sqlx::query(
                "INSERT INTO DemandForecastLogs (forecast_date, time_slot, historical_count, demand_intensity_score)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(forecast_date)
            .bind(&forecast.time_slot)
            .bind(forecast.historical_count)
            .bind(forecast.demand_intensity_score)
            .execute(&mut *tx)
            .await?;
        }

        for decision in allocations {
            sqlx::query(
                "INSERT INTO AllocationLogs (request_id, room_id, allocation_score) VALUES (?1, ?2, ?3)",
            )
            .bind(decision.request_id)
            .bind(decision.room_id)
            .bind(decision.score)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE Requests SET status = 'ALLOCATED' WHERE id = ?1")
                .bind(decision.request_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

fn row_to_request(r: sqlx::sqlite::SqliteRow) -> Request {
    let status: String = r.get("status");
    Request {
        request_id: r.get("id"),
        requested_capacity: r.get("requested_capacity"),
        requested_date: r.get("requested_date"),
        requested_time_slot: r.get("requested_time_slot"),
        priority_weight: r.get("priority_weight"),
        stakeholder_id: r.get("stakeholder_id"),
        status: match status.as_str() {
            "ALLOCATED" => RequestStatus::Allocated,
            _ => RequestStatus::Pending,
        },
    }
}

fn parse_sqlite_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.fZ")
                .map(|naive| naive.and_utc())
                .unwrap_or_else(|_| Utc::now())
        })
}
