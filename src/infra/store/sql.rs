use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

use crate::position::{PositionEvent, PositionRecord};
use crate::services::position_store::{PositionStore, StoreError, TABLE_NAME};

const SCHEMA: &str = include_str!("schema.sql");

const COLUMNS: &str = "line_id, line_name, station_id, station_name, train_number, \
     last_received_date, last_received_time, direction_type, destination_station_id, \
     destination_station_name, train_status_code, is_express, is_last_train";

/// Position table in a SQLite database.
///
/// Holds exactly one connection for the life of the process; a lost
/// connection surfaces as a [`StoreError::Database`] and is not retried.
pub struct SqlStore {
    pool: SqlitePool,
}

impl SqlStore {
    /// Opens (creating if needed) the database at `url` and ensures the schema.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        info!(url, "Connected to position database");
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {TABLE_NAME}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn event_from_row(row: &SqliteRow) -> Result<PositionEvent, StoreError> {
    let created_at: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|source| StoreError::Timestamp {
            value: created_at.clone(),
            source,
        })?
        .with_timezone(&Utc);

    let direction_type: i64 = row.try_get("direction_type")?;
    let train_status_code: Option<i64> = row.try_get("train_status_code")?;
    let is_express: i64 = row.try_get("is_express")?;
    let is_last_train: i64 = row.try_get("is_last_train")?;

    Ok(PositionEvent {
        record: PositionRecord {
            line_id: row.try_get("line_id")?,
            line_name: row.try_get("line_name")?,
            station_id: row.try_get("station_id")?,
            station_name: row.try_get("station_name")?,
            train_number: row.try_get("train_number")?,
            last_received_date: row.try_get("last_received_date")?,
            last_received_time: row.try_get("last_received_time")?,
            direction_type: direction_type as i32,
            destination_station_id: row.try_get("destination_station_id")?,
            destination_station_name: row.try_get("destination_station_name")?,
            train_status_code: train_status_code.map(|c| c as i32),
            is_express: is_express != 0,
            is_last_train: is_last_train != 0,
        },
        created_at,
    })
}

#[async_trait]
impl PositionStore for SqlStore {
    async fn insert_positions(&self, records: &[PositionRecord]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("INSERT INTO {TABLE_NAME} ({COLUMNS}) "));

        builder.push_values(records, |mut row, r| {
            row.push_bind(r.line_id.clone())
                .push_bind(r.line_name.clone())
                .push_bind(r.station_id.clone())
                .push_bind(r.station_name.clone())
                .push_bind(r.train_number.clone())
                .push_bind(r.last_received_date.clone())
                .push_bind(r.last_received_time.clone())
                .push_bind(r.direction_type)
                .push_bind(r.destination_station_id.clone())
                .push_bind(r.destination_station_name.clone())
                .push_bind(r.train_status_code)
                .push_bind(r.is_express)
                .push_bind(r.is_last_train);
        });

        let result = builder.build().execute(&self.pool).await?;
        debug!(rows = result.rows_affected(), "Inserted position batch");
        Ok(result.rows_affected() as usize)
    }

    async fn fetch_recent(
        &self,
        line_id: &str,
        limit: usize,
    ) -> Result<Vec<PositionEvent>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS}, created_at FROM {TABLE_NAME} \
             WHERE line_id = ? ORDER BY created_at DESC, id DESC LIMIT ?"
        ))
        .bind(line_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(event_from_row).collect()
    }
}
