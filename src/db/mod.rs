// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: the `activities` table behind an upsert-capable store.
//!
//! Two sqlx backends share the same SQL shape:
//! - PostgreSQL for production
//! - SQLite for local runs and tests

/// Bind every column of `row` to an upsert query, in [`COLUMNS`] order.
macro_rules! bind_row {
    ($query:expr, $row:ident) => {
        $query
            .bind($row.activity_id)
            .bind($row.athlete_id)
            .bind($row.name.clone())
            .bind($row.sport.clone())
            .bind($row.start_date)
            .bind($row.date)
            .bind($row.distance)
            .bind($row.moving_time)
            .bind($row.elapsed_time)
            .bind($row.average_speed)
            .bind($row.max_speed)
            .bind($row.total_elevation_gain)
            .bind($row.average_cadence)
            .bind($row.calories)
            .bind($row.has_heartrate)
            .bind($row.average_heartrate)
            .bind($row.max_heartrate)
            .bind($row.elev_high)
            .bind($row.elev_low)
            .bind($row.pace.clone())
    };
}

pub mod postgres;
pub mod sqlite;

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

use crate::error::{AppError, Result};
use crate::models::activity::{NormalizedActivityRow, COLUMNS};
use async_trait::async_trait;
use std::sync::Arc;

/// Table names as constants.
pub mod tables {
    pub const ACTIVITIES: &str = "activities";
}

/// Persistent store for normalized activities, keyed by `activity_id`.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Create the `activities` table if it does not exist.
    async fn migrate(&self) -> Result<()>;

    /// Insert-or-update every row in one transaction.
    ///
    /// Either the whole batch commits or nothing does. Returns the number
    /// of rows written.
    async fn upsert_batch(&self, rows: &[NormalizedActivityRow]) -> Result<u64>;

    async fn get(&self, activity_id: i64) -> Result<Option<NormalizedActivityRow>>;

    /// Delete a row. Returns whether a row was removed.
    async fn delete(&self, activity_id: i64) -> Result<bool>;

    async fn count(&self) -> Result<i64>;

    /// All rows, oldest first.
    async fn list_all(&self) -> Result<Vec<NormalizedActivityRow>>;
}

/// Open a store for the given sqlx URL, picking the backend from the scheme.
pub async fn connect(database_url: &str) -> Result<Arc<dyn ActivityStore>> {
    if database_url.starts_with("sqlite:") {
        Ok(Arc::new(SqliteStore::connect(database_url).await?))
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://")
    {
        Ok(Arc::new(PostgresStore::connect(database_url).await?))
    } else {
        Err(AppError::Load(
            "Unsupported database URL (expected postgres:// or sqlite:)".to_string(),
        ))
    }
}

/// Placeholder style of the target database.
#[derive(Clone, Copy)]
enum Placeholder {
    /// `$1, $2, …`
    Dollar,
    /// `?1, ?2, …`
    Question,
}

/// Build the `INSERT … ON CONFLICT DO UPDATE` statement for one row.
fn upsert_sql(style: Placeholder) -> String {
    let placeholders: Vec<String> = (1..=COLUMNS.len())
        .map(|i| match style {
            Placeholder::Dollar => format!("${}", i),
            Placeholder::Question => format!("?{}", i),
        })
        .collect();

    let updates: Vec<String> = COLUMNS
        .iter()
        .filter(|c| **c != "activity_id")
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT (activity_id) DO UPDATE SET {}",
        tables::ACTIVITIES,
        COLUMNS.join(", "),
        placeholders.join(", "),
        updates.join(", ")
    )
}

fn select_sql() -> String {
    format!("SELECT {} FROM {}", COLUMNS.join(", "), tables::ACTIVITIES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_sql_updates_every_non_key_column() {
        let sql = upsert_sql(Placeholder::Dollar);
        assert!(sql.starts_with("INSERT INTO activities (activity_id, athlete_id,"));
        assert!(sql.contains("$20)"));
        assert!(sql.contains("ON CONFLICT (activity_id) DO UPDATE SET athlete_id = EXCLUDED.athlete_id"));
        assert!(sql.ends_with("pace = EXCLUDED.pace"));
        assert!(!sql.contains("activity_id = EXCLUDED.activity_id"));
    }

    #[test]
    fn test_upsert_sql_sqlite_placeholders() {
        let sql = upsert_sql(Placeholder::Question);
        assert!(sql.contains("VALUES (?1, ?2,"));
        assert!(!sql.contains('$'));
    }

    #[tokio::test]
    async fn test_connect_rejects_unknown_scheme() {
        assert!(matches!(
            connect("mysql://localhost/db").await,
            Err(AppError::Load(_))
        ));
    }
}
