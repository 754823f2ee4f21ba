// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SQLite-backed activity store (local runs and tests).

use super::{select_sql, tables, upsert_sql, ActivityStore, Placeholder};
use crate::error::{AppError, Result};
use crate::models::NormalizedActivityRow;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// SQLite activity store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    upsert_sql: String,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url`.
    ///
    /// `sqlite::memory:` databases live on a single pinned connection, since
    /// every new connection would otherwise see its own empty database.
    pub async fn connect(url: &str) -> Result<Self> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| AppError::Load(format!("Failed to open SQLite database: {}", e)))?;

        tracing::info!(in_memory, "Connected to SQLite");
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            upsert_sql: upsert_sql(Placeholder::Question),
        }
    }

    /// Underlying pool, for tests that need to reach past the store.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ActivityStore for SqliteStore {
    async fn migrate(&self) -> Result<()> {
        let sql = format!(
            r"
            CREATE TABLE IF NOT EXISTS {} (
                activity_id INTEGER PRIMARY KEY NOT NULL,
                athlete_id INTEGER,
                name TEXT,
                sport TEXT,
                start_date TEXT,
                date TEXT,
                distance REAL,
                moving_time REAL,
                elapsed_time REAL,
                average_speed REAL,
                max_speed REAL,
                total_elevation_gain REAL,
                average_cadence REAL,
                calories INTEGER,
                has_heartrate BOOLEAN NOT NULL DEFAULT 0,
                average_heartrate REAL,
                max_heartrate REAL,
                elev_high REAL,
                elev_low REAL,
                pace TEXT
            )
            ",
            tables::ACTIVITIES
        );

        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn upsert_batch(&self, rows: &[NormalizedActivityRow]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        // Dropping `tx` on any early return rolls the whole batch back.
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for row in rows {
            let result = bind_row!(sqlx::query(&self.upsert_sql), row)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::Load(format!(
                        "Upsert of activity {} failed: {}",
                        row.activity_id, e
                    ))
                })?;
            written += result.rows_affected();
        }

        tx.commit().await?;
        tracing::debug!(rows = rows.len(), "SQLite batch committed");
        Ok(written)
    }

    async fn get(&self, activity_id: i64) -> Result<Option<NormalizedActivityRow>> {
        let sql = format!("{} WHERE activity_id = ?1", select_sql());
        let row = sqlx::query_as::<_, NormalizedActivityRow>(&sql)
            .bind(activity_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete(&self, activity_id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE activity_id = ?1", tables::ACTIVITIES);
        let result = sqlx::query(&sql).bind(activity_id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", tables::ACTIVITIES);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn list_all(&self) -> Result<Vec<NormalizedActivityRow>> {
        let sql = format!("{} ORDER BY start_date, activity_id", select_sql());
        let rows = sqlx::query_as::<_, NormalizedActivityRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
