// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PostgreSQL-backed activity store (production).

use super::{select_sql, tables, upsert_sql, ActivityStore, Placeholder};
use crate::error::{AppError, Result};
use crate::models::NormalizedActivityRow;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// PostgreSQL activity store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    upsert_sql: String,
}

impl PostgresStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(url)
            .await
            .map_err(|e| AppError::Load(format!("Failed to connect to PostgreSQL: {}", e)))?;

        tracing::info!("Connected to PostgreSQL");
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            upsert_sql: upsert_sql(Placeholder::Dollar),
        }
    }
}

#[async_trait]
impl ActivityStore for PostgresStore {
    async fn migrate(&self) -> Result<()> {
        let sql = format!(
            r"
            CREATE TABLE IF NOT EXISTS {} (
                activity_id BIGINT PRIMARY KEY,
                athlete_id BIGINT,
                name TEXT,
                sport TEXT,
                start_date TIMESTAMPTZ,
                date DATE,
                distance DOUBLE PRECISION,
                moving_time DOUBLE PRECISION,
                elapsed_time DOUBLE PRECISION,
                average_speed DOUBLE PRECISION,
                max_speed DOUBLE PRECISION,
                total_elevation_gain DOUBLE PRECISION,
                average_cadence DOUBLE PRECISION,
                calories BIGINT,
                has_heartrate BOOLEAN NOT NULL DEFAULT FALSE,
                average_heartrate DOUBLE PRECISION,
                max_heartrate DOUBLE PRECISION,
                elev_high DOUBLE PRECISION,
                elev_low DOUBLE PRECISION,
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
        tracing::debug!(rows = rows.len(), "PostgreSQL batch committed");
        Ok(written)
    }

    async fn get(&self, activity_id: i64) -> Result<Option<NormalizedActivityRow>> {
        let sql = format!("{} WHERE activity_id = $1", select_sql());
        let row = sqlx::query_as::<_, NormalizedActivityRow>(&sql)
            .bind(activity_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete(&self, activity_id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE activity_id = $1", tables::ACTIVITIES);
        let result = sqlx::query(&sql).bind(activity_id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", tables::ACTIVITIES);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn list_all(&self) -> Result<Vec<NormalizedActivityRow>> {
        let sql = format!(
            "{} ORDER BY start_date NULLS FIRST, activity_id",
            select_sql()
        );
        let rows = sqlx::query_as::<_, NormalizedActivityRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
