// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use strava_etl::config::Config;
use strava_etl::db::{ActivityStore, SqliteStore};
use strava_etl::error::{AppError, Result};
use strava_etl::models::{NormalizedActivityRow, RawActivity};
use strava_etl::routes::create_router;
use strava_etl::services::strava::AccessToken;
use strava_etl::services::{
    ActivityFetcher, Credentials, Pipeline, SyncJob, TasksService, TokenExchanger,
};
use strava_etl::AppState;
use tokio::sync::mpsc::UnboundedReceiver;

/// Check if a PostgreSQL test database is configured.
#[allow(dead_code)]
pub fn postgres_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL").ok()
}

/// Skip test with message if PostgreSQL is not available.
#[macro_export]
macro_rules! require_postgres {
    () => {
        match crate::common::postgres_url() {
            Some(url) => url,
            None => {
                eprintln!("⚠️  Skipping: TEST_DATABASE_URL not set");
                return;
            }
        }
    };
}

/// A Strava-shaped activity payload.
#[allow(dead_code)]
pub fn raw_activity(id: i64) -> RawActivity {
    json!({
        "resource_state": 2,
        "athlete": {"id": 12345, "resource_state": 1},
        "id": id,
        "name": format!("Activity {}", id),
        "distance": 10000.0,
        "moving_time": 3000,
        "elapsed_time": 3300,
        "total_elevation_gain": 120.5,
        "type": "Run",
        "sport_type": "Run",
        "start_date": "2024-06-01T14:00:00Z",
        "start_date_local": "2024-06-01T07:00:00Z",
        "timezone": "(GMT-08:00) America/Los_Angeles",
        "average_speed": 3.33,
        "max_speed": 4.8,
        "has_heartrate": false,
        "kudos_count": 4,
        "map": {"id": "a1", "summary_polyline": "}_ilFnyrjV", "resource_state": 2}
    })
}

/// Normalized row with a given ID and name.
#[allow(dead_code)]
pub fn row(id: i64, name: &str) -> NormalizedActivityRow {
    let mut raw = raw_activity(id);
    raw["name"] = Value::String(name.to_string());
    strava_etl::services::transform::transform(&raw).expect("sample activity is valid")
}

/// Fresh in-memory SQLite store with the table created.
#[allow(dead_code)]
pub async fn test_store() -> SqliteStore {
    let store = SqliteStore::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");
    store.migrate().await.expect("Failed to create table");
    store
}

/// Token exchanger that always succeeds without network access.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeExchanger {
    pub calls: AtomicUsize,
}

#[async_trait]
impl TokenExchanger for FakeExchanger {
    async fn exchange(&self, _credentials: &Credentials) -> Result<AccessToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(AccessToken {
            access_token: "fake-access-token".to_string(),
            expires_at: Utc::now() + Duration::hours(6),
        })
    }
}

/// Fetcher backed by an in-memory map of activities, recording every call.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeFetcher {
    pub activities: HashMap<i64, RawActivity>,
    /// IDs whose lookup fails with the given HTTP status.
    pub failures: HashMap<i64, u16>,
    pub get_calls: Mutex<Vec<i64>>,
    pub list_calls: Mutex<Vec<u32>>,
}

#[allow(dead_code)]
impl FakeFetcher {
    pub fn with_activities(ids: &[i64]) -> Self {
        Self {
            activities: ids.iter().map(|id| (*id, raw_activity(*id))).collect(),
            ..Default::default()
        }
    }

    pub fn get_calls(&self) -> Vec<i64> {
        self.get_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActivityFetcher for FakeFetcher {
    async fn list_page(
        &self,
        _access_token: &str,
        page: u32,
        per_page: u32,
        _after: Option<i64>,
    ) -> Result<Vec<RawActivity>> {
        self.list_calls.lock().unwrap().push(page);
        let mut ids: Vec<i64> = self.activities.keys().copied().collect();
        ids.sort_unstable();
        let start = ((page - 1) * per_page) as usize;
        Ok(ids
            .iter()
            .skip(start)
            .take(per_page as usize)
            .map(|id| self.activities[id].clone())
            .collect())
    }

    async fn get_activity(&self, _access_token: &str, activity_id: i64) -> Result<RawActivity> {
        self.get_calls.lock().unwrap().push(activity_id);
        if let Some(status) = self.failures.get(&activity_id) {
            return Err(AppError::Fetch {
                status: *status,
                body: "Internal Server Error".to_string(),
            });
        }
        self.activities
            .get(&activity_id)
            .cloned()
            .ok_or(AppError::NotFound(activity_id))
    }
}

/// Store wrapper that counts upsert batches.
#[allow(dead_code)]
pub struct CountingStore {
    pub inner: SqliteStore,
    pub upserts: AtomicUsize,
}

#[allow(dead_code)]
impl CountingStore {
    pub fn new(inner: SqliteStore) -> Self {
        Self {
            inner,
            upserts: AtomicUsize::new(0),
        }
    }

    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActivityStore for CountingStore {
    async fn migrate(&self) -> Result<()> {
        self.inner.migrate().await
    }

    async fn upsert_batch(&self, rows: &[NormalizedActivityRow]) -> Result<u64> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert_batch(rows).await
    }

    async fn get(&self, activity_id: i64) -> Result<Option<NormalizedActivityRow>> {
        self.inner.get(activity_id).await
    }

    async fn delete(&self, activity_id: i64) -> Result<bool> {
        self.inner.delete(activity_id).await
    }

    async fn count(&self) -> Result<i64> {
        self.inner.count().await
    }

    async fn list_all(&self) -> Result<Vec<NormalizedActivityRow>> {
        self.inner.list_all().await
    }
}

/// Pipeline wired to fakes and an in-memory store.
#[allow(dead_code)]
pub struct TestPipeline {
    pub pipeline: Arc<Pipeline>,
    pub exchanger: Arc<FakeExchanger>,
    pub fetcher: Arc<FakeFetcher>,
    pub store: Arc<CountingStore>,
}

#[allow(dead_code)]
pub async fn test_pipeline(fetcher: FakeFetcher) -> TestPipeline {
    let config = Config::test_default();
    let exchanger = Arc::new(FakeExchanger::default());
    let fetcher = Arc::new(fetcher);
    let store = Arc::new(CountingStore::new(test_store().await));

    let pipeline = Arc::new(Pipeline::new(
        Credentials::from_config(&config),
        exchanger.clone(),
        fetcher.clone(),
        store.clone(),
    ));

    TestPipeline {
        pipeline,
        exchanger,
        fetcher,
        store,
    }
}

/// Create a test app without a worker attached.
/// Returns the router, the shared state, and the job receiver.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, UnboundedReceiver<SyncJob>) {
    let (tasks, receiver) = TasksService::new();
    let state = Arc::new(AppState {
        config: Config::test_default(),
        tasks,
    });

    (create_router(state.clone()), state, receiver)
}
