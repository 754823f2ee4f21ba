// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity sync pipeline.
//!
//! Handles the core workflow:
//! 1. Exchange the refresh token for an access token
//! 2. Fetch activities from Strava (all pages, or one by ID)
//! 3. Normalize them into table rows
//! 4. Upsert the rows in a single transaction

use crate::config::Config;
use crate::db::ActivityStore;
use crate::error::Result;
use crate::models::NormalizedActivityRow;
use crate::services::strava::{
    fetch_all, ActivityFetcher, Credentials, FetchOptions, StravaClient, TokenExchanger,
};
use crate::services::transform::{transform, transform_all};
use std::sync::Arc;

/// Wires token exchange, fetching, normalization and loading together.
pub struct Pipeline {
    credentials: Credentials,
    exchanger: Arc<dyn TokenExchanger>,
    fetcher: Arc<dyn ActivityFetcher>,
    store: Arc<dyn ActivityStore>,
}

/// Outcome of a bulk sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Activities returned by Strava
    pub fetched: usize,
    /// Rows written to the store
    pub loaded: u64,
}

impl Pipeline {
    pub fn new(
        credentials: Credentials,
        exchanger: Arc<dyn TokenExchanger>,
        fetcher: Arc<dyn ActivityFetcher>,
        store: Arc<dyn ActivityStore>,
    ) -> Self {
        Self {
            credentials,
            exchanger,
            fetcher,
            store,
        }
    }

    /// Pipeline talking to the real Strava API.
    pub fn from_config(config: &Config, store: Arc<dyn ActivityStore>) -> Self {
        let client = Arc::new(StravaClient::from_config(config));
        Self::new(
            Credentials::from_config(config),
            client.clone(),
            client,
            store,
        )
    }

    /// Bulk path: fetch every page, normalize, and load as one batch.
    pub async fn sync(&self, options: &FetchOptions) -> Result<SyncReport> {
        tracing::info!(
            after = ?options.after,
            per_page = options.per_page,
            max_pages = options.max_pages,
            "Starting bulk sync"
        );

        let token = self.exchanger.exchange(&self.credentials).await?;
        let raws = fetch_all(self.fetcher.as_ref(), &token.access_token, options).await?;
        let rows = transform_all(&raws)?;
        let loaded = self.store.upsert_batch(&rows).await?;

        let report = SyncReport {
            fetched: raws.len(),
            loaded,
        };
        tracing::info!(fetched = report.fetched, loaded = report.loaded, "Bulk sync complete");
        Ok(report)
    }

    /// Single path: fetch one activity by ID and upsert it.
    ///
    /// Safe to repeat for the same ID; the row is overwritten, never duplicated.
    pub async fn sync_one(&self, activity_id: i64) -> Result<NormalizedActivityRow> {
        tracing::info!(activity_id, "Syncing activity");

        let token = self.exchanger.exchange(&self.credentials).await?;
        let raw = self
            .fetcher
            .get_activity(&token.access_token, activity_id)
            .await?;
        let row = transform(&raw)?;
        self.store.upsert_batch(std::slice::from_ref(&row)).await?;

        tracing::info!(activity_id, sport = ?row.sport, "Activity stored");
        Ok(row)
    }

    /// Remove an activity from the store.
    pub async fn remove(&self, activity_id: i64) -> Result<bool> {
        let removed = self.store.delete(activity_id).await?;
        if removed {
            tracing::info!(activity_id, "Activity deleted");
        } else {
            tracing::debug!(activity_id, "Activity to delete was not stored");
        }
        Ok(removed)
    }
}
