// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client for token exchange and activity fetching.
//!
//! Handles:
//! - Refresh-token → access-token exchange
//! - Paginated activity listing (bulk mode)
//! - Single activity lookup by ID (webhook mode)
//!
//! Nothing here retries. Callers that want backoff can wrap the
//! [`TokenExchanger`] and [`ActivityFetcher`] traits.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::RawActivity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// OAuth credentials for the athlete being synced.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl Credentials {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client_id: config.strava_client_id.clone(),
            client_secret: config.strava_client_secret.clone(),
            refresh_token: config.strava_refresh_token.clone(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Short-lived bearer token. Lives only for one pipeline run.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Exchanges a refresh token for an access token.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self, credentials: &Credentials) -> Result<AccessToken>;
}

/// Reads activities from the Strava API.
#[async_trait]
pub trait ActivityFetcher: Send + Sync {
    /// Fetch one page of the athlete's activity list.
    async fn list_page(
        &self,
        access_token: &str,
        page: u32,
        per_page: u32,
        after: Option<i64>,
    ) -> Result<Vec<RawActivity>>;

    /// Fetch a single activity. A 404 maps to [`AppError::NotFound`].
    async fn get_activity(&self, access_token: &str, activity_id: i64) -> Result<RawActivity>;
}

/// Options for bulk fetching.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Only activities that started after this instant.
    pub after: Option<DateTime<Utc>>,
    pub per_page: u32,
    /// Hard stop on the number of page requests.
    pub max_pages: u32,
}

impl FetchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            after: None,
            per_page: config.per_page,
            max_pages: config.max_pages,
        }
    }
}

/// Fetch the full activity history, page by page.
///
/// Stops at the first empty page or after `max_pages` requests, whichever
/// comes first. Pages are concatenated in the order Strava returned them.
pub async fn fetch_all(
    fetcher: &dyn ActivityFetcher,
    access_token: &str,
    options: &FetchOptions,
) -> Result<Vec<RawActivity>> {
    let after = options.after.map(|dt| dt.timestamp());
    let mut activities = Vec::new();

    for page in 1..=options.max_pages {
        let batch = fetcher
            .list_page(access_token, page, options.per_page, after)
            .await?;

        tracing::debug!(page, count = batch.len(), "Fetched activity page");

        if batch.is_empty() {
            return Ok(activities);
        }
        activities.extend(batch);
    }

    tracing::warn!(
        max_pages = options.max_pages,
        fetched = activities.len(),
        "Stopped fetching at page limit; history may be incomplete"
    );
    Ok(activities)
}

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    oauth_url: String,
}

impl StravaClient {
    /// Create a new Strava client against the given endpoints.
    pub fn new(base_url: impl Into<String>, oauth_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            oauth_url: oauth_url.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.strava_api_url, &config.strava_oauth_url)
    }
}

/// Token refresh response from Strava.
#[derive(Debug, Clone, Deserialize)]
struct TokenRefreshResponse {
    access_token: String,
    expires_at: i64,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[async_trait]
impl TokenExchanger for StravaClient {
    async fn exchange(&self, credentials: &Credentials) -> Result<AccessToken> {
        tracing::debug!(client_id = %credentials.client_id, "Requesting access token");

        let response = self
            .http
            .post(&self.oauth_url)
            .form(&[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("refresh_token", credentials.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        if !(200..300).contains(&status) {
            tracing::error!(status, body = %body, "Strava token exchange failed");
            return Err(AppError::Auth { status, body });
        }

        let parsed: TokenRefreshResponse = match serde_json::from_str(&body) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(status, error = %e, "Malformed token response");
                return Err(AppError::Auth { status, body });
            }
        };

        let Some(expires_at) = DateTime::from_timestamp(parsed.expires_at, 0) else {
            tracing::error!(expires_at = parsed.expires_at, "Token expiry out of range");
            return Err(AppError::Auth { status, body });
        };

        if parsed
            .refresh_token
            .as_deref()
            .is_some_and(|t| t != credentials.refresh_token)
        {
            tracing::warn!("Strava rotated the refresh token; update STRAVA_REFRESH_TOKEN");
        }

        tracing::info!(expires_at = %expires_at, "Access token received");
        Ok(AccessToken {
            access_token: parsed.access_token,
            expires_at,
        })
    }
}

#[async_trait]
impl ActivityFetcher for StravaClient {
    async fn list_page(
        &self,
        access_token: &str,
        page: u32,
        per_page: u32,
        after: Option<i64>,
    ) -> Result<Vec<RawActivity>> {
        let url = format!("{}/athlete/activities", self.base_url);

        let mut query = vec![
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await?;

        check_response_json(response).await
    }

    async fn get_activity(&self, access_token: &str, activity_id: i64) -> Result<RawActivity> {
        let url = format!("{}/activities/{}", self.base_url, activity_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(activity_id));
        }

        let activity: RawActivity = check_response_json(response).await?;
        if !activity.is_object() {
            return Err(AppError::Fetch {
                status: 200,
                body: activity.to_string(),
            });
        }
        Ok(activity)
    }
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status().as_u16();
    let body = response.text().await?;

    if !(200..300).contains(&status) {
        if status == 429 {
            tracing::warn!("Strava rate limit hit (429)");
        }
        return Err(AppError::Fetch { status, body });
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::error!(status, error = %e, "Failed to parse Strava response");
        AppError::Fetch { status, body }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves `full_pages` pages of `per_page` activities, then empty pages.
    struct PagedFetcher {
        full_pages: u32,
        requested: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl ActivityFetcher for PagedFetcher {
        async fn list_page(
            &self,
            _access_token: &str,
            page: u32,
            per_page: u32,
            _after: Option<i64>,
        ) -> Result<Vec<RawActivity>> {
            self.requested.lock().unwrap().push(page);
            if page > self.full_pages {
                return Ok(Vec::new());
            }
            Ok((0..per_page)
                .map(|i| json!({"id": (page * 1000 + i) as i64}))
                .collect())
        }

        async fn get_activity(&self, _access_token: &str, activity_id: i64) -> Result<RawActivity> {
            Err(AppError::NotFound(activity_id))
        }
    }

    #[tokio::test]
    async fn test_fetch_all_stops_on_empty_page() {
        let fetcher = PagedFetcher {
            full_pages: 3,
            requested: Mutex::new(Vec::new()),
        };
        let options = FetchOptions {
            after: None,
            per_page: 5,
            max_pages: 100,
        };

        let activities = fetch_all(&fetcher, "token", &options).await.unwrap();

        assert_eq!(activities.len(), 15);
        assert_eq!(*fetcher.requested.lock().unwrap(), vec![1, 2, 3, 4]);
        // Vendor order is preserved across pages.
        assert_eq!(activities[0]["id"], 1000);
        assert_eq!(activities[5]["id"], 2000);
        assert_eq!(activities[14]["id"], 3004);
    }

    #[tokio::test]
    async fn test_fetch_all_respects_max_pages() {
        let fetcher = PagedFetcher {
            full_pages: 10,
            requested: Mutex::new(Vec::new()),
        };
        let options = FetchOptions {
            after: None,
            per_page: 2,
            max_pages: 3,
        };

        let activities = fetch_all(&fetcher, "token", &options).await.unwrap();

        assert_eq!(activities.len(), 6);
        assert_eq!(*fetcher.requested.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let creds = Credentials {
            client_id: "123".to_string(),
            client_secret: "shh".to_string(),
            refresh_token: "also-shh".to_string(),
        };
        let debug = format!("{:?}", creds);
        assert!(debug.contains("123"));
        assert!(!debug.contains("shh"));
    }
}
