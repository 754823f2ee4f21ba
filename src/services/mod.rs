// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod export;
pub mod pipeline;
pub mod strava;
pub mod tasks;
pub mod transform;

pub use pipeline::{Pipeline, SyncReport};
pub use strava::{ActivityFetcher, Credentials, FetchOptions, StravaClient, TokenExchanger};
pub use tasks::{SyncJob, TasksService};
