// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! strava-etl: copy Strava activities into a relational table
//!
//! This crate provides the batch sync pipeline (token exchange, paginated
//! fetch, normalization, transactional upsert) and the webhook server that
//! keeps the table current as athletes record new activities.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::TasksService;

/// Shared application state for the webhook server.
pub struct AppState {
    pub config: Config,
    pub tasks: TasksService,
}
