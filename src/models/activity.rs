// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava activity models: the raw API payload and the normalized table row.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Activity exactly as returned by the Strava API.
///
/// Strava adds fields over time, so the payload is kept as an untyped
/// JSON object and only the columns we store are picked out of it.
pub type RawActivity = serde_json::Value;

/// Normalized activity row stored in the `activities` table.
///
/// Numeric columns are `None` when Strava omitted the field or sent `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NormalizedActivityRow {
    /// Strava activity ID (primary key)
    pub activity_id: i64,
    /// Strava athlete ID (owner)
    pub athlete_id: Option<i64>,
    /// Activity name/title
    pub name: Option<String>,
    /// Sport type (Ride, Run, Hike, etc.)
    pub sport: Option<String>,
    /// Start time in UTC
    pub start_date: Option<DateTime<Utc>>,
    /// Calendar date in the athlete's local time zone
    pub date: Option<NaiveDate>,
    /// Distance in kilometres
    pub distance: Option<f64>,
    /// Moving time in minutes
    pub moving_time: Option<f64>,
    /// Elapsed time in minutes
    pub elapsed_time: Option<f64>,
    /// Average speed in m/s
    pub average_speed: Option<f64>,
    /// Max speed in m/s
    pub max_speed: Option<f64>,
    /// Total elevation gain in metres
    pub total_elevation_gain: Option<f64>,
    pub average_cadence: Option<f64>,
    /// Estimated kcal from work done (kJ)
    pub calories: Option<i64>,
    pub has_heartrate: bool,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    /// Highest elevation in metres
    pub elev_high: Option<f64>,
    /// Lowest elevation in metres
    pub elev_low: Option<f64>,
    /// Average pace, e.g. "5:00/km"
    pub pace: Option<String>,
}

/// Column order shared by the SQL statements and the CSV export.
pub const COLUMNS: &[&str] = &[
    "activity_id",
    "athlete_id",
    "name",
    "sport",
    "start_date",
    "date",
    "distance",
    "moving_time",
    "elapsed_time",
    "average_speed",
    "max_speed",
    "total_elevation_gain",
    "average_cadence",
    "calories",
    "has_heartrate",
    "average_heartrate",
    "max_heartrate",
    "elev_high",
    "elev_low",
    "pace",
];
