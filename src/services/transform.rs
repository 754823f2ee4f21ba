// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Normalization of raw Strava activities into table rows.
//!
//! Everything here is pure: the same raw activity always produces the
//! same row, and nothing outside the input is consulted.

use crate::error::{AppError, Result};
use crate::models::{NormalizedActivityRow, RawActivity};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// kcal per 1000 kJ of mechanical work (0.239 kcal/kJ), as used by
/// Strava's own estimate.
const KCAL_PER_KJ_MILLI: f64 = 239.0;

/// Normalize a single activity.
///
/// Only `id` is required. Every other column becomes `None` when the field
/// is missing, `null`, or cannot be coerced to the column type.
pub fn transform(raw: &RawActivity) -> Result<NormalizedActivityRow> {
    let activity_id = raw
        .get("id")
        .and_then(as_i64)
        .ok_or_else(|| AppError::Schema("activity is missing integer field `id`".to_string()))?;

    let average_speed = number(raw, "average_speed").map(|v| round_to(v, 2));

    Ok(NormalizedActivityRow {
        activity_id,
        athlete_id: raw.get("athlete").and_then(|a| a.get("id")).and_then(as_i64),
        name: string(raw, "name"),
        sport: string(raw, "sport_type").or_else(|| string(raw, "type")),
        start_date: raw
            .get("start_date")
            .and_then(Value::as_str)
            .and_then(parse_timestamp),
        date: raw
            .get("start_date_local")
            .and_then(Value::as_str)
            .and_then(parse_local_date),
        distance: number(raw, "distance").map(|m| round_to(m / 1000.0, 2)),
        moving_time: number(raw, "moving_time").map(|s| round_to(s / 60.0, 2)),
        elapsed_time: number(raw, "elapsed_time").map(|s| round_to(s / 60.0, 2)),
        average_speed,
        max_speed: number(raw, "max_speed").map(|v| round_to(v, 2)),
        total_elevation_gain: number(raw, "total_elevation_gain").map(|v| round_to(v, 2)),
        average_cadence: number(raw, "average_cadence").map(|v| round_to(v, 2)),
        calories: number(raw, "kilojoules").map(kilojoules_to_kcal),
        has_heartrate: raw
            .get("has_heartrate")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        average_heartrate: number(raw, "average_heartrate").map(|v| round_to(v, 1)),
        max_heartrate: number(raw, "max_heartrate").map(|v| round_to(v, 1)),
        elev_high: number(raw, "elev_high").map(|v| round_to(v, 2)),
        elev_low: number(raw, "elev_low").map(|v| round_to(v, 2)),
        pace: average_speed.and_then(format_pace),
    })
}

/// Normalize a batch, failing on the first activity without an `id`.
pub fn transform_all(raws: &[RawActivity]) -> Result<Vec<NormalizedActivityRow>> {
    raws.iter().map(transform).collect()
}

/// Format a speed in m/s as a running pace, e.g. `3.33` → `"5:00/km"`.
///
/// Returns `None` for zero, negative, or non-finite speeds.
pub fn format_pace(speed_m_per_s: f64) -> Option<String> {
    if !speed_m_per_s.is_finite() || speed_m_per_s <= 0.0 {
        return None;
    }

    let minutes_per_km = 1000.0 / (speed_m_per_s * 60.0);
    let mut minutes = minutes_per_km.trunc() as u64;
    let mut seconds = ((minutes_per_km - minutes_per_km.trunc()) * 60.0).round() as u64;

    if seconds == 60 {
        minutes += 1;
        seconds = 0;
    }

    Some(format!("{}:{:02}/km", minutes, seconds))
}

fn kilojoules_to_kcal(kj: f64) -> i64 {
    // Integer multiplier keeps x.5 products exact before rounding.
    (kj * KCAL_PER_KJ_MILLI / 1000.0).round() as i64
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn number(raw: &Value, key: &str) -> Option<f64> {
    let value = match raw.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

fn string(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Strava's `start_date_local` carries a bogus `Z`; the wall-clock date is
/// what we want, so the offset is ignored.
fn parse_local_date(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local().date());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.date());
    }
    NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok()
}
