// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! CSV export of stored activities.

use crate::error::{AppError, Result};
use crate::models::activity::{NormalizedActivityRow, COLUMNS};
use crate::time_utils::format_utc_rfc3339;
use std::io::Write;

/// Write rows as CSV with a header line. Missing values become empty cells.
///
/// Returns the number of data rows written.
pub fn write_csv<W: Write>(rows: &[NormalizedActivityRow], writer: W) -> Result<usize> {
    let mut csv = csv::Writer::from_writer(writer);

    csv.write_record(COLUMNS).map_err(csv_error)?;
    for row in rows {
        csv.write_record(record(row)).map_err(csv_error)?;
    }
    csv.flush()
        .map_err(|e| AppError::Internal(anyhow::Error::from(e)))?;

    Ok(rows.len())
}

fn csv_error(err: csv::Error) -> AppError {
    AppError::Internal(anyhow::Error::from(err))
}

fn record(row: &NormalizedActivityRow) -> Vec<String> {
    vec![
        row.activity_id.to_string(),
        cell(&row.athlete_id),
        cell(&row.name),
        cell(&row.sport),
        row.start_date.map(format_utc_rfc3339).unwrap_or_default(),
        cell(&row.date),
        cell(&row.distance),
        cell(&row.moving_time),
        cell(&row.elapsed_time),
        cell(&row.average_speed),
        cell(&row.max_speed),
        cell(&row.total_elevation_gain),
        cell(&row.average_cadence),
        cell(&row.calories),
        row.has_heartrate.to_string(),
        cell(&row.average_heartrate),
        cell(&row.max_heartrate),
        cell(&row.elev_high),
        cell(&row.elev_low),
        cell(&row.pace),
    ]
}

fn cell<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(T::to_string).unwrap_or_default()
}
