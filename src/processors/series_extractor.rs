use crate::error::{ProcessingError, Result};
use crate::models::{ResampleRule, SeriesPoint};
use crate::readers::SampledTable;
use crate::utils::{parse_number, parse_timestamp};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SeriesRequest {
    pub value_column: String,
    pub time_column: String,
    pub resample: Option<ResampleRule>,
}

pub struct SeriesExtractor;

impl SeriesExtractor {
    /// Build an ascending `(timestamp, value)` series from explicitly named
    /// columns. An empty series is an error.
    pub fn extract(table: &SampledTable, request: &SeriesRequest) -> Result<Vec<SeriesPoint>> {
        let value_index = table.require_column(&request.value_column)?;
        let time_index = table.require_column(&request.time_column)?;

        let mut points: Vec<SeriesPoint> = table
            .rows
            .iter()
            .filter_map(|row| {
                let timestamp = parse_timestamp(table.cell(row, time_index))?;
                let value = parse_number(table.cell(row, value_index))?;
                Some(SeriesPoint { timestamp, value })
            })
            .collect();

        if points.is_empty() {
            return Err(ProcessingError::ComputeFailure(format!(
                "No rows with both a valid '{}' time and numeric '{}' value",
                request.time_column, request.value_column
            )));
        }

        points.sort_by_key(|p| p.timestamp);

        let series = match request.resample {
            Some(rule) => resample_mean(&points, rule),
            None => points,
        };

        debug!(
            "Built series of {} points from {} rows (resample={:?})",
            series.len(),
            table.len(),
            request.resample
        );

        Ok(series)
    }
}

/// Mean of each bucket, one point per non-empty bucket in ascending order
pub fn resample_mean(points: &[SeriesPoint], rule: ResampleRule) -> Vec<SeriesPoint> {
    let mut buckets: BTreeMap<DateTime<Utc>, (f64, usize)> = BTreeMap::new();
    for point in points {
        let entry = buckets
            .entry(rule.bucket_start(&point.timestamp))
            .or_insert((0.0, 0));
        entry.0 += point.value;
        entry.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(timestamp, (sum, count))| SeriesPoint {
            timestamp,
            value: sum / count as f64,
        })
        .collect()
}
