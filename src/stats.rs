//! Per-request records and their statistical reduction.
//!
//! Workers emit one [`RequestStat`] per attempted request. The reducer
//! [`create_requests_stats`] folds any sequence of them into a
//! [`RequestStatSummary`] without assuming any ordering; callers may hand it
//! a single target's stats or a flattened global slice.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use itertools::Itertools;
use serde::Serialize;

use crate::util::IntoAdjustedByte;

/// The saved information about an individual completed HTTP request.
#[derive(Clone, Debug, Serialize)]
pub struct RequestStat {
    /// Protocol of the exchange, e.g. `HTTP/1.1` or `HTTP/2.0`.
    pub proto: String,
    pub url: String,
    pub method: String,
    pub start_time: SystemTime,
    pub end_time: SystemTime,
    /// Equivalent to the difference between `start_time` and `end_time`.
    pub duration: Duration,
    /// HTTP status code, e.g. 200, 404, 503. Zero when the request failed
    /// before producing a response.
    pub status_code: u16,
    pub error: Option<String>,
    /// Head and body bytes sent plus head and body bytes received.
    pub data_transferred: u64,
}

impl RequestStat {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Aggregate statistical summary of a set of [`RequestStat`]s.
///
/// Extrema and averages cover non-error requests only; error requests
/// contribute to `error_count` and to the observed time window.
#[derive(Clone, Debug, Serialize)]
pub struct RequestStatSummary {
    /// Non-error requests per nanosecond of observed wall time.
    pub avg_rps: f64,
    pub avg_duration: Duration,
    pub min_duration: Duration,
    pub max_duration: Duration,
    /// Start of the earliest non-error request, or of the earliest request
    /// overall when every request failed.
    pub start_time: SystemTime,
    /// End of the latest non-error request, or of the latest request overall
    /// when every request failed.
    pub end_time: SystemTime,
    pub avg_data_transferred: u64,
    pub min_data_transferred: u64,
    pub max_data_transferred: u64,
    pub total_data_transferred: u64,
    /// Count of responses per status code.
    pub status_codes: HashMap<u16, u64>,
    pub error_count: u64,
}

impl Default for RequestStatSummary {
    fn default() -> Self {
        Self {
            avg_rps: 0.0,
            avg_duration: Duration::ZERO,
            min_duration: Duration::ZERO,
            max_duration: Duration::ZERO,
            start_time: UNIX_EPOCH,
            end_time: UNIX_EPOCH,
            avg_data_transferred: 0,
            min_data_transferred: 0,
            max_data_transferred: 0,
            total_data_transferred: 0,
            status_codes: HashMap::new(),
            error_count: 0,
        }
    }
}

/// Fold individual request stats into a statistical summary.
///
/// Order independent. Minimums initialize from the first non-error stat so
/// error requests (which carry zero bytes) never produce spurious zero
/// minima, and the window start/end cover non-error stats only. All-error
/// input has no such window and falls back to the extremes across every
/// stat.
pub fn create_requests_stats(stats: &[RequestStat]) -> RequestStatSummary {
    let Some(first) = stats.first() else {
        return RequestStatSummary::default();
    };

    let mut summary = RequestStatSummary::default();

    let mut observed_start = first.start_time;
    let mut observed_end = first.end_time;
    let mut total_duration = Duration::ZERO;
    let mut non_err_count: u64 = 0;
    for stat in stats {
        observed_start = observed_start.min(stat.start_time);
        observed_end = observed_end.max(stat.end_time);

        if stat.is_error() {
            summary.error_count += 1;
            continue;
        }
        if non_err_count == 0 {
            summary.min_duration = stat.duration;
            summary.max_duration = stat.duration;
            summary.min_data_transferred = stat.data_transferred;
            summary.max_data_transferred = stat.data_transferred;
            summary.start_time = stat.start_time;
            summary.end_time = stat.end_time;
        }
        non_err_count += 1;

        summary.min_duration = summary.min_duration.min(stat.duration);
        summary.max_duration = summary.max_duration.max(stat.duration);
        summary.min_data_transferred = summary.min_data_transferred.min(stat.data_transferred);
        summary.max_data_transferred = summary.max_data_transferred.max(stat.data_transferred);
        summary.total_data_transferred += stat.data_transferred;
        summary.start_time = summary.start_time.min(stat.start_time);
        summary.end_time = summary.end_time.max(stat.end_time);
        total_duration += stat.duration;
        *summary.status_codes.entry(stat.status_code).or_default() += 1;
    }

    if non_err_count == 0 {
        summary.start_time = observed_start;
        summary.end_time = observed_end;
        return summary;
    }

    summary.avg_duration = Duration::from_nanos((total_duration.as_nanos() / non_err_count as u128) as u64);
    summary.avg_data_transferred = summary.total_data_transferred / non_err_count;

    let window = summary
        .end_time
        .duration_since(summary.start_time)
        .unwrap_or_default();
    if window.as_nanos() > 0 {
        summary.avg_rps = non_err_count as f64 / window.as_nanos() as f64;
    }
    summary
}

/// Render a human friendly summary of an entire test.
#[rustfmt::skip]
pub fn create_text_summary(summary: &RequestStatSummary) -> String {
    use std::fmt::Write;

    let total_time = summary
        .end_time
        .duration_since(summary.start_time)
        .unwrap_or_default();

    let mut out = String::from("\n");
    out.push_str("Timing\n");
    let _ = writeln!(out, "Mean query speed:     {} ms", summary.avg_duration.as_millis());
    let _ = writeln!(out, "Fastest query speed:  {} ms", summary.min_duration.as_millis());
    let _ = writeln!(out, "Slowest query speed:  {} ms", summary.max_duration.as_millis());
    let _ = writeln!(out, "Mean RPS:             {:.2} req/sec", summary.avg_rps * 1_000_000_000.0);
    let _ = writeln!(out, "Total time:           {} ms", total_time.as_millis());

    out.push_str("\nData Transferred\n");
    let _ = writeln!(out, "Mean query:      {:.2}", summary.avg_data_transferred.adjusted());
    let _ = writeln!(out, "Largest query:   {:.2}", summary.max_data_transferred.adjusted());
    let _ = writeln!(out, "Smallest query:  {:.2}", summary.min_data_transferred.adjusted());
    let _ = writeln!(out, "Total:           {:.2}", summary.total_data_transferred.adjusted());

    out.push_str("\nResponse Codes\n");
    let total_responses: u64 = summary.status_codes.values().sum();
    for (code, count) in summary.status_codes.iter().sorted() {
        let share = 100.0 * *count as f64 / total_responses as f64;
        let _ = writeln!(out, "{code}: {count} responses ({share:.2}%)");
    }
    if summary.error_count > 0 {
        let _ = writeln!(out, "Failed: {} requests", summary.error_count);
    }

    out.push_str("\nErrors\n");
    let _ = writeln!(out, "Failed requests: {}", summary.error_count);
    out
}
