//! Shared analysis types.

use chrono::{DateTime, Utc};
use std::fmt;

/// Why an analysis produced no report. Each variant renders as the console
/// message printed in place of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoData,
    NoArrivals,
    NoDwellPairs,
    NoTurnarounds,
    NoExpressTrains,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::NoData => "No data found.",
            SkipReason::NoArrivals => "No arrival data found.",
            SkipReason::NoDwellPairs => {
                "No valid dwell time data found (need arrival->departure pairs)."
            }
            SkipReason::NoTurnarounds => "No turnaround events detected.",
            SkipReason::NoExpressTrains => {
                "Not applicable: no express trains found in this line data."
            }
        })
    }
}

/// Seconds between two instants as a float, negative if `to` precedes `from`.
pub(crate) fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}
