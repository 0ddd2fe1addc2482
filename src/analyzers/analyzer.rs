use std::io::Write;
use tracing::{debug, error, warn};

use crate::analyzers::dwell::analyze_dwell;
use crate::analyzers::duplicates::count_repeated_observations;
use crate::analyzers::interference::analyze_interference;
use crate::analyzers::interval::analyze_intervals;
use crate::analyzers::turnaround::analyze_turnarounds;
use crate::analyzers::types::SkipReason;
use crate::position::PositionEvent;
use crate::services::PositionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    Dwell,
    Interval,
    Turnaround,
    Interference,
}

impl AnalysisKind {
    pub fn title(self) -> &'static str {
        match self {
            AnalysisKind::Dwell => "Delay Hotspots (Dwell Time)",
            AnalysisKind::Interval => "Interval Regularity",
            AnalysisKind::Turnaround => "Turnaround Efficiency",
            AnalysisKind::Interference => "Express/Local Interference",
        }
    }

    /// How many recent rows each analysis looks at by default.
    pub fn default_limit(self) -> usize {
        match self {
            AnalysisKind::Dwell => 3000,
            AnalysisKind::Interval => 2000,
            AnalysisKind::Turnaround => 5000,
            AnalysisKind::Interference => 3000,
        }
    }
}

/// Recent events for a line in chronological order; a store failure is
/// logged and reads as no data.
///
/// The store returns newest first, so rows sharing a `created_at` (one insert
/// batch) come back in reverse insertion order. Reversing restores it.
pub async fn load_events<S: PositionStore + ?Sized>(
    store: &S,
    line_id: &str,
    limit: usize,
) -> Vec<PositionEvent> {
    match store.fetch_recent(line_id, limit).await {
        Ok(mut events) => {
            events.reverse();
            events
        }
        Err(e) => {
            error!(line_id, error = %e, "Failed to fetch position history");
            Vec::new()
        }
    }
}

/// Runs one analysis over already-loaded events and writes the console report.
pub fn write_analysis<W: Write>(
    out: &mut W,
    kind: AnalysisKind,
    line_id: &str,
    events: &[PositionEvent],
) -> std::io::Result<()> {
    writeln!(out, "--- Analyzing {} for Line {} ---", kind.title(), line_id)?;

    let repeated = count_repeated_observations(events);
    if repeated > 0 {
        warn!(
            line_id,
            repeated,
            total = events.len(),
            "Repeated observations present; statistics include them"
        );
    }

    let result: Result<String, SkipReason> = match kind {
        AnalysisKind::Dwell => analyze_dwell(events).map(|r| r.to_string()),
        AnalysisKind::Interval => analyze_intervals(events)
            .inspect(|r| debug!(total = r.total_events, arrivals = r.arrivals, "Interval input"))
            .map(|r| r.to_string()),
        AnalysisKind::Turnaround => analyze_turnarounds(events).map(|r| r.to_string()),
        AnalysisKind::Interference => analyze_interference(events).map(|r| r.to_string()),
    };

    match result {
        Ok(report) => write!(out, "\n{report}"),
        Err(reason) => writeln!(out, "{reason}"),
    }
}

/// Fetches a line's history and writes one analysis report.
pub async fn run_analysis<S, W>(
    store: &S,
    out: &mut W,
    kind: AnalysisKind,
    line_id: &str,
    limit: usize,
) -> std::io::Result<()>
where
    S: PositionStore + ?Sized,
    W: Write,
{
    let events = load_events(store, line_id, limit).await;
    write_analysis(out, kind, line_id, &events)
}
