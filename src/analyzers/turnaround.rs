//! Turnarounds: a train's direction code changing between consecutive
//! observations.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::analyzers::pairing::pair_consecutive;
use crate::analyzers::types::{SkipReason, elapsed_secs};
use crate::position::PositionEvent;

#[derive(Debug, Clone, PartialEq)]
pub struct TurnaroundEvent {
    pub train_number: String,
    /// Where the new direction was first observed.
    pub station_name: String,
    pub from_direction: i32,
    pub to_direction: i32,
    pub observed_at: DateTime<Utc>,
    pub gap_secs: f64,
}

impl TurnaroundEvent {
    pub fn gap_minutes(&self) -> f64 {
        self.gap_secs / 60.0
    }
}

/// Every turnaround occurrence, ordered by train then time.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnaroundReport {
    pub events: Vec<TurnaroundEvent>,
}

pub fn analyze_turnarounds(events: &[PositionEvent]) -> Result<TurnaroundReport, SkipReason> {
    if events.is_empty() {
        return Err(SkipReason::NoData);
    }

    let turnarounds: Vec<TurnaroundEvent> = pair_consecutive(
        events,
        |e| e.record.train_number.as_str(),
        |e| e.created_at,
        |previous, current| previous.record.direction_type != current.record.direction_type,
    )
    .into_iter()
    .map(|(previous, current)| TurnaroundEvent {
        train_number: current.record.train_number.clone(),
        station_name: current.record.station_name.clone(),
        from_direction: previous.record.direction_type,
        to_direction: current.record.direction_type,
        observed_at: current.created_at,
        gap_secs: elapsed_secs(previous.created_at, current.created_at),
    })
    .collect();

    if turnarounds.is_empty() {
        return Err(SkipReason::NoTurnarounds);
    }

    Ok(TurnaroundReport {
        events: turnarounds,
    })
}

impl fmt::Display for TurnaroundReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Analysis Result: Turnaround Events]")?;
        for t in &self.events {
            writeln!(
                f,
                "- Train {} at {}: {:.1} min gap between direction change",
                t.train_number,
                t.station_name,
                t.gap_minutes()
            )?;
        }
        Ok(())
    }
}
