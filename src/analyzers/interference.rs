//! Express/local interference.
//!
//! Only partitions observations into express and local and counts them; no
//! overtake detection is attempted.

use std::fmt;

use crate::analyzers::types::SkipReason;
use crate::position::PositionEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterferenceReport {
    pub express_events: usize,
    pub local_events: usize,
}

pub fn analyze_interference(events: &[PositionEvent]) -> Result<InterferenceReport, SkipReason> {
    if events.is_empty() {
        return Err(SkipReason::NoData);
    }

    if !events.iter().any(|e| e.record.is_express) {
        return Err(SkipReason::NoExpressTrains);
    }

    let express_events = events.iter().filter(|e| e.record.is_express).count();
    Ok(InterferenceReport {
        express_events,
        local_events: events.len() - express_events,
    })
}

impl fmt::Display for InterferenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Express trains detected. Comparing express and local observations...")?;
        writeln!(f, "- Express Train Data Count: {}", self.express_events)?;
        writeln!(f, "- Local Train Data Count: {}", self.local_events)
    }
}
