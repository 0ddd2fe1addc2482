//! Dispatch interval regularity: time between consecutive arrivals at the
//! same station in the same direction.

use std::collections::BTreeMap;
use std::fmt;

use crate::analyzers::pairing::pair_consecutive;
use crate::analyzers::types::{SkipReason, elapsed_secs};
use crate::analyzers::utility::{mean, sample_stddev};
use crate::position::{Direction, PositionEvent, TrainStatus};

/// Interval spread above this many minutes counts as bunching.
pub const IRREGULAR_STDDEV_MINUTES: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct StationInterval {
    pub station_name: String,
    pub direction: Direction,
    pub mean_secs: f64,
    pub stddev_secs: f64,
    pub count: usize,
}

impl StationInterval {
    pub fn mean_minutes(&self) -> f64 {
        self.mean_secs / 60.0
    }

    pub fn stddev_minutes(&self) -> f64 {
        self.stddev_secs / 60.0
    }

    pub fn is_irregular(&self) -> bool {
        self.stddev_minutes() > IRREGULAR_STDDEV_MINUTES
    }
}

/// Groups ordered by station name, then direction. Groups with fewer than
/// two intervals have no spread and are left out.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalReport {
    pub total_events: usize,
    pub arrivals: usize,
    pub groups: Vec<StationInterval>,
}

impl IntervalReport {
    pub fn irregular_groups(&self) -> impl Iterator<Item = &StationInterval> {
        self.groups.iter().filter(|g| g.is_irregular())
    }
}

pub fn analyze_intervals(events: &[PositionEvent]) -> Result<IntervalReport, SkipReason> {
    if events.is_empty() {
        return Err(SkipReason::NoData);
    }

    let arrivals: Vec<&PositionEvent> = events
        .iter()
        .filter(|e| e.status() == Some(TrainStatus::Arrived))
        .collect();

    if arrivals.is_empty() {
        return Err(SkipReason::NoArrivals);
    }

    let pairs = pair_consecutive(
        &arrivals,
        |e| (e.record.station_name.as_str(), e.direction()),
        |e| e.created_at,
        |_, _| true,
    );

    let mut by_group: BTreeMap<(&str, Direction), Vec<f64>> = BTreeMap::new();
    for (previous, current) in pairs {
        by_group
            .entry((current.record.station_name.as_str(), current.direction()))
            .or_default()
            .push(elapsed_secs(previous.created_at, current.created_at));
    }

    let groups = by_group
        .into_iter()
        .filter_map(|((station, direction), samples)| {
            let mean_secs = mean(&samples);
            let stddev_secs = sample_stddev(&samples, mean_secs)?;
            Some(StationInterval {
                station_name: station.to_string(),
                direction,
                mean_secs,
                stddev_secs,
                count: samples.len(),
            })
        })
        .collect();

    Ok(IntervalReport {
        total_events: events.len(),
        arrivals: arrivals.len(),
        groups,
    })
}

impl fmt::Display for IntervalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Analysis Result: Station Intervals]")?;
        for g in &self.groups {
            writeln!(
                f,
                "- {} ({}): Avg {:.1} min (+/- {:.1} min) [n={}]",
                g.station_name,
                g.direction,
                g.mean_minutes(),
                g.stddev_minutes(),
                g.count
            )?;
            if g.is_irregular() {
                writeln!(f, "  >>> WARNING: Irregular intervals detected at {}!", g.station_name)?;
            }
        }
        Ok(())
    }
}
