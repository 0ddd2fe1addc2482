//! Dwell time per station: arrival to departure of the same train.

use std::collections::BTreeMap;
use std::fmt;

use crate::analyzers::pairing::pair_consecutive;
use crate::analyzers::types::{SkipReason, elapsed_secs};
use crate::analyzers::utility::{max, mean};
use crate::position::{PositionEvent, TrainStatus};

/// Mean dwell above this many seconds is flagged.
pub const LONG_DWELL_SECS: f64 = 60.0;

#[derive(Debug, Clone, PartialEq)]
pub struct StationDwell {
    pub station_name: String,
    pub mean_secs: f64,
    pub max_secs: f64,
    pub count: usize,
}

impl StationDwell {
    pub fn is_long(&self) -> bool {
        self.mean_secs > LONG_DWELL_SECS
    }
}

/// Stations ordered by descending mean dwell.
#[derive(Debug, Clone, PartialEq)]
pub struct DwellReport {
    pub stations: Vec<StationDwell>,
}

impl DwellReport {
    pub fn long_dwell_stations(&self) -> impl Iterator<Item = &StationDwell> {
        self.stations.iter().filter(|s| s.is_long())
    }
}

/// Pairs each departure with the arrival just before it for the same train
/// at the same station. Entering events are dropped before pairing, so an
/// arrived → entering → departed run still pairs.
pub fn analyze_dwell(events: &[PositionEvent]) -> Result<DwellReport, SkipReason> {
    if events.is_empty() {
        return Err(SkipReason::NoData);
    }

    let dwell_events: Vec<&PositionEvent> = events
        .iter()
        .filter(|e| matches!(e.status(), Some(TrainStatus::Arrived | TrainStatus::Departed)))
        .collect();

    let pairs = pair_consecutive(
        &dwell_events,
        |e| (e.record.train_number.as_str(), e.record.station_name.as_str()),
        |e| e.created_at,
        |previous, current| {
            previous.status() == Some(TrainStatus::Arrived)
                && current.status() == Some(TrainStatus::Departed)
        },
    );

    if pairs.is_empty() {
        return Err(SkipReason::NoDwellPairs);
    }

    let mut by_station: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for (arrival, departure) in pairs {
        by_station
            .entry(departure.record.station_name.as_str())
            .or_default()
            .push(elapsed_secs(arrival.created_at, departure.created_at));
    }

    let mut stations: Vec<StationDwell> = by_station
        .into_iter()
        .map(|(station, samples)| StationDwell {
            station_name: station.to_string(),
            mean_secs: mean(&samples),
            max_secs: max(&samples).unwrap_or_default(),
            count: samples.len(),
        })
        .collect();
    stations.sort_by(|a, b| b.mean_secs.total_cmp(&a.mean_secs));

    Ok(DwellReport { stations })
}

impl fmt::Display for DwellReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Analysis Result: Station Dwell Times]")?;
        for s in &self.stations {
            writeln!(
                f,
                "- {}: Avg {:.1}s (Max {:.1}s) [n={}]",
                s.station_name, s.mean_secs, s.max_secs, s.count
            )?;
            if s.is_long() {
                writeln!(f, "  >>> WARNING: Long dwell time at {}!", s.station_name)?;
            }
        }
        Ok(())
    }
}
