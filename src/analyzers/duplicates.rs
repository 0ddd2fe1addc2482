//! Repeated observations.
//!
//! Polling every minute often sees a train still sitting in the same state,
//! so the same (train, station, status) shows up in back-to-back rows. These
//! are counted and reported, never removed.

use crate::analyzers::pairing::pair_consecutive;
use crate::position::PositionEvent;

/// Number of observations that repeat the previous observation of the same
/// train at the same station with the same status code.
pub fn count_repeated_observations(events: &[PositionEvent]) -> usize {
    pair_consecutive(
        events,
        |e| e.record.train_number.as_str(),
        |e| e.created_at,
        |previous, current| {
            previous.record.station_name == current.record.station_name
                && previous.record.train_status_code == current.record.train_status_code
        },
    )
    .len()
}
