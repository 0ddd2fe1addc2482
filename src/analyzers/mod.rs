//! Descriptive statistics over the stored position history.
//!
//! Each analysis takes a line's recent events, pairs consecutive observations
//! where needed, and produces a report that renders as console text. An
//! analysis that has nothing to say returns a [`types::SkipReason`] instead.

pub mod analyzer;
pub mod duplicates;
pub mod dwell;
pub mod interference;
pub mod interval;
pub mod pairing;
pub mod turnaround;
pub mod types;
pub mod utility;
