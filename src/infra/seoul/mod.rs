//! Seoul Metropolitan Government realtime subway position API.

mod client;

pub use client::{DEFAULT_WINDOW, SeoulMetroClient, extract_positions};
