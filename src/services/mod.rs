//! The seams between collection/analysis logic and the outside world.

pub mod position_api;
pub mod position_store;

pub use position_api::{FetchError, PositionApi};
pub use position_store::{PositionStore, StoreError, TABLE_NAME};
