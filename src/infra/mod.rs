pub mod seoul;
pub mod store;
