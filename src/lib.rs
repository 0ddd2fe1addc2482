pub mod analyzers;
pub mod collector;
pub mod config;
pub mod fetch;
pub mod infra;
pub mod output;
pub mod position;
pub mod scheduler;
pub mod services;
