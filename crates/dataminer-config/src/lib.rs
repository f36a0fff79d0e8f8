//! YAML configuration loading and validation.
//!
//! Deserializes into typed structs rather than an untracked
//! `serde_json::Value` bag, so the daemon gets compile-time-checked field
//! access to everything it wires at startup.

mod error;
mod load;
mod log_level;
mod schema;

pub use error::ConfigError;
pub use load::{load_from_path, load_from_str};
pub use log_level::LogLevel;
pub use schema::{
    AppConfig, AppSection, DataTypeConfig, ExchangeConfig, JobConfig, SchedulerSection,
    TradablePairsConfig,
};
