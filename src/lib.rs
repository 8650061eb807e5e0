//! Recurring shifts, duty ranges and the alarms that follow them.

pub mod alarm;
pub mod config;
pub mod duty;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod model;
pub mod notify;
pub mod recurrence;
pub mod store;
pub mod telemetry;
pub mod timer;

pub use error::{Error, Result};
