//! Service Uptime Monitor Library
//!
//! Probes a catalogue of HTTP services, records every outcome into a
//! time-series store and derives status, rolling uptime and a daily history
//! from what was recorded.

pub mod aggregator;
pub mod api;
pub mod config;
pub mod errors;
pub mod history;
pub mod models;
pub mod monitor;
pub mod orchestrator;
pub mod prober;
pub mod recorder;
pub mod secrets;
pub mod status;
pub mod store;

pub use config::{Config, StatusPageConfig};
pub use errors::{MonitorError, Result};
pub use models::{DayStatus, HealthCheckResult, ServiceConfig, ServiceStatus, UptimeWindow};
pub use monitor::StatusMonitor;
pub use status::classify;
