//! Data models shared by the probing and aggregation paths

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Probe timeout used when a service does not override it
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Banner {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HealthCheckConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    /// Milliseconds
    #[serde(default, alias = "timeoutMs")]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<HealthCheckConfig>,
}

impl ServiceConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            link: link.into(),
            healthcheck: None,
        }
    }

    pub fn with_healthcheck(mut self, healthcheck: HealthCheckConfig) -> Self {
        self.healthcheck = Some(healthcheck);
        self
    }

    /// URL the prober should hit: the healthcheck override, else the public link
    pub fn probe_url(&self) -> &str {
        self.healthcheck
            .as_ref()
            .and_then(|hc| hc.url.as_deref())
            .unwrap_or(&self.link)
    }

    pub fn probe_method(&self) -> &str {
        self.healthcheck
            .as_ref()
            .and_then(|hc| hc.method.as_deref())
            .unwrap_or("GET")
    }

    pub fn probe_timeout(&self) -> Duration {
        let ms = self
            .healthcheck
            .as_ref()
            .and_then(|hc| hc.timeout)
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        Duration::from_millis(ms)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Up,
    Down,
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeStatus::Up => write!(f, "up"),
            ProbeStatus::Down => write!(f, "down"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResult {
    pub service_name: String,
    pub url: String,
    pub status: ProbeStatus,
    /// Milliseconds from dispatch to resolution
    pub latency: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub timestamp: DateTime<Utc>,
}

impl HealthCheckResult {
    pub fn is_up(&self) -> bool {
        self.status == ProbeStatus::Up
    }
}

/// Discrete, human-facing status derived from an uptime percentage
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceStatus {
    Unknown,
    Operational,
    Degraded,
    PartialOutage,
    MajorOutage,
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceStatus::Unknown => write!(f, "unknown"),
            ServiceStatus::Operational => write!(f, "operational"),
            ServiceStatus::Degraded => write!(f, "degraded"),
            ServiceStatus::PartialOutage => write!(f, "partial-outage"),
            ServiceStatus::MajorOutage => write!(f, "major-outage"),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UptimeWindow {
    pub uptime: f64,
    pub avg_latency: f64,
}

impl UptimeWindow {
    /// Reported when a window holds no samples
    pub const HEALTHY: UptimeWindow = UptimeWindow {
        uptime: 100.0,
        avg_latency: 0.0,
    };
}

impl Default for UptimeWindow {
    fn default() -> Self {
        Self::HEALTHY
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayStatus {
    pub date: NaiveDate,
    pub status: ServiceStatus,
    pub uptime: f64,
    pub avg_latency: f64,
}

impl DayStatus {
    /// Placeholder for a calendar day without any samples
    pub fn unknown(date: NaiveDate) -> Self {
        Self {
            date,
            status: ServiceStatus::Unknown,
            uptime: 100.0,
            avg_latency: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatusResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub link: String,
    pub status: ServiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_latency: Option<u64>,
    pub uptime_24h: f64,
    pub uptime_7d: f64,
    pub uptime_30d: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPageResponse {
    pub banner: Option<Banner>,
    pub services: Vec<ServiceStatusResponse>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub service_name: String,
    pub history: Vec<DayStatus>,
}

/// Round to two decimal places, the precision reported to clients
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
