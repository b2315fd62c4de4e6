//! Time-series store boundary
//!
//! The monitor appends one [`DataPoint`] per probe and later reads back
//! aggregates through [`AggregateQuery`]. Storage, indexing and weighting of
//! points belong to the store implementation.

pub mod analytics;
pub mod memory;

pub use analytics::AnalyticsEngineStore;
pub use memory::MemoryStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::errors::Result;
use crate::models::{HealthCheckResult, ServiceConfig};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Append-only store of probe outcomes
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Append a single point. Points are never updated, though a store may
    /// expire them once they fall outside every query window.
    async fn write(&self, point: DataPoint) -> Result<()>;

    /// Run one aggregate query. An empty vector means no samples matched.
    async fn query(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>>;
}

/// One probe outcome as stored
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataPoint {
    /// Service id, the index the store partitions on
    pub key: String,
    /// Service name
    pub tags: Vec<String>,
    pub up: bool,
    pub latency_ms: u64,
    /// 0 when no response was received
    pub status_code: u16,
    pub timestamp: DateTime<Utc>,
}

impl DataPoint {
    pub fn from_result(service: &ServiceConfig, result: &HealthCheckResult) -> Self {
        Self {
            key: service.id.clone(),
            tags: vec![service.name.clone()],
            up: result.is_up(),
            latency_ms: result.latency,
            status_code: result.status_code.unwrap_or(0),
            timestamp: result.timestamp,
        }
    }

    /// Numeric columns in store order: up flag, latency, status code
    pub fn metrics(&self) -> [f64; 3] {
        [
            if self.up { 1.0 } else { 0.0 },
            self.latency_ms as f64,
            self.status_code as f64,
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Grouping {
    /// A single row covering the whole window
    Total,
    /// One row per UTC calendar day
    Daily,
}

/// Uptime/latency aggregate over `timestamp >= now - days` for one service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateQuery {
    pub service_id: String,
    pub days: u32,
    pub grouping: Grouping,
}

impl AggregateQuery {
    pub fn window(service_id: impl Into<String>, days: u32) -> Self {
        Self {
            service_id: service_id.into(),
            days,
            grouping: Grouping::Total,
        }
    }

    pub fn daily(service_id: impl Into<String>, days: u32) -> Self {
        Self {
            service_id: service_id.into(),
            days,
            grouping: Grouping::Daily,
        }
    }
}

/// One aggregate result row.
///
/// `date` is set only for [`Grouping::Daily`] queries, formatted `%Y-%m-%d`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AggregateRow {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub uptime: Option<f64>,
    #[serde(default, rename = "avgLatency", deserialize_with = "lenient_f64")]
    pub avg_latency: Option<f64>,
}

/// Build the store selected by `config.backend`
pub fn from_config(config: &StoreConfig) -> Result<Arc<dyn TimeSeriesStore>> {
    let store: Arc<dyn TimeSeriesStore> = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::AnalyticsEngine => Arc::new(AnalyticsEngineStore::new(config.clone())?),
    };
    Ok(store)
}

/// Accept numbers, numeric strings (`"99.5"`, `"nan"`) and null
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProbeStatus;

    #[test]
    fn test_from_config_selects_backend() {
        let config = StoreConfig::default();
        assert!(from_config(&config).is_ok());

        let config = StoreConfig {
            backend: StoreBackend::AnalyticsEngine,
            ..StoreConfig::default()
        };
        assert!(from_config(&config).is_ok());
    }

    #[test]
    fn test_data_point_from_down_result() {
        let service = ServiceConfig::new("api", "Public API", "https://example.com");
        let result = HealthCheckResult {
            service_name: "Public API".to_string(),
            url: "https://example.com".to_string(),
            status: ProbeStatus::Down,
            latency: 10_000,
            status_code: None,
            timestamp: Utc::now(),
        };

        let point = DataPoint::from_result(&service, &result);
        assert_eq!(point.key, "api");
        assert_eq!(point.tags, vec!["Public API".to_string()]);
        assert_eq!(point.metrics(), [0.0, 10_000.0, 0.0]);
    }

    #[test]
    fn test_row_parsing_is_lenient() {
        let row: AggregateRow =
            serde_json::from_str(r#"{"uptime": "99.5", "avgLatency": 120}"#).unwrap();
        assert_eq!(row.uptime, Some(99.5));
        assert_eq!(row.avg_latency, Some(120.0));
        assert_eq!(row.date, None);

        let row: AggregateRow =
            serde_json::from_str(r#"{"date": "2024-03-01", "uptime": null}"#).unwrap();
        assert_eq!(row.date.as_deref(), Some("2024-03-01"));
        assert_eq!(row.uptime, None);
        assert_eq!(row.avg_latency, None);

        let row: AggregateRow = serde_json::from_str(r#"{"uptime": "nan"}"#).unwrap();
        assert!(row.uptime.unwrap().is_nan());
    }
}
