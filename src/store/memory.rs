//! In-process store used for local runs and tests

use super::{AggregateQuery, AggregateRow, DataPoint, Grouping, TimeSeriesStore};
use crate::errors::Result;
use crate::history::HISTORY_DAYS;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Weight given to every point, mirroring `_sample_interval` for unsampled data
const SAMPLE_INTERVAL: f64 = 1.0;

/// Append-only in-memory store.
///
/// Points older than the retention period are dropped on the next write, so
/// a long-running process holds at most one history's worth of samples.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    points: Arc<RwLock<Vec<DataPoint>>>,
    retention: Duration,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            points: Arc::default(),
            // Covers the daily history plus the partial day at its start
            retention: Duration::days(i64::from(HISTORY_DAYS) + 1),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Snapshot of every point written so far
    pub async fn points(&self) -> Vec<DataPoint> {
        self.points.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.points.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.points.read().await.is_empty()
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    total_weight: f64,
    down_weight: f64,
    latency_sum: f64,
    count: usize,
}

impl Accumulator {
    fn add(&mut self, point: &DataPoint) {
        self.total_weight += SAMPLE_INTERVAL;
        if !point.up {
            self.down_weight += SAMPLE_INTERVAL;
        }
        self.latency_sum += point.latency_ms as f64;
        self.count += 1;
    }

    fn into_row(self, date: Option<String>) -> AggregateRow {
        AggregateRow {
            date,
            uptime: Some((self.total_weight - self.down_weight) / self.total_weight * 100.0),
            avg_latency: Some(self.latency_sum / self.count as f64),
        }
    }
}

#[async_trait]
impl TimeSeriesStore for MemoryStore {
    async fn write(&self, point: DataPoint) -> Result<()> {
        let cutoff = Utc::now() - self.retention;
        let mut points = self.points.write().await;
        let before = points.len();
        points.retain(|p| p.timestamp >= cutoff);
        let expired = before - points.len();
        if expired > 0 {
            debug!("Expired {} data points older than {}", expired, cutoff);
        }
        points.push(point);
        debug!("Stored data point, store size: {}", points.len());
        Ok(())
    }

    async fn query(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>> {
        let since = Utc::now() - Duration::days(i64::from(query.days));
        let points = self.points.read().await;
        let matching = points
            .iter()
            .filter(|p| p.key == query.service_id && p.timestamp >= since);

        let rows = match query.grouping {
            Grouping::Total => {
                let mut acc = Accumulator::default();
                matching.for_each(|p| acc.add(p));
                if acc.count == 0 {
                    Vec::new()
                } else {
                    vec![acc.into_row(None)]
                }
            }
            Grouping::Daily => {
                let mut days: BTreeMap<String, Accumulator> = BTreeMap::new();
                for point in matching {
                    let date = point.timestamp.format("%Y-%m-%d").to_string();
                    days.entry(date).or_default().add(point);
                }
                days.into_iter()
                    .map(|(date, acc)| acc.into_row(Some(date)))
                    .collect()
            }
        };

        Ok(rows)
    }
}
