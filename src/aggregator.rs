//! Rolling-window uptime and latency statistics

use crate::config::StatusPageConfig;
use crate::errors::{MonitorError, Result};
use crate::models::{round2, ServiceConfig, ServiceStatusResponse, UptimeWindow};
use crate::status::classify;
use crate::store::{AggregateQuery, AggregateRow, TimeSeriesStore};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::error;

pub const WINDOW_24H_DAYS: u32 = 1;
pub const WINDOW_7D_DAYS: u32 = 7;
pub const WINDOW_30D_DAYS: u32 = 30;

#[derive(Clone)]
pub struct UptimeAggregator {
    catalog: Arc<StatusPageConfig>,
    store: Arc<dyn TimeSeriesStore>,
}

impl UptimeAggregator {
    pub fn new(catalog: Arc<StatusPageConfig>, store: Arc<dyn TimeSeriesStore>) -> Self {
        Self { catalog, store }
    }

    /// Uptime % and mean latency for `service_id` over the trailing `days`.
    ///
    /// A window without samples is reported as fully healthy. Store failures
    /// are logged and reported the same way, so the two are indistinguishable
    /// to callers.
    pub async fn uptime_latency(&self, service_id: &str, days: u32) -> Result<UptimeWindow> {
        if self.catalog.service(service_id).is_none() {
            return Err(MonitorError::ServiceNotFound(service_id.to_string()));
        }

        let rows = match self.store.query(&AggregateQuery::window(service_id, days)).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Error querying store for {} ({} days): {}", service_id, days, e);
                Vec::new()
            }
        };

        Ok(window_from_rows(&rows))
    }

    /// Current status of one service. Only the 24h window feeds the status.
    pub async fn service_status(&self, service: &ServiceConfig) -> Result<ServiceStatusResponse> {
        let (day, week, month) = tokio::try_join!(
            self.uptime_latency(&service.id, WINDOW_24H_DAYS),
            self.uptime_latency(&service.id, WINDOW_7D_DAYS),
            self.uptime_latency(&service.id, WINDOW_30D_DAYS),
        )?;

        Ok(ServiceStatusResponse {
            id: service.id.clone(),
            name: service.name.clone(),
            description: service.description.clone(),
            link: service.link.clone(),
            status: classify(day.uptime),
            current_latency: (day.avg_latency > 0.0).then(|| day.avg_latency.round() as u64),
            uptime_24h: round2(day.uptime),
            uptime_7d: round2(week.uptime),
            uptime_30d: round2(month.uptime),
        })
    }

    /// Current status of every service, in catalogue order
    pub async fn current_status(&self) -> Result<Vec<ServiceStatusResponse>> {
        try_join_all(self.catalog.services.iter().map(|s| self.service_status(s))).await
    }
}

fn window_from_rows(rows: &[AggregateRow]) -> UptimeWindow {
    match rows.first() {
        Some(AggregateRow {
            uptime: Some(uptime),
            avg_latency,
            ..
        }) if uptime.is_finite() => UptimeWindow {
            uptime: (*uptime).clamp(0.0, 100.0),
            avg_latency: avg_latency
                .filter(|l| l.is_finite())
                .map(|l| l.max(0.0))
                .unwrap_or(0.0),
        },
        _ => UptimeWindow::HEALTHY,
    }
}
