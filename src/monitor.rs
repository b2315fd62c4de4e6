//! Top-level monitor wiring the probing and aggregation paths together

use crate::aggregator::UptimeAggregator;
use crate::config::{Config, StatusPageConfig};
use crate::errors::Result;
use crate::history::HistoryBuilder;
use crate::models::{
    Banner, DayStatus, HealthCheckResult, ServiceStatusResponse, StatusPageResponse,
};
use crate::orchestrator::{CycleOutcome, HealthCheckRunner};
use crate::prober::Prober;
use crate::recorder::Recorder;
use crate::secrets::EnvSecrets;
use crate::store::{self, TimeSeriesStore};
use chrono::Utc;
use std::sync::Arc;

/// Owns the service catalogue and exposes the monitor's three operations:
/// probing, current status and daily history.
#[derive(Clone)]
pub struct StatusMonitor {
    catalog: Arc<StatusPageConfig>,
    runner: HealthCheckRunner,
    aggregator: UptimeAggregator,
    history: HistoryBuilder,
}

impl StatusMonitor {
    pub fn new(catalog: StatusPageConfig, store: Arc<dyn TimeSeriesStore>, prober: Prober) -> Self {
        let catalog = Arc::new(catalog);

        Self {
            runner: HealthCheckRunner::new(
                Arc::clone(&catalog),
                prober,
                Recorder::new(Arc::clone(&store)),
            ),
            aggregator: UptimeAggregator::new(Arc::clone(&catalog), Arc::clone(&store)),
            history: HistoryBuilder::new(Arc::clone(&catalog), store),
            catalog,
        }
    }

    /// Build from runtime config, reading header secrets from the environment
    pub fn from_config(config: &Config, catalog: StatusPageConfig) -> Result<Self> {
        let store = store::from_config(&config.store)?;
        let prober = Prober::new(Arc::new(EnvSecrets))?;
        Ok(Self::new(catalog, store, prober))
    }

    pub fn catalog(&self) -> &StatusPageConfig {
        &self.catalog
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.catalog.banner.as_ref()
    }

    pub fn runner(&self) -> &HealthCheckRunner {
        &self.runner
    }

    pub async fn run_health_checks(&self) -> Vec<HealthCheckResult> {
        self.runner.run_health_checks().await
    }

    /// Run one cycle and keep hold of its recording task
    pub async fn check_all(&self) -> CycleOutcome {
        self.runner.check_all().await
    }

    pub async fn current_status(&self) -> Result<Vec<ServiceStatusResponse>> {
        self.aggregator.current_status().await
    }

    pub async fn service_history(&self, service_id: &str) -> Result<Vec<DayStatus>> {
        self.history.service_history(service_id).await
    }

    /// Everything the status page renders in one response
    pub async fn status_page(&self) -> Result<StatusPageResponse> {
        Ok(StatusPageResponse {
            banner: self.catalog.banner.clone(),
            services: self.current_status().await?,
            last_updated: Utc::now(),
        })
    }
}
