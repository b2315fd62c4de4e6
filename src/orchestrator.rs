//! Concurrent probing of every configured service

use crate::config::StatusPageConfig;
use crate::models::HealthCheckResult;
use crate::prober::Prober;
use crate::recorder::Recorder;
use crate::store::DataPoint;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Results of one cycle plus the background task recording them
#[derive(Debug)]
pub struct CycleOutcome {
    pub results: Vec<HealthCheckResult>,
    /// Resolves to the number of data points the store accepted
    pub recording: JoinHandle<usize>,
}

/// Up/down tally of one probing cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    pub cycle_id: String,
    pub checked: usize,
    pub up: usize,
    pub down: usize,
}

impl CycleSummary {
    pub fn from_results(cycle_id: String, results: &[HealthCheckResult]) -> Self {
        let up = results.iter().filter(|r| r.is_up()).count();
        Self {
            cycle_id,
            checked: results.len(),
            up,
            down: results.len() - up,
        }
    }
}

#[derive(Clone)]
pub struct HealthCheckRunner {
    catalog: Arc<StatusPageConfig>,
    prober: Prober,
    recorder: Recorder,
}

impl HealthCheckRunner {
    pub fn new(catalog: Arc<StatusPageConfig>, prober: Prober, recorder: Recorder) -> Self {
        Self {
            catalog,
            prober,
            recorder,
        }
    }

    /// Probe every service at once and wait for all of them.
    ///
    /// Results come back in catalogue order, one per service. Recording runs
    /// in the background and never holds the results back.
    pub async fn run_health_checks(&self) -> Vec<HealthCheckResult> {
        self.check_all().await.results
    }

    /// Same as [`run_health_checks`](Self::run_health_checks), but hands back
    /// the recording task so the caller can wait for the writes to land.
    #[instrument(skip(self))]
    pub async fn check_all(&self) -> CycleOutcome {
        let cycle_id = Uuid::new_v4().to_string();
        info!(
            "Running health checks for {} services (cycle {})",
            self.catalog.services.len(),
            cycle_id
        );

        let probes = self
            .catalog
            .services
            .iter()
            .map(|service| self.prober.probe(service));
        let outcomes = join_all(probes).await;

        let mut results = Vec::with_capacity(outcomes.len());
        let mut writes = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            results.push(outcome.result);
            writes.extend(outcome.writes);
        }

        let recording = self.spawn_recording(cycle_id.clone(), writes);

        let summary = CycleSummary::from_results(cycle_id, &results);
        info!("Health checks completed: {} services checked", summary.checked);
        info!("Status: {} up, {} down", summary.up, summary.down);

        CycleOutcome { results, recording }
    }

    fn spawn_recording(&self, cycle_id: String, writes: Vec<DataPoint>) -> JoinHandle<usize> {
        let recorder = self.recorder.clone();
        tokio::spawn(async move {
            let attempted = writes.len();
            let written = recorder.record_all(writes).await;
            debug!(
                "Recorded {}/{} data points for cycle {}",
                written, attempted, cycle_id
            );
            written
        })
    }

    /// Run a probing cycle every `period` until `shutdown` resolves
    pub async fn run_until<F>(&self, period: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!("Starting health check scheduler, interval {}s", period.as_secs());
        let mut ticker = scheduler_interval(period);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stopping health check scheduler");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_health_checks().await;
                }
            }
        }
    }
}

/// A cycle that overruns its period delays the next one instead of
/// triggering a burst of catch-up cycles.
fn scheduler_interval(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
