//! Forwards probe data points to the time-series store

use crate::store::{DataPoint, TimeSeriesStore};
use std::sync::Arc;
use tracing::{debug, error};

#[derive(Clone)]
pub struct Recorder {
    store: Arc<dyn TimeSeriesStore>,
}

impl Recorder {
    pub fn new(store: Arc<dyn TimeSeriesStore>) -> Self {
        Self { store }
    }

    /// Write one point. Failures are logged and reported as `false`, never raised.
    pub async fn record(&self, point: DataPoint) -> bool {
        let key = point.key.clone();
        match self.store.write(point).await {
            Ok(()) => {
                debug!("Recorded health check for {}", key);
                true
            }
            Err(e) => {
                error!("Failed to record health check for {}: {}", key, e);
                false
            }
        }
    }

    /// Write every point in order, returning how many were accepted
    pub async fn record_all(&self, points: Vec<DataPoint>) -> usize {
        let mut written = 0;
        for point in points {
            if self.record(point).await {
                written += 1;
            }
        }
        written
    }
}
