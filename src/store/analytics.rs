//! Cloudflare Workers Analytics Engine backend
//!
//! Aggregates are read through the SQL API, which answers in `JSONEachRow`.
//! Analytics Engine has no public write API, so points are posted as
//! `{indexes, blobs, doubles}` JSON to an ingest endpoint that forwards them
//! to the dataset binding.

use super::{AggregateQuery, AggregateRow, DataPoint, Grouping, TimeSeriesStore};
use crate::config::StoreConfig;
use crate::errors::{MonitorError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tokio::time::timeout;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct AnalyticsEngineStore {
    client: Client,
    config: StoreConfig,
}

#[derive(Debug, Serialize)]
struct IngestPayload<'a> {
    indexes: [&'a str; 1],
    blobs: &'a [String],
    doubles: [f64; 3],
    timestamp: i64,
}

impl AnalyticsEngineStore {
    pub fn new(config: StoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .user_agent(format!("uptime_monitor/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(MonitorError::Http)?;

        Ok(Self { client, config })
    }

    fn sql_url(&self, account_id: &str) -> String {
        format!(
            "{}/client/v4/accounts/{}/analytics_engine/sql",
            self.config.api_url.trim_end_matches('/'),
            account_id
        )
    }

    /// Render the SQL for an aggregate query against `dataset`
    pub fn build_sql(dataset: &str, query: &AggregateQuery) -> String {
        let service_id = query.service_id.replace('\\', "\\\\").replace('\'', "\\'");
        let (date_column, group_by) = match query.grouping {
            Grouping::Total => ("", ""),
            Grouping::Daily => (
                "formatDateTime(timestamp, '%Y-%m-%d') AS date,\n  ",
                "\nGROUP BY date",
            ),
        };

        format!(
            "SELECT\n  {date_column}((SUM(_sample_interval) - sumIf(_sample_interval, double1 = 0)) / SUM(_sample_interval)) * 100 AS uptime,\n  avg(double2) AS avgLatency\nFROM {dataset}\nWHERE index1 = '{service_id}'\n  AND timestamp >= NOW() - INTERVAL '{days}' DAY{group_by}\nFORMAT JSONEachRow",
            days = query.days,
        )
    }

    fn parse_rows(body: &str) -> Result<Vec<AggregateRow>> {
        body.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(MonitorError::Json))
            .collect()
    }
}

#[async_trait]
impl TimeSeriesStore for AnalyticsEngineStore {
    async fn write(&self, point: DataPoint) -> Result<()> {
        let url = self.config.ingest_url.as_deref().ok_or_else(|| {
            MonitorError::Config("Analytics Engine ingest URL not configured".to_string())
        })?;

        let payload = IngestPayload {
            indexes: [point.key.as_str()],
            blobs: &point.tags,
            doubles: point.metrics(),
            timestamp: point.timestamp.timestamp_millis(),
        };

        let mut request = self.client.post(url).json(&payload);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }

        let response = timeout(self.config.http_timeout, request.send())
            .await
            .map_err(|_| MonitorError::Timeout(self.config.http_timeout))?
            .map_err(MonitorError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::Store(format!(
                "Ingest rejected point for {}: {} {}",
                point.key, status, body
            )));
        }

        debug!("Wrote data point for {}", point.key);
        Ok(())
    }

    async fn query(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>> {
        let (Some(account_id), Some(api_token)) =
            (self.config.account_id.as_deref(), self.config.api_token.as_deref())
        else {
            return Err(MonitorError::Config(
                "Analytics Engine SQL API credentials not configured".to_string(),
            ));
        };

        let sql = Self::build_sql(&self.config.dataset, query);
        debug!("Querying Analytics Engine for {} over {} days", query.service_id, query.days);

        let response = timeout(
            self.config.http_timeout,
            self.client
                .post(self.sql_url(account_id))
                .bearer_auth(api_token)
                .body(sql)
                .send(),
        )
        .await
        .map_err(|_| MonitorError::Timeout(self.config.http_timeout))?
        .map_err(MonitorError::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(MonitorError::Http)?;

        if !status.is_success() {
            return Err(MonitorError::Store(format!(
                "Analytics API error: {}\n{}",
                status, body
            )));
        }

        Self::parse_rows(&body)
    }
}
