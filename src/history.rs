//! Gap-filled daily history

use crate::config::StatusPageConfig;
use crate::errors::{MonitorError, Result};
use crate::models::{round2, DayStatus};
use crate::status::classify;
use crate::store::{AggregateQuery, AggregateRow, TimeSeriesStore};
use chrono::{Duration, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, warn};

/// Days of history before today; the series covers `HISTORY_DAYS + 1` dates
pub const HISTORY_DAYS: u32 = 90;

#[derive(Clone)]
pub struct HistoryBuilder {
    catalog: Arc<StatusPageConfig>,
    store: Arc<dyn TimeSeriesStore>,
}

impl HistoryBuilder {
    pub fn new(catalog: Arc<StatusPageConfig>, store: Arc<dyn TimeSeriesStore>) -> Self {
        Self { catalog, store }
    }

    pub async fn service_history(&self, service_id: &str) -> Result<Vec<DayStatus>> {
        self.service_history_on(service_id, Utc::now().date_naive()).await
    }

    /// History for the `HISTORY_DAYS + 1` days ending at `today`, oldest first
    pub async fn service_history_on(
        &self,
        service_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<DayStatus>> {
        if self.catalog.service(service_id).is_none() {
            return Err(MonitorError::ServiceNotFound(service_id.to_string()));
        }

        let query = AggregateQuery::daily(service_id, HISTORY_DAYS);
        let rows = match self.store.query(&query).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Error querying history for {}: {}", service_id, e);
                Vec::new()
            }
        };

        let recorded = rows.into_iter().filter_map(day_from_row).collect();
        Ok(fill_gaps(recorded, today, HISTORY_DAYS))
    }
}

fn day_from_row(row: AggregateRow) -> Option<DayStatus> {
    let raw_date = row.date?;
    let date = match NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d") {
        Ok(date) => date,
        Err(e) => {
            warn!("Skipping history row with bad date {:?}: {}", raw_date, e);
            return None;
        }
    };

    let uptime = row.uptime.filter(|u| u.is_finite())?.clamp(0.0, 100.0);
    let avg_latency = row
        .avg_latency
        .filter(|l| l.is_finite())
        .map(|l| l.max(0.0))
        .unwrap_or(0.0);

    Some(DayStatus {
        date,
        status: classify(uptime),
        uptime: round2(uptime),
        avg_latency: round2(avg_latency),
    })
}

/// One entry per date in `[today - days, today]`, ascending.
///
/// Dates without a recorded entry become `unknown`. Entries outside the range
/// are dropped; for duplicate dates the first entry wins.
pub fn fill_gaps(recorded: Vec<DayStatus>, today: NaiveDate, days: u32) -> Vec<DayStatus> {
    let start = today - Duration::days(i64::from(days));

    let mut by_date: BTreeMap<NaiveDate, DayStatus> = BTreeMap::new();
    for day in recorded {
        if day.date < start || day.date > today {
            continue;
        }
        by_date.entry(day.date).or_insert(day);
    }

    start
        .iter_days()
        .take_while(|date| *date <= today)
        .map(|date| by_date.remove(&date).unwrap_or_else(|| DayStatus::unknown(date)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ServiceConfig, ServiceStatus};
    use crate::store::testing::{FixedRowsStore, UnavailableStore};
    use crate::store::{DataPoint, MemoryStore};

    fn catalog() -> Arc<StatusPageConfig> {
        Arc::new(StatusPageConfig::new(vec![ServiceConfig::new(
            "api",
            "API",
            "https://api.example.com",
        )]))
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn daily_row(day: &str, uptime: f64, avg_latency: f64) -> AggregateRow {
        AggregateRow {
            date: Some(day.to_string()),
            uptime: Some(uptime),
            avg_latency: Some(avg_latency),
        }
    }

    fn assert_contiguous(history: &[DayStatus], today: NaiveDate) {
        assert_eq!(history.len(), 91);
        assert_eq!(history[0].date, today - Duration::days(90));
        assert_eq!(history[90].date, today);
        for pair in history.windows(2) {
            assert_eq!(pair[1].date, pair[0].date + Duration::days(1));
        }
    }

    #[test]
    fn test_fill_gaps_without_data() {
        let today = date("2024-03-31");
        let history = fill_gaps(Vec::new(), today, HISTORY_DAYS);

        assert_contiguous(&history, today);
        assert!(history.iter().all(|d| d.status == ServiceStatus::Unknown));
        assert!(history.iter().all(|d| d.uptime == 100.0 && d.avg_latency == 0.0));
    }

    #[test]
    fn test_fill_gaps_last_five_days() {
        let today = date("2024-03-01");
        let recorded: Vec<DayStatus> = (0..5)
            .map(|i| DayStatus {
                date: today - Duration::days(i),
                status: ServiceStatus::Degraded,
                uptime: 97.5,
                avg_latency: 80.0,
            })
            .collect();

        let history = fill_gaps(recorded, today, HISTORY_DAYS);

        assert_contiguous(&history, today);
        let unknown = history.iter().filter(|d| d.status == ServiceStatus::Unknown).count();
        assert_eq!(unknown, 86);
        assert!(history[..86].iter().all(|d| d.status == ServiceStatus::Unknown));
        assert!(history[86..].iter().all(|d| d.status == ServiceStatus::Degraded));
    }

    #[test]
    fn test_fill_gaps_drops_out_of_range_and_duplicates() {
        let today = date("2024-03-01");
        let day = |d: NaiveDate, uptime: f64| DayStatus {
            date: d,
            status: classify(uptime),
            uptime,
            avg_latency: 1.0,
        };
        let recorded = vec![
            day(today, 99.0),
            day(today, 50.0),
            day(today + Duration::days(1), 10.0),
            day(today - Duration::days(91), 10.0),
        ];

        let history = fill_gaps(recorded, today, HISTORY_DAYS);

        assert_contiguous(&history, today);
        assert_eq!(history[90].uptime, 99.0);
        assert_eq!(history[0].status, ServiceStatus::Unknown);
    }

    #[tokio::test]
    async fn test_rows_are_rounded_and_classified() {
        let today = date("2024-03-01");
        let store = FixedRowsStore(vec![
            daily_row("2024-03-01", 99.899, 120.456),
            daily_row("2024-02-29", 89.0, 10.0),
            daily_row("not-a-date", 50.0, 10.0),
            AggregateRow {
                date: Some("2024-02-28".to_string()),
                uptime: None,
                avg_latency: None,
            },
        ]);
        let builder = HistoryBuilder::new(catalog(), Arc::new(store));

        let history = builder.service_history_on("api", today).await.unwrap();

        assert_contiguous(&history, today);
        let last = &history[90];
        assert_eq!(last.uptime, 99.9);
        assert_eq!(last.avg_latency, 120.46);
        assert_eq!(last.status, ServiceStatus::Degraded);
        assert_eq!(history[89].status, ServiceStatus::MajorOutage);
        assert_eq!(history[88].status, ServiceStatus::Unknown);
    }

    #[tokio::test]
    async fn test_history_from_memory_store() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for (age, up) in [(0, true), (0, false), (2, true)] {
            store
                .write(DataPoint {
                    key: "api".to_string(),
                    tags: vec!["API".to_string()],
                    up,
                    latency_ms: 50,
                    status_code: if up { 200 } else { 0 },
                    timestamp: now - Duration::days(age),
                })
                .await
                .unwrap();
        }
        let builder = HistoryBuilder::new(catalog(), Arc::new(store));

        let history = builder
            .service_history_on("api", now.date_naive())
            .await
            .unwrap();

        assert_contiguous(&history, now.date_naive());
        assert_eq!(history[90].uptime, 50.0);
        assert_eq!(history[90].status, ServiceStatus::MajorOutage);
        assert_eq!(history[89].status, ServiceStatus::Unknown);
        assert_eq!(history[88].status, ServiceStatus::Operational);
    }

    #[tokio::test]
    async fn test_query_failure_yields_all_unknown() {
        let builder = HistoryBuilder::new(catalog(), Arc::new(UnavailableStore));

        let history = builder.service_history("api").await.unwrap();

        assert_eq!(history.len(), 91);
        assert!(history.iter().all(|d| d.status == ServiceStatus::Unknown));
    }

    #[tokio::test]
    async fn test_unknown_service() {
        let builder = HistoryBuilder::new(catalog(), Arc::new(MemoryStore::new()));

        let result = builder.service_history("missing").await;
        assert!(matches!(result, Err(MonitorError::ServiceNotFound(_))));
    }
}
