//! Single-service health checks

use crate::errors::{MonitorError, Result};
use crate::models::{HealthCheckResult, ProbeStatus, ServiceConfig};
use crate::secrets::{resolve_headers, SecretProvider};
use crate::store::DataPoint;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, Method, StatusCode};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

/// Result of one probe plus the store writes it produced.
///
/// The prober never touches the store; whoever drives it dispatches `writes`.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub result: HealthCheckResult,
    pub writes: Vec<DataPoint>,
}

#[derive(Clone)]
pub struct Prober {
    client: Client,
    secrets: Arc<dyn SecretProvider>,
    user_agent: String,
}

impl std::fmt::Debug for Prober {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prober")
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl Prober {
    pub fn new(secrets: Arc<dyn SecretProvider>) -> Result<Self> {
        let client = Client::builder().build().map_err(MonitorError::Http)?;
        Ok(Self::with_client(client, secrets))
    }

    pub fn with_client(client: Client, secrets: Arc<dyn SecretProvider>) -> Self {
        Self {
            client,
            secrets,
            user_agent: format!(
                "Mozilla/5.0 (compatible; uptime_monitor/{})",
                env!("CARGO_PKG_VERSION")
            ),
        }
    }

    /// Check one service. Every failure is folded into a `down` result.
    #[instrument(skip(self, service), fields(service = %service.id))]
    pub async fn probe(&self, service: &ServiceConfig) -> ProbeOutcome {
        let timestamp = Utc::now();
        let started = Instant::now();
        let target = service.probe_url();

        let response = self.dispatch(service, target).await;
        let latency = started.elapsed().as_millis() as u64;

        let (status, status_code) = match response {
            Ok(code) => {
                info!("Checked {}: {} returned in {}ms", service.id, code.as_u16(), latency);
                let status = if is_available(code) {
                    ProbeStatus::Up
                } else {
                    ProbeStatus::Down
                };
                (status, Some(code.as_u16()))
            }
            Err(e) => {
                warn!("Check of {} failed after {}ms: {}", service.id, latency, e);
                (ProbeStatus::Down, None)
            }
        };

        let result = HealthCheckResult {
            service_name: service.name.clone(),
            url: service.link.clone(),
            status,
            latency,
            status_code,
            timestamp,
        };
        let writes = vec![DataPoint::from_result(service, &result)];

        ProbeOutcome { result, writes }
    }

    async fn dispatch(&self, service: &ServiceConfig, target: &str) -> Result<StatusCode> {
        let method_name = service.probe_method().to_uppercase();
        let method = Method::from_bytes(method_name.as_bytes())
            .map_err(|_| MonitorError::InvalidRequest(format!("invalid method {}", method_name)))?;
        let headers = self.build_headers(service)?;
        let deadline = service.probe_timeout();

        let request = self.client.request(method, target).headers(headers);
        let response = timeout(deadline, request.send())
            .await
            .map_err(|_| MonitorError::Timeout(deadline))?
            .map_err(MonitorError::Http)?;

        Ok(response.status())
    }

    fn build_headers(&self, service: &ServiceConfig) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        if let Some(healthcheck) = &service.healthcheck {
            for (name, value) in resolve_headers(&healthcheck.headers, self.secrets.as_ref()) {
                let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                    MonitorError::InvalidRequest(format!("invalid header name {}", name))
                })?;
                let header_value = HeaderValue::from_str(&value).map_err(|_| {
                    MonitorError::InvalidRequest(format!("invalid value for header {}", name))
                })?;
                headers.insert(header_name, header_value);
            }
        }

        if !headers.contains_key(USER_AGENT) {
            let agent = HeaderValue::from_str(&self.user_agent)
                .map_err(|_| MonitorError::InvalidRequest("invalid user agent".to_string()))?;
            headers.insert(USER_AGENT, agent);
        }

        Ok(headers)
    }
}

/// 2xx and unfollowed 3xx responses count as available
fn is_available(code: StatusCode) -> bool {
    code.is_success() || code.is_redirection()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HealthCheckConfig;
    use crate::secrets::StaticSecrets;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prober() -> Prober {
        let secrets = StaticSecrets::new().with("API_KEY", "abc123");
        Prober::new(Arc::new(secrets)).unwrap()
    }

    fn healthcheck(url: Option<String>) -> HealthCheckConfig {
        HealthCheckConfig {
            url,
            method: None,
            timeout: None,
            headers: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_success_is_up_with_status_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let service = ServiceConfig::new("api", "API", format!("{}/", server.uri()));
        let outcome = prober().probe(&service).await;

        assert_eq!(outcome.result.status, ProbeStatus::Up);
        assert_eq!(outcome.result.status_code, Some(204));
        assert_eq!(outcome.result.service_name, "API");
        assert_eq!(outcome.writes.len(), 1);
        assert!(outcome.writes[0].up);
        assert_eq!(outcome.writes[0].key, "api");
    }

    #[tokio::test]
    async fn test_error_status_is_down_with_status_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let service = ServiceConfig::new("api", "API", server.uri());
        let outcome = prober().probe(&service).await;

        assert_eq!(outcome.result.status, ProbeStatus::Down);
        assert_eq!(outcome.result.status_code, Some(503));
        assert_eq!(outcome.writes[0].status_code, 503);
    }

    #[tokio::test]
    async fn test_timeout_is_down_without_status_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let service = ServiceConfig::new("slow", "Slow", "https://unused.invalid").with_healthcheck(
            HealthCheckConfig {
                timeout: Some(200),
                ..healthcheck(Some(server.uri()))
            },
        );
        let outcome = prober().probe(&service).await;

        assert_eq!(outcome.result.status, ProbeStatus::Down);
        assert_eq!(outcome.result.status_code, None);
        assert!(outcome.result.latency >= 200, "latency {}", outcome.result.latency);
        assert!(outcome.result.latency < 3000, "latency {}", outcome.result.latency);
        assert_eq!(outcome.writes[0].status_code, 0);
    }

    #[tokio::test]
    async fn test_connection_refused_is_down() {
        let service = ServiceConfig::new("gone", "Gone", "http://127.0.0.1:1/");
        let outcome = prober().probe(&service).await;

        assert_eq!(outcome.result.status, ProbeStatus::Down);
        assert_eq!(outcome.result.status_code, None);
        assert!(!outcome.writes[0].up);
    }

    #[tokio::test]
    async fn test_healthcheck_overrides_target_method_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/healthz"))
            .and(header("authorization", "Bearer abc123"))
            .and(header("x-missing", "OTHER_KEY"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), "Bearer $API_KEY".to_string());
        headers.insert("X-Missing".to_string(), "$OTHER_KEY".to_string());
        let service = ServiceConfig::new("api", "API", "https://public.example.com").with_healthcheck(
            HealthCheckConfig {
                method: Some("post".to_string()),
                headers,
                ..healthcheck(Some(format!("{}/healthz", server.uri())))
            },
        );

        let outcome = prober().probe(&service).await;

        assert_eq!(outcome.result.status, ProbeStatus::Up);
        // The result reports the public link, not the healthcheck endpoint
        assert_eq!(outcome.result.url, "https://public.example.com");
    }

    #[tokio::test]
    async fn test_default_user_agent_unless_overridden() {
        let server = MockServer::start().await;
        let default_agent = format!(
            "Mozilla/5.0 (compatible; uptime_monitor/{})",
            env!("CARGO_PKG_VERSION")
        );
        Mock::given(method("GET"))
            .and(path("/default"))
            .and(header("user-agent", default_agent.as_str()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/custom"))
            .and(header("user-agent", "status-bot/2.0"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let plain = ServiceConfig::new("a", "A", format!("{}/default", server.uri()));
        assert!(prober().probe(&plain).await.result.is_up());

        let mut headers = BTreeMap::new();
        headers.insert("User-Agent".to_string(), "status-bot/2.0".to_string());
        let custom = ServiceConfig::new("b", "B", format!("{}/custom", server.uri())).with_healthcheck(
            HealthCheckConfig {
                headers,
                ..healthcheck(None)
            },
        );
        assert!(prober().probe(&custom).await.result.is_up());
    }

    #[tokio::test]
    async fn test_invalid_method_is_down() {
        let service = ServiceConfig::new("api", "API", "http://127.0.0.1:1/").with_healthcheck(
            HealthCheckConfig {
                method: Some("NOT A METHOD".to_string()),
                ..healthcheck(None)
            },
        );
        let outcome = prober().probe(&service).await;

        assert_eq!(outcome.result.status, ProbeStatus::Down);
        assert_eq!(outcome.result.status_code, None);
    }

    #[test]
    fn test_availability_range() {
        assert!(is_available(StatusCode::OK));
        assert!(is_available(StatusCode::NOT_MODIFIED));
        assert!(!is_available(StatusCode::NOT_FOUND));
        assert!(!is_available(StatusCode::INTERNAL_SERVER_ERROR));
    }
}
