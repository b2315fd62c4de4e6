//! Configuration management for the uptime monitor
//!
//! Two layers: [`Config`] holds runtime settings read from the environment,
//! [`StatusPageConfig`] is the service catalogue loaded from a JSON file.

use crate::errors::{MonitorError, Result};
use crate::models::{Banner, ServiceConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreBackend {
    Memory,
    AnalyticsEngine,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "analytics-engine" | "analytics_engine" | "analytics" => {
                Ok(StoreBackend::AnalyticsEngine)
            }
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Base URL of the Cloudflare API
    pub api_url: String,

    pub account_id: Option<String>,

    pub api_token: Option<String>,

    /// Analytics Engine dataset holding probe points
    pub dataset: String,

    /// Endpoint accepting data points for the dataset
    pub ingest_url: Option<String>,

    /// HTTP timeout for store requests
    pub http_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            api_url: "https://api.cloudflare.com".to_string(),
            account_id: None,
            api_token: None,
            dataset: "workers_status_page".to_string(),
            ingest_url: None,
            http_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the service catalogue JSON
    pub services_path: PathBuf,

    /// Address the status API binds to
    pub listen_addr: String,

    /// Interval between probing cycles
    pub check_interval: Duration,

    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            services_path: PathBuf::from("config.json"),
            listen_addr: "0.0.0.0:8080".to_string(),
            check_interval: Duration::from_secs(60),
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(path) = lookup("STATUS_CONFIG_PATH") {
            config.services_path = PathBuf::from(path);
        }

        if let Some(addr) = lookup("LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Some(interval) = lookup("CHECK_INTERVAL_SECONDS") {
            if let Ok(seconds) = interval.parse::<u64>() {
                config.check_interval = Duration::from_secs(seconds);
            }
        }

        if let Some(backend) = lookup("STORE_BACKEND") {
            if let Ok(backend) = backend.parse() {
                config.store.backend = backend;
            }
        }

        if let Some(api_url) = lookup("ANALYTICS_API_URL") {
            config.store.api_url = api_url;
        }

        config.store.account_id = lookup("ACCOUNT_ID").filter(|v| !v.is_empty());
        config.store.api_token = lookup("API_TOKEN").filter(|v| !v.is_empty());

        if let Some(dataset) = lookup("ANALYTICS_DATASET") {
            config.store.dataset = dataset;
        }

        config.store.ingest_url = lookup("ANALYTICS_INGEST_URL").filter(|v| !v.is_empty());

        if let Some(timeout) = lookup("STORE_HTTP_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.store.http_timeout = Duration::from_secs(seconds);
            }
        }

        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.listen_addr.is_empty() {
            return Err("listen_addr cannot be empty".to_string());
        }

        if self.check_interval.is_zero() {
            return Err("check_interval must be greater than 0".to_string());
        }

        if self.store.http_timeout.is_zero() {
            return Err("store http_timeout must be greater than 0".to_string());
        }

        if self.store.dataset.is_empty()
            || !self
                .store
                .dataset
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(format!("invalid dataset name: {:?}", self.store.dataset));
        }

        if self.store.backend == StoreBackend::AnalyticsEngine && self.store.api_url.is_empty() {
            return Err("api_url cannot be empty for the analytics-engine backend".to_string());
        }

        if self.store.backend == StoreBackend::AnalyticsEngine && self.store.ingest_url.is_none() {
            return Err(
                "ANALYTICS_INGEST_URL must be set for the analytics-engine backend".to_string(),
            );
        }

        Ok(())
    }
}

/// Service catalogue and optional banner shown on the status page
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusPageConfig {
    #[serde(default)]
    pub banner: Option<Banner>,
    pub services: Vec<ServiceConfig>,
}

impl StatusPageConfig {
    pub fn new(services: Vec<ServiceConfig>) -> Self {
        Self {
            banner: None,
            services,
        }
    }

    /// Read and validate the catalogue from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: StatusPageConfig = serde_json::from_str(&raw)?;
        config.validate().map_err(|e| {
            MonitorError::Config(format!("{}: {}", path.display(), e))
        })?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut seen = HashSet::new();

        for service in &self.services {
            if service.id.is_empty() {
                return Err(format!("service {:?} has an empty id", service.name));
            }

            if !seen.insert(service.id.as_str()) {
                return Err(format!("duplicate service id: {}", service.id));
            }

            if service.link.is_empty() {
                return Err(format!("service {} has an empty link", service.id));
            }
        }

        Ok(())
    }

    pub fn service(&self, id: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.id == id)
    }
}
