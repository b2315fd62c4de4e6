//! Error types for the uptime monitor

use std::fmt;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Debug)]
pub enum MonitorError {
    /// IO operation failed
    Io(std::io::Error),

    /// HTTP request failed
    Http(reqwest::Error),

    /// JSON serialization/deserialization failed
    Json(serde_json::Error),

    /// Configuration error
    Config(String),

    /// No configured service carries this id
    ServiceNotFound(String),

    /// Probe exceeded its deadline
    Timeout(Duration),

    /// Probe request could not be built (bad method, header or URL)
    InvalidRequest(String),

    /// Time-series store rejected a write or query
    Store(String),
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::Io(err) => write!(f, "IO error: {}", err),
            MonitorError::Http(err) => write!(f, "HTTP error: {}", err),
            MonitorError::Json(err) => write!(f, "JSON error: {}", err),
            MonitorError::Config(msg) => write!(f, "Configuration error: {}", msg),
            MonitorError::ServiceNotFound(id) => write!(f, "Service {} not found", id),
            MonitorError::Timeout(after) => {
                write!(f, "Request timed out after {}ms", after.as_millis())
            }
            MonitorError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            MonitorError::Store(msg) => write!(f, "Store error: {}", msg),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Io(err) => Some(err),
            MonitorError::Http(err) => Some(err),
            MonitorError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        MonitorError::Io(err)
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        MonitorError::Http(err)
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Json(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn kind(err: &MonitorError) -> &'static str {
        match err {
            MonitorError::Io(_) => "io",
            MonitorError::Http(_) => "http",
            MonitorError::Json(_) => "json",
            MonitorError::Config(_) => "config",
            MonitorError::ServiceNotFound(_) => "not-found",
            MonitorError::Timeout(_) => "timeout",
            MonitorError::InvalidRequest(_) => "invalid-request",
            MonitorError::Store(_) => "store",
        }
    }

    #[test]
    fn test_display_and_source() {
        let err = MonitorError::ServiceNotFound("api".to_string());
        assert_eq!(kind(&err), "not-found");
        assert_eq!(err.to_string(), "Service api not found");
        assert!(err.source().is_none());

        let err = MonitorError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "Request timed out after 1500ms");

        let err: MonitorError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert_eq!(kind(&err), "json");
        assert!(err.source().is_some());
    }
}
