//! Secret substitution for healthcheck request headers
//!
//! Header values may reference secrets as `$NAME`. Each reference is replaced
//! with the value the [`SecretProvider`] returns for `NAME`, or with the bare
//! `NAME` when no such secret exists.

use regex::{Captures, Regex};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

/// Name to value lookup for secrets referenced by healthcheck headers
pub trait SecretProvider: Send + Sync {
    fn secret(&self, name: &str) -> Option<String>;
}

/// Reads secrets from the process environment
#[derive(Debug, Clone, Default)]
pub struct EnvSecrets;

impl SecretProvider for EnvSecrets {
    fn secret(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed in-memory secret table
#[derive(Debug, Clone, Default)]
pub struct StaticSecrets {
    values: HashMap<String, String>,
}

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl SecretProvider for StaticSecrets {
    fn secret(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$([A-Za-z0-9_]+)").expect("placeholder pattern is valid"))
}

/// Replace every `$NAME` placeholder in a single header value
pub fn resolve_value(value: &str, secrets: &dyn SecretProvider) -> String {
    placeholder_pattern()
        .replace_all(value, |caps: &Captures| {
            let name = &caps[1];
            secrets.secret(name).unwrap_or_else(|| name.to_string())
        })
        .into_owned()
}

/// Resolve placeholders in every header value, keeping header names as-is
pub fn resolve_headers(
    headers: &BTreeMap<String, String>,
    secrets: &dyn SecretProvider,
) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| (name.clone(), resolve_value(value, secrets)))
        .collect()
}
