//! Configuration structures.
//!
//! Configuration is loaded from environment variables (with `.env` support via
//! `dotenvy`) and carries per-section defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Global configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Session budget limits.
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Response cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Remote platform configuration.
    #[serde(default)]
    pub platform: PlatformConfig,

    /// CSV export configuration.
    #[serde(default)]
    pub export: ExportConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Session budget limits. Fixed for the lifetime of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Maximum query executions per session.
    pub max_queries: u32,

    /// Maximum credits spendable per session.
    pub max_credits: f64,

    /// Maximum schema-introspection calls per session.
    pub max_schema_calls: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_queries: 5,
            max_credits: 100.0,
            max_schema_calls: 3,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Default time-to-live for cached entries.
    #[serde(with = "humantime_serde")]
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(600),
        }
    }
}

/// Remote platform configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// API key for the analytics platform.
    pub api_key: String,

    /// REST API base URL.
    pub base_url: String,

    /// GraphQL endpoint for public query search.
    pub graphql_url: String,

    /// Schema-reference repository for code search (owner/name).
    pub reference_repo: String,

    /// Optional token for the code-search API (raises rate limits).
    pub search_token: Option<String>,

    /// Request timeout for platform calls.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.dune.com/api/v1".to_string(),
            graphql_url: "https://core-api.dune.com/public/graphql".to_string(),
            reference_repo: "duneanalytics/spellbook".to_string(),
            search_token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// CSV export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory that receives one CSV artifact per completed job.
    pub directory: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: "./query_exports".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Log output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    /// Lenient parse: `json` (any case) selects JSON, anything else compact.
    pub fn from_env_value(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Compact
        }
    }
}

impl Config {
    /// Build configuration from the process environment.
    ///
    /// Unset variables fall back to section defaults; malformed numeric values
    /// are rejected rather than silently defaulted.
    pub fn from_env() -> crate::types::Result<Self> {
        let mut config = Config::default();

        if let Ok(v) = std::env::var("MAX_QUERIES_PER_SESSION") {
            config.budget.max_queries = parse_env("MAX_QUERIES_PER_SESSION", &v)?;
        }
        if let Ok(v) = std::env::var("MAX_CREDITS_PER_SESSION") {
            config.budget.max_credits = parse_env("MAX_CREDITS_PER_SESSION", &v)?;
        }
        if let Ok(v) = std::env::var("MAX_SCHEMA_CALLS_PER_SESSION") {
            config.budget.max_schema_calls = parse_env("MAX_SCHEMA_CALLS_PER_SESSION", &v)?;
        }
        if let Ok(v) = std::env::var("QUERYDECK_API_KEY") {
            config.platform.api_key = v;
        }
        if let Ok(v) = std::env::var("QUERYDECK_API_BASE_URL") {
            config.platform.base_url = v;
        }
        if let Ok(v) = std::env::var("QUERYDECK_GRAPHQL_URL") {
            config.platform.graphql_url = v;
        }
        if let Ok(v) = std::env::var("QUERYDECK_REFERENCE_REPO") {
            config.platform.reference_repo = v;
        }
        if let Ok(v) = std::env::var("GITHUB_TOKEN") {
            config.platform.search_token = Some(v);
        }
        if let Ok(v) = std::env::var("EXPORT_DIRECTORY") {
            config.export.directory = v;
        }
        if let Ok(v) = std::env::var("QUERYDECK_LOG_FORMAT") {
            config.observability.log_format = LogFormat::from_env_value(&v);
        }

        Ok(config)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> crate::types::Result<T> {
    value.parse().map_err(|_| {
        crate::types::Error::validation(format!("invalid value for {}: '{}'", name, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.budget.max_queries, 5);
        assert!((config.budget.max_credits - 100.0).abs() < f64::EPSILON);
        assert_eq!(config.budget.max_schema_calls, 3);
        assert_eq!(config.cache.default_ttl, Duration::from_secs(600));
        assert_eq!(config.export.directory, "./query_exports");
        assert_eq!(config.observability.log_format, LogFormat::Compact);
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_env_value("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::from_env_value("anything"), LogFormat::Compact);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        let parsed: crate::types::Result<u32> = parse_env("MAX_QUERIES_PER_SESSION", "lots");
        assert!(parsed.is_err());
    }
}
