//! Connector configuration
//!
//! The host hands the task a flat string-keyed map at startup. This module
//! turns that map into an immutable [`ConnectorConfig`] exactly once; the
//! struct is then passed by reference into the poller and never mutated.
//! Invalid or missing required keys fail the task at startup, the only
//! point where errors are allowed to escape the connector.
//!
//! The CLI accepts the same keys from a YAML file (scalar values only).

use crate::error::{Error, Result};
use crate::offset::PartitionKey;
use crate::types::StringMap;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Configuration keys
// ============================================================================

/// Destination topic for emitted records
pub const TOPIC_KEY: &str = "topic";
/// Identity of the user whose playback history is polled; defines the partition
pub const USERNAME_KEY: &str = "username";
/// Seconds to sleep at the start of every poll cycle
pub const POLL_INTERVAL_KEY: &str = "poll.interval.seconds";
/// Historical window fetched on first run, when no committed offset exists
pub const LOOKBACK_KEY: &str = "lookback.seconds";
/// Base URL of the playback-history API
pub const BASE_URL_KEY: &str = "api.base.url";
/// Maximum events requested per page
pub const PAGE_LIMIT_KEY: &str = "api.page.limit";
/// Static OAuth access token
pub const ACCESS_TOKEN_KEY: &str = "oauth.access.token";
/// OAuth client id (refresh flow)
pub const CLIENT_ID_KEY: &str = "oauth.client.id";
/// OAuth client secret (refresh flow)
pub const CLIENT_SECRET_KEY: &str = "oauth.client.secret";
/// OAuth refresh token (refresh flow)
pub const REFRESH_TOKEN_KEY: &str = "oauth.refresh.token";
/// OAuth token endpoint (refresh flow)
pub const TOKEN_URL_KEY: &str = "oauth.token.url";
/// Per-request timeout in seconds
pub const HTTP_TIMEOUT_KEY: &str = "http.timeout.seconds";
/// Maximum retries per fetch inside the source adapter
pub const HTTP_MAX_RETRIES_KEY: &str = "http.max.retries";
/// Client-side request rate cap
pub const HTTP_RPS_KEY: &str = "http.requests.per.second";

const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const DEFAULT_LOOKBACK_SECS: u64 = 180 * 24 * 60 * 60; // ~6 months
const DEFAULT_BASE_URL: &str = "https://api.playback.example/v1";
const DEFAULT_PAGE_LIMIT: u32 = 50;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HTTP_MAX_RETRIES: u32 = 3;
const DEFAULT_HTTP_RPS: u32 = 2;

// ============================================================================
// Config structs
// ============================================================================

/// Immutable connector configuration, built once at startup
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Destination topic for emitted records
    pub topic: String,
    /// User identity; one task instance polls one user
    pub username: String,
    /// Sleep duration at the start of each poll cycle
    pub poll_interval: Duration,
    /// Bootstrap lookback window (first run only)
    pub lookback: chrono::Duration,
    /// API endpoint settings
    pub api: ApiConfig,
    /// Credential settings, passed opaquely to the source adapter
    pub auth: AuthSettings,
}

/// Playback API endpoint settings
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the playback-history API
    pub base_url: String,
    /// Maximum events requested per page
    pub page_limit: u32,
    /// Per-request timeout
    pub timeout: Duration,
    /// Maximum retries per fetch
    pub max_retries: u32,
    /// Client-side request rate cap (requests per second)
    pub requests_per_second: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_limit: DEFAULT_PAGE_LIMIT,
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            max_retries: DEFAULT_HTTP_MAX_RETRIES,
            requests_per_second: DEFAULT_HTTP_RPS,
        }
    }
}

/// Credentials for the playback API
#[derive(Debug, Clone, Default)]
pub struct AuthSettings {
    /// Static bearer token; used directly when no refresh flow is configured
    pub access_token: Option<String>,
    /// OAuth2 refresh-token flow; takes precedence over the static token
    pub refresh: Option<RefreshFlow>,
}

/// OAuth2 refresh-token flow settings
#[derive(Debug, Clone)]
pub struct RefreshFlow {
    /// Token endpoint URL
    pub token_url: String,
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Long-lived refresh token
    pub refresh_token: String,
}

impl ConnectorConfig {
    /// Build a configuration from the host's string-keyed property map.
    pub fn from_map(map: &StringMap) -> Result<Self> {
        let topic = required(map, TOPIC_KEY)?;
        let username = required(map, USERNAME_KEY)?;

        let poll_interval_secs = parse_u64(map, POLL_INTERVAL_KEY, DEFAULT_POLL_INTERVAL_SECS)?;
        if poll_interval_secs == 0 {
            return Err(Error::invalid_value(POLL_INTERVAL_KEY, "must be positive"));
        }

        let lookback_secs = parse_u64(map, LOOKBACK_KEY, DEFAULT_LOOKBACK_SECS)?;
        if lookback_secs == 0 {
            return Err(Error::invalid_value(LOOKBACK_KEY, "must be positive"));
        }

        let page_limit = parse_u64(map, PAGE_LIMIT_KEY, u64::from(DEFAULT_PAGE_LIMIT))? as u32;
        if page_limit == 0 || page_limit > 200 {
            return Err(Error::invalid_value(
                PAGE_LIMIT_KEY,
                "must be between 1 and 200",
            ));
        }

        let base_url =
            optional(map, BASE_URL_KEY).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        url::Url::parse(&base_url)?;

        let api = ApiConfig {
            base_url,
            page_limit,
            timeout: Duration::from_secs(parse_u64(
                map,
                HTTP_TIMEOUT_KEY,
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
            max_retries: parse_u64(map, HTTP_MAX_RETRIES_KEY, u64::from(DEFAULT_HTTP_MAX_RETRIES))?
                as u32,
            requests_per_second: parse_u64(map, HTTP_RPS_KEY, u64::from(DEFAULT_HTTP_RPS))? as u32,
        };

        let auth = Self::auth_from_map(map)?;
        let lookback = chrono::Duration::seconds(lookback_secs as i64);

        Ok(Self {
            topic,
            username,
            poll_interval: Duration::from_secs(poll_interval_secs),
            lookback,
            api,
            auth,
        })
    }

    /// Load a configuration from a YAML file of scalar key/value pairs.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    /// Parse a configuration from a YAML string of scalar key/value pairs.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let raw: std::collections::HashMap<String, serde_yaml::Value> =
            serde_yaml::from_str(yaml)?;

        let mut map = StringMap::new();
        for (key, value) in raw {
            let rendered = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                other => {
                    return Err(Error::invalid_value(
                        key,
                        format!("expected a scalar value, got {other:?}"),
                    ))
                }
            };
            map.insert(key, rendered);
        }

        Self::from_map(&map)
    }

    /// The partition key this task instance owns
    pub fn partition_key(&self) -> PartitionKey {
        PartitionKey::new(&self.username)
    }

    fn auth_from_map(map: &StringMap) -> Result<AuthSettings> {
        let access_token = optional(map, ACCESS_TOKEN_KEY);

        let refresh_fields = [
            optional(map, TOKEN_URL_KEY),
            optional(map, CLIENT_ID_KEY),
            optional(map, CLIENT_SECRET_KEY),
            optional(map, REFRESH_TOKEN_KEY),
        ];

        let refresh = match refresh_fields {
            [Some(token_url), Some(client_id), Some(client_secret), Some(refresh_token)] => {
                Some(RefreshFlow {
                    token_url,
                    client_id,
                    client_secret,
                    refresh_token,
                })
            }
            [None, None, None, None] => None,
            _ => {
                return Err(Error::config(format!(
                    "incomplete OAuth refresh settings: {TOKEN_URL_KEY}, {CLIENT_ID_KEY}, \
                     {CLIENT_SECRET_KEY} and {REFRESH_TOKEN_KEY} must all be set together"
                )))
            }
        };

        if access_token.is_none() && refresh.is_none() {
            return Err(Error::missing_field(ACCESS_TOKEN_KEY));
        }

        Ok(AuthSettings {
            access_token,
            refresh,
        })
    }
}

// ============================================================================
// Map helpers
// ============================================================================

fn required(map: &StringMap, key: &str) -> Result<String> {
    optional(map, key).ok_or_else(|| Error::missing_field(key))
}

fn optional(map: &StringMap, key: &str) -> Option<String> {
    map.get(key).filter(|v| !v.is_empty()).cloned()
}

fn parse_u64(map: &StringMap, key: &str, default: u64) -> Result<u64> {
    match map.get(key).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|e| Error::invalid_value(key, e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn minimal_map() -> StringMap {
        let mut map = StringMap::new();
        map.insert(TOPIC_KEY.to_string(), "plays".to_string());
        map.insert(USERNAME_KEY.to_string(), "alice".to_string());
        map.insert(ACCESS_TOKEN_KEY.to_string(), "tok".to_string());
        map
    }

    #[test]
    fn test_from_map_minimal() {
        let config = ConnectorConfig::from_map(&minimal_map()).unwrap();
        assert_eq!(config.topic, "plays");
        assert_eq!(config.username, "alice");
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.lookback, chrono::Duration::days(180));
        assert_eq!(config.api.page_limit, 50);
        assert_eq!(config.auth.access_token.as_deref(), Some("tok"));
        assert!(config.auth.refresh.is_none());
    }

    #[test]
    fn test_from_map_missing_topic() {
        let mut map = minimal_map();
        map.remove(TOPIC_KEY);
        let err = ConnectorConfig::from_map(&map).unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { field } if field == TOPIC_KEY));
    }

    #[test]
    fn test_from_map_missing_username() {
        let mut map = minimal_map();
        map.remove(USERNAME_KEY);
        assert!(ConnectorConfig::from_map(&map).is_err());
    }

    #[test]
    fn test_from_map_missing_credentials() {
        let mut map = minimal_map();
        map.remove(ACCESS_TOKEN_KEY);
        let err = ConnectorConfig::from_map(&map).unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { .. }));
    }

    #[test]
    fn test_from_map_invalid_interval() {
        let mut map = minimal_map();
        map.insert(POLL_INTERVAL_KEY.to_string(), "0".to_string());
        assert!(ConnectorConfig::from_map(&map).is_err());

        map.insert(POLL_INTERVAL_KEY.to_string(), "abc".to_string());
        let err = ConnectorConfig::from_map(&map).unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_from_map_refresh_flow() {
        let mut map = minimal_map();
        map.remove(ACCESS_TOKEN_KEY);
        map.insert(TOKEN_URL_KEY.to_string(), "https://auth.example/token".to_string());
        map.insert(CLIENT_ID_KEY.to_string(), "cid".to_string());
        map.insert(CLIENT_SECRET_KEY.to_string(), "secret".to_string());
        map.insert(REFRESH_TOKEN_KEY.to_string(), "refresh".to_string());

        let config = ConnectorConfig::from_map(&map).unwrap();
        let refresh = config.auth.refresh.unwrap();
        assert_eq!(refresh.client_id, "cid");
        assert_eq!(refresh.token_url, "https://auth.example/token");
    }

    #[test]
    fn test_from_map_partial_refresh_flow_rejected() {
        let mut map = minimal_map();
        map.insert(CLIENT_ID_KEY.to_string(), "cid".to_string());
        let err = ConnectorConfig::from_map(&map).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_from_map_overrides() {
        let mut map = minimal_map();
        map.insert(POLL_INTERVAL_KEY.to_string(), "5".to_string());
        map.insert(LOOKBACK_KEY.to_string(), "3600".to_string());
        map.insert(PAGE_LIMIT_KEY.to_string(), "25".to_string());
        map.insert(BASE_URL_KEY.to_string(), "http://localhost:9999".to_string());

        let config = ConnectorConfig::from_map(&map).unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.lookback, chrono::Duration::seconds(3600));
        assert_eq!(config.api.page_limit, 25);
        assert_eq!(config.api.base_url, "http://localhost:9999");
    }

    #[test]
    fn test_from_map_invalid_base_url() {
        let mut map = minimal_map();
        map.insert(BASE_URL_KEY.to_string(), "not a url".to_string());
        let err = ConnectorConfig::from_map(&map).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn test_from_map_page_limit_bounds() {
        let mut map = minimal_map();
        map.insert(PAGE_LIMIT_KEY.to_string(), "201".to_string());
        assert!(ConnectorConfig::from_map(&map).is_err());

        map.insert(PAGE_LIMIT_KEY.to_string(), "0".to_string());
        assert!(ConnectorConfig::from_map(&map).is_err());
    }

    #[test]
    fn test_from_yaml_str() {
        let yaml = r#"
topic: plays
username: alice
oauth.access.token: tok
poll.interval.seconds: 10
api.page.limit: 20
"#;
        let config = ConnectorConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.username, "alice");
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.api.page_limit, 20);
    }

    #[test]
    fn test_from_yaml_str_rejects_nested_values() {
        let yaml = r#"
topic: plays
username: alice
oauth.access.token: tok
api.page.limit: [1, 2]
"#;
        assert!(ConnectorConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_partition_key() {
        let config = ConnectorConfig::from_map(&minimal_map()).unwrap();
        assert_eq!(config.partition_key(), PartitionKey::new("alice"));
    }
}
