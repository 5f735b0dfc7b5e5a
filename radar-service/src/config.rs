//! Configuration module for environment variable parsing.
//!
//! Everything except the webhook secret has a default. Invalid values for
//! optional settings fall back to the default with a warning.

use std::env;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;
use url::Url;

/// Default GitHub REST API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// GitHub caps webhook payloads at 25 MB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("WEBHOOK_SECRET must be set to a non-empty value")]
    MissingSecret,

    #[error("{name} is not a valid URL: {value}")]
    InvalidUrl { name: &'static str, value: String },
}

/// Shared HMAC key for webhook signature verification.
///
/// `Debug` is redacted so the secret cannot leak through logged structs.
#[derive(Clone)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret([redacted])")
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HMAC key shared with GitHub
    pub webhook_secret: WebhookSecret,

    /// Bearer token for the GitHub REST API
    pub api_token: Option<String>,

    /// Port for the web server to listen on
    pub port: u16,

    /// Base URL of the GitHub REST API
    pub api_base_url: Url,

    /// Timeout applied to every outbound API request
    pub request_timeout_ms: u64,

    /// Largest accepted webhook body
    pub max_body_bytes: usize,

    /// Answer 401 instead of 500 when the signature does not verify
    pub reject_invalid_signature_with_401: bool,

    /// Submit push scans against the pushed ref instead of refs/heads/main
    pub scan_pushed_ref: bool,

    /// How long handled delivery ids are remembered; 0 disables deduplication
    pub delivery_dedup_ttl_secs: u64,

    /// Maximum number of remembered delivery ids
    pub delivery_dedup_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let webhook_secret = lookup("WEBHOOK_SECRET")
            .filter(|s| !s.trim().is_empty())
            .map(WebhookSecret::new)
            .ok_or(ConfigError::MissingSecret)?;

        let raw_url = lookup("API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = Url::parse(&raw_url).map_err(|_| ConfigError::InvalidUrl {
            name: "API_BASE_URL",
            value: raw_url.clone(),
        })?;

        Ok(Config {
            webhook_secret,

            api_token: lookup("API_TOKEN").filter(|s| !s.trim().is_empty()),

            port: parse_or(&lookup, "PORT", 3000),

            api_base_url,

            request_timeout_ms: parse_or(&lookup, "REQUEST_TIMEOUT_MS", 10_000),

            max_body_bytes: parse_or(&lookup, "MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES),

            reject_invalid_signature_with_401: parse_flag(
                &lookup,
                "REJECT_INVALID_SIGNATURE_WITH_401",
                false,
            ),

            scan_pushed_ref: parse_flag(&lookup, "SCAN_PUSHED_REF", false),

            delivery_dedup_ttl_secs: parse_or(&lookup, "DELIVERY_DEDUP_TTL_SECS", 0),

            delivery_dedup_capacity: parse_or(&lookup, "DELIVERY_DEDUP_CAPACITY", 4096),
        })
    }

    /// Whether delivery deduplication is turned on.
    pub fn dedup_enabled(&self) -> bool {
        self.delivery_dedup_ttl_secs > 0 && self.delivery_dedup_capacity > 0
    }
}

/// Parse a value, falling back to `default` when unset or invalid.
fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = match lookup(name) {
        Some(v) => v,
        None => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Parse a boolean flag such as "true", "1", "off".
fn parse_flag<F>(lookup: &F, name: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let raw = match lookup(name) {
        Some(v) => v,
        None => return default,
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!(env_var = name, value = %raw, "Invalid flag value, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[("WEBHOOK_SECRET", "s3cret")])).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.api_base_url.as_str(), "https://api.github.com/");
        assert_eq!(config.request_timeout_ms, 10_000);
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert!(config.api_token.is_none());
        assert!(!config.reject_invalid_signature_with_401);
        assert!(!config.scan_pushed_ref);
        assert!(!config.dedup_enabled());
    }

    #[test]
    fn test_missing_secret() {
        let result = Config::from_lookup(lookup_from(&[("PORT", "8080")]));
        assert!(matches!(result, Err(ConfigError::MissingSecret)));

        let result = Config::from_lookup(lookup_from(&[("WEBHOOK_SECRET", "   ")]));
        assert!(matches!(result, Err(ConfigError::MissingSecret)));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("WEBHOOK_SECRET", "s3cret"),
            ("API_TOKEN", "ghp_token"),
            ("PORT", "8080"),
            ("API_BASE_URL", "http://localhost:9000/api/v3/"),
            ("REJECT_INVALID_SIGNATURE_WITH_401", "TRUE"),
            ("SCAN_PUSHED_REF", "1"),
            ("DELIVERY_DEDUP_TTL_SECS", "600"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.api_token.as_deref(), Some("ghp_token"));
        assert_eq!(config.api_base_url.as_str(), "http://localhost:9000/api/v3/");
        assert!(config.reject_invalid_signature_with_401);
        assert!(config.scan_pushed_ref);
        assert!(config.dedup_enabled());
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("WEBHOOK_SECRET", "s3cret"),
            ("PORT", "not-a-port"),
            ("SCAN_PUSHED_REF", "maybe"),
        ]))
        .unwrap();

        assert_eq!(config.port, 3000);
        assert!(!config.scan_pushed_ref);
    }

    #[test]
    fn test_invalid_url() {
        let result = Config::from_lookup(lookup_from(&[
            ("WEBHOOK_SECRET", "s3cret"),
            ("API_BASE_URL", "not a url"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = WebhookSecret::new("hunter2");
        assert!(!format!("{:?}", secret).contains("hunter2"));
    }
}
