//! Service configuration loaded from the environment
//!
//! Read once at process start and never mutated afterwards:
//! - `PORT` - public listener port (default 80)
//! - `ADMIN_PORT` - administrative listener port (default 9000)
//! - `GRACEFUL_SHUTDOWN_TIMEOUT` - drain budget, e.g. `30s`, `1m30s`, `500ms` (default 30s)
//! - `RANDOM_SERVICE_BASE_URL` - downstream random service (default `http://localhost/random`)

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_ADMIN_PORT: u16 = 9000;
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RANDOM_SERVICE_BASE_URL: &str = "http://localhost/random";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Operational parameters for the color service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub admin_port: u16,
    pub shutdown_timeout: Duration,
    pub random_service_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            admin_port: DEFAULT_ADMIN_PORT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            random_service_base_url: DEFAULT_RANDOM_SERVICE_BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// Unset or empty variables fall back to their defaults. Set but
    /// unparsable values are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(v) => parse_port("PORT", &v)?,
            None => DEFAULT_PORT,
        };

        let admin_port = match get("ADMIN_PORT") {
            Some(v) => parse_port("ADMIN_PORT", &v)?,
            None => DEFAULT_ADMIN_PORT,
        };

        let shutdown_timeout = match get("GRACEFUL_SHUTDOWN_TIMEOUT") {
            Some(v) => parse_duration(&v)
                .map_err(|reason| ConfigError::invalid("GRACEFUL_SHUTDOWN_TIMEOUT", &v, reason))?,
            None => DEFAULT_SHUTDOWN_TIMEOUT,
        };

        let random_service_base_url = match get("RANDOM_SERVICE_BASE_URL") {
            Some(v) => v.trim().trim_end_matches('/').to_string(),
            None => DEFAULT_RANDOM_SERVICE_BASE_URL.to_string(),
        };
        if random_service_base_url.is_empty() {
            return Err(ConfigError::invalid(
                "RANDOM_SERVICE_BASE_URL",
                &random_service_base_url,
                "must not be empty",
            ));
        }

        Ok(Self {
            port,
            admin_port,
            shutdown_timeout,
            random_service_base_url,
        })
    }
}

fn parse_port(key: &'static str, value: &str) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|e| ConfigError::invalid(key, value, e.to_string()))
}

/// Parse a duration such as `30s`, `1m30s`, `250ms` or `2h`
///
/// A bare integer is interpreted as seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("empty duration".to_string());
    }

    if let Ok(secs) = input.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = input;
    while !rest.is_empty() {
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            return Err(format!("expected a number at {:?}", rest));
        }
        let amount: u64 = rest[..digits]
            .parse()
            .map_err(|e| format!("invalid number: {}", e))?;
        rest = &rest[digits..];

        let unit_len = rest
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .count();
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let part = match unit {
            "ms" => Duration::from_millis(amount),
            "s" => Duration::from_secs(amount),
            "m" => Duration::from_secs(amount.saturating_mul(60)),
            "h" => Duration::from_secs(amount.saturating_mul(3600)),
            "" => return Err(format!("missing unit after {}", amount)),
            other => return Err(format!("unknown unit {:?}", other)),
        };
        total = total.saturating_add(part);
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.port, 80);
        assert_eq!(config.admin_port, 9000);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
        assert_eq!(config.random_service_base_url, "http://localhost/random");
    }

    #[test]
    fn test_overrides_from_environment() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("ADMIN_PORT", "9100"),
            ("GRACEFUL_SHUTDOWN_TIMEOUT", "5s"),
            ("RANDOM_SERVICE_BASE_URL", "http://random:8080/"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.admin_port, 9100);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(config.random_service_base_url, "http://random:8080");
    }

    #[test]
    fn test_empty_values_use_defaults() {
        let config = Config::from_lookup(lookup(&[("PORT", ""), ("ADMIN_PORT", "  ")])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.admin_port, DEFAULT_ADMIN_PORT);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = Config::from_lookup(lookup(&[("PORT", "not-a-port")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "PORT", .. }));

        let err = Config::from_lookup(lookup(&[("ADMIN_PORT", "70000")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "ADMIN_PORT", .. }));
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        let err =
            Config::from_lookup(lookup(&[("GRACEFUL_SHUTDOWN_TIMEOUT", "soon")])).unwrap_err();
        assert!(err.to_string().contains("GRACEFUL_SHUTDOWN_TIMEOUT"));
    }

    #[test]
    fn test_parse_duration_forms() {
        assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_duration("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("45"), Ok(Duration::from_secs(45)));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("10 seconds").is_err());
        assert!(parse_duration("10d").is_err());
        assert!(parse_duration("1m30").is_err());
    }
}
