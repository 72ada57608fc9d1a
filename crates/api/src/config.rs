//! Application configuration loaded from environment variables.

use std::time::Duration;

use order_store::ConnectOptions;
use saga::{CompensationPolicy, OrchestratorConfig, OrderPersistence};
use thiserror::Error;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error(
        "RECOVERY_STALE_AFTER_SECS ({stale_after:?}) must exceed PAYMENT_TIMEOUT_MS ({payment_timeout:?})"
    )]
    RecoveryTooEager {
        stale_after: Duration,
        payment_timeout: Duration,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}', expected 'text' or 'json'")),
        }
    }
}

/// Cart service configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`, `PORT` — bind address (default: `0.0.0.0:8081`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `text` or `json` (default: `text`)
/// - `DATABASE_URL` — PostgreSQL URL; unset runs on the in-memory store
/// - `DATABASE_MAX_CONNECTIONS` — pool size (default: 10)
/// - `PAYMENT_SERVICE_URL`, `NOTIFICATION_SERVICE_URL` — collaborator base URLs
/// - `PAYMENT_TIMEOUT_MS`, `NOTIFICATION_TIMEOUT_MS` — per-call bounds (default: 10000 / 5000)
/// - `ORDER_PERSISTENCE` — `required` or `skip` (default: `required`)
/// - `COMPENSATION_MAX_ATTEMPTS`, `COMPENSATION_BACKOFF_MS` — compensation retry (default: 1 / 200)
/// - `RECOVERY_INTERVAL_SECS` — stranded-order scan period, 0 disables (default: 0)
/// - `RECOVERY_STALE_AFTER_SECS` — age before a saga counts as stranded (default: 300)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub payment_service_url: String,
    pub notification_service_url: String,
    pub payment_timeout: Duration,
    pub notification_timeout: Duration,
    pub order_persistence: OrderPersistence,
    pub compensation_max_attempts: u32,
    pub compensation_backoff: Duration,
    pub recovery_interval: Option<Duration>,
    pub recovery_stale_after: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which returns the value of a variable.
    ///
    /// Unparseable numbers fall back to their defaults; malformed modes and
    /// URLs are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        let config = Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parse_enum(&lookup, "LOG_FORMAT")?.unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.database_max_connections),
            payment_service_url: parse_url(&lookup, "PAYMENT_SERVICE_URL")?
                .unwrap_or(defaults.payment_service_url),
            notification_service_url: parse_url(&lookup, "NOTIFICATION_SERVICE_URL")?
                .unwrap_or(defaults.notification_service_url),
            payment_timeout: number("PAYMENT_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.payment_timeout),
            notification_timeout: number("NOTIFICATION_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.notification_timeout),
            order_persistence: parse_enum(&lookup, "ORDER_PERSISTENCE")?
                .unwrap_or(defaults.order_persistence),
            compensation_max_attempts: lookup("COMPENSATION_MAX_ATTEMPTS")
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|n| *n >= 1)
                .unwrap_or(defaults.compensation_max_attempts),
            compensation_backoff: number("COMPENSATION_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.compensation_backoff),
            recovery_interval: match number("RECOVERY_INTERVAL_SECS") {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.recovery_interval,
            },
            recovery_stale_after: number("RECOVERY_STALE_AFTER_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.recovery_stale_after),
        };

        if config.recovery_interval.is_some()
            && config.recovery_stale_after <= config.payment_timeout
        {
            return Err(ConfigError::RecoveryTooEager {
                stale_after: config.recovery_stale_after,
                payment_timeout: config.payment_timeout,
            });
        }

        Ok(config)
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Settings for the checkout orchestrator.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig::default()
            .with_payment_timeout(self.payment_timeout)
            .with_notification_timeout(self.notification_timeout)
            .with_persistence(self.order_persistence)
            .with_compensation(self.compensation_policy())
    }

    pub fn compensation_policy(&self) -> CompensationPolicy {
        CompensationPolicy::new(self.compensation_max_attempts, self.compensation_backoff)
    }

    /// PostgreSQL connection settings, when a database is configured.
    pub fn connect_options(&self) -> Option<ConnectOptions> {
        self.database_url.as_ref().map(|url| {
            ConnectOptions::new(url.clone()).with_max_connections(self.database_max_connections)
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            payment_service_url: "http://payment:8082".to_string(),
            notification_service_url: "http://notification:8083".to_string(),
            payment_timeout: Duration::from_secs(10),
            notification_timeout: Duration::from_secs(5),
            order_persistence: OrderPersistence::Required,
            compensation_max_attempts: 1,
            compensation_backoff: Duration::from_millis(200),
            recovery_interval: None,
            recovery_stale_after: Duration::from_secs(300),
        }
    }
}

fn parse_enum<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr<Err = String>,
{
    lookup(var)
        .map(|value| {
            value
                .parse()
                .map_err(|reason| ConfigError::InvalidValue { var, value, reason })
        })
        .transpose()
}

fn parse_url<F>(lookup: &F, var: &'static str) -> Result<Option<String>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|value| match reqwest::Url::parse(&value) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(value),
            Ok(url) => Err(ConfigError::InvalidValue {
                var,
                reason: format!("unsupported scheme '{}'", url.scheme()),
                value,
            }),
            Err(e) => Err(ConfigError::InvalidValue {
                var,
                reason: e.to_string(),
                value,
            }),
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8081);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
        assert_eq!(config.order_persistence, OrderPersistence::Required);
        assert_eq!(config.compensation_max_attempts, 1);
        assert!(config.recovery_interval.is_none());
    }

    #[test]
    fn test_empty_environment_matches_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.addr(), "0.0.0.0:8081");
        assert_eq!(config.payment_service_url, "http://payment:8082");
        assert_eq!(config.notification_service_url, "http://notification:8083");
        assert!(config.connect_options().is_none());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_reads_overrides() {
        let config = load(&[
            ("PORT", "9000"),
            ("LOG_FORMAT", "json"),
            ("DATABASE_URL", "postgres://localhost/cart"),
            ("PAYMENT_SERVICE_URL", "http://localhost:8082"),
            ("PAYMENT_TIMEOUT_MS", "2500"),
            ("ORDER_PERSISTENCE", "skip"),
            ("COMPENSATION_MAX_ATTEMPTS", "3"),
        ])
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.payment_timeout, Duration::from_millis(2500));
        assert_eq!(config.order_persistence, OrderPersistence::Skip);

        let orchestrator = config.orchestrator_config();
        assert_eq!(orchestrator.payment_timeout, Duration::from_millis(2500));
        assert_eq!(orchestrator.compensation.max_attempts(), 3);

        let options = config.connect_options().unwrap();
        assert_eq!(options.url, "postgres://localhost/cart");
    }

    #[test]
    fn test_bad_numbers_fall_back() {
        let config = load(&[("PORT", "eighty"), ("NOTIFICATION_TIMEOUT_MS", "-1")]).unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.notification_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_unknown_persistence_mode() {
        let err = load(&[("ORDER_PERSISTENCE", "sometimes")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "ORDER_PERSISTENCE",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_malformed_url() {
        assert!(load(&[("PAYMENT_SERVICE_URL", "payment:8082")]).is_err());
        assert!(load(&[("NOTIFICATION_SERVICE_URL", "not a url")]).is_err());
    }

    #[test]
    fn test_recovery_disabled_by_zero() {
        let config = load(&[("RECOVERY_INTERVAL_SECS", "0")]).unwrap();
        assert!(config.recovery_interval.is_none());
    }

    #[test]
    fn test_recovery_must_outlast_payment_timeout() {
        let err = load(&[
            ("RECOVERY_INTERVAL_SECS", "30"),
            ("RECOVERY_STALE_AFTER_SECS", "5"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::RecoveryTooEager { .. }));

        let config = load(&[
            ("RECOVERY_INTERVAL_SECS", "30"),
            ("RECOVERY_STALE_AFTER_SECS", "60"),
        ])
        .unwrap();
        assert_eq!(config.recovery_interval, Some(Duration::from_secs(30)));
    }
}
