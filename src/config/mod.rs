//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::util::time::DEFAULT_TICK_INTERVAL;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS, any origin when unset
    pub client_origin: Option<String>,
    /// Pause between physics ticks
    pub tick_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match var("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => var("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let tick_interval = match var("TICK_INTERVAL_MS") {
            Some(ms) => match ms.parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => return Err(ConfigError::Invalid("TICK_INTERVAL_MS")),
            },
            None => DEFAULT_TICK_INTERVAL,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            client_origin: var("CLIENT_ORIGIN").filter(|origin| !origin.trim().is_empty()),
            tick_interval,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_level: "info".to_string(),
            client_origin: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.log_level, "info");
        assert_eq!(config.client_origin, None);
        assert_eq!(config.tick_interval, Duration::from_millis(10));
    }

    #[test]
    fn port_wins_over_server_addr() {
        let config = load(&[("PORT", "9000"), ("SERVER_ADDR", "127.0.0.1:1234")]).unwrap();
        assert_eq!(config.server_addr, "0.0.0.0:9000".parse::<SocketAddr>().unwrap());

        let config = load(&[("SERVER_ADDR", "127.0.0.1:1234")]).unwrap();
        assert_eq!(config.server_addr, "127.0.0.1:1234".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(load(&[("PORT", "nope")]), Err(ConfigError::InvalidAddress)));
        assert!(matches!(
            load(&[("TICK_INTERVAL_MS", "0")]),
            Err(ConfigError::Invalid("TICK_INTERVAL_MS"))
        ));
        assert!(load(&[("TICK_INTERVAL_MS", "fast")]).is_err());
    }

    #[test]
    fn reads_optional_settings() {
        let config = load(&[
            ("LOG_LEVEL", "debug"),
            ("CLIENT_ORIGIN", "http://localhost:3000"),
            ("TICK_INTERVAL_MS", "16"),
        ])
        .unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.client_origin.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.tick_interval, Duration::from_millis(16));

        assert_eq!(load(&[("CLIENT_ORIGIN", " ")]).unwrap().client_origin, None);
    }
}
