//! Runtime configuration, read from the environment.

use crate::backend::BackendConfig;
use crate::error::{EngineError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    /// Socket address the HTTP API listens on.
    pub bind_addr: String,
    /// How to reach the ERP backend.
    pub backend: BackendConfig,
    /// Rule book to load instead of the bundled one.
    pub vacation_rules: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables, after reading a
    /// `.env` file if one is present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout_secs = match var("ERP_BACKEND_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                EngineError::configuration(format!("Invalid ERP_BACKEND_TIMEOUT_SECS: {raw}"))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let config = Config {
            bind_addr: var("ERP_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            backend: BackendConfig {
                base_url: var("ERP_BACKEND_URL").unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
                timeout: Duration::from_secs(timeout_secs),
                auth_token: var("ERP_AUTH_TOKEN"),
            },
            vacation_rules: var("ERP_VACATION_RULES").map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend.timeout.is_zero() {
            return Err(EngineError::configuration(
                "Backend timeout must be greater than 0",
            ));
        }
        if !self.backend.base_url.starts_with("http://") && !self.backend.base_url.starts_with("https://") {
            return Err(EngineError::configuration(format!(
                "Backend URL must be http(s): {}",
                self.backend.base_url
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.backend.base_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.backend.timeout, Duration::from_secs(30));
        assert!(config.backend.auth_token.is_none());
        assert!(config.vacation_rules.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("ERP_BIND_ADDR", "0.0.0.0:8080"),
            ("ERP_BACKEND_URL", "https://erp.example.com/api"),
            ("ERP_BACKEND_TIMEOUT_SECS", "5"),
            ("ERP_AUTH_TOKEN", "abc"),
            ("ERP_VACATION_RULES", "/etc/erp/rules.json"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.backend.timeout, Duration::from_secs(5));
        assert_eq!(config.backend.auth_token.as_deref(), Some("abc"));
        assert_eq!(config.vacation_rules, Some(PathBuf::from("/etc/erp/rules.json")));
    }

    #[test]
    fn test_invalid_values() {
        for pairs in [
            vec![("ERP_BACKEND_TIMEOUT_SECS", "soon")],
            vec![("ERP_BACKEND_TIMEOUT_SECS", "0")],
            vec![("ERP_BACKEND_URL", "localhost:5000")],
        ] {
            let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(matches!(err, EngineError::Configuration(_)));
        }
    }
}
