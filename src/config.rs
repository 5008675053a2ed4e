use std::env;
use std::fmt;

use chrono::Duration;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string; `None` runs on the in-memory backend.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub token_ttl: Duration,
    pub seed_demo_data: bool,
}

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid(key, value) => write!(f, "{} has an invalid value: '{}'", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let token_ttl = match get("TOKEN_TTL_MINUTES") {
            None => Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES),
            Some(raw) => match raw.parse::<i64>() {
                Ok(minutes) if minutes > 0 => Duration::minutes(minutes),
                _ => return Err(ConfigError::Invalid("TOKEN_TTL_MINUTES", raw)),
            },
        };

        let seed_demo_data = match get("SEED_DEMO_DATA").as_deref().map(str::to_ascii_lowercase) {
            None => false,
            Some(flag) => match flag.as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(ConfigError::Invalid("SEED_DEMO_DATA", flag)),
            },
        };

        Ok(Config {
            database_url: get("DATABASE_URL"),
            jwt_secret,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            token_ttl,
            seed_demo_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_secret_is_set() {
        let config = config(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.token_ttl, Duration::minutes(30));
        assert!(!config.seed_demo_data);
    }

    #[test]
    fn blank_secret_is_missing() {
        assert_eq!(config(&[("JWT_SECRET", "  ")]).unwrap_err(), ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn bad_values_are_reported() {
        let err = config(&[("JWT_SECRET", "s"), ("TOKEN_TTL_MINUTES", "0")]).unwrap_err();
        assert_eq!(err, ConfigError::Invalid("TOKEN_TTL_MINUTES", "0".to_string()));
        let err = config(&[("JWT_SECRET", "s"), ("SEED_DEMO_DATA", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("SEED_DEMO_DATA"));

        let config = config(&[("JWT_SECRET", "s"), ("SEED_DEMO_DATA", "TRUE"), ("DATABASE_URL", "postgres://db")]).unwrap();
        assert!(config.seed_demo_data);
        assert_eq!(config.database_url.as_deref(), Some("postgres://db"));
    }
}
