use crate::datasource::binance::{DEFAULT_BASE_URL, DEFAULT_CHUNK_MS};
use crate::domain::Symbol;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const MS_PER_HOUR: i64 = 60 * 60 * 1000;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub binance_api_url: String,
    pub binance_api_key: String,
    pub binance_api_secret: String,
    pub symbol: Symbol,
    pub lookback_ms: i64,
    /// Seconds between scheduled runs; 0 disables the scheduler.
    pub reconcile_interval_secs: u64,
    pub fetch_chunk_ms: i64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("database_path", &self.database_path)
            .field("binance_api_url", &self.binance_api_url)
            .field("binance_api_key", &"<redacted>")
            .field("binance_api_secret", &"<redacted>")
            .field("symbol", &self.symbol)
            .field("lookback_ms", &self.lookback_ms)
            .field("reconcile_interval_secs", &self.reconcile_interval_secs)
            .field("fetch_chunk_ms", &self.fetch_chunk_ms)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Secrets overlay read from `BINANCE_SECRETS_FILE`.
#[derive(Debug, Default, Deserialize)]
struct SecretsFile {
    #[serde(rename = "BINANCE_API_KEY", default)]
    api_key: String,
    #[serde(rename = "BINANCE_SECRET_KEY", default)]
    api_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or(&env_map, "PORT", 8080u16, "must be a valid u16")?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let binance_api_url = env_map
            .get("BINANCE_API_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let (binance_api_key, binance_api_secret) = load_credentials(&env_map)?;

        let symbol = Symbol::from_str(
            env_map
                .get("SYMBOL")
                .map(|s| s.as_str())
                .unwrap_or("ETHUSDT"),
        )
        .map_err(|e| ConfigError::InvalidValue("SYMBOL".to_string(), e))?;

        let lookback_hours = parse_or(&env_map, "LOOKBACK_HOURS", 2i64, "must be a valid i64")?;
        if lookback_hours <= 0 {
            return Err(ConfigError::InvalidValue(
                "LOOKBACK_HOURS".to_string(),
                "must be positive".to_string(),
            ));
        }
        let lookback_ms = lookback_hours.checked_mul(MS_PER_HOUR).ok_or_else(|| {
            ConfigError::InvalidValue("LOOKBACK_HOURS".to_string(), "too large".to_string())
        })?;

        let reconcile_interval_secs = parse_or(
            &env_map,
            "RECONCILE_INTERVAL_SECS",
            3600u64,
            "must be a valid u64",
        )?;

        let fetch_chunk_ms = parse_or(
            &env_map,
            "FETCH_CHUNK_MS",
            DEFAULT_CHUNK_MS,
            "must be a valid i64",
        )?;
        if fetch_chunk_ms <= 0 {
            return Err(ConfigError::InvalidValue(
                "FETCH_CHUNK_MS".to_string(),
                "must be positive".to_string(),
            ));
        }

        Ok(Config {
            port,
            database_path,
            binance_api_url,
            binance_api_key,
            binance_api_secret,
            symbol,
            lookback_ms,
            reconcile_interval_secs,
            fetch_chunk_ms,
        })
    }
}

fn parse_or<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
    expectation: &str,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), expectation.to_string())),
    }
}

/// Env credentials, overridden by non-empty values from the secrets file.
fn load_credentials(env_map: &HashMap<String, String>) -> Result<(String, String), ConfigError> {
    let mut api_key = env_map.get("BINANCE_API_KEY").cloned().unwrap_or_default();
    let mut api_secret = env_map
        .get("BINANCE_API_SECRET")
        .cloned()
        .unwrap_or_default();

    if let Some(file_path) = env_map.get("BINANCE_SECRETS_FILE") {
        let content = std::fs::read_to_string(file_path).map_err(|_| {
            ConfigError::InvalidValue(
                "BINANCE_SECRETS_FILE".to_string(),
                "file not found or unreadable".to_string(),
            )
        })?;
        let secrets: SecretsFile = serde_json::from_str(&content).map_err(|e| {
            ConfigError::InvalidValue("BINANCE_SECRETS_FILE".to_string(), e.to_string())
        })?;
        if !secrets.api_key.is_empty() {
            api_key = secrets.api_key;
        }
        if !secrets.api_secret.is_empty() {
            api_secret = secrets.api_secret;
        }
    }

    if api_key.is_empty() {
        return Err(ConfigError::MissingEnv("BINANCE_API_KEY".to_string()));
    }
    if api_secret.is_empty() {
        return Err(ConfigError::MissingEnv("BINANCE_API_SECRET".to_string()));
    }
    Ok((api_key, api_secret))
}
