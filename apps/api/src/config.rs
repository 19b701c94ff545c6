use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absent → the in-memory store is used (local development only).
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub provider: ProviderPolicy,
}

/// Timeout and retry budget applied by the provider gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderPolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for ProviderPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_attempts: 3,
            base_backoff: Duration::from_millis(1000),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = ProviderPolicy::default();
        let max_attempts: u32 = parse_env("PROVIDER_MAX_ATTEMPTS", defaults.max_attempts)?;
        if max_attempts == 0 {
            bail!("PROVIDER_MAX_ATTEMPTS must be at least 1");
        }

        Ok(Config {
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10)?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            provider: ProviderPolicy {
                timeout: Duration::from_secs(parse_env(
                    "PROVIDER_TIMEOUT_SECS",
                    defaults.timeout.as_secs(),
                )?),
                max_attempts,
                base_backoff: Duration::from_millis(parse_env(
                    "PROVIDER_BACKOFF_MS",
                    defaults.base_backoff.as_millis() as u64,
                )?),
            },
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
