use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_STATE_FILE: &str = ".portal-state.json";
/// Admin tokens live for 30 minutes.
const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client configuration loaded from environment variables.
/// Every value has a default; only malformed numbers are rejected.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub state_file: PathBuf,
    pub session_ttl: Duration,
    pub request_timeout: Duration,
    pub assistant_id: Option<String>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            api_url: std::env::var("PORTAL_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            state_file: std::env::var("PORTAL_STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_STATE_FILE)),
            session_ttl: Duration::from_secs(env_secs(
                "PORTAL_SESSION_TTL_SECS",
                DEFAULT_SESSION_TTL_SECS,
            )?),
            request_timeout: Duration::from_secs(env_secs(
                "PORTAL_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            assistant_id: std::env::var("PORTAL_ASSISTANT_ID")
                .ok()
                .filter(|v| !v.is_empty()),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            assistant_id: None,
            rust_log: "info".to_string(),
        }
    }
}

fn env_secs(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(raw) => parse_secs(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<u64> {
    let secs = raw
        .trim()
        .parse::<u64>()
        .with_context(|| format!("{key} must be a whole number of seconds"))?;
    anyhow::ensure!(secs > 0, "{key} must be greater than zero");
    Ok(secs)
}
