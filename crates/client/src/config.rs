//! # Client Configuration
//!
//! Settings are read from the environment (a `.env` file is loaded by the
//! binary before this runs).
//!
//! - `SCHEDULER_API_URL`: base URL of the scheduler backend (required)
//! - `SCHEDULER_CALENDAR_URL`: base URL of the calendar service (default: "http://localhost:5000")
//! - `SCHEDULER_TIMEZONE`: IANA zone used to place slots on the clock (default: "America/Los_Angeles")
//! - `SCHEDULER_REQUEST_TIMEOUT_SECONDS`: per-request timeout (default: 30)
//! - `LOG_LEVEL`: logging level (default: "info")

use std::env;

use chrono_tz::Tz;
use eyre::{Result, WrapErr, eyre};
use tracing::Level;

pub const DEFAULT_CALENDAR_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, without a trailing slash.
    pub api_url: String,

    /// Calendar service base URL, without a trailing slash.
    pub calendar_url: String,

    pub timezone: Tz,

    pub log_level: Level,

    /// Request timeout in seconds
    pub request_timeout: u64,
}

impl ClientConfig {
    /// Loads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Fails when `SCHEDULER_API_URL` is missing or `SCHEDULER_TIMEZONE` is
    /// not a known zone.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("SCHEDULER_API_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| eyre!("SCHEDULER_API_URL environment variable must be set"))?;

        let calendar_url =
            lookup("SCHEDULER_CALENDAR_URL").unwrap_or_else(|| DEFAULT_CALENDAR_URL.to_string());

        let timezone = lookup("SCHEDULER_TIMEZONE")
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string())
            .parse::<Tz>()
            .map_err(|err| eyre!(err))
            .wrap_err("Invalid SCHEDULER_TIMEZONE value")?;

        let log_level = parse_log_level(lookup("LOG_LEVEL").as_deref());

        let request_timeout = lookup("SCHEDULER_REQUEST_TIMEOUT_SECONDS")
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        Ok(Self {
            api_url: trim_base(&api_url),
            calendar_url: trim_base(&calendar_url),
            timezone,
            log_level,
            request_timeout,
        })
    }
}

/// Unknown or missing levels fall back to `info`.
pub fn parse_log_level(value: Option<&str>) -> Level {
    match value.unwrap_or("info").to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn trim_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
