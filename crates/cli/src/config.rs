use std::env;

use eyre::{Result, eyre};

/// Credentials for the backend session.
///
/// Read from `SCHEDULER_EMAIL` and `SCHEDULER_PASSWORD`. Both are optional
/// at load time since some commands work without signing in.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl CliConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            email: non_empty("SCHEDULER_EMAIL").map(|email| email.trim().to_string()),
            password: non_empty("SCHEDULER_PASSWORD"),
        }
    }

    /// The email and password, or an error naming what is missing.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        let email = self
            .email
            .as_deref()
            .ok_or_else(|| eyre!("SCHEDULER_EMAIL environment variable not set"))?;
        let password = self
            .password
            .as_deref()
            .ok_or_else(|| eyre!("SCHEDULER_PASSWORD environment variable not set"))?;
        Ok((email, password))
    }
}
