use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

/// Secrets shipped in sample env files. Starting with one of these would let
/// anyone mint tokens.
const PLACEHOLDER_SECRETS: &[&str] = &["", "change-me", "dev-secret-change-me", "secret", "changeme"];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub staff_signup_code: Option<String>,
    pub poll_interval_secs: u64,
}

impl Config {
    pub fn load() -> Result<Self> {
        let jwt_secret = env::var("ADOPTLY_JWT_SECRET").context("ADOPTLY_JWT_SECRET must be set")?;
        if is_placeholder(&jwt_secret) {
            bail!("ADOPTLY_JWT_SECRET is a placeholder value; set a real secret");
        }

        let staff_signup_code = env::var("ADOPTLY_STAFF_SIGNUP_CODE")
            .ok()
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty());
        if staff_signup_code.is_none() {
            info!("ADOPTLY_STAFF_SIGNUP_CODE not set, staff signup disabled");
        }

        let poll_interval_secs: u64 = try_load("ADOPTLY_POLL_INTERVAL_SECS", "10")?;
        if poll_interval_secs == 0 {
            bail!("ADOPTLY_POLL_INTERVAL_SECS must be at least 1");
        }

        Ok(Self {
            host: try_load("ADOPTLY_HOST", "0.0.0.0")?,
            port: try_load("ADOPTLY_PORT", "3000")?,
            db_path: try_load("ADOPTLY_DB_PATH", "adoptly.db")?,
            jwt_secret,
            staff_signup_code,
            poll_interval_secs,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow::anyhow!("invalid {key} value '{raw}': {e}")
    })
}

fn is_placeholder(secret: &str) -> bool {
    PLACEHOLDER_SECRETS.contains(&secret.trim().to_ascii_lowercase().as_str())
}
