use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use sii_api::proximity::DEFAULT_DELTA;

/// Runtime settings, read from the environment (after `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub proximity_delta: f64,
    pub push_endpoint: Option<String>,
    pub push_server_key: Option<String>,
    pub push_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = get("SII_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("SII_PORT")
            .or_else(|| get("PORT"))
            .unwrap_or_else(|| "8080".into())
            .parse()
            .context("invalid SII_PORT")?;
        let db_path: PathBuf = get("SII_DB_PATH").unwrap_or_else(|| "sii.db".into()).into();

        let proximity_delta = match get("SII_PROXIMITY_DELTA") {
            Some(v) => v.parse::<f64>().context("invalid SII_PROXIMITY_DELTA")?,
            None => DEFAULT_DELTA,
        };
        if !proximity_delta.is_finite() || proximity_delta <= 0.0 {
            bail!("SII_PROXIMITY_DELTA must be a positive number of degrees, got {}", proximity_delta);
        }

        let push_timeout_secs: u64 = get("SII_PUSH_TIMEOUT_SECS")
            .unwrap_or_else(|| "10".into())
            .parse()
            .context("invalid SII_PUSH_TIMEOUT_SECS")?;

        Ok(Self {
            host,
            port,
            db_path,
            proximity_delta,
            push_endpoint: get("SII_PUSH_ENDPOINT"),
            push_server_key: get("SII_PUSH_SERVER_KEY"),
            push_timeout: Duration::from_secs(push_timeout_secs),
        })
    }
}
