//! Process configuration, read from `FACTURX_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, Context};

use facturx_invoicing::FutureDatePolicy;
use facturx_observability::LogFormat;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// JSON counter file; counters live in memory when unset.
    pub counter_file: Option<PathBuf>,
    /// JSON party history file; history lives in memory when unset.
    pub history_file: Option<PathBuf>,
    pub future_date_policy: FutureDatePolicy,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr: SocketAddr = get("FACTURX_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .trim()
            .parse::<SocketAddr>()
            .context("FACTURX_BIND_ADDR must be a socket address like 0.0.0.0:8000")?;

        let future_date_policy = match get("FACTURX_FUTURE_DATE_POLICY") {
            Some(raw) => raw
                .parse::<FutureDatePolicy>()
                .map_err(|e| anyhow!("FACTURX_FUTURE_DATE_POLICY: {e}"))?,
            None => FutureDatePolicy::default(),
        };

        let log_format = match get("FACTURX_LOG_FORMAT") {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|e| anyhow!("FACTURX_LOG_FORMAT: {e}"))?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind_addr,
            counter_file: get("FACTURX_COUNTER_FILE").map(PathBuf::from),
            history_file: get("FACTURX_HISTORY_FILE").map(PathBuf::from),
            future_date_policy,
            log_format,
        })
    }
}
