use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

use eco_gateway::GatewayConfig;

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

/// Server settings, read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub broadcast_capacity: usize,
    pub gateway: GatewayConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup so parsing can be tested without
    /// touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("ECO_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(&lookup, "ECO_PORT", 5000)?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let db_path = PathBuf::from(lookup("ECO_DB_PATH").unwrap_or_else(|| "ecoconnect.db".into()));

        let jwt_secret = match lookup("ECO_JWT_SECRET") {
            Some(secret) if !secret.is_empty() => secret,
            _ => {
                warn!("ECO_JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let heartbeat_secs: u64 = parse_or(&lookup, "ECO_HEARTBEAT_SECS", 30)?;
        if heartbeat_secs == 0 {
            anyhow::bail!("ECO_HEARTBEAT_SECS must be at least 1");
        }
        let max_missed: u32 = parse_or(&lookup, "ECO_MAX_MISSED_HEARTBEATS", 0)?;
        let broadcast_capacity: usize = parse_or(&lookup, "ECO_BROADCAST_CAPACITY", 1024)?;

        Ok(Self {
            addr,
            db_path,
            jwt_secret,
            broadcast_capacity,
            gateway: GatewayConfig {
                heartbeat_interval: Duration::from_secs(heartbeat_secs),
                max_missed_heartbeats: (max_missed > 0).then_some(max_missed),
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {}: '{}'", key, raw)),
        None => Ok(default),
    }
}
