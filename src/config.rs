use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use crate::{engine::SearchLimits, error::ConfigError};

pub const DEFAULT_ENGINE_PATH: &str = "stockfish";
pub const DEFAULT_THINK_MS: u64 = 150;
pub const DEFAULT_REPLY_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub path: PathBuf,
    pub limits: SearchLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            path: PathBuf::from(DEFAULT_ENGINE_PATH),
            limits: SearchLimits {
                think_time: Duration::from_millis(DEFAULT_THINK_MS),
                reply_timeout: Duration::from_millis(DEFAULT_REPLY_TIMEOUT_MS),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub engine: EngineConfig,
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Reads `CHESS_ENGINE_PATH`, `CHESS_THINK_MS`, `CHESS_REPLY_TIMEOUT_MS`
    /// and `CHESS_BIND_ADDR`, falling back to the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let path = lookup("CHESS_ENGINE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ENGINE_PATH));
        let think_ms: u64 = parse(&lookup, "CHESS_THINK_MS", DEFAULT_THINK_MS)?;
        let reply_ms: u64 = parse(&lookup, "CHESS_REPLY_TIMEOUT_MS", DEFAULT_REPLY_TIMEOUT_MS)?;
        if reply_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "CHESS_REPLY_TIMEOUT_MS",
                value: reply_ms.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        let bind_addr = parse(
            &lookup,
            "CHESS_BIND_ADDR",
            SocketAddr::from(([0, 0, 0, 0], 8080)),
        )?;

        Ok(Config {
            engine: EngineConfig {
                path,
                limits: SearchLimits {
                    think_time: Duration::from_millis(think_ms),
                    reply_timeout: Duration::from_millis(reply_ms),
                },
            },
            bind_addr,
        })
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            })
        }
    }
}
