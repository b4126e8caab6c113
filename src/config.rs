use std::env;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite:polls.db";
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub database_url: String,
    /// Register commands on this guild only, which Discord applies instantly.
    pub dev_guild: Option<u64>,
    pub sweep_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let discord_token = get("DISCORD_TOKEN").ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;
        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let dev_guild = get("DEV_GUILD")
            .map(|value| {
                value.trim().parse().map_err(|_| ConfigError::Invalid {
                    name: "DEV_GUILD",
                    value,
                })
            })
            .transpose()?;

        let sweep_secs = match get("POLL_SWEEP_INTERVAL_SECS") {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "POLL_SWEEP_INTERVAL_SECS",
                        value,
                    });
                }
            },
            None => DEFAULT_SWEEP_INTERVAL_SECS,
        };

        Ok(Self {
            discord_token,
            database_url,
            dev_guild,
            sweep_interval: Duration::from_secs(sweep_secs),
        })
    }
}
