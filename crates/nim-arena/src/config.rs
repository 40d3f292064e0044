//! Server configuration, read from the environment.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use nim_arena_room::{GameConfig, RoomError};

/// Port used when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 4000;

/// Health listener address used when `NIM_ARENA_HEALTH_ADDR` is not set.
pub const DEFAULT_HEALTH_ADDR: &str = "0.0.0.0:4001";

/// Errors from reading the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Game(#[from] RoomError),
}

/// Everything needed to start a server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// WebSocket listen address.
    pub bind_addr: String,

    /// Health endpoint listen address. `None` disables it.
    pub health_addr: Option<String>,

    /// Close a connection that sends nothing for this long. `None` (the
    /// default) never times out; the match clock lives in the client.
    pub idle_timeout: Option<Duration>,

    pub game: GameConfig,

    /// Directory for the JSON file snapshot mirror. `None` disables
    /// mirroring.
    pub mirror_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            health_addr: Some(DEFAULT_HEALTH_ADDR.to_string()),
            idle_timeout: None,
            game: GameConfig::default(),
            mirror_dir: None,
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// | variable | effect |
    /// |---|---|
    /// | `PORT` | listen on `0.0.0.0:PORT` |
    /// | `NIM_ARENA_BIND` | full listen address, overrides `PORT` |
    /// | `NIM_ARENA_HEALTH_ADDR` | health listener, `off` disables |
    /// | `NIM_ARENA_IDLE_TIMEOUT_SECS` | idle connection timeout |
    /// | `NIM_ARENA_PILE_COUNT` / `_PILE_MIN` / `_PILE_MAX` | pile generation |
    /// | `NIM_ARENA_MIRROR_DIR` | enable the JSON file mirror |
    ///
    /// Unset and empty variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), but reads variables through
    /// `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(port) = parse::<u16>(&get, "PORT")? {
            config.bind_addr = format!("0.0.0.0:{port}");
        }
        if let Some(bind) = get("NIM_ARENA_BIND") {
            config.bind_addr = bind;
        }
        if let Some(health) = get("NIM_ARENA_HEALTH_ADDR") {
            config.health_addr = (!health.eq_ignore_ascii_case("off")).then_some(health);
        }
        if let Some(secs) = parse::<u64>(&get, "NIM_ARENA_IDLE_TIMEOUT_SECS")? {
            config.idle_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(count) = parse::<usize>(&get, "NIM_ARENA_PILE_COUNT")? {
            config.game.pile_count = count;
        }
        if let Some(min) = parse::<u32>(&get, "NIM_ARENA_PILE_MIN")? {
            config.game.min_pile = min;
        }
        if let Some(max) = parse::<u32>(&get, "NIM_ARENA_PILE_MAX")? {
            config.game.max_pile = max;
        }
        config.mirror_dir = get("NIM_ARENA_MIRROR_DIR").map(PathBuf::from);

        config.game.validate()?;
        Ok(config)
    }
}

fn parse<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    get(key)
        .map(|value| {
            value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            })
        })
        .transpose()
}
