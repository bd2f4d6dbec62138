//! Server configuration, with defaults and environment overrides.

use std::env;
use std::time::Duration;

use coopsweeper_room::RoomConfig;

use crate::CoopsweeperError;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Full listen address, e.g. `0.0.0.0:9000`. Wins over [`PORT_ENV`].
const BIND_ENV: &str = "COOPSWEEPER_BIND";
/// Port only; listens on all interfaces.
const PORT_ENV: &str = "PORT";
const CURSOR_THROTTLE_ENV: &str = "COOPSWEEPER_CURSOR_THROTTLE_MS";
const IDLE_TIMEOUT_ENV: &str = "COOPSWEEPER_IDLE_TIMEOUT_SECS";

/// Everything an operator can tune about a running server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// Minimum spacing between cursor-only broadcasts in a room.
    pub cursor_throttle: Duration,

    /// How long a new connection has to send its handshake.
    pub handshake_timeout: Duration,

    /// A connection that sends nothing (heartbeats included) for this long
    /// is dropped.
    pub idle_timeout: Duration,

    /// Capacity of each room's command channel.
    pub room_channel_size: usize,

    /// A room nobody joins within this long is closed.
    pub empty_room_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let room = RoomConfig::default();
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            cursor_throttle: room.cursor_throttle,
            handshake_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(30),
            room_channel_size: room.channel_size,
            empty_room_timeout: room.empty_timeout,
        }
    }
}

impl ServerConfig {
    /// Defaults, overridden by whatever is set in the process environment.
    ///
    /// # Errors
    /// [`CoopsweeperError::Config`] if a variable is set but malformed.
    pub fn from_env() -> Result<Self, CoopsweeperError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CoopsweeperError> {
        let mut config = Self::default();

        if let Some(addr) = lookup(BIND_ENV) {
            config.bind_addr = addr;
        } else if let Some(port) = lookup(PORT_ENV) {
            let port: u16 = parse(PORT_ENV, &port)?;
            config.bind_addr = format!("0.0.0.0:{port}");
        }

        if let Some(ms) = lookup(CURSOR_THROTTLE_ENV) {
            config.cursor_throttle = Duration::from_millis(parse(CURSOR_THROTTLE_ENV, &ms)?);
        }

        if let Some(secs) = lookup(IDLE_TIMEOUT_ENV) {
            let secs: u64 = parse(IDLE_TIMEOUT_ENV, &secs)?;
            if secs == 0 {
                return Err(CoopsweeperError::Config(format!(
                    "{IDLE_TIMEOUT_ENV} must be at least 1"
                )));
            }
            config.idle_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// The room-level subset handed to the registry.
    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            cursor_throttle: self.cursor_throttle,
            channel_size: self.room_channel_size,
            empty_timeout: self.empty_room_timeout,
        }
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, CoopsweeperError> {
    value
        .trim()
        .parse()
        .map_err(|_| CoopsweeperError::Config(format!("{key}={value:?} is not a valid number")))
}
