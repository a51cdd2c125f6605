//! Persisted board definitions.
//!
//! The config file is TOML:
//!
//! ```toml
//! delay_after_enable = "30s"
//!
//! [messages]
//! unable_to_execute = "unable to execute: {0}"
//!
//! [boards.top]
//! command = "/list"
//! interval = "30m"
//! delay = "5s"
//! sender = "CONSOLE"
//! filters = ["There are (\\d+).*=Online: $1"]
//!
//! [boards.top.location]
//! world = "world"
//! x = 0.5
//! y = 72.0
//! z = -10.5
//! ```
//!
//! Only `command`, `interval` and `location` are needed per board; the rest
//! fall back to defaults. Bad durations and bad filters in the file are logged
//! and replaced by defaults rather than failing the whole load.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::board::{Board, BoardSettings, DEFAULT_DELAY, DEFAULT_INTERVAL};
use crate::capture::SenderKind;
use crate::error::Result;
use crate::filter::FilterChain;
use crate::location::Location;
use crate::messages::Messages;
use crate::time::{Ticks, format_ticks, parse_ticks_or, seconds};

/// Default config file name
pub const CONFIG_FILE: &str = "boards.toml";

/// Wait after activation before the first load, giving the host time to settle
pub const DEFAULT_ENABLE_DELAY: Ticks = seconds(30);

fn default_interval() -> String {
    format_ticks(DEFAULT_INTERVAL)
}

fn default_delay() -> String {
    format_ticks(DEFAULT_DELAY)
}

fn default_enable_delay() -> String {
    format_ticks(DEFAULT_ENABLE_DELAY)
}

/// One persisted board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardDefinition {
    #[serde(default)]
    pub command: String,
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default = "default_delay")]
    pub delay: String,
    #[serde(default)]
    pub sender: SenderKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,
    #[serde(default)]
    pub location: Location,
}

impl BoardDefinition {
    pub fn new(command: impl Into<String>, location: Location) -> Self {
        Self {
            command: command.into(),
            interval: default_interval(),
            delay: default_delay(),
            sender: SenderKind::default(),
            filters: Vec::new(),
            location,
        }
    }

    pub fn from_board(board: &Board) -> Self {
        let settings = board.settings();
        Self {
            command: settings.command,
            interval: format_ticks(settings.interval),
            delay: format_ticks(settings.delay),
            sender: settings.sender,
            filters: settings.filters.definitions(),
            location: settings.location,
        }
    }

    /// Build runtime settings, substituting defaults for unparseable values.
    pub fn to_settings(&self, id: &str) -> BoardSettings {
        let filters = match FilterChain::parse(&self.filters) {
            Ok(chain) => chain,
            Err(e) => {
                warn!("Board {}: {}, filters disabled", id, e);
                FilterChain::disabled(&self.filters)
            }
        };

        BoardSettings {
            command: self.command.clone(),
            location: self.location.clone(),
            interval: parse_ticks_or(&self.interval, DEFAULT_INTERVAL),
            delay: parse_ticks_or(&self.delay, DEFAULT_DELAY),
            sender: self.sender,
            filters,
        }
    }

    pub fn to_board(&self, id: &str) -> Board {
        Board::new(id, self.to_settings(id))
    }
}

/// The whole config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_enable_delay")]
    pub delay_after_enable: String,
    #[serde(default)]
    pub messages: Messages,
    #[serde(default)]
    pub boards: BTreeMap<String, BoardDefinition>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            delay_after_enable: default_enable_delay(),
            messages: Messages::default(),
            boards: BTreeMap::new(),
        }
    }
}

impl BoardConfig {
    /// Load from `path`; a missing file is an empty config.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Config {} not found, starting empty", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config: Self = toml::from_str(&content)?;
        info!(
            "Loaded {} board definitions from {}",
            config.boards.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        debug!("Saved {} boards to {}", self.boards.len(), path.display());
        Ok(())
    }

    pub fn enable_delay(&self) -> Ticks {
        parse_ticks_or(&self.delay_after_enable, DEFAULT_ENABLE_DELAY)
    }
}
