//! Configuration file loading for the arena.
//!
//! Settings come from `arena.toml` in the working directory. A missing file
//! yields the defaults; command-line flags override individual values.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when loading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// Requested bot was not found in the configuration.
    #[error("Bot not found: {0}")]
    BotNotFound(String),
}

/// A named bot executable.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct BotConfig {
    /// Path to the bot executable.
    pub path: PathBuf,
}

/// Main arena configuration structure.
///
/// Every field has a default so an empty file, or no file at all, is a
/// usable configuration.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ArenaConfig {
    /// Path to the rules executable.
    #[serde(default = "default_rules_path")]
    pub rules_path: PathBuf,
    /// The single argument every launched executable receives.
    #[serde(default = "default_mode_flag")]
    pub mode_flag: String,
    /// Thinking budget handed to bots with every `getmove`.
    #[serde(default = "default_think_ms")]
    pub think_ms: u64,
    /// Number of games in a tournament.
    #[serde(default = "default_games")]
    pub games: u32,
    /// Opening rotation file, one notation per line.
    #[serde(default = "default_openings_path")]
    pub openings_path: PathBuf,
    /// Directory for the append-only game logs.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// How long a bot may take to exit after `end` before it is killed.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
    /// Map of bot names to their configurations.
    #[serde(default)]
    pub bots: HashMap<String, BotConfig>,
}

fn default_rules_path() -> PathBuf {
    PathBuf::from("assets/chess_implementation/chess")
}

fn default_mode_flag() -> String {
    engine_protocol::DEFAULT_MODE_FLAG.to_string()
}

fn default_think_ms() -> u64 {
    100
}

fn default_games() -> u32 {
    500
}

fn default_openings_path() -> PathBuf {
    PathBuf::from("assets/fens/fens.txt")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_shutdown_grace_ms() -> u64 {
    1000
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            rules_path: default_rules_path(),
            mode_flag: default_mode_flag(),
            think_ms: default_think_ms(),
            games: default_games(),
            openings_path: default_openings_path(),
            log_dir: default_log_dir(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            bots: HashMap::new(),
        }
    }
}

impl ArenaConfig {
    /// Loads the arena configuration from [`Self::config_path()`].
    ///
    /// If the file does not exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// or [`ConfigError::ParseError`] if the file contains invalid TOML.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Loads the configuration at `path`, falling back to defaults when it
    /// does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the path to the configuration file.
    ///
    /// Currently returns `arena.toml` in the current working directory.
    pub fn config_path() -> PathBuf {
        PathBuf::from("arena.toml")
    }

    /// Retrieves a bot configuration by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BotNotFound`] if no bot with the given name exists.
    pub fn get_bot(&self, name: &str) -> Result<&BotConfig, ConfigError> {
        self.bots
            .get(name)
            .ok_or_else(|| ConfigError::BotNotFound(name.to_string()))
    }

    /// Resolves a command-line bot argument: a configured name, or else a
    /// path taken as given.
    pub fn resolve_bot(&self, name_or_path: &str) -> PathBuf {
        self.get_bot(name_or_path)
            .map(|b| b.path.clone())
            .unwrap_or_else(|_| PathBuf::from(name_or_path))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}
