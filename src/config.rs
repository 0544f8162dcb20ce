//! User configuration
//!
//! Stored as TOML in the platform config directory. A missing file means
//! defaults; every field is optional in the file.

use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::presence::DEFAULT_DISCORD_APP_ID;
use crate::session::DEFAULT_SCROBBLE_CAP_SECS;

/// Settings for the scrobbler binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Connect to Apple Music as soon as the scrobbler starts
    pub auto_connect: bool,

    /// Mirror the current track to Discord Rich Presence
    pub enable_discord_rich_presence: bool,

    /// Discord application whose assets the presence uses
    pub discord_app_id: String,

    /// Credit the composer instead of the performer on classical tracks
    pub composer_as_artist: bool,

    /// How often the current track is re-read
    pub refresh_interval_ms: u64,

    /// How often the position is re-read and played seconds counted
    pub count_interval_ms: u64,

    /// Upper bound for a single call into Apple Music
    pub source_timeout_ms: u64,

    /// Ceiling on the number of counted seconds needed to scrobble
    pub scrobble_cap_seconds: u32,

    /// Where scrobbles are recorded (defaults to the data directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_connect: false,
            enable_discord_rich_presence: false,
            discord_app_id: DEFAULT_DISCORD_APP_ID.to_string(),
            composer_as_artist: false,
            refresh_interval_ms: 1000,
            count_interval_ms: 1000,
            source_timeout_ms: 3000,
            scrobble_cap_seconds: DEFAULT_SCROBBLE_CAP_SECS,
            journal_path: None,
        }
    }
}

impl Config {
    /// Default location of the config file.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(crate::APP_DIR_NAME).join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load from `path`, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No config at {path:?}, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(io_err)
    }

    /// Write to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::default_path()?)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }

    pub fn count_interval(&self) -> Duration {
        Duration::from_millis(self.count_interval_ms.max(1))
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms.max(1))
    }
}
