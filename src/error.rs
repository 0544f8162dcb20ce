//! Error types shared across the scrobbler.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure to decompose a combined artist/album line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// The line looked composer-credited (`By ... — ...`) but did not carry
    /// composer, performer and album segments.
    #[error("composer-credited line has {found} segment(s), expected 3: {raw:?}")]
    MissingComposerSegments { raw: String, found: usize },
}

/// Errors reported by a [`MediaSource`](crate::source::MediaSource).
#[derive(Debug, Error)]
pub enum SourceError {
    /// The player is not reachable (not running, no window, no permission).
    #[error("media source unavailable: {0}")]
    Unavailable(String),

    /// Reading from a connected player failed.
    #[error("media source fault: {0}")]
    Fault(String),

    /// A single source call did not answer in time.
    #[error("media source did not respond within {0:?}")]
    Timeout(Duration),

    /// The player's metadata could not be parsed for this poll.
    #[error("unparseable track metadata: {0}")]
    Parse(#[from] MetadataError),
}

/// Errors loading or saving the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config directory available on this platform")]
    NoConfigDir,

    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
