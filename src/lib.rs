//! Apple Music scrobbler
//!
//! Watches what the Apple Music desktop app is playing by polling its
//! now-playing state, decides when a track has been listened to long enough,
//! and submits each qualifying play exactly once.
//!
//! - [`metadata`] splits Apple Music's combined `Artist — Album` line.
//! - [`scrobbler::Scrobbler`] runs the refresh/count ticks and the connection lifecycle.
//! - [`session::TrackingSession`] holds the per-track counters.

pub mod config;
pub mod error;
pub mod media_remote_source;
pub mod metadata;
pub mod platform;
pub mod presence;
pub mod scrobbler;
pub mod session;
pub mod sink;
pub mod source;
pub mod ticker;
pub mod track;
pub mod util;

pub use config::Config;
pub use error::{ConfigError, MetadataError, SourceError};
pub use metadata::{parse, ParsedMetadata};
pub use scrobbler::{Command, ConnectionState, Scrobbler, ScrobblerEvent, ScrobblerHandle};
pub use session::TrackingSession;
pub use sink::ScrobbleSink;
pub use source::MediaSource;
pub use ticker::{Tick, TickSource};
pub use track::{Scrobble, TrackIdentity};

/// Directory name used under the platform config and data directories
pub const APP_DIR_NAME: &str = "apple-music-scrobbler";
