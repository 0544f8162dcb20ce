//! Play-submission sinks
//!
//! The scrobbler hands finished plays and now-playing heartbeats to a
//! [`ScrobbleSink`]. Calls are fire-and-forget: a sink logs its own failures
//! and never reports them back, because local counting stays authoritative
//! whether or not a submission went through.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use crate::track::{Scrobble, TrackIdentity};

/// Receiver of play submissions.
pub trait ScrobbleSink: Send {
    /// Submit finished plays.
    fn scrobble(&mut self, scrobbles: &[Scrobble]);

    /// Report that `track` is playing right now. Best-effort.
    fn update_now_playing(&mut self, track: &TrackIdentity);
}

impl<S: ScrobbleSink + ?Sized> ScrobbleSink for Box<S> {
    fn scrobble(&mut self, scrobbles: &[Scrobble]) {
        (**self).scrobble(scrobbles);
    }

    fn update_now_playing(&mut self, track: &TrackIdentity) {
        (**self).update_now_playing(track);
    }
}

/// Appends each scrobble as a JSON line to a journal file.
pub struct JournalSink {
    path: PathBuf,
}

impl JournalSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Journal in the platform data directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join(crate::APP_DIR_NAME).join("scrobbles.jsonl"))
    }

    fn append(&self, scrobbles: &[Scrobble]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create journal directory: {parent:?}"))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open scrobble journal: {:?}", self.path))?;

        for scrobble in scrobbles {
            let line = serde_json::to_string(scrobble).context("Failed to encode scrobble")?;
            writeln!(file, "{line}").context("Failed to write scrobble")?;
        }

        Ok(())
    }

    /// Read every scrobble recorded so far. Unreadable lines are skipped.
    pub fn read_all(&self) -> Result<Vec<Scrobble>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read scrobble journal: {:?}", self.path))?;

        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(scrobble) => Some(scrobble),
                Err(e) => {
                    debug!("Skipping journal line: {e}");
                    None
                }
            })
            .collect())
    }
}

impl ScrobbleSink for JournalSink {
    fn scrobble(&mut self, scrobbles: &[Scrobble]) {
        match self.append(scrobbles) {
            Ok(()) => {
                for s in scrobbles {
                    info!("📝 Scrobbled: {} - {}", s.artist, s.track);
                }
            }
            Err(e) => warn!("Scrobble journal error: {e:#}"),
        }
    }

    fn update_now_playing(&mut self, track: &TrackIdentity) {
        debug!("Now playing: {}", track.display_line());
    }
}

/// Only logs; used for dry runs.
#[derive(Debug, Default)]
pub struct LogSink;

impl ScrobbleSink for LogSink {
    fn scrobble(&mut self, scrobbles: &[Scrobble]) {
        for s in scrobbles {
            info!("Would scrobble: {} - {} at {}", s.artist, s.track, s.timestamp);
        }
    }

    fn update_now_playing(&mut self, track: &TrackIdentity) {
        debug!("Now playing: {}", track.display_line());
    }
}
