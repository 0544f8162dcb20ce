//! MediaRemote source for Apple Music
//!
//! Uses macOS MediaRemote framework (via `mediaremote-rs`) to read the
//! system-wide Now Playing info and keeps only what the Music app reports.
//!
//! # How it works
//!
//! Apple Music publishes title, artist, album, duration and elapsed time to
//! the Now Playing center. The app's own mini player shows artist and album
//! on one combined line (`Artist — Album`, or `By Composer — Performer — Album`
//! for classical works, where the composer credit is part of the artist
//! field). That line is rebuilt here and handed to the
//! [`metadata`](crate::metadata) parser so both layouts come out the same way.
//!
//! The elapsed time is only republished when playback state changes, so
//! [`PositionClock`] runs it forward between reports.
//!
//! # Bundle ID
//!
//! Apple Music registers as `com.apple.Music`.

use log::debug;
use std::time::{Duration, Instant};

use crate::error::{MetadataError, SourceError};
use crate::metadata::{self, DELIMITER};
use crate::platform;
use crate::source::MediaSource;
use crate::track::TrackIdentity;

/// Apple Music's macOS bundle identifier
pub const APPLE_MUSIC_BUNDLE_ID: &str = "com.apple.Music";

/// Now Playing info, filtered for Apple Music
#[derive(Debug, Clone, Default)]
pub struct NowPlayingSnapshot {
    /// Whether Apple Music is actively playing audio
    pub is_playing: bool,

    /// Track title
    pub title: String,

    /// Artist field; carries the `By Composer — Performer` credit on classical works
    pub artist: Option<String>,

    /// Album field
    pub album: Option<String>,

    /// Elapsed playback time in seconds
    pub elapsed_secs: Option<f64>,

    /// Total duration in seconds
    pub duration_secs: Option<f64>,

    /// Playback speed; 1.0 for normal playback, 0.0 when paused
    pub playback_rate: Option<f64>,
}

impl NowPlayingSnapshot {
    /// Rate at which the position advances right now.
    pub fn effective_rate(&self) -> f64 {
        if !self.is_playing {
            return 0.0;
        }
        self.playback_rate
            .filter(|rate| rate.is_finite() && *rate >= 0.0)
            .unwrap_or(1.0)
    }
}

/// Read Apple Music playback state from macOS MediaRemote framework.
///
/// Returns `Some(state)` if Apple Music is the current Now Playing app,
/// `None` if MediaRemote is inaccessible or another app is playing.
#[cfg(target_os = "macos")]
pub fn read_now_playing() -> Option<NowPlayingSnapshot> {
    let info = mediaremote_rs::get_now_playing()?;

    // Only care about Apple Music
    if info.bundle_identifier != APPLE_MUSIC_BUNDLE_ID {
        debug!(
            "MediaRemote: active app is '{}', not Apple Music",
            info.bundle_identifier
        );
        return None;
    }

    debug!(
        "MediaRemote: Apple Music playing={}, title={:?}",
        info.playing, info.title
    );

    Some(NowPlayingSnapshot {
        is_playing: info.playing,
        title: info.title,
        artist: info.artist,
        album: info.album,
        elapsed_secs: info.elapsed_time,
        duration_secs: info.duration,
        playback_rate: info.playback_rate,
    })
}

/// Stub for non-macOS platforms: always returns None.
#[cfg(not(target_os = "macos"))]
pub fn read_now_playing() -> Option<NowPlayingSnapshot> {
    None
}

/// Rebuild the combined subtitle line the Music app displays.
pub fn subtitle_line(artist: &str, album: Option<&str>) -> String {
    match album.map(str::trim).filter(|a| !a.is_empty()) {
        Some(album) => format!("{artist}{DELIMITER}{album}"),
        None => artist.to_string(),
    }
}

/// Convert a snapshot into a track identity.
///
/// Returns `Ok(None)` when the snapshot has no title or artist to credit.
pub fn track_from_snapshot(
    snapshot: &NowPlayingSnapshot,
    composer_as_artist: bool,
) -> Result<Option<TrackIdentity>, MetadataError> {
    let title = snapshot.title.trim();
    let Some(artist) = snapshot
        .artist
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
    else {
        debug!("Now Playing entry without artist, ignoring");
        return Ok(None);
    };
    if title.is_empty() {
        return Ok(None);
    }

    let line = subtitle_line(artist, snapshot.album.as_deref());
    let parsed = metadata::parse(&line, composer_as_artist)?;
    let duration = snapshot.duration_secs.and_then(whole_seconds).unwrap_or(0);

    Ok(Some(TrackIdentity::new(
        title,
        parsed.artist.clone(),
        parsed.album,
        parsed.artist,
        duration,
    )))
}

/// Floor a seconds reading; negative or non-finite values are unknown.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_seconds(secs: f64) -> Option<u32> {
    if secs.is_finite() && secs >= 0.0 {
        // Float-to-int casts saturate
        Some(secs.floor() as u32)
    } else {
        None
    }
}

/// Position `since_report` after `reported` was published, at `rate`.
pub fn extrapolate_position(reported: f64, since_report: Duration, rate: f64) -> f64 {
    if rate.is_finite() && rate > 0.0 {
        reported + since_report.as_secs_f64() * rate
    } else {
        reported
    }
}

#[derive(Debug, Clone, Copy)]
struct PositionAnchor {
    reported: f64,
    rate: f64,
    at: Instant,
}

/// Running playback clock.
///
/// The Now Playing center only republishes the elapsed time when playback
/// state changes (play, pause, seek, new track). Between reports the position
/// is extrapolated from the last one.
#[derive(Debug, Default)]
pub struct PositionClock {
    anchor: Option<PositionAnchor>,
}

impl PositionClock {
    /// Feed one reading taken at `now` and return the estimated position.
    pub fn position(&mut self, reported: f64, rate: f64, now: Instant) -> f64 {
        let anchor = match self.anchor {
            Some(anchor)
                if anchor.reported.to_bits() == reported.to_bits()
                    && anchor.rate.to_bits() == rate.to_bits() =>
            {
                anchor
            }
            _ => {
                let anchor = PositionAnchor {
                    reported,
                    rate,
                    at: now,
                };
                self.anchor = Some(anchor);
                anchor
            }
        };

        extrapolate_position(
            anchor.reported,
            now.saturating_duration_since(anchor.at),
            anchor.rate,
        )
    }

    pub fn reset(&mut self) {
        self.anchor = None;
    }
}

/// [`MediaSource`] backed by the Now Playing center.
#[derive(Debug, Default)]
pub struct MediaRemoteSource {
    composer_as_artist: bool,
    connected: bool,
    clock: PositionClock,
}

impl MediaRemoteSource {
    pub fn new(composer_as_artist: bool) -> Self {
        Self {
            composer_as_artist,
            connected: false,
            clock: PositionClock::default(),
        }
    }
}

impl MediaSource for MediaRemoteSource {
    fn connect(&mut self) -> Result<(), SourceError> {
        if !cfg!(target_os = "macos") {
            return Err(SourceError::Unavailable(format!(
                "the Now Playing reader is not available on {}",
                platform::name()
            )));
        }
        if !platform::is_apple_music_running() {
            return Err(SourceError::Unavailable("Apple Music not running".to_string()));
        }

        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.clock.reset();
    }

    fn current_track(&mut self) -> Result<Option<TrackIdentity>, SourceError> {
        if !self.connected {
            return Ok(None);
        }

        match read_now_playing() {
            Some(snapshot) => {
                track_from_snapshot(&snapshot, self.composer_as_artist).map_err(SourceError::from)
            }
            None => Ok(None),
        }
    }

    fn current_position_seconds(&mut self) -> Result<Option<u32>, SourceError> {
        if !self.connected {
            return Ok(None);
        }

        let Some(snapshot) = read_now_playing() else {
            self.clock.reset();
            return Ok(None);
        };
        let Some(reported) = snapshot.elapsed_secs.filter(|e| e.is_finite()) else {
            self.clock.reset();
            return Ok(None);
        };

        let position = self
            .clock
            .position(reported, snapshot.effective_rate(), Instant::now());
        let position = match snapshot.duration_secs {
            Some(duration) if duration.is_finite() && duration > 0.0 => position.min(duration),
            _ => position,
        };
        Ok(whole_seconds(position))
    }
}
