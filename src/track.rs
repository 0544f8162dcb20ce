//! Track identity and play events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A track as observed on one poll of the media source.
///
/// Two identities are the same track when title, artist, album artist and
/// duration match. The album is deliberately left out of the comparison, so a
/// changed album string alone does not count as a new track.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackIdentity {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_artist: String,
    pub duration_seconds: u32,
}

impl TrackIdentity {
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
        album_artist: impl Into<String>,
        duration_seconds: u32,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            album_artist: album_artist.into(),
            duration_seconds,
        }
    }

    /// One-line display string, e.g. for status output.
    pub fn display_line(&self) -> String {
        format!("{} - {} ({})", self.artist, self.title, self.album)
    }
}

impl PartialEq for TrackIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.artist == other.artist
            && self.album_artist == other.album_artist
            && self.duration_seconds == other.duration_seconds
    }
}

impl Eq for TrackIdentity {}

impl Hash for TrackIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.title.hash(state);
        self.artist.hash(state);
        self.album_artist.hash(state);
        self.duration_seconds.hash(state);
    }
}

/// A play submission: the track was listened to long enough to count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scrobble {
    pub track: String,
    pub artist: String,
    pub album: String,
    pub album_artist: String,
    pub timestamp: DateTime<Utc>,
}

impl Scrobble {
    /// Build a submission for `track`, played at `timestamp`.
    pub fn from_track(track: &TrackIdentity, timestamp: DateTime<Utc>) -> Self {
        Self {
            track: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            album_artist: track.album_artist.clone(),
            timestamp,
        }
    }
}
