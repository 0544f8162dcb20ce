//! Per-connection tracking state
//!
//! [`TrackingSession`] holds what the scrobbler knows about the track that is
//! playing right now: which track it is, how many ticks of confirmed forward
//! playback it has seen, and whether the play was already submitted. It does
//! no I/O; the [`Scrobbler`](crate::scrobbler::Scrobbler) feeds it readings
//! and acts on what it reports.

use crate::track::TrackIdentity;

/// Ceiling on the scrobble threshold, in counted seconds.
pub const DEFAULT_SCROBBLE_CAP_SECS: u32 = 240;

/// Counted seconds after which a track of `duration_seconds` is eligible.
///
/// Half the duration, capped at `cap`. Tracks shorter than two seconds (or
/// with an unknown, zero duration) are never eligible.
pub fn scrobble_threshold(duration_seconds: u32, cap: u32) -> Option<u32> {
    match duration_seconds / 2 {
        0 => None,
        half => Some(half.min(cap)),
    }
}

/// Result of feeding one position reading to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Nothing is playing, or the position is unknown. Counters untouched.
    Idle,
    /// First reading for this track; stored as the baseline, not counted.
    Baseline,
    /// Same reading as last time (paused or stuck).
    Stalled,
    /// Playback moved; one more second counted.
    Advanced { played_seconds: u32 },
    /// Playback moved and the track just became eligible for submission.
    ThresholdReached { played_seconds: u32 },
}

impl Progress {
    /// Whether this reading counted as forward playback.
    pub fn advanced(self) -> bool {
        matches!(self, Self::Advanced { .. } | Self::ThresholdReached { .. })
    }
}

/// Live state for one connected session.
#[derive(Debug, Clone, Default)]
pub struct TrackingSession {
    current_track: Option<TrackIdentity>,
    played_seconds: u32,
    last_observed_position: Option<u32>,
    scrobbled: bool,
}

impl TrackingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_track(&self) -> Option<&TrackIdentity> {
        self.current_track.as_ref()
    }

    pub fn played_seconds(&self) -> u32 {
        self.played_seconds
    }

    pub fn last_observed_position(&self) -> Option<u32> {
        self.last_observed_position
    }

    pub fn scrobbled(&self) -> bool {
        self.scrobbled
    }

    /// Record the track reported by the latest poll.
    ///
    /// Returns `true` when it differs from the current one, in which case all
    /// per-track counters start over.
    pub fn observe_track(&mut self, track: Option<TrackIdentity>) -> bool {
        if self.current_track == track {
            return false;
        }

        self.current_track = track;
        self.played_seconds = 0;
        self.scrobbled = false;
        self.last_observed_position = None;
        true
    }

    /// Record a raw position reading and count forward progress.
    ///
    /// Progress is any reading that differs from the previous one; the counter
    /// advances by exactly one per call no matter how far the position moved.
    pub fn observe_position(&mut self, position: Option<u32>, cap: u32) -> Progress {
        let (Some(track), Some(position)) = (&self.current_track, position) else {
            return Progress::Idle;
        };
        let threshold = scrobble_threshold(track.duration_seconds, cap);

        let progress = match self.last_observed_position {
            None => Progress::Baseline,
            Some(last) if last == position => Progress::Stalled,
            Some(_) => {
                self.played_seconds += 1;
                let played_seconds = self.played_seconds;

                if !self.scrobbled && threshold.is_some_and(|t| played_seconds >= t) {
                    self.scrobbled = true;
                    Progress::ThresholdReached { played_seconds }
                } else {
                    Progress::Advanced { played_seconds }
                }
            }
        };

        self.last_observed_position = Some(position);
        progress
    }
}
