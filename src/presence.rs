//! Discord Rich Presence
//!
//! Shows the track Apple Music is playing as a "Listening to" activity.
//! Subscribes to [`ScrobblerEvent`]s; the Discord connection is opened lazily
//! and dropped on any error, then retried on the next event.

use chrono::Utc;
use discord_rich_presence::{activity, DiscordIpc, DiscordIpcClient};
use log::{debug, info, warn};

use crate::scrobbler::ScrobblerEvent;
use crate::track::TrackIdentity;
use crate::util::truncate;

/// Default Discord application ID
pub const DEFAULT_DISCORD_APP_ID: &str = "1470193365518450760";

/// Asset key of the large image uploaded to the Discord application
const LARGE_IMAGE_KEY: &str = "apple_music";

/// Discord rejects activity strings longer than this
const MAX_FIELD_CHARS: usize = 128;

/// Activity payload built from a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceText {
    pub details: String,
    pub state: String,
    pub large_text: String,
}

impl PresenceText {
    pub fn from_track(track: &TrackIdentity) -> Self {
        // Discord also rejects strings shorter than two characters
        let field = |s: &str, fallback: &str| {
            let s = if s.chars().count() < 2 { fallback } else { s };
            truncate(s, MAX_FIELD_CHARS)
        };

        Self {
            details: field(&track.title, "Unknown track"),
            state: field(&format!("by {}", track.artist), "Apple Music"),
            large_text: field(&track.album, "Apple Music"),
        }
    }
}

/// Mirrors scrobbler events to Discord.
pub struct DiscordPresence {
    app_id: String,
    client: Option<DiscordIpcClient>,
}

impl DiscordPresence {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            client: None,
        }
    }

    /// React to one scrobbler event.
    pub fn handle(&mut self, event: &ScrobblerEvent) {
        match event {
            ScrobblerEvent::TrackChanged(Some(track)) => self.show(track),
            ScrobblerEvent::TrackChanged(None) | ScrobblerEvent::Disconnected => self.clear(),
            ScrobblerEvent::Connected | ScrobblerEvent::Scrobbled(_) => {}
        }
    }

    fn show(&mut self, track: &TrackIdentity) {
        let Some(client) = self.client() else {
            return;
        };

        if let Err(e) = set_listening_activity(client, track) {
            warn!("Discord update error: {e}");
            // Connection might be lost, reconnect on the next event
            self.client = None;
        } else {
            debug!("Updated presence: {}", track.display_line());
        }
    }

    fn clear(&mut self) {
        if let Some(client) = self.client.as_mut() {
            if let Err(e) = client.clear_activity() {
                warn!("Discord clear error: {e}");
                self.client = None;
            }
        }
    }

    /// Connected client, connecting first if needed.
    fn client(&mut self) -> Option<&mut DiscordIpcClient> {
        if self.client.is_none() {
            let mut client = DiscordIpcClient::new(&self.app_id);
            match client.connect() {
                Ok(()) => {
                    info!("🔗 Connected to Discord");
                    self.client = Some(client);
                }
                Err(e) => {
                    debug!("Discord not available: {e}");
                    return None;
                }
            }
        }
        self.client.as_mut()
    }
}

impl Drop for DiscordPresence {
    fn drop(&mut self) {
        if let Some(ref mut c) = self.client {
            let _ = c.clear_activity();
            let _ = c.close();
        }
    }
}

/// Set a "Listening" activity for `track`, started now.
fn set_listening_activity(
    client: &mut DiscordIpcClient,
    track: &TrackIdentity,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = PresenceText::from_track(track);
    let timestamps = activity::Timestamps::new().start(Utc::now().timestamp());

    let assets = activity::Assets::new()
        .large_image(LARGE_IMAGE_KEY)
        .large_text(&text.large_text);

    let activity_payload = activity::Activity::new()
        .activity_type(activity::ActivityType::Listening)
        .details(&text.details)
        .state(&text.state)
        .timestamps(timestamps)
        .assets(assets);

    client.set_activity(activity_payload)?;

    Ok(())
}
