//! Apple Music Scrobbler
//!
//! Polls Apple Music's now-playing state and records every track played past
//! its scrobble threshold.
//!
//! Architecture:
//! - Main thread: runs the scrobbler event loop (ticks, commands)
//! - Ticker threads: post refresh/count ticks
//! - Source thread: talks to Apple Music with a per-call timeout
//! - Input thread: reads commands from stdin

use anyhow::{Context, Result};
use apple_music_scrobbler::media_remote_source::MediaRemoteSource;
use apple_music_scrobbler::presence::DiscordPresence;
use apple_music_scrobbler::sink::{JournalSink, LogSink, ScrobbleSink};
use apple_music_scrobbler::source::BoundedSource;
use apple_music_scrobbler::ticker::IntervalTicker;
use apple_music_scrobbler::{platform, Config, Scrobbler, ScrobblerHandle, Tick};
use log::{info, warn};
use std::thread;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    info!("🎵 Apple Music Scrobbler starting on {}...", platform::name());

    let config = Config::load().context("Failed to load config")?;
    let dry_run = std::env::args().skip(1).any(|arg| arg == "--dry-run");

    let sink: Box<dyn ScrobbleSink> = if dry_run {
        info!("Dry run: scrobbles are only logged");
        Box::new(LogSink)
    } else {
        let journal_path = match config.journal_path.clone() {
            Some(path) => path,
            None => JournalSink::default_path().context("Could not determine data directory")?,
        };
        info!("📝 Recording scrobbles to {}", journal_path.display());
        Box::new(JournalSink::new(journal_path))
    };

    let source = BoundedSource::spawn(
        MediaRemoteSource::new(config.composer_as_artist),
        config.source_timeout(),
    );

    let mut scrobbler = Scrobbler::new(
        source,
        sink,
        IntervalTicker::new(Tick::Refresh, config.refresh_interval()),
        IntervalTicker::new(Tick::Count, config.count_interval()),
    )
    .with_scrobble_cap(config.scrobble_cap_seconds);

    if config.enable_discord_rich_presence {
        let mut presence = DiscordPresence::new(config.discord_app_id.clone());
        scrobbler.subscribe(move |event| presence.handle(event));
        info!("Discord Rich Presence enabled");
    }

    spawn_input_reader(scrobbler.handle());

    if !config.auto_connect {
        info!("Type 'c' to connect to Apple Music");
    } else if scrobbler.connect().is_err() {
        warn!("Apple Music not available, type 'c' to retry");
    }

    scrobbler.run();
    Ok(())
}

/// Read commands from stdin. A closed stdin (login item, launchd) only
/// disables commands; the scrobbler keeps running until `q` or a signal.
fn spawn_input_reader(handle: ScrobblerHandle) {
    info!("Commands: c = connect/disconnect, s = status, q = quit");

    thread::spawn(move || handle.forward_commands(std::io::stdin().lock()));
}
