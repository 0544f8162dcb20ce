//! Apple Music probe
//!
//! Debug tool: reads the Now Playing state once and shows what the
//! scrobbler would see.

use anyhow::Result;
use apple_music_scrobbler::media_remote_source::{self, NowPlayingSnapshot, APPLE_MUSIC_BUNDLE_ID};
use apple_music_scrobbler::session::scrobble_threshold;
use apple_music_scrobbler::util::truncate;
use apple_music_scrobbler::{metadata, platform, Config, TrackIdentity};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .format_timestamp(None)
        .init();

    println!("🎵 Apple Music Probe");
    println!("====================\n");

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("⚠️  Config error: {e}, using defaults\n");
            Config::default()
        }
    };

    if platform::is_apple_music_running() {
        println!("✅ Apple Music is running on {}!\n", platform::name());
    } else {
        println!("⚠️  Apple Music is not currently running on {}.", platform::name());
        println!("   Start Apple Music and run this program again.\n");
    }

    println!("📊 Reading Now Playing info for {APPLE_MUSIC_BUNDLE_ID}...\n");

    let Some(snapshot) = media_remote_source::read_now_playing() else {
        println!("   (nothing from Apple Music in Now Playing)");
        return Ok(());
    };
    print_snapshot(&snapshot);

    println!("\n🔍 Parsed:");
    match media_remote_source::track_from_snapshot(&snapshot, config.composer_as_artist) {
        Ok(Some(track)) => print_track(&track, config.scrobble_cap_seconds),
        Ok(None) => println!("   (no usable track)"),
        Err(e) => println!("   ❌ {e}"),
    }

    if let Some(artist) = snapshot.artist.as_deref() {
        let line = media_remote_source::subtitle_line(artist, snapshot.album.as_deref());
        if let Ok(parsed) = metadata::parse(&line, !config.composer_as_artist) {
            println!("   With the other artist preference: {}", parsed.artist);
        }
    }

    Ok(())
}

fn print_snapshot(snapshot: &NowPlayingSnapshot) {
    println!("┌─────────────────────────────────────────────┐");
    println!("│ 🎵 Now Playing                              │");
    println!("├─────────────────────────────────────────────┤");
    println!("│ Playing:       {:28} │", if snapshot.is_playing { "Yes ▶️" } else { "No ⏸️" });
    println!("│ Title:         {:28} │", truncate(&snapshot.title, 28));
    println!(
        "│ Artist:        {:28} │",
        truncate(snapshot.artist.as_deref().unwrap_or("(none)"), 28)
    );
    println!(
        "│ Album:         {:28} │",
        truncate(snapshot.album.as_deref().unwrap_or("(none)"), 28)
    );
    match snapshot.elapsed_secs {
        Some(elapsed) => println!("│ Elapsed:       {elapsed:>27.1}s │"),
        None => println!("│ Elapsed:       {:28} │", "(none)"),
    }
    match snapshot.duration_secs {
        Some(duration) => println!("│ Duration:      {duration:>27.1}s │"),
        None => println!("│ Duration:      {:28} │", "(none)"),
    }
    println!("│ Rate:          {:>28.2} │", snapshot.effective_rate());
    println!("└─────────────────────────────────────────────┘");
}

fn print_track(track: &TrackIdentity, cap: u32) {
    println!("   Title:        {}", track.title);
    println!("   Artist:       {}", track.artist);
    println!("   Album:        {}", track.album);
    println!("   Album artist: {}", track.album_artist);
    println!("   Duration:     {}s", track.duration_seconds);

    match scrobble_threshold(track.duration_seconds, cap) {
        Some(t) => println!("   Scrobbles after {t}s of playback"),
        None => println!("   Too short to scrobble"),
    }
}
