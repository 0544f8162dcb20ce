//! Fallback for platforms without an Apple Music desktop app

use super::Platform;

pub struct UnsupportedPlatform;

impl Platform for UnsupportedPlatform {
    fn is_apple_music_running() -> bool {
        false
    }

    fn name() -> &'static str {
        std::env::consts::OS
    }
}
