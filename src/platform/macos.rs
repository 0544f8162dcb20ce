//! macOS platform implementation

use super::Platform;
use crate::util;
use std::process::Command;

/// Process name of the Music app
const MUSIC_PROCESS_NAME: &str = "Music";

/// macOS platform implementation
pub struct MacOSPlatform;

impl Platform for MacOSPlatform {
    fn is_apple_music_running() -> bool {
        util::run_command_with_timeout(
            Command::new("pgrep").args(["-x", MUSIC_PROCESS_NAME]),
            util::DEFAULT_COMMAND_TIMEOUT,
        )
        .map(|output| output.status.success())
        .unwrap_or(false)
    }

    fn name() -> &'static str {
        "macOS"
    }
}
