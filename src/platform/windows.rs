//! Windows platform implementation
//!
//! Only process detection is available here; the now-playing reader is
//! macOS-only, so connecting still fails on Windows.

use super::Platform;
use crate::util;
use std::process::Command;

/// Windows platform implementation
pub struct WindowsPlatform;

impl Platform for WindowsPlatform {
    fn is_apple_music_running() -> bool {
        // Use run_command_with_timeout to prevent indefinite hangs
        util::run_command_with_timeout(
            Command::new("tasklist").args(["/FI", "IMAGENAME eq AppleMusic.exe"]),
            util::DEFAULT_COMMAND_TIMEOUT,
        )
        .map(|output| String::from_utf8_lossy(&output.stdout).contains("AppleMusic.exe"))
        .unwrap_or(false)
    }

    fn name() -> &'static str {
        "Windows"
    }
}
