//! Platform abstraction layer
//!
//! This module provides platform-specific implementations for:
//! - Detecting if Apple Music is running
//! - Naming the platform in logs

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub mod unsupported;

/// Platform-specific operations
pub trait Platform {
    /// Check if Apple Music is currently running
    fn is_apple_music_running() -> bool;

    /// Get the platform name for logging
    fn name() -> &'static str;
}

/// Get the current platform implementation
#[cfg(target_os = "macos")]
pub use macos::MacOSPlatform as CurrentPlatform;

#[cfg(target_os = "windows")]
pub use windows::WindowsPlatform as CurrentPlatform;

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub use unsupported::UnsupportedPlatform as CurrentPlatform;

/// Check if Apple Music is running on the current platform
pub fn is_apple_music_running() -> bool {
    CurrentPlatform::is_apple_music_running()
}

/// Name of the current platform
pub fn name() -> &'static str {
    CurrentPlatform::name()
}
