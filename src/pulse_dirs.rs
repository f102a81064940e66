//! Centralized application directory paths for PulsePause.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! | Purpose | macOS | Linux | Windows |
//! |---------|-------|-------|---------|
//! | Config | `~/Library/Application Support/pulsepause/` | `~/.config/pulsepause/` | `%APPDATA%\pulsepause\` |
//!
//! # Environment Overrides
//!
//! - `PULSEPAUSE_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application config directory.
///
/// Resolves to `dirs::config_dir()/pulsepause/` by default. Override with
/// the `PULSEPAUSE_CONFIG_DIR` environment variable.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("PULSEPAUSE_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("pulsepause"))
        .unwrap_or_else(|| std::env::temp_dir().join("pulsepause-config"))
}

/// Settings file path (`config_dir()/settings.json`).
#[must_use]
pub fn settings_file() -> PathBuf {
    config_dir().join("settings.json")
}
