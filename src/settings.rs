//! User settings and their JSON persistence.
//!
//! [`SettingsStore`] is the sole owner of the persisted copy. Everything else
//! works with a [`Settings`] value read for the current operation.
//!
//! The on-disk format keeps the key names of earlier releases:
//!
//! ```json
//! { "disable_app": false, "check_in_interval": 60, "is_athlete": false }
//! ```
//!
//! Missing keys fall back to their defaults. A file that cannot be parsed is
//! replaced with defaults rather than reported to the user.

use crate::classifier::Profile;
use crate::error::{PulseError, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default minutes between scheduled check-ins.
pub const DEFAULT_INTERVAL_MINUTES: NonZeroU32 = match NonZeroU32::new(60) {
    Some(n) => n,
    None => unreachable!(),
};

/// Default length of the camera measurement window.
pub const DEFAULT_CAPTURE_SECONDS: NonZeroU32 = match NonZeroU32::new(20) {
    Some(n) => n,
    None => unreachable!(),
};

/// User configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Whether scheduled check-ins run at all.
    pub enabled: bool,
    /// Minutes between scheduled check-ins.
    pub interval_minutes: NonZeroU32,
    /// Selects the athlete anomaly threshold.
    pub is_athlete: bool,
    /// Ask for consent before a scheduled check-in starts the camera.
    pub prompt_on_scheduled_checkin: bool,
    /// Length of the camera measurement window in seconds.
    pub capture_duration_seconds: NonZeroU32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            is_athlete: false,
            prompt_on_scheduled_checkin: false,
            capture_duration_seconds: DEFAULT_CAPTURE_SECONDS,
        }
    }
}

impl Settings {
    /// Time between scheduled check-ins.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_minutes.get()) * 60)
    }

    /// Length of the measurement window.
    pub fn capture_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.capture_duration_seconds.get()))
    }

    /// Classification profile derived from `is_athlete`.
    pub fn profile(&self) -> Profile {
        if self.is_athlete {
            Profile::Athlete
        } else {
            Profile::Adult
        }
    }

    /// Returns `true` when `other` needs a different check-in cadence.
    pub fn cadence_differs(&self, other: &Settings) -> bool {
        self.enabled != other.enabled || self.interval_minutes != other.interval_minutes
    }
}

/// On-disk representation of [`Settings`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct SettingsFile {
    disable_app: bool,
    check_in_interval: NonZeroU32,
    is_athlete: bool,
    prompt_on_scheduled_checkin: bool,
    capture_duration_seconds: NonZeroU32,
}

impl Default for SettingsFile {
    fn default() -> Self {
        Settings::default().into()
    }
}

impl From<Settings> for SettingsFile {
    fn from(s: Settings) -> Self {
        Self {
            disable_app: !s.enabled,
            check_in_interval: s.interval_minutes,
            is_athlete: s.is_athlete,
            prompt_on_scheduled_checkin: s.prompt_on_scheduled_checkin,
            capture_duration_seconds: s.capture_duration_seconds,
        }
    }
}

impl From<SettingsFile> for Settings {
    fn from(f: SettingsFile) -> Self {
        Self {
            enabled: !f.disable_app,
            interval_minutes: f.check_in_interval,
            is_athlete: f.is_athlete,
            prompt_on_scheduled_checkin: f.prompt_on_scheduled_checkin,
            capture_duration_seconds: f.capture_duration_seconds,
        }
    }
}

/// File-backed settings persistence.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Create a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store at [`SettingsStore::default_path`].
    pub fn at_default_path() -> Self {
        Self::new(Self::default_path())
    }

    /// Default settings file: `<config dir>/pulsepause/settings.json`.
    pub fn default_path() -> PathBuf {
        crate::pulse_dirs::settings_file()
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted settings.
    ///
    /// A missing or malformed file yields [`Settings::default`], which is
    /// written back immediately so the next read finds a valid file.
    ///
    /// # Errors
    ///
    /// Returns an error only when the storage itself cannot be read or the
    /// defaults cannot be written.
    pub fn load(&self) -> Result<Settings> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "no settings at {}, writing defaults",
                    self.path.display()
                );
                return self.restore_defaults();
            }
            Err(e) => {
                return Err(PulseError::Settings(format!(
                    "cannot read {}: {e}",
                    self.path.display()
                )));
            }
        };

        match serde_json::from_slice::<SettingsFile>(&bytes) {
            Ok(file) => {
                let settings = Settings::from(file);
                debug!(?settings, "loaded settings from {}", self.path.display());
                Ok(settings)
            }
            Err(e) => {
                warn!(
                    "settings at {} are corrupt, restoring defaults: {e}",
                    self.path.display()
                );
                self.restore_defaults()
            }
        }
    }

    /// Overwrite the persisted settings.
    ///
    /// The file is written to a sibling temp file and renamed into place, so
    /// readers never see a partial write.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PulseError::Settings(format!("cannot create settings directory: {e}"))
            })?;
        }

        let json = serde_json::to_string_pretty(&SettingsFile::from(*settings))
            .map_err(|e| PulseError::Settings(format!("cannot serialize settings: {e}")))?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)
            .map_err(|e| PulseError::Settings(format!("cannot write settings temp file: {e}")))?;
        std::fs::rename(&tmp_path, &self.path)
            .map_err(|e| PulseError::Settings(format!("cannot finalize settings file: {e}")))?;

        debug!(?settings, "saved settings to {}", self.path.display());
        Ok(())
    }

    fn restore_defaults(&self) -> Result<Settings> {
        let defaults = Settings::default();
        self.save(&defaults)?;
        Ok(defaults)
    }
}
