//! Settings Persistence
//!
//! Tunables for playback polling, caption lookup, the edit form and embedded
//! players, stored as camelCase JSON at `{config_dir}/settings.json`.
//!
//! Loading is tolerant: a missing or corrupt file yields defaults, and out of
//! range values are clamped by [`AppSettings::normalize`]. Saves go through
//! [`crate::core::fs::atomic_write_json_pretty`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::{
    fs::atomic_write_json_pretty,
    playback::{Lookup, LookupStrategy, DEFAULT_SCAN_THRESHOLD},
    CoreResult,
};

/// Settings schema version for migration support
pub const SETTINGS_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE: &str = "settings.json";

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub playback: PlaybackSettings,

    #[serde(default)]
    pub editor: EditorSettings,

    #[serde(default)]
    pub media: MediaSettings,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            playback: PlaybackSettings::default(),
            editor: EditorSettings::default(),
            media: MediaSettings::default(),
        }
    }
}

impl AppSettings {
    /// Clamps settings so persisted state is always usable.
    ///
    /// Bad values are corrected instead of rejected so an old or hand-edited
    /// file never blocks startup.
    pub fn normalize(&mut self) {
        self.version = SETTINGS_VERSION;

        self.playback.poll_interval_ms = self.playback.poll_interval_ms.clamp(10, 1000);
        self.playback.scan_threshold = self.playback.scan_threshold.clamp(1, 100_000);

        self.editor.capture_decimals = self.editor.capture_decimals.clamp(0, 3);

        let host = self.media.embed_parent_host.trim();
        if host.is_empty() || host.contains(|c: char| c.is_whitespace() || c == '/') {
            self.media.embed_parent_host = default_parent_host();
        } else if host.len() != self.media.embed_parent_host.len() {
            self.media.embed_parent_host = host.to_string();
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Playback synchronization settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSettings {
    /// Poll interval for embedded players, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub lookup_strategy: LookupStrategy,

    /// Entry count at which `auto` lookup switches to bisection
    #[serde(default = "default_scan_threshold")]
    pub scan_threshold: usize,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            lookup_strategy: LookupStrategy::default(),
            scan_threshold: default_scan_threshold(),
        }
    }
}

impl PlaybackSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn lookup(&self) -> Lookup {
        Lookup::new(self.lookup_strategy, self.scan_threshold)
    }
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_scan_threshold() -> usize {
    DEFAULT_SCAN_THRESHOLD
}

/// Caption edit form settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditorSettings {
    /// Decimal places kept when capturing the playhead into start/end
    #[serde(default = "default_capture_decimals")]
    pub capture_decimals: u32,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            capture_decimals: default_capture_decimals(),
        }
    }
}

fn default_capture_decimals() -> u32 {
    1
}

/// Embedded player settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaSettings {
    /// Host passed to players that require the embedding page's domain
    #[serde(default = "default_parent_host")]
    pub embed_parent_host: String,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            embed_parent_host: default_parent_host(),
        }
    }
}

fn default_parent_host() -> String {
    "localhost".to_string()
}

// =============================================================================
// Settings Manager
// =============================================================================

/// Loads and saves settings in a config directory
#[derive(Debug, Clone)]
pub struct SettingsManager {
    settings_path: PathBuf,
}

impl SettingsManager {
    pub fn new(config_dir: PathBuf) -> Self {
        Self {
            settings_path: config_dir.join(SETTINGS_FILE),
        }
    }

    /// Platform config directory for cuekit, if the platform has one
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cuekit"))
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Load settings from disk, returning defaults if the file is missing or unreadable
    pub fn load(&self) -> AppSettings {
        if !self.settings_path.exists() {
            info!("Settings file not found, using defaults");
            return AppSettings::default();
        }

        match self.read() {
            Ok(mut settings) => {
                if settings.version < SETTINGS_VERSION {
                    info!(
                        "Migrating settings from version {} to {}",
                        settings.version, SETTINGS_VERSION
                    );
                }
                settings.normalize();
                settings
            }
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                AppSettings::default()
            }
        }
    }

    fn read(&self) -> CoreResult<AppSettings> {
        let content = fs::read_to_string(&self.settings_path)?;
        Ok(serde_json::from_str::<AppSettings>(&content)?)
    }

    /// Normalizes and saves settings, returning what was written
    pub fn save(&self, settings: &AppSettings) -> CoreResult<AppSettings> {
        let mut normalized = settings.clone();
        normalized.normalize();

        atomic_write_json_pretty(&self.settings_path, &normalized)?;
        info!("Settings saved to {:?}", self.settings_path);
        Ok(normalized)
    }
}
