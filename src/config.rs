//! Configuration file support for BBAT.
//!
//! Preferences and keybindings are stored as JSON in the user's config directory and
//! turned into a [`SessionConfig`] when a session starts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_POINTER_MOVE_HZ, DEFAULT_PROB_THRESHOLD, HANDLE_HIT_RADIUS, MIN_BOX_SIZE,
    UNDO_HISTORY_SIZE,
};
use crate::history::HistoryConfig;
use crate::keybindings::KeyBindings;
use crate::session::SessionConfig;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration that can be exported and imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Application name (for identification)
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// User preferences
    #[serde(default)]
    pub preferences: UserPreferences,

    /// Keybinding configuration
    #[serde(default)]
    pub keybindings: KeyBindings,
}

fn default_app_name() -> String {
    "BBAT".to_string()
}

/// User preferences section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Number of undo steps kept
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Smallest box side in image pixels
    #[serde(default = "default_min_box_size")]
    pub min_box_size: f32,

    /// Drag updates per second (0 = unthrottled)
    #[serde(default = "default_pointer_move_hz")]
    pub pointer_move_hz: u32,

    /// Handle grab radius in screen pixels
    #[serde(default = "default_handle_hit_radius")]
    pub handle_hit_radius: f32,

    /// Minimum detector confidence for merged boxes
    #[serde(default = "default_detection_threshold")]
    pub detection_threshold: f32,
}

fn default_history_capacity() -> usize {
    UNDO_HISTORY_SIZE
}

fn default_min_box_size() -> f32 {
    MIN_BOX_SIZE
}

fn default_pointer_move_hz() -> u32 {
    DEFAULT_POINTER_MOVE_HZ
}

fn default_handle_hit_radius() -> f32 {
    HANDLE_HIT_RADIUS
}

fn default_detection_threshold() -> f32 {
    DEFAULT_PROB_THRESHOLD
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            history_capacity: default_history_capacity(),
            min_box_size: default_min_box_size(),
            pointer_move_hz: default_pointer_move_hz(),
            handle_hit_radius: default_handle_hit_radius(),
            detection_threshold: default_detection_threshold(),
        }
    }
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            app_name: default_app_name(),
            preferences: UserPreferences::default(),
            keybindings: KeyBindings::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Session settings derived from the preferences.
    ///
    /// Out-of-range values fall back to the defaults.
    pub fn session_config(&self) -> SessionConfig {
        let prefs = &self.preferences;
        let positive_or = |value: f32, fallback: f32| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                log::warn!("Ignoring invalid preference value {value}, using {fallback}");
                fallback
            }
        };
        let threshold = if (0.0..=1.0).contains(&prefs.detection_threshold) {
            prefs.detection_threshold
        } else {
            log::warn!(
                "Detection threshold {} outside [0, 1], using {DEFAULT_PROB_THRESHOLD}",
                prefs.detection_threshold
            );
            DEFAULT_PROB_THRESHOLD
        };

        SessionConfig {
            history: HistoryConfig {
                capacity: prefs.history_capacity.max(1),
            },
            min_box_size: positive_or(prefs.min_box_size, MIN_BOX_SIZE),
            pointer_move_hz: prefs.pointer_move_hz,
            handle_hit_radius: positive_or(prefs.handle_hit_radius, HANDLE_HIT_RADIUS),
            detection_threshold: threshold,
            class_count: None,
            keybindings: self.keybindings.clone(),
        }
    }

    /// Get the default filename for config export.
    pub fn default_filename() -> &'static str {
        "bbat-config.json"
    }

    /// Get the default config file path for auto-load/save.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("bbat").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("bbat")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keybindings::KeyCode;

    #[test]
    fn test_minimal_file_uses_defaults() {
        let config = AppConfig::from_json(r#"{"version":1}"#).expect("parse");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.session_config(), SessionConfig::default());
    }

    #[test]
    fn test_newer_version_is_rejected() {
        let result = AppConfig::from_json(r#"{"version":99}"#);
        assert!(matches!(
            result,
            Err(ConfigError::VersionTooNew {
                file_version: 99,
                supported_version: CONFIG_VERSION
            })
        ));
    }

    #[test]
    fn test_partial_preferences() {
        let json = r#"{"version":1,"preferences":{"log_level":"debug","history_capacity":10}}"#;
        let config = AppConfig::from_json(json).expect("parse");
        assert_eq!(config.preferences.log_level.to_level_filter(), log::LevelFilter::Debug);
        assert_eq!(config.session_config().history.capacity, 10);
        assert_eq!(config.preferences.min_box_size, MIN_BOX_SIZE);
    }

    #[test]
    fn test_partial_keybindings() {
        let json = r#"{"version":1,"keybindings":{"mode":"shift","class_hotkeys":[{"char":"q"}]}}"#;
        let config = AppConfig::from_json(json).expect("parse");
        let bindings = config.session_config().keybindings;
        assert!(bindings.is_mode_key(KeyCode::Shift));
        assert_eq!(bindings.undo, KeyCode::Char('z'));
        assert_eq!(bindings.class_index_for_key(KeyCode::Char('q')), Some(0));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let mut config = AppConfig::default();
        config.preferences.min_box_size = -3.0;
        config.preferences.detection_threshold = 1.5;
        config.preferences.history_capacity = 0;
        let session = config.session_config();
        assert_eq!(session.min_box_size, MIN_BOX_SIZE);
        assert_eq!(session.detection_threshold, DEFAULT_PROB_THRESHOLD);
        assert_eq!(session.history.capacity, 1);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(AppConfig::default_filename());

        let mut config = AppConfig::default();
        config.keybindings.mode = KeyCode::Shift;
        config.preferences.pointer_move_hz = 0;
        config.save(&path).expect("save");

        let loaded = AppConfig::load(&path).expect("load");
        assert_eq!(loaded, config);
        assert_eq!(loaded.session_config().pointer_move_hz, 0);
    }
}
