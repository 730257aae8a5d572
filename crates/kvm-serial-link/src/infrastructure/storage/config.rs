//! TOML-based configuration persistence for the serial link.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\KvmSerial\config.toml`
//! - Linux:    `~/.config/kvm-serial/config.toml`
//! - macOS:    `~/Library/Application Support/KvmSerial/config.toml`
//!
//! # What is TOML? (for beginners)
//!
//! TOML (Tom's Obvious Minimal Language) is a configuration file format designed
//! to be easy to read and write.  Example:
//!
//! ```toml
//! [serial]
//! port = "COM3"
//! baud_rate = 115200
//!
//! [jiggle]
//! enabled = false
//! ```
//!
//! # Serde default values
//!
//! Every section and every field has a default, so an empty file (or no file
//! at all) is a valid configuration.  Fields annotated with
//! `#[serde(default = "some_fn")]` take `some_fn()` when absent.
//!
//! The on-disk shape is deliberately flat (milliseconds and seconds as
//! integers).  [`AppConfig::to_link_settings`] validates it and converts it
//! into the runtime [`LinkSettings`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use kvm_serial_core::{ProfileKind, ScrollSettings};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::{JiggleConfig, LinkSettings, WorkerConfig};
use crate::infrastructure::serial::{SerialSettings, DEFAULT_BAUD_RATE};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value parsed but is not usable.
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub jiggle: JiggleSection,
    #[serde(default)]
    pub input: InputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Serial port settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerialConfig {
    /// Port name, e.g. `"COM3"` or `"/dev/ttyUSB0"`.  Unset until chosen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Read/write timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Worker pacing and shutdown bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueConfig {
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,
    #[serde(default = "default_send_gap_ms")]
    pub send_gap_ms: u64,
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

/// Anti-idle monitor settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JiggleSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_min_idle_secs")]
    pub min_idle_secs: u64,
    #[serde(default = "default_max_idle_secs")]
    pub max_idle_secs: u64,
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
    #[serde(default = "default_move_delay_ms")]
    pub move_delay_ms: u64,
    /// Lower bound of jiggle positions on both axes (device units).
    #[serde(default = "default_coord_min")]
    pub coord_min: i32,
    /// Upper bound of jiggle positions on both axes (device units).
    #[serde(default = "default_coord_max")]
    pub coord_max: i32,
}

/// Input translation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputConfig {
    /// Scroll ticks per wheel notch, clamped to 1–20.
    #[serde(default = "default_scroll_sensitivity")]
    pub scroll_sensitivity: u8,
    #[serde(default)]
    pub scroll_reverse: bool,
    /// Mouse frame layout expected by the device.
    #[serde(default)]
    pub profile: ProfileKind,
    /// Width of the video view in pixels, for pointer mapping.
    #[serde(default = "default_view_width")]
    pub view_width: u32,
    #[serde(default = "default_view_height")]
    pub view_height: u32,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}
fn default_timeout_ms() -> u64 {
    1000
}
fn default_idle_poll_ms() -> u64 {
    5
}
fn default_send_gap_ms() -> u64 {
    1
}
fn default_error_backoff_ms() -> u64 {
    100
}
fn default_shutdown_timeout_ms() -> u64 {
    2000
}
fn default_min_idle_secs() -> u64 {
    120
}
fn default_max_idle_secs() -> u64 {
    180
}
fn default_poll_secs() -> u64 {
    10
}
fn default_move_delay_ms() -> u64 {
    100
}
fn default_coord_min() -> i32 {
    0x1000
}
fn default_coord_max() -> i32 {
    0x4000
}
fn default_scroll_sensitivity() -> u8 {
    1
}
fn default_view_width() -> u32 {
    1920
}
fn default_view_height() -> u32 {
    1080
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            idle_poll_ms: default_idle_poll_ms(),
            send_gap_ms: default_send_gap_ms(),
            error_backoff_ms: default_error_backoff_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

impl Default for JiggleSection {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            min_idle_secs: default_min_idle_secs(),
            max_idle_secs: default_max_idle_secs(),
            poll_secs: default_poll_secs(),
            move_delay_ms: default_move_delay_ms(),
            coord_min: default_coord_min(),
            coord_max: default_coord_max(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            scroll_sensitivity: default_scroll_sensitivity(),
            scroll_reverse: false,
            profile: ProfileKind::default(),
            view_width: default_view_width(),
            view_height: default_view_height(),
        }
    }
}

// ── Conversion to runtime settings ────────────────────────────────────────────

impl AppConfig {
    /// Validates the file values and builds [`LinkSettings`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an empty idle range, an inverted
    /// coordinate range, or a zero poll interval or send gap.
    pub fn to_link_settings(&self) -> Result<LinkSettings, ConfigError> {
        let j = &self.jiggle;
        if j.min_idle_secs > j.max_idle_secs {
            return Err(ConfigError::Invalid {
                field: "jiggle.min_idle_secs",
                reason: format!("{} exceeds max_idle_secs {}", j.min_idle_secs, j.max_idle_secs),
            });
        }
        if j.coord_min > j.coord_max {
            return Err(ConfigError::Invalid {
                field: "jiggle.coord_min",
                reason: format!("{} exceeds coord_max {}", j.coord_min, j.coord_max),
            });
        }
        if j.poll_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "jiggle.poll_secs",
                reason: "must be at least 1".to_string(),
            });
        }

        let q = &self.queue;
        for (field, value) in [
            ("queue.idle_poll_ms", q.idle_poll_ms),
            ("queue.send_gap_ms", q.send_gap_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be at least 1".to_string(),
                });
            }
        }

        Ok(LinkSettings {
            profile: self.input.profile.profile(),
            worker: WorkerConfig {
                idle_poll: Duration::from_millis(q.idle_poll_ms),
                send_gap: Duration::from_millis(q.send_gap_ms),
                error_backoff: Duration::from_millis(q.error_backoff_ms),
            },
            jiggle: JiggleConfig {
                enabled: j.enabled,
                min_idle: Duration::from_secs(j.min_idle_secs),
                max_idle: Duration::from_secs(j.max_idle_secs),
                poll_interval: Duration::from_secs(j.poll_secs),
                move_delay: Duration::from_millis(j.move_delay_ms),
                coord_range: j.coord_min..=j.coord_max,
                seed: None,
            },
            shutdown_timeout: Duration::from_millis(q.shutdown_timeout_ms),
        })
    }

    /// Serial settings for the configured port, or `None` if no port is set.
    pub fn serial_settings(&self) -> Option<SerialSettings> {
        self.serial.port.as_ref().map(|port| SerialSettings {
            port: port.clone(),
            baud_rate: self.serial.baud_rate,
            timeout: Duration::from_millis(self.serial.timeout_ms),
        })
    }

    pub fn scroll_settings(&self) -> ScrollSettings {
        ScrollSettings::new(self.input.scroll_sensitivity, self.input.scroll_reverse)
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the platform config file.
///
/// # Errors
///
/// See [`load_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to the platform config file.
///
/// # Errors
///
/// See [`save_to`].
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_to(config, &config_file_path()?)
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the app subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("KvmSerial"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("kvm-serial"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("KvmSerial")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use kvm_serial_core::WireProfile;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_default_config_converts_to_default_link_settings() {
        // Arrange
        let cfg = AppConfig::default();

        // Act
        let settings = cfg.to_link_settings().expect("defaults are valid");

        // Assert
        assert_eq!(settings, LinkSettings::default());
    }

    #[test]
    fn test_default_config_has_no_port() {
        let cfg = AppConfig::default();
        assert!(cfg.serial_settings().is_none());
        assert_eq!(cfg.serial.baud_rate, 115_200);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides_only_named_fields() {
        // Arrange
        let toml_str = r#"
[serial]
port = "COM3"
baud_rate = 9600

[input]
profile = "calibrated"
scroll_sensitivity = 40
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        let serial = cfg.serial_settings().expect("port set");
        assert_eq!(serial.port, "COM3");
        assert_eq!(serial.baud_rate, 9600);
        assert_eq!(serial.timeout, Duration::from_millis(1000));
        assert_eq!(
            cfg.to_link_settings().unwrap().profile,
            WireProfile::CALIBRATED
        );
        // Sensitivity is clamped on conversion.
        assert_eq!(cfg.scroll_settings().sensitivity, 20);
        assert!(cfg.jiggle.enabled);
    }

    #[test]
    fn test_unknown_profile_is_parse_error() {
        let result: Result<AppConfig, _> = toml::from_str("[input]\nprofile = \"turbo\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_inverted_coordinate_range_is_rejected() {
        // Arrange
        let mut cfg = AppConfig::default();
        cfg.jiggle.coord_min = 0x5000;
        cfg.jiggle.coord_max = 0x1000;

        // Act
        let result = cfg.to_link_settings();

        // Assert
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "jiggle.coord_min",
                ..
            })
        ));
    }

    #[test]
    fn test_inverted_idle_range_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.jiggle.min_idle_secs = 300;
        assert!(cfg.to_link_settings().is_err());
    }

    #[test]
    fn test_zero_worker_waits_are_rejected() {
        // Arrange
        let mut idle = AppConfig::default();
        idle.queue.idle_poll_ms = 0;
        let mut gap = AppConfig::default();
        gap.queue.send_gap_ms = 0;

        // Act / Assert
        assert!(matches!(
            idle.to_link_settings(),
            Err(ConfigError::Invalid {
                field: "queue.idle_poll_ms",
                ..
            })
        ));
        assert!(matches!(
            gap.to_link_settings(),
            Err(ConfigError::Invalid {
                field: "queue.send_gap_ms",
                ..
            })
        ));
    }

    #[test]
    fn test_queue_section_maps_to_worker_config() {
        // Arrange
        let mut cfg = AppConfig::default();
        cfg.queue.send_gap_ms = 4;
        cfg.queue.shutdown_timeout_ms = 500;

        // Act
        let settings = cfg.to_link_settings().unwrap();

        // Assert
        assert_eq!(settings.worker.send_gap, Duration::from_millis(4));
        assert_eq!(settings.shutdown_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_load_from_missing_file_returns_default() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/config.toml");
        let cfg = load_from(&path).expect("missing file is not an error");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_save_and_load_round_trip_via_temp_dir() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("kvm_serial_test_{}", Uuid::new_v4()));
        let path = dir.join("nested").join("config.toml");
        let mut cfg = AppConfig::default();
        cfg.serial.port = Some("/dev/ttyUSB0".to_string());
        cfg.general.log_level = "debug".to_string();
        cfg.jiggle.enabled = false;

        // Act
        save_to(&cfg, &path).expect("save");
        let loaded = load_from(&path).expect("load");

        // Assert
        assert_eq!(loaded, cfg);

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_from_malformed_file_is_parse_error() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("kvm_serial_test_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        // Act
        let result = load_from(&path);

        // Assert
        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(
                path.ends_with("config.toml"),
                "config file must be named config.toml, got {path:?}"
            );
        }
        // NoPlatformConfigDir is acceptable in a stripped environment.
    }
}
