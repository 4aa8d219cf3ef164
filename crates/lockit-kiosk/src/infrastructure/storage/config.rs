//! TOML-based configuration for the kiosk.
//!
//! The kiosk reads `KioskConfig` from, in order of preference:
//!
//! 1. the file passed with `--config <path>` (must exist), or
//! 2. the platform-appropriate config file, if present:
//!    - Windows:  `%APPDATA%\LockIt\config.toml`
//!    - Linux:    `~/.config/lockit/config.toml`
//!    - macOS:    `~/Library/Application Support/LockIt/config.toml`
//!
//! and otherwise falls back to [`KioskConfig::default()`].  Command-line
//! flags and `LOCKIT_*` environment variables are applied on top by the
//! binary.
//!
//! # What is TOML? (for beginners)
//!
//! TOML (Tom's Obvious Minimal Language) is a configuration file format designed
//! to be easy to read and write.  It looks similar to INI files but with more
//! data types.  Example:
//!
//! ```toml
//! [messaging]
//! host = "wss://broker.example.com:8084/mqtt"
//! topic = "lockit/boxes"
//!
//! [scanner]
//! refresh_hz = 30
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the TOML file.  Every section
//! is itself `#[serde(default)]`, so an empty file is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use lockit_core::Qos;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::scan_frames::FacingMode;
use crate::application::view_controller::ManualEntryPolicy;
use crate::infrastructure::messaging::{MqttConnectConfig, DEFAULT_CLIENT_ID_PREFIX};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
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
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level kiosk configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KioskConfig {
    #[serde(default)]
    pub kiosk: KioskSection,
    #[serde(default)]
    pub messaging: MessagingSection,
    #[serde(default)]
    pub scanner: ScannerSection,
}

/// Front-end behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KioskSection {
    /// `tracing` log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// What a manually typed code does on submit.
    #[serde(default)]
    pub manual_entry: ManualEntryPolicy,
    /// Preferred camera facing.
    #[serde(default)]
    pub facing: FacingMode,
}

/// Broker connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessagingSection {
    /// Broker URL: `mqtt://`, `tcp://`, `mqtts://`, `ssl://`, `ws://` or `wss://`.
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Topic unlock requests are published to (and subscribed on).
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_client_id_prefix")]
    pub client_id_prefix: String,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    /// Delivery level for unlock requests.
    #[serde(default)]
    pub qos: Qos,
}

/// Frame sampling settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScannerSection {
    /// Sampling ticks per second while scanning.
    #[serde(default = "default_refresh_hz")]
    pub refresh_hz: u32,
    /// Serve this image file instead of a live camera.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_host() -> String {
    "mqtt://localhost:1883".to_string()
}
fn default_topic() -> String {
    "lockit/boxes".to_string()
}
fn default_client_id_prefix() -> String {
    DEFAULT_CLIENT_ID_PREFIX.to_string()
}
fn default_keep_alive_secs() -> u64 {
    30
}
fn default_reconnect_delay_secs() -> u64 {
    5
}
fn default_refresh_hz() -> u32 {
    60
}

impl Default for KioskSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            manual_entry: ManualEntryPolicy::default(),
            facing: FacingMode::default(),
        }
    }
}

impl Default for MessagingSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            username: None,
            password: None,
            topic: default_topic(),
            client_id_prefix: default_client_id_prefix(),
            keep_alive_secs: default_keep_alive_secs(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            qos: Qos::default(),
        }
    }
}

impl Default for ScannerSection {
    fn default() -> Self {
        Self {
            refresh_hz: default_refresh_hz(),
            image: None,
        }
    }
}

impl MessagingSection {
    /// Connection settings for [`MqttPublisher::connect`].
    ///
    /// [`MqttPublisher::connect`]: crate::infrastructure::messaging::MqttPublisher::connect
    pub fn connect_config(&self) -> MqttConnectConfig {
        MqttConnectConfig {
            url: self.host.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            topic: self.topic.clone(),
            client_id_prefix: self.client_id_prefix.clone(),
            keep_alive: Duration::from_secs(self.keep_alive_secs),
            reconnect_delay: Duration::from_secs(self.reconnect_delay_secs),
        }
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

/// Resolves the full path to the platform config file, if the platform has one.
pub fn config_file_path() -> Option<PathBuf> {
    platform_config_dir().map(|dir| dir.join("config.toml"))
}

/// Loads the configuration.
///
/// With `Some(path)` the file must exist.  With `None` the platform config
/// file is used if present, otherwise `KioskConfig::default()`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors (including a missing
/// explicit file) and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<KioskConfig, ConfigError> {
    match path {
        Some(path) => read_config(path),
        None => match config_file_path() {
            Some(path) => match read_config(&path) {
                Err(ConfigError::Io { source, .. })
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    Ok(KioskConfig::default())
                }
                other => other,
            },
            None => Ok(KioskConfig::default()),
        },
    }
}

/// Renders `config` as pretty TOML (used by `--print-config`).
///
/// # Errors
///
/// Returns [`ConfigError::Serialize`] if serialization fails.
pub fn render_config(config: &KioskConfig) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(config)?)
}

fn read_config(path: &Path) -> Result<KioskConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Resolves the platform config directory including the `LockIt` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("LockIt"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("lockit"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("LockIt")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
