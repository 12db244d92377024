//! Configuration for the fanlink CLI.
//!
//! TOML file + `FANLINK_*` environment overrides, and translation to
//! `fanlink_core::ControllerConfig`. The CLI layers its flag overrides on
//! top of what this crate resolves.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use fanlink_core::{ControllerConfig, DEFAULT_DEVICE_URL};

/// Environment variable prefix. Nested keys use `__`, e.g.
/// `FANLINK_POLLING__INTERVAL_MS=500`.
pub const ENV_PREFIX: &str = "FANLINK_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceSection,

    #[serde(default)]
    pub polling: PollingSection,

    /// Output defaults for the CLI.
    #[serde(default)]
    pub defaults: Defaults,
}

/// Where the fan controller lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeviceSection {
    /// Device base URL (e.g., "http://192.168.100.161").
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,

    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            url: default_url(),
            poll_timeout_ms: default_poll_timeout_ms(),
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PollingSection {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Consecutive failures before the link is reported down.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_url() -> String {
    DEFAULT_DEVICE_URL.into()
}
fn default_poll_timeout_ms() -> u64 {
    1000
}
fn default_command_timeout_ms() -> u64 {
    3000
}
fn default_interval_ms() -> u64 {
    1000
}
fn default_max_retries() -> u32 {
    3
}
fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "fanlink", "fanlink").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("fanlink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path` (missing file is fine) + environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

/// Serialize config to TOML and write it to `path`, creating parents.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Parse and check a device URL. Only `http` and `https` are accepted.
pub fn parse_device_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "device.url".into(),
        reason: format!("invalid URL: {raw}"),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Validation {
            field: "device.url".into(),
            reason: format!("expected http or https, got '{other}'"),
        }),
    }
}

impl Config {
    /// Build a `ControllerConfig` from this file -- no CLI flag overrides.
    pub fn to_controller_config(&self) -> Result<ControllerConfig, ConfigError> {
        let url = parse_device_url(&self.device.url)?;

        if self.polling.max_retries == 0 {
            return Err(ConfigError::Validation {
                field: "polling.max_retries".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.polling.interval_ms == 0 {
            return Err(ConfigError::Validation {
                field: "polling.interval_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.device.poll_timeout_ms == 0 || self.device.command_timeout_ms == 0 {
            return Err(ConfigError::Validation {
                field: "device timeouts".into(),
                reason: "must be greater than zero".into(),
            });
        }

        let mut cfg = ControllerConfig::new(url);
        cfg.poll_interval = Duration::from_millis(self.polling.interval_ms);
        cfg.poll_timeout = Duration::from_millis(self.device.poll_timeout_ms);
        cfg.command_timeout = Duration::from_millis(self.device.command_timeout_ms);
        cfg.max_retries = self.polling.max_retries;
        Ok(cfg)
    }
}
