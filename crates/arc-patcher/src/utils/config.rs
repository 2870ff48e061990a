//! Application configuration management utilities.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;

pub const DEFAULT_REMOTE_ROOT: &str = "SaltySD/mods";

/// Application-wide defaults stored in config.toml. Command-line flags win.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Original, unmodified archive.
    pub archive_path: Option<Utf8PathBuf>,
    /// JSON slot manifest exported from the archive's table of contents.
    pub manifest_path: Option<Utf8PathBuf>,
    /// Base URL of the remote store, e.g. `http://192.168.0.20:8080`.
    pub remote_host: Option<String>,
    pub remote_root: String,
    pub level_start: i32,
    pub level_end: i32,
    pub jobs: usize,
    pub remote_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            archive_path: None,
            manifest_path: None,
            remote_host: None,
            remote_root: DEFAULT_REMOTE_ROOT.to_string(),
            level_start: arcpatch::encoder::MAX_LEVEL,
            level_end: arcpatch::encoder::MIN_LEVEL,
            jobs: 1,
            remote_timeout_secs: arcpatch::DEFAULT_REMOTE_TIMEOUT.as_secs(),
        }
    }
}

/// Returns the directory where the current executable resides.
pub fn install_dir() -> Option<Utf8PathBuf> {
    let exe = env::current_exe().ok()?;
    let parent = exe.parent()?;
    Utf8PathBuf::from_path_buf(parent.to_path_buf()).ok()
}

/// Returns the default configuration file path (config.toml next to the executable).
pub fn default_config_path() -> Option<Utf8PathBuf> {
    install_dir().map(|dir| dir.join("config.toml"))
}

/// Loads the application configuration from config.toml.
/// Returns default configuration if file doesn't exist or cannot be parsed.
pub fn load_config() -> AppConfig {
    if let Some(path) = default_config_path() {
        if path.exists() {
            match fs::read_to_string(&path).map(|content| parse_config(&content)) {
                Ok(Ok(cfg)) => return cfg,
                Ok(Err(e)) => tracing::warn!("Ignoring invalid {}: {}", path, e),
                Err(e) => tracing::warn!("Could not read {}: {}", path, e),
            }
        }
    }
    AppConfig::default()
}

pub fn parse_config(content: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str(content)
}

/// Saves the application configuration to config.toml.
pub fn save_config(cfg: &AppConfig) -> io::Result<()> {
    if let Some(path) = default_config_path() {
        let content = toml::to_string_pretty(cfg).map_err(io::Error::other)?;
        fs::write(path.as_str(), content)
    } else {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            "Could not determine config path",
        ))
    }
}
