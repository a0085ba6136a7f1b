use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::assets::PlatformRules;
use crate::paths::paths;

pub const RELEASE_URL: &str = "https://api.github.com/repos/Velocitcs/Velocity/releases/latest";
pub const INSTALLER_RELEASE_URL: &str =
    "https://api.github.com/repos/Velocitcy/Installer/releases/latest";
pub const INSTALLER_DOWNLOAD_BASE: &str =
    "https://github.com/Velocitcy/Installer/releases/latest/download/";

/// Which flavour of Velocity gets installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallTarget {
    /// Patches the official Discord client.
    #[default]
    Discord,
    /// Standalone Velocity desktop app.
    Desktop,
}

impl InstallTarget {
    pub fn rules(self) -> PlatformRules {
        match self {
            InstallTarget::Discord => PlatformRules::discord(),
            InstallTarget::Desktop => PlatformRules::desktop(),
        }
    }
}

/// Settings loaded from `config.toml`.
///
/// Every key is optional. Example:
/// ```toml
/// target = "desktop"
/// install_dir = "/opt/velocity"
/// timeout_secs = 120
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub release_url: String,
    pub installer_release_url: String,
    pub installer_download_base: String,
    pub install_dir: Option<PathBuf>,
    pub target: InstallTarget,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub cleanup_attempts: u32,
    pub cleanup_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            release_url: RELEASE_URL.to_string(),
            installer_release_url: INSTALLER_RELEASE_URL.to_string(),
            installer_download_base: INSTALLER_DOWNLOAD_BASE.to_string(),
            install_dir: None,
            target: InstallTarget::default(),
            timeout_secs: 300,
            connect_timeout_secs: 10,
            cleanup_attempts: 10,
            cleanup_delay_ms: 1000,
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_millis(self.cleanup_delay_ms)
    }

    /// Directory the Velocity assets are written to.
    pub fn install_dir(&self) -> Result<PathBuf> {
        match &self.install_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(paths()?.dist),
        }
    }
}

/// Load settings from the installer home, falling back to defaults when
/// no `config.toml` exists yet.
pub fn load_settings() -> Result<Settings> {
    let p = paths()?;
    load_settings_from(&p.config)
}

/// Load and parse a specific config file.
///
/// # Errors
/// - Returns an error if the file exists but cannot be read.
/// - Returns an error if parsing the TOML fails.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        log::debug!("no config at {}, using defaults", path.display());
        return Ok(Settings::default());
    }
    let txt = fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let settings: Settings = toml::from_str(&txt)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(settings)
}
