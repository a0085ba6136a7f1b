use anyhow::Result;
use std::{env, path::PathBuf};

#[derive(Clone)]
pub struct Paths {
    pub config: PathBuf,
    pub dist: PathBuf,
}

/// Resolve the installer's home directory.
///
/// `VELOCITY_INSTALLER_HOME` wins; otherwise `$XDG_CONFIG_HOME/velocity-installer`,
/// falling back to `$HOME/.config/velocity-installer`.
pub fn installer_home() -> Result<PathBuf> {
    if let Some(home) = env::var_os("VELOCITY_INSTALLER_HOME") {
        return Ok(PathBuf::from(home));
    }
    let xdg = env::var_os("XDG_CONFIG_HOME");
    let base = xdg
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env::var_os("HOME").unwrap_or_default()).join(".config"));
    Ok(base.join("velocity-installer"))
}

pub fn paths() -> Result<Paths> {
    let home = installer_home()?;
    Ok(Paths {
        config: home.join("config.toml"),
        dist: home.join("dist"),
    })
}
