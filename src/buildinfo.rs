//! Identifiers baked into the binary at compile time.
//!
//! Release builds are produced with `VELOCITY_INSTALLER_TAG` and
//! `VELOCITY_INSTALLER_GIT_HASH` set in the build environment. Local builds
//! fall back to [`VERSION_UNKNOWN`], which disables the self-updater.

pub const VERSION_UNKNOWN: &str = "Unknown";

/// Release tag of the running installer, e.g. `v1.4.0`.
pub const INSTALLER_TAG: &str = match option_env!("VELOCITY_INSTALLER_TAG") {
    Some(tag) => tag,
    None => VERSION_UNKNOWN,
};

/// Git commit the running installer was built from.
pub const INSTALLER_GIT_HASH: &str = match option_env!("VELOCITY_INSTALLER_GIT_HASH") {
    Some(hash) => hash,
    None => VERSION_UNKNOWN,
};

/// Which front-end this binary was built as. Picks the self-update asset on Windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiType {
    Cli,
    Gui,
}

pub const UI_TYPE: UiType = UiType::Cli;

/// `User-Agent` sent with every request.
pub fn user_agent() -> String {
    format!(
        "VelocityInstaller/{} (https://github.com/Velocitcy/Installer)",
        INSTALLER_GIT_HASH
    )
}
