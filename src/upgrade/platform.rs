use crate::buildinfo::{UI_TYPE, UiType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Windows,
    MacOs,
    Linux,
    Other,
}

impl Os {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => Os::Windows,
            "macos" => Os::MacOs,
            "linux" => Os::Linux,
            _ => Os::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: Os,
    pub ui: UiType,
}

impl Platform {
    pub fn current() -> Self {
        Platform {
            os: Os::current(),
            ui: UI_TYPE,
        }
    }

    /// macOS refuses to run a swapped app bundle, so users there download
    /// the new installer by hand.
    pub fn supports_self_replace(&self) -> bool {
        self.os != Os::MacOs
    }
}

/// Release asset name of the installer build for `platform`.
pub fn installer_asset_name(platform: Platform) -> Option<&'static str> {
    match platform.os {
        Os::Windows => Some(match platform.ui {
            UiType::Cli => "VelocityInstallerCli.exe",
            UiType::Gui => "VelocityInstaller.exe",
        }),
        Os::MacOs => Some("VelocityInstaller.MacOS.zip"),
        Os::Linux => Some("VelocityInstallerCli-linux"),
        Os::Other => None,
    }
}

/// Download URL of the installer build for `platform` under `base`.
pub fn installer_download_url(platform: Platform, base: &str) -> Option<String> {
    let name = installer_asset_name(platform)?;
    Some(format!("{}/{}", base.trim_end_matches('/'), name))
}
