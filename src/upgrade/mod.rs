//! Installer self-update.
//!
//! [`SelfUpdater`] checks the installer's own release feed against the tag
//! compiled into this binary, swaps in a newer build next to the running
//! executable, and relaunches it. Only one updater exists per process; it is
//! the sole writer of its [`SelfUpdateState`].

pub mod platform;
pub mod relaunch;
pub mod replace;

use anyhow::Context;
use reqwest::blocking::Client;
use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use crate::buildinfo::{INSTALLER_TAG, VERSION_UNKNOWN};
use crate::config::{Settings, load_settings};
use crate::download::{copy_verified, get_ok};
use crate::error::{Error, Result};
use crate::github::{fetch_release, gh_client};
use crate::progress::{finish_err, finish_ok, spinner};
use crate::task::TaskHandle;
use platform::{Platform, installer_download_url};
use relaunch::relaunch_and_exit;
use replace::{CleanupPolicy, ExeFs, OsFs, make_executable, swap_executable};

const MANUAL_DOWNLOAD_URL: &str = "https://github.com/Velocitcy/Installer/releases/latest";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelfUpdateState {
    Unchecked,
    Checking,
    UpToDate,
    UpdateAvailable,
    Updating,
    /// The new executable is in place; the process is about to relaunch.
    Updated,
    Failed(String),
}

impl fmt::Display for SelfUpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelfUpdateState::Unchecked => f.write_str("not checked"),
            SelfUpdateState::Checking => f.write_str("checking"),
            SelfUpdateState::UpToDate => f.write_str("up to date"),
            SelfUpdateState::UpdateAvailable => f.write_str("update available"),
            SelfUpdateState::Updating => f.write_str("updating"),
            SelfUpdateState::Updated => f.write_str("updated"),
            SelfUpdateState::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelfUpdateConfig {
    pub feed_url: String,
    pub download_base: String,
    /// Path of the running executable, captured before anything replaces it.
    pub exe_path: PathBuf,
    pub platform: Platform,
    pub build_tag: String,
}

impl SelfUpdateConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(SelfUpdateConfig {
            feed_url: settings.installer_release_url.clone(),
            download_base: settings.installer_download_base.clone(),
            exe_path: std::env::current_exe()?,
            platform: Platform::current(),
            build_tag: INSTALLER_TAG.to_string(),
        })
    }
}

pub struct SelfUpdater {
    config: SelfUpdateConfig,
    state: Mutex<SelfUpdateState>,
}

impl SelfUpdater {
    pub fn new(config: SelfUpdateConfig) -> Self {
        SelfUpdater {
            config,
            state: Mutex::new(SelfUpdateState::Unchecked),
        }
    }

    pub fn state(&self) -> SelfUpdateState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_state(&self, next: SelfUpdateState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Unreleased builds never look for updates of themselves.
    pub fn is_enabled(&self) -> bool {
        self.config.build_tag != VERSION_UNKNOWN
    }

    /// Compare the installer feed's tag with this build's tag.
    ///
    /// Returns whether a newer installer is published. A failed fetch moves
    /// the updater to `Failed` and is returned to the caller.
    pub fn check_for_update(&self, client: &Client) -> Result<bool> {
        if !self.is_enabled() {
            return Err(Error::state(
                "self-update is disabled because this is not a release build",
            ));
        }
        if matches!(
            self.state(),
            SelfUpdateState::Updating | SelfUpdateState::Updated
        ) {
            return Err(Error::state("self-update already in progress"));
        }

        self.set_state(SelfUpdateState::Checking);
        log::debug!("checking for installer updates");
        match fetch_release(client, &self.config.feed_url) {
            Ok(rel) => {
                let outdated = rel.tag_name != self.config.build_tag;
                log::debug!(
                    "installer {} vs latest {}, outdated: {}",
                    self.config.build_tag,
                    rel.tag_name,
                    outdated
                );
                self.set_state(if outdated {
                    SelfUpdateState::UpdateAvailable
                } else {
                    SelfUpdateState::UpToDate
                });
                Ok(outdated)
            }
            Err(e) => {
                log::warn!("failed to check for self updates: {}", e);
                self.set_state(SelfUpdateState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Run [`Self::check_for_update`] on a background thread.
    ///
    /// Returns `None` for unreleased builds, where no check is made.
    pub fn spawn_check(self: &Arc<Self>, client: &Client) -> Option<TaskHandle<bool>> {
        if !self.is_enabled() {
            log::debug!("disabling self updater because this is not a release build");
            return None;
        }
        self.set_state(SelfUpdateState::Checking);
        let updater = Arc::clone(self);
        let client = client.clone();
        Some(TaskHandle::spawn("self-update check", move || {
            updater.check_for_update(&client)
        }))
    }

    /// True when a newer installer exists and this platform can swap itself.
    pub fn can_apply(&self) -> bool {
        self.state() == SelfUpdateState::UpdateAvailable
            && self.config.platform.supports_self_replace()
    }

    /// Download the new installer and put it in place of the running one.
    ///
    /// On any failure the original executable stays reachable, either at its
    /// own path or at `<exe>.old`.
    pub fn apply(&self, client: &Client, fs: &dyn ExeFs) -> Result<()> {
        if !self.can_apply() {
            return Err(Error::state(
                "cannot update self: either no update is available or this platform needs a manual download",
            ));
        }
        let url = installer_download_url(self.config.platform, &self.config.download_base)
            .ok_or_else(|| Error::state("failed to get installer download link"))?;

        self.set_state(SelfUpdateState::Updating);
        match self.stage_and_swap(client, fs, &url) {
            Ok(()) => {
                log::info!("installer updated from {}", url);
                self.set_state(SelfUpdateState::Updated);
                Ok(())
            }
            Err(e) => {
                log::error!("self-update failed: {}", e);
                self.set_state(SelfUpdateState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    fn stage_and_swap(&self, client: &Client, fs: &dyn ExeFs, url: &str) -> Result<()> {
        log::debug!("updating self from {}", url);
        let exe = &self.config.exe_path;
        let dir = exe
            .parent()
            .ok_or_else(|| Error::state(format!("{} has no parent directory", exe.display())))?;

        let mut resp = get_ok(client, url)?;
        let declared = resp.content_length();

        // Same directory as the executable so the final rename stays on one filesystem.
        let mut tmp = tempfile::Builder::new()
            .prefix("VelocityInstallerUpdate")
            .tempfile_in(dir)
            .map_err(|e| Error::io(format!("failed to create update file in {}", dir.display()), e))?;
        copy_verified(&mut resp, tmp.as_file_mut(), declared)?;
        let staged = tmp.into_temp_path();
        make_executable(&staged)
            .map_err(|e| Error::io("failed to mark update as executable", e))?;

        // From here on the staged file outlives this function unless the
        // original is known to still be in place.
        let staged = staged
            .keep()
            .map_err(|e| Error::io("failed to keep staged update", e.error))?;
        if let Err(e) = swap_executable(fs, &staged, exe) {
            if exe.exists() {
                let _ = std::fs::remove_file(&staged);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Delete the `.old` executable left by a previous update.
    pub fn cleanup_previous(&self, fs: &dyn ExeFs, policy: CleanupPolicy) -> bool {
        replace::cleanup_previous(fs, &self.config.exe_path, policy)
    }

    /// Start the freshly installed executable and exit this process.
    ///
    /// Only allowed after [`Self::apply`] succeeded.
    pub fn relaunch(&self) -> Result<Infallible> {
        if self.state() != SelfUpdateState::Updated {
            return Err(Error::state("refusing to relaunch before a successful update"));
        }
        relaunch_and_exit(&self.config.exe_path)
    }
}

/// Update the installer itself to the latest release and restart it.
///
/// On macOS the user is pointed at the release page instead.
pub fn cmd_upgrade() -> anyhow::Result<()> {
    let settings = load_settings()?;
    let client = gh_client(&settings)?;
    let updater = SelfUpdater::new(SelfUpdateConfig::from_settings(&settings)?);

    if !updater.is_enabled() {
        println!("self-update is disabled for development builds");
        return Ok(());
    }

    let pb = spinner("checking for installer updates…");
    let outdated = match updater.check_for_update(&client) {
        Ok(o) => o,
        Err(e) => {
            finish_err(&pb, "failed to check for installer updates");
            return Err(e).context("failed to check for installer updates");
        }
    };
    if !outdated {
        finish_ok(&pb, format!("installer is up to date ({})", INSTALLER_TAG));
        return Ok(());
    }
    if !updater.can_apply() {
        finish_ok(
            &pb,
            format!(
                "a new installer is available, download it from {}",
                MANUAL_DOWNLOAD_URL
            ),
        );
        return Ok(());
    }

    pb.set_message("downloading new installer…");
    if let Err(e) = updater.apply(&client, &OsFs) {
        finish_err(&pb, "self-update failed");
        return Err(e).context("self-update failed");
    }

    finish_ok(&pb, "installer updated, restarting…");
    match updater.relaunch()? {}
}
