use reqwest::blocking::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assets::select;
use crate::config::Settings;
use crate::download::{DownloadOutcome, download_all};
use crate::error::{Error, Result};
use crate::github::{Release, fetch_release, gh_client};
use crate::ownership::{OwnershipHook, default_hook};
use crate::task::TaskHandle;
use crate::upgrade::replace::{CleanupPolicy, OsFs};
use crate::upgrade::{SelfUpdateConfig, SelfUpdater};
use crate::version::{VersionState, is_dev_install_from_env};

/// Everything a [`Session`] takes from the environment, gathered up front so
/// tests can build one without touching process state.
pub struct SessionOptions {
    pub install_dir: PathBuf,
    pub dev_install: bool,
    pub self_update: SelfUpdateConfig,
    pub hook: Box<dyn OwnershipHook + Send + Sync>,
}

impl SessionOptions {
    /// Options for a real run: dev-install flag from the environment, the
    /// running executable for self-update and the sudo ownership hook.
    pub fn from_settings(settings: &Settings, install_dir: PathBuf) -> Result<Self> {
        let dev_install = is_dev_install_from_env();
        log::debug!("is dev install: {}", dev_install);
        Ok(SessionOptions {
            install_dir,
            dev_install,
            self_update: SelfUpdateConfig::from_settings(settings)?,
            hook: default_hook(),
        })
    }
}

/// State of one installer run.
///
/// `start` kicks off the release fetch and the installer's own update check
/// in the background; `wait_for_*` join them when their results are needed.
pub struct Session {
    settings: Settings,
    client: Client,
    install_dir: PathBuf,
    hook: Box<dyn OwnershipHook + Send + Sync>,
    versions: VersionState,
    release: Option<Release>,
    release_task: Option<TaskHandle<Release>>,
    release_error: Option<String>,
    self_updater: Arc<SelfUpdater>,
    self_check: Option<TaskHandle<bool>>,
}

impl Session {
    pub fn start(settings: Settings, opts: SessionOptions) -> Result<Self> {
        let client = gh_client(&settings)?;

        let mut versions = VersionState::new(opts.dev_install);
        let release_task = if opts.dev_install {
            None
        } else {
            let client = client.clone();
            let url = settings.release_url.clone();
            Some(TaskHandle::spawn("release fetch", move || {
                fetch_release(&client, &url)
            }))
        };
        versions.ingest_local_artifact(&opts.install_dir, &settings.target.rules().entry_point);

        let self_updater = Arc::new(SelfUpdater::new(opts.self_update));
        if self_updater.is_enabled() {
            let updater = Arc::clone(&self_updater);
            let policy = CleanupPolicy {
                attempts: settings.cleanup_attempts,
                delay: settings.cleanup_delay(),
            };
            // Detached: nobody waits on the cleanup.
            drop(TaskHandle::spawn("old executable cleanup", move || {
                Ok(updater.cleanup_previous(&OsFs, policy))
            }));
        }
        let self_check = self_updater.spawn_check(&client);

        Ok(Session {
            settings,
            client,
            install_dir: opts.install_dir,
            hook: opts.hook,
            versions,
            release: None,
            release_task,
            release_error: None,
            self_updater,
            self_check,
        })
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn versions(&self) -> &VersionState {
        &self.versions
    }

    pub fn release(&self) -> Option<&Release> {
        self.release.as_ref()
    }

    /// Why the last release fetch failed, if it did.
    pub fn release_error(&self) -> Option<&str> {
        self.release_error.as_deref()
    }

    pub fn self_updater(&self) -> &SelfUpdater {
        &self.self_updater
    }

    /// True once [`Self::wait_for_release`] would not block.
    pub fn release_ready(&self) -> bool {
        self.release_task.as_ref().is_none_or(TaskHandle::is_finished)
    }

    /// Block until the release fetch is done. Returns whether it succeeded.
    ///
    /// A failed fetch keeps the previous `latest` value. In dev-install mode
    /// there is nothing to wait for and this returns `true` at once.
    pub fn wait_for_release(&mut self) -> bool {
        let Some(task) = self.release_task.take() else {
            return self.release_error.is_none();
        };
        match task.join() {
            Ok(rel) => {
                log::debug!("finished fetching GitHub data");
                self.versions.ingest_remote(&rel);
                self.release = Some(rel);
                self.release_error = None;
                true
            }
            Err(e) => {
                self.release_error = Some(e.to_string());
                false
            }
        }
    }

    /// Block until the self-update check is done. Returns whether it succeeded.
    ///
    /// Details of a failure are in [`SelfUpdater::state`].
    pub fn wait_for_self_check(&mut self) -> bool {
        match self.self_check.take() {
            Some(task) => task.join().is_ok(),
            None => true,
        }
    }

    /// Download the latest build's assets into the install directory.
    ///
    /// # Errors
    /// - [`Error::State`] in dev-install mode or when release data is unavailable.
    /// - [`Error::NoMatchingAsset`] when the release has nothing for this target.
    /// - Whatever the first failing download returned; later assets are skipped.
    pub fn install(&mut self) -> Result<Vec<DownloadOutcome>> {
        log::debug!("installing latest builds");
        if self.versions.dev_install {
            return Err(Error::state("skipping install because this is a dev install"));
        }
        self.wait_for_release();

        let Some(release) = self.release.as_ref() else {
            return Err(Error::state(format!(
                "release data unavailable: {}",
                self.release_error.as_deref().unwrap_or("not fetched")
            )));
        };

        let selected = select(release, &self.settings.target.rules());
        if selected.is_empty() {
            log::error!("no matching asset in {}", release.name);
            return Err(Error::NoMatchingAsset(release.name.clone()));
        }

        let outcomes = download_all(&self.client, &selected, &self.install_dir, &*self.hook)?;
        self.versions.mark_installed();
        Ok(outcomes)
    }
}
