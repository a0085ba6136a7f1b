//! Installed-vs-latest bookkeeping for the Velocity build.

use regex::bytes::Regex;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use crate::github::Release;

/// `installed` before a local build has been found.
pub const INSTALLED_NONE: &str = "None";
/// `latest` before a release has been fetched.
pub const LATEST_UNKNOWN: &str = "Unknown";
/// Setting this to `1` turns on dev-install mode.
pub const DEV_INSTALL_ENV: &str = "VELOCITY_DEV_INSTALL";

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"// Velocity ((?-u:\w)+)").expect("marker regex is valid"));

/// Read the dev-install flag from the process environment.
pub fn is_dev_install_from_env() -> bool {
    dev_install_flag(env::var(DEV_INSTALL_ENV).ok().as_deref())
}

fn dev_install_flag(value: Option<&str>) -> bool {
    value == Some("1")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionState {
    pub installed: String,
    pub latest: String,
    pub dev_install: bool,
}

impl Default for VersionState {
    fn default() -> Self {
        VersionState::new(false)
    }
}

impl VersionState {
    pub fn new(dev_install: bool) -> Self {
        VersionState {
            installed: INSTALLED_NONE.to_string(),
            latest: LATEST_UNKNOWN.to_string(),
            dev_install,
        }
    }

    /// Pick up the identifier of an existing install at `path`.
    ///
    /// When `path` is a directory the marker is read from `entry_point` inside
    /// it. A missing path, a directory without `entry_point`, an unreadable
    /// file and a file without the marker all leave `installed` untouched.
    pub fn ingest_local_artifact(&mut self, path: &Path, entry_point: &str) {
        let Ok(meta) = fs::metadata(path) else {
            return;
        };
        let file = if meta.is_dir() {
            path.join(entry_point)
        } else {
            path.to_path_buf()
        };

        let Ok(bytes) = fs::read(&file) else {
            return;
        };

        log::debug!("found existing Velocity install at {}", file.display());
        match extract_marker(&bytes) {
            Some(hash) => {
                log::debug!("existing hash is {}", hash);
                self.installed = hash;
            }
            None => log::debug!("did not find hash in {}", file.display()),
        }
    }

    /// Record the identifier carried in the release name.
    pub fn ingest_remote(&mut self, release: &Release) {
        self.latest = identifier_from_name(&release.name).to_string();
        log::debug!(
            "latest hash is {}, local install is {}",
            self.latest,
            if self.is_outdated() { "outdated" } else { "up to date" }
        );
    }

    pub fn is_outdated(&self) -> bool {
        !self.dev_install && self.installed != self.latest
    }

    /// Called once the latest build has been written to disk.
    pub fn mark_installed(&mut self) {
        self.installed = self.latest.clone();
    }
}

/// The token after the last space of a release name.
pub fn identifier_from_name(name: &str) -> &str {
    match name.rfind(' ') {
        Some(i) => &name[i + 1..],
        None => name,
    }
}

fn extract_marker(bytes: &[u8]) -> Option<String> {
    MARKER
        .captures(bytes)
        .and_then(|c| c.get(1))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn release(name: &str) -> Release {
        Release {
            name: name.to_string(),
            tag_name: "devbuild".to_string(),
            assets: vec![],
        }
    }

    #[test]
    fn identifier_is_text_after_last_space() {
        assert_eq!(identifier_from_name("Velocity Build abc123"), "abc123");
        assert_eq!(identifier_from_name("Velocity abc123"), "abc123");
        assert_eq!(identifier_from_name("abc123"), "abc123");
        assert_eq!(identifier_from_name("Velocity "), "");
    }

    #[test]
    fn dev_install_is_never_outdated() {
        let mut v = VersionState::new(true);
        v.ingest_remote(&release("Velocity abc123"));
        assert_ne!(v.installed, v.latest);
        assert!(!v.is_outdated());
    }

    #[test]
    fn outdated_iff_identifiers_differ() {
        let mut v = VersionState::new(false);
        v.installed = "abc123".into();
        v.ingest_remote(&release("Velocity abc123"));
        assert!(!v.is_outdated());

        v.ingest_remote(&release("Velocity def456"));
        assert!(v.is_outdated());
    }

    #[test]
    fn identical_sentinels_are_current() {
        let mut v = VersionState::new(false);
        v.installed = LATEST_UNKNOWN.into();
        assert!(!v.is_outdated());
    }

    #[test]
    fn fresh_state_with_failed_fetch_is_outdated() {
        let v = VersionState::default();
        assert_eq!(v.installed, INSTALLED_NONE);
        assert_eq!(v.latest, LATEST_UNKNOWN);
        assert!(v.is_outdated());
    }

    #[test]
    fn missing_path_keeps_sentinel() {
        let td = tempdir().unwrap();
        let mut v = VersionState::default();
        v.ingest_local_artifact(&td.path().join("nope"), "patcher.js");
        assert_eq!(v.installed, INSTALLED_NONE);
    }

    #[test]
    fn directory_without_entry_point_keeps_sentinel() {
        let td = tempdir().unwrap();
        let mut v = VersionState::default();
        fs::write(td.path().join("main.js"), "// Velocity abc123\n").unwrap();
        v.ingest_local_artifact(td.path(), "patcher.js");
        assert_eq!(v.installed, INSTALLED_NONE);
    }

    #[test]
    fn directory_entry_point_marker_is_read() {
        let td = tempdir().unwrap();
        fs::write(
            td.path().join("patcher.js"),
            "\"use strict\";\n// Velocity 9f8e7d_1 (built)\n// Velocity later\n",
        )
        .unwrap();
        let mut v = VersionState::default();
        v.ingest_local_artifact(td.path(), "patcher.js");
        assert_eq!(v.installed, "9f8e7d_1");
    }

    #[test]
    fn plain_file_without_marker_keeps_sentinel() {
        let td = tempdir().unwrap();
        let f = td.path().join("desktop.asar");
        fs::write(&f, b"\x00\x01 Velocity abc // Velocity  ").unwrap();
        let mut v = VersionState::default();
        v.ingest_local_artifact(&f, "patcher.js");
        assert_eq!(v.installed, INSTALLED_NONE);
    }

    #[test]
    fn marker_found_in_binary_file() {
        let td = tempdir().unwrap();
        let f = td.path().join("desktop.asar");
        fs::write(&f, b"\x00\xff\xfe// Velocity abc123\x00rest").unwrap();
        let mut v = VersionState::default();
        v.ingest_local_artifact(&f, "patcher.js");
        assert_eq!(v.installed, "abc123");
    }

    #[test]
    fn marker_identifier_stops_at_non_ascii() {
        assert_eq!(extract_marker("// Velocity abcé\n".as_bytes()).as_deref(), Some("abc"));
        assert_eq!(extract_marker("// Velocity é".as_bytes()), None);
    }

    #[test]
    fn mark_installed_copies_latest() {
        let mut v = VersionState::default();
        v.ingest_remote(&release("Velocity abc123"));
        v.mark_installed();
        assert_eq!(v.installed, "abc123");
        assert!(!v.is_outdated());
    }

    #[test]
    fn dev_flag_requires_literal_one() {
        assert!(dev_install_flag(Some("1")));
        assert!(!dev_install_flag(Some("true")));
        assert!(!dev_install_flag(Some("")));
        assert!(!dev_install_flag(None));
    }
}
