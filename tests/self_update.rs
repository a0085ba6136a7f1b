use httpmock::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use velocity_installer::Error;
use velocity_installer::buildinfo::UiType;
use velocity_installer::upgrade::platform::{Os, Platform};
use velocity_installer::upgrade::replace::{CleanupPolicy, ExeFs, OsFs, old_path};
use velocity_installer::upgrade::{SelfUpdateConfig, SelfUpdateState, SelfUpdater};

const FEED_PATH: &str = "/repos/Velocitcy/Installer/releases/latest";
const EXE_NAME: &str = "VelocityInstallerCli-linux";

fn serve_feed(server: &MockServer, tag: &str) {
    let body = serde_json::json!({
        "name": format!("Installer {}", tag),
        "tag_name": tag,
        "assets": [],
    })
    .to_string();
    server.mock(|when, then| {
        when.method(GET).path(FEED_PATH);
        then.status(200).body(body);
    });
}

fn updater(server: &MockServer, exe: &Path, os: Os) -> SelfUpdater {
    SelfUpdater::new(SelfUpdateConfig {
        feed_url: server.url(FEED_PATH),
        download_base: server.url("/download/"),
        exe_path: exe.to_path_buf(),
        platform: Platform { os, ui: UiType::Cli },
        build_tag: "v1.0.0".into(),
    })
}

fn install_fake_exe(dir: &Path) -> PathBuf {
    let exe = dir.join(EXE_NAME);
    fs::write(&exe, "old build").unwrap();
    exe
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn newer_tag_means_update_available() {
    let server = MockServer::start();
    serve_feed(&server, "v1.1.0");
    let td = tempfile::tempdir().unwrap();
    let u = updater(&server, &td.path().join(EXE_NAME), Os::Linux);

    assert!(u.check_for_update(&reqwest::blocking::Client::new()).unwrap());
    assert_eq!(u.state(), SelfUpdateState::UpdateAvailable);
    assert!(u.can_apply());
}

#[test]
fn same_tag_means_up_to_date() {
    let server = MockServer::start();
    serve_feed(&server, "v1.0.0");
    let td = tempfile::tempdir().unwrap();
    let u = updater(&server, &td.path().join(EXE_NAME), Os::Linux);

    assert!(!u.check_for_update(&reqwest::blocking::Client::new()).unwrap());
    assert_eq!(u.state(), SelfUpdateState::UpToDate);
    assert!(!u.can_apply());
}

#[test]
fn background_check_reports_through_handle() {
    let server = MockServer::start();
    serve_feed(&server, "v2.0.0");
    let td = tempfile::tempdir().unwrap();
    let u = Arc::new(updater(&server, &td.path().join(EXE_NAME), Os::Windows));

    let handle = u.spawn_check(&reqwest::blocking::Client::new()).unwrap();
    assert!(handle.join().unwrap());
    assert_eq!(u.state(), SelfUpdateState::UpdateAvailable);
}

#[test]
fn background_check_failure_is_reported_not_fatal() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(FEED_PATH);
        then.status(403).body("rate limited");
    });
    let td = tempfile::tempdir().unwrap();
    let u = Arc::new(updater(&server, &td.path().join(EXE_NAME), Os::Linux));

    let handle = u.spawn_check(&reqwest::blocking::Client::new()).unwrap();
    assert!(matches!(handle.join(), Err(Error::HttpStatus { .. })));
    assert!(matches!(u.state(), SelfUpdateState::Failed(msg) if msg.contains("403")));
}

#[test]
fn macos_cannot_apply_even_when_outdated() {
    let server = MockServer::start();
    serve_feed(&server, "v1.1.0");
    let td = tempfile::tempdir().unwrap();
    let exe = install_fake_exe(td.path());
    let u = updater(&server, &exe, Os::MacOs);
    let client = reqwest::blocking::Client::new();

    assert!(u.check_for_update(&client).unwrap());
    assert!(!u.can_apply());
    assert!(matches!(u.apply(&client, &OsFs), Err(Error::State(_))));
    assert_eq!(fs::read_to_string(&exe).unwrap(), "old build");
}

#[test]
fn apply_replaces_running_executable() {
    let server = MockServer::start();
    serve_feed(&server, "v1.1.0");
    let download = server.mock(|when, then| {
        when.method(GET).path(format!("/download/{}", EXE_NAME));
        then.status(200).body("new build");
    });

    let td = tempfile::tempdir().unwrap();
    let exe = install_fake_exe(td.path());
    let u = updater(&server, &exe, Os::Linux);
    let client = reqwest::blocking::Client::new();

    assert!(u.check_for_update(&client).unwrap());
    u.apply(&client, &OsFs).unwrap();

    download.assert();
    assert_eq!(u.state(), SelfUpdateState::Updated);
    assert_eq!(fs::read_to_string(&exe).unwrap(), "new build");
    assert_eq!(dir_entries(td.path()), [EXE_NAME]);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&exe).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

#[test]
fn failed_download_leaves_original_and_no_temp_file() {
    let server = MockServer::start();
    serve_feed(&server, "v1.1.0");
    server.mock(|when, then| {
        when.method(GET).path(format!("/download/{}", EXE_NAME));
        then.status(404);
    });

    let td = tempfile::tempdir().unwrap();
    let exe = install_fake_exe(td.path());
    let u = updater(&server, &exe, Os::Linux);
    let client = reqwest::blocking::Client::new();

    u.check_for_update(&client).unwrap();
    let err = u.apply(&client, &OsFs).unwrap_err();
    assert!(matches!(err, Error::HttpStatus { .. }));
    assert!(matches!(u.state(), SelfUpdateState::Failed(_)));
    assert_eq!(fs::read_to_string(&exe).unwrap(), "old build");
    assert_eq!(dir_entries(td.path()), [EXE_NAME]);
}

/// Refuses both deleting and renaming, like a locked binary on a read-only mount.
struct LockedFs;

impl ExeFs for LockedFs {
    fn remove(&self, _path: &Path) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "file in use"))
    }

    fn rename(&self, _from: &Path, _to: &Path) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "file in use"))
    }
}

#[test]
fn locked_executable_survives_failed_swap() {
    let server = MockServer::start();
    serve_feed(&server, "v1.1.0");
    server.mock(|when, then| {
        when.method(GET).path(format!("/download/{}", EXE_NAME));
        then.status(200).body("new build");
    });

    let td = tempfile::tempdir().unwrap();
    let exe = install_fake_exe(td.path());
    let u = updater(&server, &exe, Os::Linux);
    let client = reqwest::blocking::Client::new();

    u.check_for_update(&client).unwrap();
    let err = u.apply(&client, &LockedFs).unwrap_err();
    assert!(matches!(err, Error::IoContext { .. }));
    assert_eq!(fs::read_to_string(&exe).unwrap(), "old build");
    assert!(!old_path(&exe).exists());
    assert_eq!(dir_entries(td.path()), [EXE_NAME]);
}

/// Deletes fine but cannot move the new build into place, e.g. a full disk.
struct StuckReplaceFs;

impl ExeFs for StuckReplaceFs {
    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn replace(&self, _staged: &Path, _target: &Path) -> io::Result<()> {
        Err(io::Error::other("no space left on device"))
    }
}

#[test]
fn failed_replace_after_remove_leaves_new_build_on_disk() {
    let server = MockServer::start();
    serve_feed(&server, "v1.1.0");
    server.mock(|when, then| {
        when.method(GET).path(format!("/download/{}", EXE_NAME));
        then.status(200).body("new build");
    });

    let td = tempfile::tempdir().unwrap();
    let exe = install_fake_exe(td.path());
    let u = updater(&server, &exe, Os::Linux);
    let client = reqwest::blocking::Client::new();

    u.check_for_update(&client).unwrap();
    let err = u.apply(&client, &StuckReplaceFs).unwrap_err();
    assert!(matches!(err, Error::IoContext { .. }));
    assert!(matches!(u.state(), SelfUpdateState::Failed(_)));
    assert!(!exe.exists());

    let entries = dir_entries(td.path());
    assert_eq!(entries.len(), 1);
    assert!(entries[0].starts_with("VelocityInstallerUpdate"));
    let staged = td.path().join(&entries[0]);
    assert_eq!(fs::read_to_string(&staged).unwrap(), "new build");
    assert!(err.to_string().contains(&staged.display().to_string()));
}

/// Cannot delete the running file but can move it aside, as on Windows.
struct NoDeleteFs;

impl ExeFs for NoDeleteFs {
    fn remove(&self, _path: &Path) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "file in use"))
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }
}

#[test]
fn undeletable_executable_is_kept_as_old_and_cleaned_later() {
    let server = MockServer::start();
    serve_feed(&server, "v1.1.0");
    server.mock(|when, then| {
        when.method(GET).path("/download/VelocityInstallerCli.exe");
        then.status(200).body("new build");
    });

    let td = tempfile::tempdir().unwrap();
    let exe = install_fake_exe(td.path());
    let u = updater(&server, &exe, Os::Windows);
    let client = reqwest::blocking::Client::new();

    u.check_for_update(&client).unwrap();
    u.apply(&client, &NoDeleteFs).unwrap();
    assert_eq!(fs::read_to_string(&exe).unwrap(), "new build");
    assert_eq!(fs::read_to_string(old_path(&exe)).unwrap(), "old build");

    let policy = CleanupPolicy {
        attempts: 3,
        delay: Duration::ZERO,
    };
    assert!(u.cleanup_previous(&OsFs, policy));
    assert!(!old_path(&exe).exists());
    assert_eq!(dir_entries(td.path()), [EXE_NAME]);
}
