use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};

/// Filesystem operations used to swap the running executable.
///
/// Kept behind a trait so the swap algorithm can be exercised against
/// failures that a real filesystem will not produce on demand.
pub trait ExeFs {
    fn remove(&self, path: &Path) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Move the staged executable into place.
    fn replace(&self, staged: &Path, target: &Path) -> io::Result<()> {
        self.rename(staged, target)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OsFs;

impl ExeFs for OsFs {
    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }
}

/// `<exe>.old`, where a running executable is parked when it cannot be deleted.
pub fn old_path(exe: &Path) -> PathBuf {
    let mut s = exe.as_os_str().to_owned();
    s.push(".old");
    PathBuf::from(s)
}

#[cfg(unix)]
pub fn make_executable(p: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perm = fs::metadata(p)?.permissions();
    perm.set_mode(0o755);
    fs::set_permissions(p, perm)
}
#[cfg(not(unix))]
pub fn make_executable(_p: &Path) -> io::Result<()> {
    Ok(())
}

/// Put `staged` where `exe` is.
///
/// Steps:
/// 1. Delete `exe`. Platforms that lock running binaries refuse this, so
/// 2. fall back to renaming it to `<exe>.old`.
/// 3. Rename `staged` onto `exe`. If that fails after step 2, the original
///    is moved back from `.old`.
///
/// If both step 1 and step 2 fail, `exe` is left untouched. `staged` is never
/// deleted here: when step 3 fails after step 1 it is the only build left, and
/// the error names it.
pub fn swap_executable(fs: &dyn ExeFs, staged: &Path, exe: &Path) -> Result<()> {
    let parked = match fs.remove(exe) {
        Ok(()) => None,
        Err(remove_err) => {
            log::debug!("cannot remove {}: {}, renaming instead", exe.display(), remove_err);
            let old = old_path(exe);
            fs.rename(exe, &old)
                .map_err(|e| Error::io("failed to remove or rename own executable", e))?;
            Some(old)
        }
    };

    let Err(e) = fs.replace(staged, exe) else {
        return Ok(());
    };
    match parked {
        Some(old) => {
            if let Err(restore) = fs.rename(&old, exe) {
                log::error!(
                    "failed to restore {} from {}: {}",
                    exe.display(),
                    old.display(),
                    restore
                );
            }
            Err(Error::io("failed to replace self with updated executable", e))
        }
        None => {
            log::error!(
                "{} was removed but the update could not be moved into place",
                exe.display()
            );
            Err(Error::io(
                format!(
                    "failed to replace self with updated executable, the new build is at {}, move it to {} or download the installer again manually",
                    staged.display(),
                    exe.display()
                ),
                e,
            ))
        }
    }
}

/// How hard to try deleting a leftover `.old` executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        CleanupPolicy {
            attempts: 10,
            delay: Duration::from_secs(1),
        }
    }
}

/// Remove `<exe>.old` left by a previous update.
///
/// The replaced process may still hold the file for a moment after relaunch,
/// hence the retries. A file that does not exist counts as removed. Returns
/// `false` when every attempt failed.
pub fn cleanup_previous(fs: &dyn ExeFs, exe: &Path, policy: CleanupPolicy) -> bool {
    let old = old_path(exe);
    for attempt in 1..=policy.attempts {
        match fs.remove(&old) {
            Ok(()) => {
                log::debug!("removed old executable {}", old.display());
                return true;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => return true,
            Err(e) => {
                log::warn!(
                    "failed to remove old executable (attempt {}/{}), retrying in {:?}: {}",
                    attempt,
                    policy.attempts,
                    policy.delay,
                    e
                );
                if attempt < policy.attempts {
                    thread::sleep(policy.delay);
                }
            }
        }
    }
    log::warn!("giving up on removing {}", old.display());
    false
}
