//! Give written files back to the invoking user.
//!
//! When the installer runs through `sudo`, everything it writes would end up
//! owned by root. The hook here is best effort: callers log a failure and move on.

use std::env;
use std::io;
use std::path::Path;

pub trait OwnershipHook {
    fn fix(&self, path: &Path) -> io::Result<()>;
}

/// Does nothing. Used when not running under `sudo` and on non-unix targets.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOwner;

impl OwnershipHook for NoopOwner {
    fn fix(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}

/// Chowns files to the `SUDO_UID`/`SUDO_GID` of the user who invoked sudo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SudoOwner {
    pub uid: u32,
    pub gid: u32,
}

impl SudoOwner {
    pub fn from_env() -> Option<Self> {
        let uid = env::var("SUDO_UID").ok()?.parse().ok()?;
        let gid = env::var("SUDO_GID").ok()?.parse().ok()?;
        Some(SudoOwner { uid, gid })
    }
}

impl OwnershipHook for SudoOwner {
    #[cfg(unix)]
    fn fix(&self, path: &Path) -> io::Result<()> {
        std::os::unix::fs::chown(path, Some(self.uid), Some(self.gid))
    }

    #[cfg(not(unix))]
    fn fix(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}

/// Pick the hook for the current process.
pub fn default_hook() -> Box<dyn OwnershipHook + Send + Sync> {
    match SudoOwner::from_env() {
        Some(owner) => {
            log::debug!("running under sudo, files will be owned by {}:{}", owner.uid, owner.gid);
            Box::new(owner)
        }
        None => Box::new(NoopOwner),
    }
}
