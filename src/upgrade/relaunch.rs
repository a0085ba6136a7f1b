use std::convert::Infallible;
use std::ffi::OsString;
use std::path::Path;
use std::process::{self, Command, Stdio};

use crate::error::{Error, Result};

/// Arguments to pass on to the new instance: everything but the program name.
pub fn forwarded_args<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    args.into_iter().skip(1).collect()
}

/// Start `exe` with `args` sharing our stdio, without waiting for it.
pub fn spawn_detached(exe: &Path, args: &[OsString]) -> Result<()> {
    log::debug!("restarting self with exe {} and args {:?}", exe.display(), args);
    // Dropping the child neither waits for nor kills it.
    Command::new(exe)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| Error::io("failed to start new process", e))?;
    Ok(())
}

/// Start the replacement and end this process with status 0.
pub fn relaunch_and_exit(exe: &Path) -> Result<Infallible> {
    let args = forwarded_args(std::env::args_os());
    spawn_detached(exe, &args)?;
    process::exit(0)
}
