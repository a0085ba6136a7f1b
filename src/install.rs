use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::buildinfo::INSTALLER_TAG;
use crate::config::load_settings;
use crate::progress::{finish_err, finish_ok, spinner};
use crate::session::{Session, SessionOptions};

fn open_session(dir: Option<PathBuf>) -> Result<Session> {
    let mut settings = load_settings()?;
    if let Some(dir) = dir {
        settings.install_dir = Some(dir);
    }
    let install_dir = settings.install_dir()?;
    let opts = SessionOptions::from_settings(&settings, install_dir)
        .context("failed to prepare installer session")?;
    Session::start(settings, opts).context("failed to start installer session")
}

/// CLI command: show installed vs latest Velocity build and the installer's own update state.
///
/// Example output:
/// ```text
/// install dir  /home/user/.config/velocity-installer/dist
/// installed    None
/// latest       abc123 (outdated)
/// installer    v1.4.0 (up to date)
/// ```
pub fn cmd_status(dir: Option<PathBuf>) -> Result<()> {
    let mut session = open_session(dir)?;

    let pb = spinner("fetching latest release…");
    let fetched = session.wait_for_release();
    pb.set_message("checking for installer updates…");
    session.wait_for_self_check();
    pb.finish_and_clear();

    let v = session.versions();
    let state = if v.dev_install {
        "dev install".cyan()
    } else if v.is_outdated() {
        "outdated".yellow()
    } else {
        "up to date".green()
    };

    println!("{:<12} {}", "install dir".bold(), session.install_dir().display());
    println!("{:<12} {}", "installed".bold(), v.installed);
    println!("{:<12} {} ({})", "latest".bold(), v.latest, state);
    if !fetched && let Some(e) = session.release_error() {
        println!("{:<12} {}", "", format!("release check failed: {}", e).red());
    }
    println!(
        "{:<12} {} ({})",
        "installer".bold(),
        INSTALLER_TAG,
        session.self_updater().state()
    );
    Ok(())
}

/// CLI command: download the latest Velocity build into the install directory.
pub fn cmd_install(dir: Option<PathBuf>) -> Result<()> {
    let mut session = open_session(dir)?;

    let pb = spinner(format!(
        "installing latest build into {}…",
        session.install_dir().display()
    ));

    match session.install() {
        Ok(outcomes) => {
            finish_ok(
                &pb,
                format!(
                    "installed {} ({} files)",
                    session.versions().installed,
                    outcomes.len()
                ),
            );
            for o in &outcomes {
                println!("  {} ({} bytes)", o.path.display(), o.bytes);
            }
            Ok(())
        }
        Err(e) => {
            finish_err(&pb, format!("install failed (error: {})", e));
            Err(e).context("install failed")
        }
    }
}
