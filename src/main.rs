//! # Velocity installer
//!
//! Installs and updates Velocity from its GitHub releases.
//!
//! - `velocity-installer status` shows installed vs latest build
//! - `velocity-installer install` downloads the latest build
//! - `velocity-installer upgrade` updates the installer itself and restarts it
//! - `velocity-installer home` prints the installer's config directory
//!
//! Set `RUST_LOG` (or pass `--verbose`) for diagnostic output.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use velocity_installer::{cmd_install, cmd_status, cmd_upgrade, installer_home};

#[derive(Parser, Debug)]
#[command(
    name = "velocity-installer",
    version,
    about = "Install and update Velocity",
    arg_required_else_help = true
)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Show installed and latest Velocity builds
    Status {
        /// Install directory to inspect instead of the configured one
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Download the latest Velocity build
    Install {
        /// Install directory to write to instead of the configured one
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Update the installer itself to the latest release
    Upgrade,
    /// Print the installer's config directory
    Home,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        Cmd::Status { dir } => cmd_status(dir),
        Cmd::Install { dir } => cmd_install(dir),
        Cmd::Upgrade => cmd_upgrade(),
        Cmd::Home => {
            println!("{}", installer_home()?.display());
            Ok(())
        }
    }
}
