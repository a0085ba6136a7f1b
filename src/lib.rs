//! Crate entry point for the **Velocity installer**.
//!
//! The library fetches Velocity release metadata from GitHub, works out
//! whether the local install (or the installer itself) is behind, downloads
//! the assets for the selected target, and replaces its own executable when
//! a newer installer is published.
//!
//! Each submodule owns one piece of that flow; [`session::Session`] ties them
//! together for a single run.

pub mod assets;
pub mod buildinfo;
pub mod config;
pub mod download;
pub mod error;
pub mod github;
mod install;
pub mod ownership;
mod paths;
mod progress;
pub mod session;
pub mod task;
pub mod upgrade;
pub mod version;

/// Re-export commonly used types and commands so they can be accessed from `velocity_installer::*`.
pub use config::{InstallTarget, Settings, load_settings};
pub use error::{Error, Result};
pub use install::{cmd_install, cmd_status};
pub use paths::installer_home;
pub use session::{Session, SessionOptions};
pub use upgrade::cmd_upgrade;
