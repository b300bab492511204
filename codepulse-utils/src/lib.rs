//! Ambient stack shared by every crate in the workspace: process
//! configuration (C12), process-wide logging setup (C13), and a handful of
//! small path/string helpers used by the pipeline crates.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod file;
pub mod logging;
pub mod string;

pub use config::EngineConfig;
pub use logging::init_from_env;

/// Result type used throughout the utility crate.
pub type Result<T> = std::result::Result<T, UtilError>;

#[derive(Debug, thiserror::Error)]
pub enum UtilError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}
