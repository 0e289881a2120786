pub mod check;
pub mod config;
pub mod lights;
pub mod run;

use std::path::PathBuf;

use onair_core::Config;

/// The explicit `--config` path, or the default location.
pub fn config_path(explicit: Option<PathBuf>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match explicit {
        Some(path) => Ok(path),
        None => Ok(Config::default_path()?),
    }
}
