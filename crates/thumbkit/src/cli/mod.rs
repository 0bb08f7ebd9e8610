//! Command handlers.

pub mod config;
pub mod decode;
pub mod run;
pub mod submit;

use std::io::Read;
use std::path::{Path, PathBuf};
use thumbkit_core::Config;

/// Load the config from `path`, or from the default location when `None`.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

/// Expand `~` in a user-supplied path.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}

/// Read a file, or stdin when no file is given.
pub fn read_input(path: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match path {
        Some(path) => std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display())),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}
