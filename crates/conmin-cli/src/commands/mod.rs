//! Subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod inspect;
pub mod process;
pub mod rules;

use std::path::{Path, PathBuf};

use tracing::debug;

use conmin_core::ConminConfig;

/// `<config dir>/conmin/config.json`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("conmin")
        .join("config.json")
}

/// Configuration for a run: the `--config` file, else the user config file
/// when present, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ConminConfig> {
    let config = match config_path {
        Some(path) => ConminConfig::from_file(Path::new(path))?,
        None => {
            let path = default_config_path();
            if path.is_file() {
                debug!("Using config file {}", path.display());
                ConminConfig::from_file(&path)?
            } else {
                ConminConfig::default()
            }
        }
    };
    Ok(config)
}

/// Supported input extensions.
pub fn is_supported_input(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    matches!(ext.as_str(), "pdf" | "json" | "txt")
}
