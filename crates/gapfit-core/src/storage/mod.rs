mod config;
pub mod history_db;

pub use config::Config;
pub use history_db::SqliteHistoryStore;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/gapfit[-dev]/` based on GAPFIT_ENV.
///
/// Set GAPFIT_ENV=dev to use a development data directory.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("GAPFIT_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("gapfit-dev")
    } else {
        base_dir.join("gapfit")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::LoadFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
