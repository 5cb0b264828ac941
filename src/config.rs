// src/config.rs

//! Configuration loading utilities.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::Config;

/// Load a configuration file and reject insane values.
///
/// A missing file falls back to defaults silently; callers report it once
/// logging is up. A file that exists but fails to parse or validate is an
/// error.
pub fn load_validated(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        Config::load(path)
            .map_err(|e| AppError::config(format!("Failed to load {}: {e}", path.display())))?
    } else {
        Config::default()
    };

    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid configuration: {e}")))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_validated(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(config.retry.max_retries, 5);
    }

    #[test]
    fn broken_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[retry\nmax_retries = ").unwrap();
        assert!(matches!(load_validated(&path), Err(AppError::Config(_))));
    }

    #[test]
    fn invalid_values_are_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[scheduler]\ndaily_hour = 24\n").unwrap();
        assert!(matches!(load_validated(&path), Err(AppError::Config(_))));
    }
}
