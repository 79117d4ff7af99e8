//! Default paths for playtime components
//!
//! Provides centralized path defaults that all crates can use.
//! Paths are user-writable by default (no root required):
//! - Config: `$XDG_CONFIG_HOME/playtime/config.json` or `~/.config/playtime/config.json`
//! - Data: `$XDG_DATA_HOME/playtime` or `~/.local/share/playtime`

use std::path::PathBuf;

/// Environment variable for overriding the config file path
pub const PLAYTIME_CONFIG_ENV: &str = "PLAYTIME_CONFIG";

/// Environment variable for overriding the data directory
pub const PLAYTIME_DATA_DIR_ENV: &str = "PLAYTIME_DATA_DIR";

/// Application subdirectory name
const APP_DIR: &str = "playtime";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.json";

/// Session log filename within the data directory
const LEDGER_FILENAME: &str = "playtime_log.csv";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$PLAYTIME_CONFIG` environment variable (if set)
/// 2. `$XDG_CONFIG_HOME/playtime/config.json` (if XDG_CONFIG_HOME is set)
/// 3. `~/.config/playtime/config.json` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(PLAYTIME_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    config_path_without_env()
}

/// Get the config path without checking the PLAYTIME_CONFIG env var.
pub fn config_path_without_env() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/tmp").join(APP_DIR).join(CONFIG_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$PLAYTIME_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/playtime` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/playtime` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(PLAYTIME_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking the PLAYTIME_DATA_DIR env var.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Get the default session log path inside the data directory
pub fn default_ledger_path() -> PathBuf {
    default_data_dir().join(LEDGER_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_json_under_app_dir() {
        let path = config_path_without_env();
        assert!(path.to_string_lossy().contains("playtime"));
        assert_eq!(path.file_name().unwrap(), "config.json");
    }

    #[test]
    fn data_dir_contains_playtime() {
        let path = data_dir_without_env();
        assert!(path.to_string_lossy().contains("playtime"));
    }

    #[test]
    fn ledger_lives_in_data_dir() {
        let ledger = default_ledger_path();
        assert_eq!(ledger.parent().unwrap(), default_data_dir());
        assert_eq!(ledger.file_name().unwrap(), "playtime_log.csv");
    }
}
