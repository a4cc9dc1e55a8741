use dirs::home_dir;
use std::{env, path::PathBuf};

const DEFAULT_DIR_NAME: &str = ".finance_tracker";
const STORE_DIR: &str = "store";
const EXPORT_DIR: &str = "exports";

/// Environment variable that overrides the data directory.
pub const HOME_ENV: &str = "FINANCE_TRACKER_HOME";

/// Returns the application data directory, defaulting to `~/.finance_tracker`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV) {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

/// Directory holding one JSON document per storage key.
pub fn store_dir() -> PathBuf {
    app_data_dir().join(STORE_DIR)
}

/// Default destination for transaction exports.
pub fn exports_dir() -> PathBuf {
    app_data_dir().join(EXPORT_DIR)
}
