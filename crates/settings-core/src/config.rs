//! Settings directory layout.
//!
//! Provides functions to locate the directory where settings stores keep
//! their JSON files.
//!
//! # Storage Structure
//!
//! ```text
//! <data dir>/settings-store/
//! └── Settings/
//!     ├── settings.json
//!     ├── settings-2024-05-01-10-22-31-1234567.json   # backup
//!     └── Plugins/
//!         └── {plugin_id}/
//!             └── settings.json
//! ```
//!
//! # Environment Variables
//!
//! - `SETTINGS_STORE_DATA_DIR`: Override the base data directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Environment variable for a custom data directory.
pub const DATA_DIR_ENV: &str = "SETTINGS_STORE_DATA_DIR";

/// Name of the directory holding settings files.
pub const SETTINGS_DIRECTORY_NAME: &str = "Settings";

/// Suffix of every settings file.
pub const FILE_SUFFIX: &str = ".json";

/// Application directory name under the platform data directory.
const DEFAULT_DATA_DIR: &str = "settings-store";

const PLUGINS_SUBDIR: &str = "Plugins";

static DATA_DIR_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Get the base data directory.
///
/// The data directory is determined by:
/// 1. `SETTINGS_STORE_DATA_DIR` environment variable if set
/// 2. `<platform data dir>/settings-store` if available
/// 3. `settings-store` in current directory as fallback
pub fn data_dir() -> PathBuf {
    DATA_DIR_CACHE
        .get_or_init(|| {
            std::env::var(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    dirs::data_dir()
                        .map(|d| d.join(DEFAULT_DATA_DIR))
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
                })
        })
        .clone()
}

/// Get the directory holding application settings files.
pub fn settings_dir() -> PathBuf {
    data_dir().join(SETTINGS_DIRECTORY_NAME)
}

/// Get the settings directory of a single plugin.
pub fn plugin_settings_dir(plugin_id: &str) -> PathBuf {
    settings_dir().join(PLUGINS_SUBDIR).join(plugin_id)
}

/// Get the path of a named settings file, e.g. `settings` -> `Settings/settings.json`.
pub fn settings_file(name: &str) -> PathBuf {
    settings_file_in(&settings_dir(), name)
}

/// Get the path of a named settings file inside `dir`.
pub fn settings_file_in(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}{}", name, FILE_SUFFIX))
}

/// Ensure a directory exists, creating it if necessary.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}
