//! Settings Core - host-side helpers shared by settings stores.
//!
//! - **config**: Settings directory layout and path helpers
//! - **logging**: Tracing subscriber setup

pub mod config;
pub mod logging;

pub use config::{
    data_dir, ensure_dir, plugin_settings_dir, settings_dir, settings_file, settings_file_in,
    FILE_SUFFIX, SETTINGS_DIRECTORY_NAME,
};
pub use logging::init_logging;
