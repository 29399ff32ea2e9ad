//! Persistence layer for settings objects.
//!
//! This crate keeps one typed value in memory and mirrors it to a JSON file.
//! Loading never fails on bad file contents: anything unusable is backed up
//! to a timestamped copy and replaced with the type's default.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use serde::{Deserialize, Serialize};
//! use settings_persistence::{FileVersionGate, JsonStore, StorageKind};
//!
//! #[derive(Serialize, Deserialize, Default)]
//! #[serde(default)]
//! struct Settings {
//!     hotkey: String,
//! }
//!
//! let gate = FileVersionGate::new("0.21.0".parse().unwrap())
//!     .with_minimum(StorageKind::JSON, "0.19.0".parse().unwrap());
//!
//! let mut store: JsonStore<Settings> = JsonStore::for_settings("settings")
//!     .unwrap()
//!     .with_version_gate(Arc::new(gate));
//!
//! store.load().unwrap();
//! store.save().unwrap();
//! ```

pub mod backup;
pub mod codec;
pub mod error;
pub mod json_store;
pub mod version_gate;

pub use backup::{backup_file, backup_path, list_backups};
pub use error::{PersistenceError, Result};
pub use json_store::{JsonStore, LoadOutcome};
pub use version_gate::{AppVersion, FileVersionGate, NoopVersionGate, StorageKind, VersionGate};
