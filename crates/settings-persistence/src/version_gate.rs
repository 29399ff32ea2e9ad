//! Version gating for persisted settings.
//!
//! A `VersionGate` decides whether a file written by an earlier application
//! version is still compatible. Incompatible files are deleted by the store
//! before loading, as if they were never there.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::{PersistenceError, Result};

/// Identifies a class of cached data sharing one compatibility policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StorageKind(u32);

impl StorageKind {
    /// Binary caches.
    pub const BINARY: Self = Self(0);
    /// JSON settings stores.
    pub const JSON: Self = Self(1);

    /// Creates a kind from its numeric identifier.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the numeric identifier.
    pub const fn id(self) -> u32 {
        self.0
    }
}

/// Trait for version compatibility oracles consulted by `JsonStore`.
pub trait VersionGate: Send + Sync {
    /// Returns true if the data at `path` predates a compatible version and
    /// must be purged before loading. Must not touch the data file.
    fn should_clear_cache(&self, path: &Path, kind: StorageKind) -> bool;

    /// Records that the data at `path` was just written by the current version.
    ///
    /// # Errors
    /// Returns an error if the marker cannot be persisted.
    fn mark_current(&self, path: &Path) -> Result<()>;
}

/// A gate that accepts every file and records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopVersionGate;

impl VersionGate for NoopVersionGate {
    fn should_clear_cache(&self, _path: &Path, _kind: StorageKind) -> bool {
        false
    }

    fn mark_current(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

/// Error returned when a version string is not dotted numeric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVersionError(String);

impl fmt::Display for ParseVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid version: {:?}", self.0)
    }
}

impl std::error::Error for ParseVersionError {}

/// A dotted numeric application version such as `0.19.2`.
///
/// Missing trailing components compare as zero, so `1.2 == 1.2.0`.
#[derive(Debug, Clone)]
pub struct AppVersion(Vec<u64>);

impl AppVersion {
    /// The version assumed when no marker has been written yet.
    pub fn zero() -> Self {
        Self(vec![0, 0, 0])
    }

    fn component(&self, index: usize) -> u64 {
        self.0.get(index).copied().unwrap_or(0)
    }
}

impl FromStr for AppVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(ParseVersionError(s.to_string()));
        }

        trimmed
            .split('.')
            .map(|part| part.parse::<u64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Self)
            .map_err(|_| ParseVersionError(s.to_string()))
    }
}

impl fmt::Display for AppVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u64::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl Ord for AppVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for AppVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for AppVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AppVersion {}

/// Suffix of the marker file written next to each data file.
const MARKER_SUFFIX: &str = "_version.txt";

/// A gate backed by a version marker file next to each data file.
///
/// `settings.json` gets `settings_version.txt`, holding the application
/// version that last saved it. Data is cleared when that version is older
/// than the minimum compatible version configured for its storage kind.
///
/// # Example
///
/// ```no_run
/// use settings_persistence::{AppVersion, FileVersionGate, StorageKind};
///
/// let gate = FileVersionGate::new("0.21.0".parse::<AppVersion>().unwrap())
///     .with_minimum(StorageKind::JSON, "0.19.0".parse().unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct FileVersionGate {
    current: AppVersion,
    minimums: HashMap<StorageKind, AppVersion>,
}

impl FileVersionGate {
    /// Creates a gate for the running application version.
    pub fn new(current: AppVersion) -> Self {
        Self {
            current,
            minimums: HashMap::new(),
        }
    }

    /// Sets the oldest version whose data of `kind` is still compatible.
    pub fn with_minimum(mut self, kind: StorageKind, minimum: AppVersion) -> Self {
        self.minimums.insert(kind, minimum);
        self
    }

    /// Returns the running application version.
    pub fn current(&self) -> &AppVersion {
        &self.current
    }

    /// Returns the marker path for a data file.
    pub fn marker_path(path: &Path) -> PathBuf {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!("{}{}", stem, MARKER_SUFFIX))
    }

    /// Returns the version recorded for `path`, or zero if none is readable.
    pub fn previous_version(&self, path: &Path) -> AppVersion {
        let marker = Self::marker_path(path);
        match fs::read_to_string(&marker) {
            Ok(content) => content.parse().unwrap_or_else(|e| {
                warn!(path = %marker.display(), error = %e, "Ignoring unreadable version marker");
                AppVersion::zero()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => AppVersion::zero(),
            Err(e) => {
                warn!(path = %marker.display(), error = %e, "Failed to read version marker");
                AppVersion::zero()
            }
        }
    }
}

impl VersionGate for FileVersionGate {
    fn should_clear_cache(&self, path: &Path, kind: StorageKind) -> bool {
        let Some(minimum) = self.minimums.get(&kind) else {
            return false;
        };

        let previous = self.previous_version(path);
        let clear = previous < *minimum;
        debug!(
            path = %path.display(),
            kind = kind.id(),
            previous = %previous,
            current = %self.current(),
            minimum = %minimum,
            clear,
            "Checked cache compatibility"
        );
        clear
    }

    fn mark_current(&self, path: &Path) -> Result<()> {
        let marker = Self::marker_path(path);
        fs::write(&marker, self.current.to_string())
            .map_err(|source| PersistenceError::WriteError { path: marker, source })
    }
}
