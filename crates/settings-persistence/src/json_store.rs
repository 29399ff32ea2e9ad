//! Single-value JSON store with self-healing load.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use settings_core::config;

use crate::backup::backup_file;
use crate::codec;
use crate::error::{PersistenceError, Result};
use crate::version_gate::{NoopVersionGate, StorageKind, VersionGate};

type DefaultFactory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Byte order mark some editors prepend to UTF-8 files.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// How the value returned by the last load was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file decoded successfully.
    Loaded,
    /// No file existed; a default was written.
    Missing,
    /// The version gate purged an incompatible file; a default was written.
    Cleared,
    /// The file was empty or whitespace; it was backed up and replaced.
    Empty { backup: PathBuf },
    /// The file failed to decode; it was backed up and replaced.
    Malformed { backup: PathBuf },
    /// The file decoded to `null`; it was backed up and replaced.
    Null { backup: PathBuf },
}

impl LoadOutcome {
    /// Returns the backup taken during the load, if any.
    pub fn backup(&self) -> Option<&Path> {
        match self {
            Self::Empty { backup } | Self::Malformed { backup } | Self::Null { backup } => {
                Some(backup.as_path())
            }
            Self::Loaded | Self::Missing | Self::Cleared => None,
        }
    }

    /// Returns true if the value is a freshly written default.
    pub fn is_default(&self) -> bool {
        !matches!(self, Self::Loaded)
    }
}

/// Why the file on disk is being discarded.
enum Discard {
    Missing,
    Cleared,
    Empty,
    Malformed,
    Null,
}

/// Holds one typed value and mirrors it to a JSON file.
///
/// `load` never fails on bad file contents: missing, empty, malformed,
/// `null` and version-incompatible files all resolve to the type's default,
/// which is written back immediately. Any file that is discarded because it
/// could not be used is first copied to a timestamped backup next to it.
/// I/O failures are returned to the caller.
///
/// The store takes no file locks; use one store per path from one thread.
///
/// # Example
///
/// ```no_run
/// use serde::{Deserialize, Serialize};
/// use settings_persistence::JsonStore;
///
/// #[derive(Serialize, Deserialize, Default)]
/// #[serde(default)]
/// struct Settings {
///     theme: String,
/// }
///
/// let mut store: JsonStore<Settings> = JsonStore::new("/tmp/app/settings.json");
/// store.load().unwrap();
/// if let Some(settings) = store.value_mut() {
///     settings.theme = "light".to_string();
/// }
/// store.save().unwrap();
/// ```
pub struct JsonStore<T> {
    file_path: PathBuf,
    directory_path: PathBuf,
    gate: Arc<dyn VersionGate>,
    kind: StorageKind,
    default_factory: Option<DefaultFactory<T>>,
    value: Option<T>,
    last_outcome: Option<LoadOutcome>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Creates a store for the given file without a version gate.
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        let file_path = file_path.into();
        let directory_path = file_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Self {
            file_path,
            directory_path,
            gate: Arc::new(NoopVersionGate),
            kind: StorageKind::JSON,
            default_factory: None,
            value: None,
            last_outcome: None,
        }
    }

    /// Creates a store for `<dir>/<name>.json`.
    pub fn in_directory(dir: impl AsRef<Path>, name: &str) -> Self {
        Self::new(config::settings_file_in(dir.as_ref(), name))
    }

    /// Creates a store for `<settings dir>/<name>.json`, creating the
    /// settings directory if needed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn for_settings(name: &str) -> Result<Self> {
        let dir = config::settings_dir();
        config::ensure_dir(&dir).map_err(|source| PersistenceError::DirectoryError {
            path: dir.clone(),
            source,
        })?;
        Ok(Self::in_directory(dir, name))
    }

    /// Sets the version gate consulted on load and notified on save.
    pub fn with_version_gate(mut self, gate: Arc<dyn VersionGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Sets the storage kind reported to the version gate.
    pub fn with_storage_kind(mut self, kind: StorageKind) -> Self {
        self.kind = kind;
        self
    }

    /// Supplies the default value used when `{}` does not decode into `T`.
    pub fn with_default(mut self, factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.default_factory = Some(Box::new(factory));
        self
    }

    /// Returns the path of the backing file.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Returns the directory holding the backing file and its backups.
    pub fn directory_path(&self) -> &Path {
        &self.directory_path
    }

    /// Returns the storage kind reported to the version gate.
    pub fn storage_kind(&self) -> StorageKind {
        self.kind
    }

    /// Returns the loaded value, or `None` before the first load.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Returns the loaded value for mutation, or `None` before the first load.
    pub fn value_mut(&mut self) -> Option<&mut T> {
        self.value.as_mut()
    }

    /// Returns true once `load` has completed.
    pub fn is_loaded(&self) -> bool {
        self.value.is_some()
    }

    /// Returns how the last load obtained its value.
    pub fn last_outcome(&self) -> Option<&LoadOutcome> {
        self.last_outcome.as_ref()
    }

    /// Loads the value from disk, recovering to a default when the file is
    /// missing, unusable or incompatible.
    ///
    /// # Errors
    /// Returns an error only for I/O failures, or when no default value can
    /// be built for `T`.
    pub fn load(&mut self) -> Result<&T> {
        self.load_with_outcome()?;
        self.value
            .as_ref()
            .ok_or_else(|| PersistenceError::NotLoaded {
                path: self.file_path.clone(),
            })
    }

    /// Like [`load`](Self::load), but reports how the value was obtained.
    ///
    /// # Errors
    /// See [`load`](Self::load).
    pub fn load_with_outcome(&mut self) -> Result<LoadOutcome> {
        let cleared = self.clear_if_incompatible()?;

        let outcome = if !self.file_path.exists() {
            let reason = if cleared { Discard::Cleared } else { Discard::Missing };
            self.load_default(reason)?
        } else {
            let bytes = fs::read(&self.file_path).map_err(|source| PersistenceError::ReadError {
                path: self.file_path.clone(),
                source,
            })?;
            let text = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes.as_slice());

            if is_blank(text) {
                debug!(path = %self.file_path.display(), "Settings file is empty");
                self.load_default(Discard::Empty)?
            } else {
                self.decode(text)?
            }
        };

        self.last_outcome = Some(outcome.clone());
        Ok(outcome)
    }

    /// Writes the value to disk, replacing the file, and marks it current
    /// with the version gate.
    ///
    /// # Errors
    /// Returns `NotLoaded` if called before `load`, otherwise any
    /// serialization, write or version marker error.
    pub fn save(&self) -> Result<()> {
        let value = self.value.as_ref().ok_or_else(|| PersistenceError::NotLoaded {
            path: self.file_path.clone(),
        })?;

        let json = codec::encode(value)?;
        fs::write(&self.file_path, json).map_err(|source| PersistenceError::WriteError {
            path: self.file_path.clone(),
            source,
        })?;
        self.gate.mark_current(&self.file_path)?;

        info!(path = %self.file_path.display(), "Saved settings");
        Ok(())
    }

    /// Deletes the file if the version gate rejects it. Returns true if a
    /// file was deleted.
    fn clear_if_incompatible(&self) -> Result<bool> {
        if !self.gate.should_clear_cache(&self.file_path, self.kind) {
            return Ok(false);
        }

        if !self.file_path.exists() {
            return Ok(false);
        }

        fs::remove_file(&self.file_path).map_err(|source| PersistenceError::DeleteError {
            path: self.file_path.clone(),
            source,
        })?;
        info!(path = %self.file_path.display(), "Deleted settings written by an incompatible version");
        Ok(true)
    }

    fn decode(&mut self, bytes: &[u8]) -> Result<LoadOutcome> {
        match codec::decode::<T>(bytes) {
            Ok(Some(value)) => {
                debug!(path = %self.file_path.display(), "Loaded settings");
                self.value = Some(value);
                Ok(LoadOutcome::Loaded)
            }
            Ok(None) => {
                warn!(path = %self.file_path.display(), "Settings file holds null, resetting to defaults");
                self.load_default(Discard::Null)
            }
            Err(e) => {
                error!(
                    path = %self.file_path.display(),
                    error = %e,
                    "Failed to decode settings, resetting to defaults"
                );
                self.load_default(Discard::Malformed)
            }
        }
    }

    /// Backs up any existing file, then replaces the value with the default
    /// and saves it right away.
    fn load_default(&mut self, reason: Discard) -> Result<LoadOutcome> {
        let backup = if self.file_path.exists() {
            Some(backup_file(&self.file_path)?)
        } else {
            None
        };

        self.value = Some(self.default_value()?);
        self.save()?;

        let outcome = match (reason, backup) {
            (Discard::Empty, Some(backup)) => LoadOutcome::Empty { backup },
            (Discard::Malformed, Some(backup)) => LoadOutcome::Malformed { backup },
            (Discard::Null, Some(backup)) => LoadOutcome::Null { backup },
            (Discard::Cleared, _) => LoadOutcome::Cleared,
            // The file vanished between the existence check and the backup.
            _ => LoadOutcome::Missing,
        };
        Ok(outcome)
    }

    fn default_value(&self) -> Result<T> {
        match codec::decode_empty::<T>() {
            Ok(value) => Ok(value),
            Err(source) => match &self.default_factory {
                Some(factory) => {
                    debug!(
                        path = %self.file_path.display(),
                        error = %source,
                        "Empty document does not decode, using supplied default"
                    );
                    Ok(factory())
                }
                None => Err(PersistenceError::DefaultUnavailable {
                    path: self.file_path.clone(),
                    source,
                }),
            },
        }
    }
}

impl<T> fmt::Debug for JsonStore<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonStore")
            .field("file_path", &self.file_path)
            .field("kind", &self.kind)
            .field("value", &self.value)
            .field("last_outcome", &self.last_outcome)
            .finish()
    }
}

/// True for empty or all-whitespace contents.
fn is_blank(bytes: &[u8]) -> bool {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.trim().is_empty(),
        Err(_) => false,
    }
}
