//! Timestamped backups of files that are about to be discarded.
//!
//! A backup sits next to the original and is named
//! `<stem>-<yyyy-MM-dd-HH-mm-ss-fffffff><suffix>`, for example
//! `settings-2024-05-01-10-22-31-1234567.json`. Backups are only ever
//! written, never read back by the store.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Timelike};
use tracing::warn;

use crate::error::{PersistenceError, Result};

/// Date and time part of a backup timestamp; the fraction is appended separately.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Number of fractional-second digits in a backup timestamp.
const FRACTION_DIGITS: usize = 7;

/// Formats `at` as `yyyy-MM-dd-HH-mm-ss-fffffff` (100 ns resolution).
pub fn backup_timestamp(at: &DateTime<Local>) -> String {
    // Leap seconds report nanoseconds >= 1e9; clamp to keep seven digits.
    let ticks = (at.nanosecond() / 100).min(9_999_999);
    format!(
        "{}-{:0width$}",
        at.format(TIMESTAMP_FORMAT),
        ticks,
        width = FRACTION_DIGITS
    )
}

/// Returns the backup path for `original` at time `at`.
pub fn backup_path(original: &Path, at: &DateTime<Local>) -> PathBuf {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = original
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let name = format!("{}-{}{}", stem, backup_timestamp(at), suffix);

    match original.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Copies `original` to a fresh timestamped backup and returns its path.
///
/// The original is left untouched. An existing file at the backup path is
/// overwritten, so the last backup taken within one tick wins.
///
/// # Errors
/// Returns an error if the copy fails.
pub fn backup_file(original: &Path) -> Result<PathBuf> {
    let backup = backup_path(original, &Local::now());
    fs::copy(original, &backup).map_err(|source| PersistenceError::BackupError {
        path: original.to_path_buf(),
        backup: backup.clone(),
        source,
    })?;

    warn!(
        path = %original.display(),
        backup = %backup.display(),
        "Backed up settings file before discarding it"
    );
    Ok(backup)
}

/// Lists the backups of `original` found in its directory, oldest first.
///
/// # Errors
/// Returns an error if the directory cannot be read.
pub fn list_backups(original: &Path) -> Result<Vec<PathBuf>> {
    let dir = match original.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|source| PersistenceError::DirectoryError {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut backups = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| PersistenceError::DirectoryError {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if is_backup_of(original, &path) {
            backups.push(path);
        }
    }

    // The timestamp format sorts lexicographically in time order.
    backups.sort();
    Ok(backups)
}

/// Returns true if `candidate` is named like a backup of `original`.
pub fn is_backup_of(original: &Path, candidate: &Path) -> bool {
    let (Some(stem), Some(name)) = (
        original.file_stem().and_then(|s| s.to_str()),
        candidate.file_name().and_then(|s| s.to_str()),
    ) else {
        return false;
    };
    let suffix = original
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    let Some(rest) = name
        .strip_prefix(stem)
        .and_then(|rest| rest.strip_prefix('-'))
        .and_then(|rest| rest.strip_suffix(suffix.as_str()))
    else {
        return false;
    };

    is_timestamp(rest)
}

/// Checks the `yyyy-MM-dd-HH-mm-ss-fffffff` shape.
fn is_timestamp(s: &str) -> bool {
    let widths = [4, 2, 2, 2, 2, 2, FRACTION_DIGITS];
    let parts: Vec<&str> = s.split('-').collect();

    parts.len() == widths.len()
        && parts
            .iter()
            .zip(widths)
            .all(|(part, width)| part.len() == width && part.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn sample_time() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 5, 1, 10, 22, 31)
            .unwrap()
            .with_nanosecond(123_456_789)
            .unwrap()
    }

    #[test]
    fn test_backup_timestamp_format() {
        assert_eq!(backup_timestamp(&sample_time()), "2024-05-01-10-22-31-1234567");
    }

    #[test]
    fn test_backup_timestamp_pads_fraction() {
        let at = sample_time().with_nanosecond(500).unwrap();
        assert_eq!(backup_timestamp(&at), "2024-05-01-10-22-31-0000005");
    }

    #[test]
    fn test_backup_path_keeps_directory_and_suffix() {
        let path = backup_path(Path::new("/data/Settings/settings.json"), &sample_time());
        assert_eq!(
            path,
            PathBuf::from("/data/Settings/settings-2024-05-01-10-22-31-1234567.json")
        );
    }

    #[test]
    fn test_backup_path_without_extension() {
        let path = backup_path(Path::new("/data/history"), &sample_time());
        assert_eq!(path, PathBuf::from("/data/history-2024-05-01-10-22-31-1234567"));
    }

    #[test]
    fn test_backup_file_copies_bytes() {
        let dir = tempdir().unwrap();
        let original = dir.path().join("settings.json");
        fs::write(&original, b"{not valid").unwrap();

        let backup = backup_file(&original).unwrap();

        assert_eq!(backup.parent(), Some(dir.path()));
        assert_eq!(fs::read(&backup).unwrap(), b"{not valid");
        // Copy, not move
        assert_eq!(fs::read(&original).unwrap(), b"{not valid");
        assert!(is_backup_of(&original, &backup));
    }

    #[test]
    fn test_backup_file_missing_original() {
        let dir = tempdir().unwrap();
        let original = dir.path().join("missing.json");

        let result = backup_file(&original);
        assert!(matches!(result, Err(PersistenceError::BackupError { .. })));
    }

    #[test]
    fn test_is_backup_of() {
        let original = Path::new("/data/settings.json");

        assert!(is_backup_of(
            original,
            Path::new("/data/settings-2024-05-01-10-22-31-1234567.json")
        ));
        assert!(!is_backup_of(original, Path::new("/data/settings.json")));
        assert!(!is_backup_of(
            original,
            Path::new("/data/settings-2024-05-01-10-22-31.json")
        ));
        assert!(!is_backup_of(
            original,
            Path::new("/data/other-2024-05-01-10-22-31-1234567.json")
        ));
        assert!(!is_backup_of(
            original,
            Path::new("/data/settings-2024-05-01-10-22-31-1234567.txt")
        ));
        assert!(!is_backup_of(original, Path::new("/data/settings_version.txt")));
    }

    #[test]
    fn test_list_backups_sorted() {
        let dir = tempdir().unwrap();
        let original = dir.path().join("settings.json");
        fs::write(&original, "{}").unwrap();

        let older = dir.path().join("settings-2023-01-01-00-00-00-0000001.json");
        let newer = dir.path().join("settings-2024-01-01-00-00-00-0000001.json");
        fs::write(&newer, "new").unwrap();
        fs::write(&older, "old").unwrap();
        fs::write(dir.path().join("unrelated.json"), "{}").unwrap();

        let backups = list_backups(&original).unwrap();
        assert_eq!(backups, vec![older, newer]);
    }

    #[test]
    fn test_list_backups_missing_directory() {
        let dir = tempdir().unwrap();
        let original = dir.path().join("gone/settings.json");

        assert!(list_backups(&original).unwrap().is_empty());
    }
}
