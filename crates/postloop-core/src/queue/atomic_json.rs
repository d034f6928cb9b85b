//! Atomic JSON file persistence shared by the Queue Store, Feedback log,
//! Preferences document, Persona profile, and daily-output snapshots.
//!
//! Write path: serialize to a `.tmp` sibling, fsync, rename over the
//! target (atomic on the same filesystem), then copy the *pre-overwrite*
//! contents of the target into a `.bak` sibling — the backup always
//! reflects the last-known-good state, never the write that just
//! succeeded. Read path: parse the target; on failure, fall back to
//! `.bak`; if both fail, reinitialize with the default value and log.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::QueueError;

fn tmp_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".tmp");
    PathBuf::from(s)
}

fn bak_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".bak");
    PathBuf::from(s)
}

fn io_err(path: &Path, source: io::Error) -> QueueError {
    QueueError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Atomically write `value` as pretty JSON to `path`.
pub fn save<T: Serialize>(path: &Path, value: &T) -> Result<(), QueueError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(path, e))?;
    }

    let tmp = tmp_path(path);
    let serialized = serde_json::to_vec_pretty(value).map_err(|e| QueueError::Corrupt {
        path: path.display().to_string(),
        source: e,
    })?;

    {
        let mut file = fs::File::create(&tmp).map_err(|e| io_err(&tmp, e))?;
        use std::io::Write as _;
        file.write_all(&serialized).map_err(|e| io_err(&tmp, e))?;
        file.sync_all().map_err(|e| io_err(&tmp, e))?;
    }

    let previous_contents = fs::read(path).ok();

    fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;

    if let Some(previous) = previous_contents {
        let bak = bak_path(path);
        if let Err(e) = fs::write(&bak, previous) {
            tracing::warn!(path = %bak.display(), error = %e, "failed to write backup file");
        }
    }

    Ok(())
}

/// Load a JSON value from `path`, falling back to `.bak` on parse failure
/// and to `T::default()` if both are unreadable or absent.
pub fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, QueueError> {
    match fs::read(path) {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(value),
            Err(primary_err) => {
                tracing::warn!(path = %path.display(), error = %primary_err, "primary store corrupt, trying backup");
                load_backup_or_default(path)
            }
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(io_err(path, e)),
    }
}

fn load_backup_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, QueueError> {
    let bak = bak_path(path);
    match fs::read(&bak) {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(value) => {
                tracing::info!(path = %bak.display(), "recovered store from backup");
                Ok(value)
            }
            Err(e) => {
                tracing::error!(path = %bak.display(), error = %e, "backup store also corrupt, reinitializing empty");
                Ok(T::default())
            }
        },
        Err(_) => {
            tracing::error!(path = %path.display(), "store and backup both unreadable, reinitializing empty");
            Ok(T::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut data = HashMap::new();
        data.insert("a".to_string(), 1);
        save(&path, &data).unwrap();
        let loaded: HashMap<String, i32> = load_or_default(&path).unwrap();
        assert_eq!(loaded, data);
    }

    #[test]
    fn missing_file_returns_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let loaded: HashMap<String, i32> = load_or_default(&path).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn second_save_creates_backup_of_first() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut first = HashMap::new();
        first.insert("a".to_string(), 1);
        save(&path, &first).unwrap();

        let mut second = HashMap::new();
        second.insert("a".to_string(), 2);
        save(&path, &second).unwrap();

        let bak = bak_path(&path);
        let backup: HashMap<String, i32> =
            serde_json::from_slice(&fs::read(&bak).unwrap()).unwrap();
        assert_eq!(backup, first, "backup must hold the pre-overwrite contents");

        let current: HashMap<String, i32> = load_or_default(&path).unwrap();
        assert_eq!(current, second);
    }

    #[test]
    fn corrupt_primary_falls_back_to_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut first = HashMap::new();
        first.insert("a".to_string(), 1);
        save(&path, &first).unwrap();

        let mut second = HashMap::new();
        second.insert("a".to_string(), 2);
        save(&path, &second).unwrap();

        fs::write(&path, b"{not valid json").unwrap();

        let loaded: HashMap<String, i32> = load_or_default(&path).unwrap();
        assert_eq!(loaded, first, "should recover the backup of the last-good write");
    }

    #[test]
    fn both_corrupt_reinitializes_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, b"{not valid").unwrap();
        fs::write(bak_path(&path), b"{also not valid").unwrap();

        let loaded: HashMap<String, i32> = load_or_default(&path).unwrap();
        assert!(loaded.is_empty());
    }
}
