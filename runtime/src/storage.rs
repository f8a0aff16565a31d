//! File-backed draft storage.
//!
//! Each key maps to one JSON file in a directory. Writes go through a
//! temporary file and a rename so a crash never leaves a half-written draft.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use formwork_engine::{DraftStorage, Error};

use crate::error::Result;

/// `DraftStorage` over a directory of JSON files.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir` for drafts. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Use `dir` for drafts, creating it now.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let storage = Self::new(dir);
        fs::create_dir_all(&storage.dir)?;
        Ok(storage)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a key. Characters outside `[A-Za-z0-9._-]` become `_`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file))
    }
}

fn storage_error(key: &str, err: std::io::Error) -> Error {
    Error::Storage(format!("{}: {}", key, err))
}

impl DraftStorage for FileStorage {
    fn get_item(&self, key: &str) -> formwork_engine::error::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error(key, e)),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> formwork_engine::error::Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| storage_error(key, e))?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|e| storage_error(key, e))?;
        fs::rename(&tmp, &path).map_err(|e| storage_error(key, e))?;

        tracing::debug!(key = %key, path = %path.display(), "Draft written");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> formwork_engine::error::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => {
                tracing::debug!(key = %key, "Draft removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(key, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        assert_eq!(storage.get_item("form-autosave-v1").unwrap(), None);
        storage.remove_item("form-autosave-v1").unwrap();
    }

    #[test]
    fn set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested/drafts"));

        storage.set_item("form-autosave-v1", "{}").unwrap();
        assert!(storage.path_for("form-autosave-v1").exists());
        assert_eq!(
            storage.get_item("form-autosave-v1").unwrap().as_deref(),
            Some("{}")
        );

        storage.set_item("form-autosave-v1", "[]").unwrap();
        assert_eq!(
            storage.get_item("form-autosave-v1").unwrap().as_deref(),
            Some("[]")
        );

        storage.remove_item("form-autosave-v1").unwrap();
        assert_eq!(storage.get_item("form-autosave-v1").unwrap(), None);
    }

    #[test]
    fn keys_cannot_escape_directory() {
        let storage = FileStorage::new("/drafts");
        assert_eq!(
            storage.path_for("../etc/passwd"),
            PathBuf::from("/drafts/.._etc_passwd.json")
        );
    }

    #[test]
    fn create_makes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::create(dir.path().join("a/b")).unwrap();
        assert!(storage.dir().is_dir());
    }
}
