//! Filesystem storage implementation.
//!
//! Provides [`FsStorage`] for reading topics, maps and media from a source
//! directory on the local filesystem.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::storage::{Source, Storage, StorageError, StorageErrorKind};

/// Backend identifier for error messages.
const BACKEND: &str = "fs";

/// Filesystem storage implementation.
///
/// All paths are interpreted relative to `source_dir`. Paths that try to
/// leave the source directory are rejected with
/// [`StorageErrorKind::InvalidPath`].
///
/// # Example
///
/// ```ignore
/// use std::path::PathBuf;
/// use dita_storage::{FsStorage, Storage};
///
/// let storage = FsStorage::new(PathBuf::from("docs"));
/// let map = storage.read("index.ditamap")?;
/// ```
#[derive(Clone, Debug)]
pub struct FsStorage {
    /// Root directory of the documentation source.
    source_dir: PathBuf,
}

impl FsStorage {
    /// Create a new filesystem storage rooted at `source_dir`.
    #[must_use]
    pub fn new(source_dir: PathBuf) -> Self {
        Self { source_dir }
    }

    /// Root directory this storage reads from.
    #[must_use]
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Validate that a path doesn't escape the source directory.
    ///
    /// Rejects absolute paths and paths containing parent directory
    /// components (`..`).
    fn validate_path(path: &Path) -> Result<(), StorageError> {
        let escapes = path.components().any(|c| {
            matches!(
                c,
                std::path::Component::ParentDir
                    | std::path::Component::RootDir
                    | std::path::Component::Prefix(_)
            )
        });

        if escapes {
            return Err(StorageError::new(StorageErrorKind::InvalidPath)
                .with_path(path)
                .with_backend(BACKEND));
        }
        Ok(())
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        Self::validate_path(relative)?;
        Ok(self.source_dir.join(relative))
    }

    fn file_mtime(full_path: &Path, path: &str) -> Result<f64, StorageError> {
        let meta = fs::metadata(full_path)
            .map_err(|e| StorageError::io(e, Some(PathBuf::from(path))).with_backend(BACKEND))?;
        let modified = meta
            .modified()
            .map_err(|e| StorageError::io(e, Some(PathBuf::from(path))).with_backend(BACKEND))?;
        Ok(modified
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |d| d.as_secs_f64()))
    }
}

impl Storage for FsStorage {
    fn read(&self, path: &str) -> Result<Source, StorageError> {
        let full_path = self.resolve(path)?;
        let data = fs::read(&full_path)
            .map_err(|e| StorageError::io(e, Some(PathBuf::from(path))).with_backend(BACKEND))?;
        let mtime = Self::file_mtime(&full_path, path)?;
        tracing::trace!(path, bytes = data.len(), "Read source file");
        Ok(Source { data, mtime })
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_ok_and(|p| p.is_file())
    }

    fn mtime(&self, path: &str) -> Result<f64, StorageError> {
        let full_path = self.resolve(path)?;
        Self::file_mtime(&full_path, path)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn create_test_storage() -> (tempfile::TempDir, FsStorage) {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(temp_dir.path().to_path_buf());
        (temp_dir, storage)
    }

    #[test]
    fn test_read_existing_file() {
        let (temp_dir, storage) = create_test_storage();
        fs::create_dir_all(temp_dir.path().join("topics")).unwrap();
        fs::write(temp_dir.path().join("topics/intro.dita"), "<topic/>").unwrap();

        let source = storage.read("topics/intro.dita").unwrap();

        assert_eq!(source.data, b"<topic/>".to_vec());
        assert!(source.mtime > 0.0);
    }

    #[test]
    fn test_read_missing_file_is_not_found() {
        let (_temp_dir, storage) = create_test_storage();

        let err = storage.read("missing.dita").unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.backend, Some("fs"));
    }

    #[test]
    fn test_read_rejects_parent_dir() {
        let (_temp_dir, storage) = create_test_storage();

        let err = storage.read("../secret.dita").unwrap_err();

        assert_eq!(err.kind, StorageErrorKind::InvalidPath);
    }

    #[test]
    fn test_read_rejects_absolute_path() {
        let (_temp_dir, storage) = create_test_storage();

        let err = storage.read("/etc/passwd").unwrap_err();

        assert_eq!(err.kind, StorageErrorKind::InvalidPath);
    }

    #[test]
    fn test_exists() {
        let (temp_dir, storage) = create_test_storage();
        fs::write(temp_dir.path().join("index.ditamap"), "<map/>").unwrap();
        fs::create_dir(temp_dir.path().join("topics")).unwrap();

        assert!(storage.exists("index.ditamap"));
        assert!(!storage.exists("other.ditamap"));
        assert!(!storage.exists("topics"));
        assert!(!storage.exists("../index.ditamap"));
    }

    #[test]
    fn test_read_to_string_rejects_invalid_utf8() {
        let (temp_dir, storage) = create_test_storage();
        fs::write(temp_dir.path().join("bad.dita"), [0xff, 0xfe, 0x00]).unwrap();

        let err = storage.read_to_string("bad.dita").unwrap_err();

        assert_eq!(err.kind, StorageErrorKind::InvalidData);
    }

    #[test]
    fn test_mtime_matches_read() {
        let (temp_dir, storage) = create_test_storage();
        fs::write(temp_dir.path().join("a.dita"), "<topic/>").unwrap();

        let mtime = storage.mtime("a.dita").unwrap();
        let source = storage.read("a.dita").unwrap();

        assert!((mtime - source.mtime).abs() < f64::EPSILON);
    }
}
