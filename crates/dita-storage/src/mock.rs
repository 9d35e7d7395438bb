//! Mock storage implementation for testing.
//!
//! Provides [`MockStorage`] for unit testing without filesystem access.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::storage::{Source, Storage, StorageError};

/// Backend identifier for error messages.
const BACKEND: &str = "mock";

/// Mock storage for testing.
///
/// Stores file contents in memory, keyed by exact path. Use the builder
/// methods to configure the mock with test data. Every `read` call is
/// counted so tests can assert memoization.
///
/// # Example
///
/// ```ignore
/// use dita_storage::{MockStorage, Storage};
///
/// let storage = MockStorage::new()
///     .with_file("index.ditamap", "<map><topicref href=\"a.dita\"/></map>")
///     .with_file("a.dita", "<topic id=\"a\"><title>A</title></topic>");
///
/// let source = storage.read("a.dita").unwrap();
/// ```
#[derive(Debug, Default)]
pub struct MockStorage {
    contents: RwLock<HashMap<String, Vec<u8>>>,
    mtimes: RwLock<HashMap<String, f64>>,
    reads: AtomicUsize,
}

impl MockStorage {
    /// Create a new empty mock storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text file.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_file(self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.with_bytes(path, content.into().into_bytes())
    }

    /// Add a binary file.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_bytes(self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.contents
            .write()
            .unwrap()
            .insert(path.into(), data.into());
        self
    }

    /// Set mtime for a path.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_mtime(self, path: impl Into<String>, mtime: f64) -> Self {
        self.mtimes.write().unwrap().insert(path.into(), mtime);
        self
    }

    /// Number of successful and failed `read` calls so far.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

impl Storage for MockStorage {
    fn read(&self, path: &str) -> Result<Source, StorageError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let data = self
            .contents
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::not_found(path).with_backend(BACKEND))?;
        let mtime = self.mtimes.read().unwrap().get(path).copied().unwrap_or(0.0);
        Ok(Source { data, mtime })
    }

    fn exists(&self, path: &str) -> bool {
        self.contents.read().unwrap().contains_key(path)
    }

    fn mtime(&self, path: &str) -> Result<f64, StorageError> {
        if !self.exists(path) {
            return Err(StorageError::not_found(path).with_backend(BACKEND));
        }
        Ok(self.mtimes.read().unwrap().get(path).copied().unwrap_or(0.0))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_mock_storage_read() {
        let storage = MockStorage::new().with_file("a.dita", "<topic/>");

        let source = storage.read("a.dita").unwrap();

        assert_eq!(source.data, b"<topic/>".to_vec());
        assert_eq!(storage.read_count(), 1);
    }

    #[test]
    fn test_mock_storage_read_not_found() {
        let storage = MockStorage::new();

        let err = storage.read("missing.dita").unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "missing.dita: not found [mock]");
    }

    #[test]
    fn test_mock_storage_exact_path_lookup() {
        let storage = MockStorage::new().with_file("Topics/A.dita", "<topic/>");

        assert!(storage.exists("Topics/A.dita"));
        assert!(!storage.exists("topics/a.dita"));
    }

    #[test]
    fn test_mock_storage_mtime() {
        let storage = MockStorage::new()
            .with_file("a.dita", "<topic/>")
            .with_mtime("a.dita", 1_700_000_000.0);

        assert!((storage.mtime("a.dita").unwrap() - 1_700_000_000.0).abs() < f64::EPSILON);
        assert!(storage.mtime("b.dita").is_err());
    }
}
