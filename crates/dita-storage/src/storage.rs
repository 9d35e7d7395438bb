//! Storage trait and error types.
//!
//! Provides the core [`Storage`] trait for abstracting byte retrieval,
//! along with [`StorageError`] for unified error handling across backends.
//!
//! # Path Convention
//!
//! All path parameters in Storage methods are forward-slash paths relative to
//! the storage root (e.g., `"index.ditamap"`, `"topics/intro.dita"`). Storage
//! never normalizes beyond that; callers join and case-fold paths with the
//! helpers in [`crate::path`].

use std::path::PathBuf;

/// Raw bytes of a stored file together with its modification time.
#[derive(Clone, Debug, PartialEq)]
pub struct Source {
    /// File content.
    pub data: Vec<u8>,
    /// Modification time as seconds since Unix epoch.
    pub mtime: f64,
}

/// What went wrong while reading a file.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageErrorKind {
    /// No file at the path.
    NotFound,
    /// The file exists but may not be read.
    PermissionDenied,
    /// The path escapes the storage root or is malformed.
    InvalidPath,
    /// Content cannot be used as requested, e.g. text that is not UTF-8.
    InvalidData,
    /// Any other backend failure.
    Other,
}

impl StorageErrorKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not found",
            Self::PermissionDenied => "permission denied",
            Self::InvalidPath => "invalid path",
            Self::InvalidData => "invalid data",
            Self::Other => "read failed",
        }
    }
}

/// Read failure with the path and backend it happened in.
#[derive(Debug)]
pub struct StorageError {
    /// Failure category.
    pub kind: StorageErrorKind,
    /// Path relative to the storage root, when known.
    pub path: Option<PathBuf>,
    /// Backend name such as `"fs"` or `"mock"`.
    pub backend: Option<&'static str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StorageError {
    #[must_use]
    pub fn new(kind: StorageErrorKind) -> Self {
        Self {
            kind,
            path: None,
            backend: None,
            source: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Whether the file does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == StorageErrorKind::NotFound
    }

    #[must_use]
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::new(StorageErrorKind::NotFound).with_path(path)
    }

    /// Classify an I/O error.
    #[must_use]
    pub fn io(err: std::io::Error, path: Option<PathBuf>) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => StorageErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => StorageErrorKind::PermissionDenied,
            std::io::ErrorKind::InvalidData => StorageErrorKind::InvalidData,
            _ => StorageErrorKind::Other,
        };
        let error = Self::new(kind).with_source(err);
        match path {
            Some(path) => error.with_path(path),
            None => error,
        }
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path.display(), self.kind.as_str())?,
            None => f.write_str(self.kind.as_str())?,
        }
        if let Some(source) = &self.source {
            write!(f, " ({source})")?;
        }
        if let Some(backend) = self.backend {
            write!(f, " [{backend}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn std::error::Error + 'static))
    }
}

/// Byte source for documents, maps and referenced media.
///
/// Implementations are shared between the map loader and concurrently
/// running topic conversions, hence `Send + Sync`.
pub trait Storage: Send + Sync {
    /// Read the bytes and modification time of a file.
    ///
    /// # Arguments
    ///
    /// * `path` - forward-slash path relative to the storage root
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] with [`StorageErrorKind::NotFound`] if the file
    /// doesn't exist, or another kind if it can't be read.
    fn read(&self, path: &str) -> Result<Source, StorageError>;

    /// Check if a file exists at the given path.
    ///
    /// Returns `false` on errors (treats errors as "doesn't exist").
    fn exists(&self, path: &str) -> bool;

    /// Get modification time as seconds since Unix epoch.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the file doesn't exist or mtime can't be retrieved.
    fn mtime(&self, path: &str) -> Result<f64, StorageError>;

    /// Read a file and decode it as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if reading fails or the content is not UTF-8.
    fn read_to_string(&self, path: &str) -> Result<String, StorageError> {
        let source = self.read(path)?;
        String::from_utf8(source.data).map_err(|e| {
            StorageError::new(StorageErrorKind::InvalidData)
                .with_path(path)
                .with_source(e)
        })
    }
}
