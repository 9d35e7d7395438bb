//! Byte source abstraction for the DITA to HTML converter.
//!
//! This crate provides a [`Storage`] trait for reading topic, map and image
//! bytes from the underlying backend. This enables:
//!
//! - **Unit testing** without touching the real filesystem
//! - **Clean separation** between conversion logic and I/O operations
//!
//! # Architecture
//!
//! The crate provides:
//! - [`Storage`] trait with `read()`, `exists()` and `mtime()` methods
//! - [`FsStorage`] implementation rooted at a source directory
//! - [`MockStorage`] for testing (behind `mock` feature flag)
//! - [`path`] helpers for the forward-slash paths used by documents
//!
//! # Example
//!
//! ```ignore
//! use std::path::PathBuf;
//! use dita_storage::{FsStorage, Storage};
//!
//! let storage = FsStorage::new(PathBuf::from("docs"));
//! let source = storage.read("topics/intro.dita")?;
//! println!("{} bytes", source.data.len());
//! ```

mod fs;
#[cfg(feature = "mock")]
mod mock;
pub mod path;
mod storage;

pub use fs::FsStorage;
#[cfg(feature = "mock")]
pub use mock::MockStorage;
pub use storage::{Source, Storage, StorageError, StorageErrorKind};
