//! CLI error types.

use dita_config::ConfigError;
use dita_site::{LoadError, PageError};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Load(#[from] LoadError),

    #[error("{0}")]
    Page(#[from] PageError),

    #[error("{0}")]
    Validation(String),
}
