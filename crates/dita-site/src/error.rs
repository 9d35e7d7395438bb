//! Error types for document loading and page conversion.

use dita_renderer::{ConvertError, Diagnostic};
use dita_storage::StorageError;

/// Failure to load a topic or map document.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The document could not be read.
    #[error(transparent)]
    Read(#[from] StorageError),
    /// The document is not well-formed XML.
    #[error("failed to parse {path}")]
    Parse {
        /// Document path.
        path: String,
        /// Underlying decoder error.
        #[source]
        source: ConvertError,
    },
    /// The document has no root element.
    #[error("{path} has no root element")]
    NoRoot {
        /// Document path.
        path: String,
    },
}

impl LoadError {
    /// Whether the document does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Read(err) if err.is_not_found())
    }
}

/// Failure to convert a topic page.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// The topic failed to load and only a placeholder exists.
    #[error("topic {0} has no loaded document")]
    NoDocument(String),
    /// Conversion aborted.
    #[error("conversion of {path} failed")]
    Convert {
        /// Topic path.
        path: String,
        /// Problems recorded before the conversion aborted.
        diagnostics: Vec<Diagnostic>,
        /// Fatal error.
        #[source]
        source: ConvertError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_not_found() {
        let err = LoadError::from(StorageError::not_found("a.dita"));

        assert!(err.is_not_found());
        assert!(
            !LoadError::NoRoot {
                path: "a.dita".to_owned()
            }
            .is_not_found()
        );
    }

    #[test]
    fn test_page_error_display() {
        let err = PageError::NoDocument("topics/a.dita".to_owned());

        assert_eq!(err.to_string(), "topic topics/a.dita has no loaded document");
    }
}
