//! Error types for DITA conversion.

use dita_storage::StorageError;

/// Error that aborts the current conversion unit.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConvertError {
    /// Output tag balance was violated.
    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// Content reuse could not be resolved (only under the abort policy).
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// XML parsing error.
    #[error("XML parse error")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute error.
    #[error("XML attribute error")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    /// Encoding error during XML parsing.
    #[error("encoding error")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    /// Document bytes are not valid UTF-8.
    #[error("{path} is not valid UTF-8")]
    Utf8 {
        /// Document path.
        path: String,
        /// Underlying decoding error.
        #[source]
        source: std::str::Utf8Error,
    },

    /// Writing output failed.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

/// Malformed token stream or unbalanced output.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum StructuralError {
    /// Close requested while no tag is open.
    #[error("no unclosed tags when closing </{0}>")]
    NoOpenTags(String),

    /// Close requested for a tag that is not on top of the stack.
    #[error("writing end tag </{requested}> but <{open}> is open")]
    MismatchedEnd {
        /// Tag that was asked to close.
        requested: String,
        /// Tag currently on top of the stack.
        open: String,
    },

    /// Text or comment written while a void tag is on top of the stack.
    #[error("content not allowed inside void tag <{0}>")]
    ContentInVoid(String),

    /// An end token reached the dispatcher outside of any element.
    #[error("unexpected end token </{0}>")]
    UnexpectedEnd(String),
}

/// Content reuse (`conref`, `conkeyref`, `conrefend`) that cannot be resolved.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ResolutionError {
    /// `conkeyref` names a key with no definition.
    #[error("keydef missing for {key} ({keyref})")]
    UndefinedKey {
        /// Key name.
        key: String,
        /// Full `conkeyref` value.
        keyref: String,
    },

    /// `conkeyref` has no `key/path` shape.
    #[error("invalid conkeyref {0}")]
    InvalidKeyRef(String),

    /// `conkeyref` used together with a bare `conref` or `conrefend` path.
    #[error("invalid conkeyref setup: {0}")]
    InvalidKeyRefSetup(String),

    /// Range start and end are in different documents.
    #[error("conref and conrefend are in different files: {start} --> {end}")]
    DifferentFiles {
        /// Resolved start document.
        start: String,
        /// Resolved end document.
        end: String,
    },

    /// Range start and end have different root elements.
    #[error("conref and conrefend have different root elements: {conref} --> {conrefend}")]
    DifferentRoots {
        /// `conref` attribute.
        conref: String,
        /// `conrefend` attribute.
        conrefend: String,
    },

    /// Start or end id path is empty.
    #[error("invalid conref path: {conref} --> {conrefend}")]
    EmptyPath {
        /// `conref` attribute.
        conref: String,
        /// `conrefend` attribute.
        conrefend: String,
    },

    /// Target document could not be read.
    #[error("problem opening {path}")]
    Open {
        /// Target document path.
        path: String,
        /// Storage failure.
        #[source]
        source: StorageError,
    },

    /// Range start id path was not found in the target document.
    #[error("did not find conref: {0}")]
    NotFound(String),

    /// Range end marker was not reached before the enclosing element ended.
    #[error("did not find conrefend: {0}")]
    EndNotFound(String),

    /// Content reuse nested deeper than the configured limit.
    #[error("content reuse nested deeper than {limit} levels at {reference}")]
    TooDeep {
        /// Configured maximum depth.
        limit: usize,
        /// Reference that exceeded the limit.
        reference: String,
    },
}
