//! Rule-driven streaming DITA to HTML transform.
//!
//! This crate converts DITA topic content to HTML one token at a time. A
//! [`Conversion`] reads tokens from a [`TokenSource`], looks each start tag up
//! in a [`RuleTable`] and writes the result through an [`Encoder`] that
//! enforces open/close balance.
//!
//! # Architecture
//!
//! - [`Rule`]: rename, skip, unwrap, or hand over to a [`TagProcessor`]
//! - [`default_rule_table`] and [`builtin_registry`]: the built-in catalog
//! - [`ConversionHost`]: document index services (file access, keys, topic
//!   titles) needed for content reuse and link resolution
//! - [`Diagnostic`]: non-fatal problems collected per conversion
//!
//! Elements with `conref`/`conkeyref` are replaced by the referenced content
//! before any other rule applies. Unresolvable references are handled by the
//! configured [`ResolutionPolicy`].
//!
//! # Example
//!
//! ```
//! use dita_renderer::{
//!     Conversion, ConversionHost, ConversionOptions, Rules, TopicSummary,
//! };
//! use dita_storage::{Source, StorageError};
//!
//! struct NoFiles;
//!
//! impl ConversionHost for NoFiles {
//!     fn read_source(&self, path: &str) -> Result<Source, StorageError> {
//!         Err(StorageError::not_found(path))
//!     }
//!     fn exists(&self, _path: &str) -> bool { false }
//!     fn key_target(&self, _key: &str) -> Option<String> { None }
//!     fn topic(&self, _path: &str) -> Option<TopicSummary> { None }
//! }
//!
//! let rules = Rules::default_dita();
//! let options = ConversionOptions::default();
//! let mut out = Vec::new();
//! let mut conv = Conversion::new(&NoFiles, &rules, &options, "intro.dita", &mut out);
//! conv.parse("<p>Press <uicontrol>OK</uicontrol>.</p>").unwrap();
//! conv.flush().unwrap();
//! drop(conv);
//!
//! assert_eq!(
//!     String::from_utf8(out).unwrap(),
//!     r#"<p>Press <b class="uicontrol">OK</b>.</p>"#
//! );
//! ```

mod audience;
mod catalog;
mod conref;
mod conversion;
mod diagnostics;
mod encoder;
mod error;
mod links;
mod processors;
mod rules;
mod token;

pub use audience::{AudienceFilter, DEFAULT_DELIVERY_TARGET};
pub use catalog::default_rule_table;
pub use conversion::{
    Conversion, ConversionHost, ConversionOptions, DEFAULT_MAX_REUSE_DEPTH, ResolutionPolicy,
    TopicSummary,
};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use encoder::{Encoder, FLUSH_THRESHOLD, escape_html, is_void};
pub use error::{ConvertError, ResolutionError, StructuralError};
pub use links::{HTML_EXT, ResolvedLink, html_path, is_external};
pub use processors::{
    ImageProcessor, LinkProcessor, MenuCascadeProcessor, NoteProcessor, SimpleTableProcessor,
    StepProcessor, TableProcessor, builtin_registry,
};
pub use rules::{ProcessorRegistry, Rule, RuleTable, Rules, TagProcessor};
pub use token::{
    Attribute, Element, Node, ReplayStream, StartTag, Token, TokenSource, XmlTokenStream,
    read_element, walk_node_path,
};
