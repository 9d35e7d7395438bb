//! Conversion dispatcher.
//!
//! A [`Conversion`] owns the encoder and diagnostics of one conversion unit
//! (one topic page) and drives tokens through the rule table:
//!
//! 1. `Skip` rules drop the subtree.
//! 2. Elements carrying `conref`/`conkeyref` are replaced by the referenced
//!    content.
//! 3. `Unwrap` rules process the children without a wrapper.
//! 4. A custom processor for the original name takes over.
//! 5. A `Rename` rule changes the name and class.
//! 6. A custom processor for the new name takes over.
//! 7. Otherwise the element is emitted and its children processed.
//!
//! Steps 3 to 7 must leave the encoder at the depth they found it; a
//! violation means a custom processor is broken and panics.

use std::io::Write;

use dita_storage::{Source, StorageError};

use crate::audience::AudienceFilter;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::encoder::Encoder;
use crate::error::{ConvertError, StructuralError};
use crate::rules::{Rule, Rules};
use crate::token::{StartTag, Token, TokenSource, XmlTokenStream};

/// Default limit for nested content reuse.
pub const DEFAULT_MAX_REUSE_DEPTH: usize = 16;

/// What to do when content reuse cannot be resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResolutionPolicy {
    /// Record a diagnostic, omit the element and keep converting.
    #[default]
    Omit,
    /// Record a diagnostic and abort the conversion unit.
    Abort,
}

/// Settings shared by all conversions of a run.
#[derive(Clone, Debug)]
pub struct ConversionOptions {
    /// Filter for audience-tagged table rows.
    pub audience: AudienceFilter,
    /// Handling of unresolvable content reuse.
    pub resolution_policy: ResolutionPolicy,
    /// Maximum nesting of content reuse.
    pub max_reuse_depth: usize,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            audience: AudienceFilter::default(),
            resolution_policy: ResolutionPolicy::default(),
            max_reuse_depth: DEFAULT_MAX_REUSE_DEPTH,
        }
    }
}

impl ConversionOptions {
    /// Set the audience filter.
    #[must_use]
    pub fn with_audience(mut self, audience: AudienceFilter) -> Self {
        self.audience = audience;
        self
    }

    /// Set the resolution policy.
    #[must_use]
    pub fn with_resolution_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.resolution_policy = policy;
        self
    }

    /// Set the maximum reuse depth.
    #[must_use]
    pub fn with_max_reuse_depth(mut self, depth: usize) -> Self {
        self.max_reuse_depth = depth;
        self
    }
}

/// Title and synopsis of a loaded topic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TopicSummary {
    /// Display title.
    pub title: String,
    /// Plain-text short description.
    pub synopsis: String,
}

/// Services a conversion needs from the document index.
///
/// All paths are root-relative forward-slash paths.
pub trait ConversionHost: Send + Sync {
    /// Read a document or media file.
    fn read_source(&self, path: &str) -> Result<Source, StorageError>;

    /// Whether a file exists.
    fn exists(&self, path: &str) -> bool;

    /// Root-relative path a key is bound to.
    fn key_target(&self, key: &str) -> Option<String>;

    /// Summary of a topic known to the index.
    fn topic(&self, path: &str) -> Option<TopicSummary>;
}

/// State of one conversion unit.
pub struct Conversion<'a> {
    host: &'a dyn ConversionHost,
    rules: &'a Rules,
    options: &'a ConversionOptions,
    encoder: Encoder<&'a mut dyn Write>,
    topic_path: String,
    decoding_path: String,
    pub(crate) reuse_depth: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Conversion<'a> {
    /// Start converting the topic at `topic_path`, writing HTML to `out`.
    pub fn new(
        host: &'a dyn ConversionHost,
        rules: &'a Rules,
        options: &'a ConversionOptions,
        topic_path: &str,
        out: &'a mut dyn Write,
    ) -> Self {
        Self {
            host,
            rules,
            options,
            encoder: Encoder::new(out),
            topic_path: topic_path.to_owned(),
            decoding_path: topic_path.to_owned(),
            reuse_depth: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Document index services.
    #[must_use]
    pub fn host(&self) -> &'a dyn ConversionHost {
        self.host
    }

    /// Run settings.
    #[must_use]
    pub fn options(&self) -> &'a ConversionOptions {
        self.options
    }

    /// Path of the topic whose page is being produced.
    #[must_use]
    pub fn topic_path(&self) -> &str {
        &self.topic_path
    }

    /// Path of the document tokens are currently read from.
    ///
    /// Differs from [`topic_path`](Self::topic_path) while reused content
    /// from another document is spliced in.
    #[must_use]
    pub fn decoding_path(&self) -> &str {
        &self.decoding_path
    }

    /// Output encoder.
    pub fn encoder(&mut self) -> &mut Encoder<&'a mut dyn Write> {
        &mut self.encoder
    }

    /// Problems recorded so far.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consume the conversion and return its diagnostics.
    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Record a problem against the current document.
    pub fn report(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(kind, self.decoding_path.clone(), message);
        tracing::debug!(
            path = %diagnostic.path,
            kind = %diagnostic.kind,
            message = %diagnostic.message,
            "Conversion diagnostic"
        );
        self.diagnostics.push(diagnostic);
    }

    /// Write buffered output.
    pub fn flush(&mut self) -> Result<(), ConvertError> {
        self.encoder.flush()
    }

    /// Convert an XML fragment.
    pub fn parse(&mut self, content: &str) -> Result<(), ConvertError> {
        let mut stream = XmlTokenStream::new(content);
        self.recurse(&mut stream)
    }

    /// Process tokens until the end of the current element or stream.
    ///
    /// The end token that stops the loop is consumed.
    pub fn recurse(&mut self, stream: &mut dyn TokenSource) -> Result<(), ConvertError> {
        while let Some(token) = stream.next_token()? {
            if matches!(token, Token::End(_)) {
                return Ok(());
            }
            self.handle(stream, token)?;
        }
        Ok(())
    }

    /// Process one token.
    ///
    /// For a start token the stream must be positioned right after it; the
    /// element's subtree is consumed.
    pub fn handle(
        &mut self,
        stream: &mut dyn TokenSource,
        token: Token,
    ) -> Result<(), ConvertError> {
        match token {
            Token::Start(start) => self.handle_start(stream, start),
            Token::Text(text) => self.encoder.text(&text),
            Token::Comment(text) => self.encoder.comment(&text),
            Token::ProcessingInstruction | Token::Directive => Ok(()),
            Token::End(name) => Err(StructuralError::UnexpectedEnd(name).into()),
        }
    }

    /// Emit `start`, process the children, then always emit the end tag.
    pub fn emit_with_children(
        &mut self,
        stream: &mut dyn TokenSource,
        start: StartTag,
    ) -> Result<(), ConvertError> {
        self.encoder.open(&start)?;
        let result = self.recurse(stream);
        let closed = self.encoder.close(&start.name);
        result.and(closed)
    }

    fn handle_start(
        &mut self,
        stream: &mut dyn TokenSource,
        start: StartTag,
    ) -> Result<(), ConvertError> {
        if matches!(self.rules.table.get(&start.name), Some(Rule::Skip)) {
            tracing::trace!(tag = %start.name, "Skipping element");
            return stream.skip();
        }

        if is_reuse(&start) {
            return self.handle_reuse(stream, start);
        }

        let depth = self.encoder.depth();
        let result = self.dispatch(stream, start);
        if result.is_ok() {
            assert_eq!(
                depth,
                self.encoder.depth(),
                "mismatched start and end tag in html output: {:?}",
                self.encoder.stack()
            );
        }
        result
    }

    fn dispatch(
        &mut self,
        stream: &mut dyn TokenSource,
        mut start: StartTag,
    ) -> Result<(), ConvertError> {
        let rules = self.rules;

        match rules.table.get(&start.name) {
            Some(Rule::Unwrap) => return self.recurse(stream),
            Some(Rule::Custom(processor)) => return self.run_custom(processor, stream, start),
            Some(Rule::Rename { name, class }) => {
                start.name.clone_from(name);
                start.set_attr("class", class.clone().unwrap_or_default());
            }
            Some(Rule::Skip) | None => {}
        }

        if let Some(Rule::Custom(processor)) = rules.table.get(&start.name) {
            return self.run_custom(processor, stream, start);
        }

        self.emit_with_children(stream, start)
    }

    fn run_custom(
        &mut self,
        processor: &str,
        stream: &mut dyn TokenSource,
        start: StartTag,
    ) -> Result<(), ConvertError> {
        let rules = self.rules;
        if let Some(processor) = rules.processors.get(processor) {
            return processor.process(self, stream, start);
        }
        tracing::warn!(processor, tag = %start.name, "Unknown tag processor");
        self.emit_with_children(stream, start)
    }

    /// Run `f` with tokens attributed to another document, restoring the
    /// previous document afterwards.
    pub(crate) fn with_decoding_path<T>(
        &mut self,
        path: String,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let previous = std::mem::replace(&mut self.decoding_path, path);
        let result = f(self);
        self.decoding_path = previous;
        result
    }
}

/// Whether a start tag requests content reuse.
fn is_reuse(start: &StartTag) -> bool {
    !start.attr("conref").is_empty() || !start.attr("conkeyref").is_empty()
}
