//! Link and media reference resolution.
//!
//! References inside a topic are written relative to the document they
//! appear in, which during content reuse is not the topic being produced.
//! Resolution joins them against the decoding document and rewrites them
//! relative to the output page of the topic.

use dita_storage::path;

use crate::conversion::Conversion;
use crate::diagnostics::DiagnosticKind;
use crate::error::{ConvertError, ResolutionError};
use crate::token::{XmlTokenStream, read_element, walk_node_path};

/// Output extension of converted topics.
pub const HTML_EXT: &str = ".html";

/// Resolved cross-reference.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedLink {
    /// Value for the `href` attribute.
    pub href: String,
    /// Title of the target, empty if unknown.
    pub title: String,
    /// Synopsis of the target topic; only set for whole-topic links.
    pub synopsis: String,
    /// Whether the link points outside the document set.
    pub external: bool,
}

/// Whether a reference is an absolute web URL.
#[must_use]
pub fn is_external(href: &str) -> bool {
    let lower = href.trim_start().to_ascii_lowercase();
    lower.starts_with("http:") || lower.starts_with("https:")
}

/// Output page of a topic source path.
#[must_use]
pub fn html_path(topic_path: &str) -> String {
    format!("{}{HTML_EXT}", path::trim_ext(topic_path))
}

/// Last segment of an id path, used as the HTML fragment.
fn fragment(selector: &str) -> &str {
    path::base(selector)
}

impl Conversion<'_> {
    /// Resolve a cross-reference found in the current document.
    ///
    /// Returns `None` and records a not-found diagnostic when the target
    /// topic is unknown; callers keep the original reference.
    pub fn resolve_link(&mut self, href: &str) -> Option<ResolvedLink> {
        if is_external(href) {
            return Some(ResolvedLink {
                href: href.to_owned(),
                external: true,
                ..ResolvedLink::default()
            });
        }

        let (file, selector) = path::split_fragment(href);
        let selector = selector.unwrap_or("");

        if file.is_empty() {
            return Some(ResolvedLink {
                href: format!("#{}", fragment(selector)),
                ..ResolvedLink::default()
            });
        }

        let target = path::join(path::dir(self.decoding_path()), file);
        let Some(topic) = self.host().topic(&target) else {
            self.report(
                DiagnosticKind::NotFound,
                format!("did not find topic {target} [{href}]"),
            );
            return None;
        };

        let mut title = String::new();
        if !selector.is_empty() {
            match self.extract_title(&target, selector) {
                Ok(Some(found)) => title = found,
                Ok(None) => self.report(
                    DiagnosticKind::NotFound,
                    format!("did not find {selector} in {target}"),
                ),
                Err(err) => self.report(
                    DiagnosticKind::Validation,
                    format!("unable to extract title from {target}: {err}"),
                ),
            }
        }

        let synopsis = if selector.is_empty() {
            topic.synopsis
        } else {
            String::new()
        };
        if title.is_empty() {
            title = topic.title;
        }

        let mut link = path::relative_path(self.topic_path(), &html_path(&target));
        if !selector.is_empty() {
            link.push('#');
            link.push_str(fragment(selector));
        }

        Some(ResolvedLink {
            href: link,
            title,
            synopsis,
            external: false,
        })
    }

    /// Resolve an image or other media reference found in the current
    /// document.
    ///
    /// Missing local files are reported and the reference is returned
    /// unchanged.
    pub fn resolve_media(&mut self, href: &str) -> String {
        if href.is_empty() || is_external(href) {
            return href.to_owned();
        }

        let target = path::join(path::dir(self.decoding_path()), href);
        if !self.host().exists(&target) {
            self.report(
                DiagnosticKind::NotFound,
                format!("did not find media {target} [{href}]"),
            );
            return href.to_owned();
        }

        path::relative_path(self.topic_path(), &target)
    }

    /// Title of the element addressed by `selector` in another document.
    fn extract_title(&self, target: &str, selector: &str) -> Result<Option<String>, ConvertError> {
        let source = self
            .host()
            .read_source(target)
            .map_err(|source| ResolutionError::Open {
                path: target.to_owned(),
                source,
            })?;
        let mut stream = XmlTokenStream::from_bytes(&source.data, target)?;
        let Some(start) = walk_node_path(&mut stream, selector)? else {
            return Ok(None);
        };
        let element = read_element(&mut stream, start)?;
        Ok(element
            .child("title")
            .map(|title| title.text().trim().to_owned()))
    }
}
