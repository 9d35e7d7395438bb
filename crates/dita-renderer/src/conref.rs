//! Content reuse (`conref`, `conkeyref`, `conrefend`).
//!
//! An element carrying a reuse attribute is replaced by a range of elements
//! from the referenced document. The range starts at the element addressed
//! by the start reference and runs, in document order, through the element
//! whose id matches the last segment of the end reference. Spliced tokens go
//! through the normal dispatcher, so nested reuse is resolved relative to the
//! referenced document.

use dita_storage::path;

use crate::conversion::{Conversion, ConversionHost, ResolutionPolicy};
use crate::diagnostics::DiagnosticKind;
use crate::error::{ConvertError, ResolutionError};
use crate::token::{StartTag, Token, TokenSource, XmlTokenStream, eq_fold, walk_node_path};

/// Resolved location of a reuse range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ReuseTarget {
    /// Root-relative document path.
    pub file: String,
    /// Id path of the first element.
    pub start_path: String,
    /// Id path of the last element.
    pub end_path: String,
}

/// Resolve the reuse attributes of `start` against the document being read.
pub(crate) fn resolve_target(
    start: &StartTag,
    decoding_path: &str,
    host: &dyn ConversionHost,
) -> Result<ReuseTarget, ResolutionError> {
    let conref = start.attr("conref");
    let conkeyref = start.attr("conkeyref");
    let conrefend = start.attr("conrefend");

    let (key_file, key_path) = resolve_key_ref(conkeyref, host)?;

    let base = path::dir(decoding_path);
    let (start_file, start_path) = split_reference(conref);
    let (end_file, end_path) = split_reference(conrefend);
    let mut start_file = join_file(base, start_file);
    let mut end_file = join_file(base, end_file);
    let mut start_path = start_path.to_owned();
    let mut end_path = end_path.to_owned();

    if start_file.is_empty() && !key_file.is_empty() {
        if !start_path.is_empty() || !end_path.is_empty() {
            return Err(ResolutionError::InvalidKeyRefSetup(conkeyref.to_owned()));
        }
        start_file = key_file;
        start_path = key_path;
    }

    if end_file.is_empty() && end_path.is_empty() {
        end_file.clone_from(&start_file);
        end_path.clone_from(&start_path);
    }

    if start_file.is_empty() && end_file.is_empty() {
        start_file = decoding_path.to_owned();
        end_file = decoding_path.to_owned();
    }

    if path::canonical(&start_file) != path::canonical(&end_file) {
        return Err(ResolutionError::DifferentFiles {
            start: start_file,
            end: end_file,
        });
    }

    if !eq_fold(path::dir(&start_path), path::dir(&end_path)) {
        return Err(ResolutionError::DifferentRoots {
            conref: conref.to_owned(),
            conrefend: conrefend.to_owned(),
        });
    }

    if start_path.is_empty() || end_path.is_empty() {
        return Err(ResolutionError::EmptyPath {
            conref: conref.to_owned(),
            conrefend: conrefend.to_owned(),
        });
    }

    Ok(ReuseTarget {
        file: start_file,
        start_path,
        end_path,
    })
}

/// Resolve `key/path` to the key's file and the element path.
fn resolve_key_ref(
    conkeyref: &str,
    host: &dyn ConversionHost,
) -> Result<(String, String), ResolutionError> {
    if conkeyref.is_empty() {
        return Ok((String::new(), String::new()));
    }
    let Some((key, element_path)) = conkeyref.split_once('/') else {
        return Err(ResolutionError::InvalidKeyRef(conkeyref.to_owned()));
    };
    let Some(file) = host.key_target(key) else {
        return Err(ResolutionError::UndefinedKey {
            key: key.to_owned(),
            keyref: conkeyref.to_owned(),
        });
    };
    Ok((file, element_path.to_owned()))
}

fn split_reference(reference: &str) -> (&str, &str) {
    let (file, fragment) = path::split_fragment(reference);
    (file, fragment.unwrap_or(""))
}

fn join_file(base: &str, file: &str) -> String {
    if file.is_empty() {
        String::new()
    } else {
        path::join(base, file)
    }
}

/// Reference text used in messages.
fn reference_label(start: &StartTag) -> String {
    let conref = start.attr("conref");
    if conref.is_empty() {
        start.attr("conkeyref").to_owned()
    } else {
        conref.to_owned()
    }
}

impl Conversion<'_> {
    /// Replace the element started by `start` with the content it references.
    pub(crate) fn handle_reuse(
        &mut self,
        stream: &mut dyn TokenSource,
        start: StartTag,
    ) -> Result<(), ConvertError> {
        stream.skip()?;

        let host = self.host();
        let target = match resolve_target(&start, self.decoding_path(), host) {
            Ok(target) => target,
            Err(err) => return self.reuse_failed(err),
        };

        if self.reuse_depth >= self.options().max_reuse_depth {
            return self.reuse_failed(ResolutionError::TooDeep {
                limit: self.options().max_reuse_depth,
                reference: reference_label(&start),
            });
        }

        let source = match host.read_source(&target.file) {
            Ok(source) => source,
            Err(source) => {
                return self.reuse_failed(ResolutionError::Open {
                    path: target.file,
                    source,
                });
            }
        };

        let mut referenced = XmlTokenStream::from_bytes(&source.data, &target.file)?;
        let Some(first) = walk_node_path(&mut referenced, &target.start_path)? else {
            return self.reuse_failed(ResolutionError::NotFound(reference_label(&start)));
        };

        tracing::trace!(
            file = %target.file,
            start = %target.start_path,
            end = %target.end_path,
            "Splicing reused content"
        );

        let end_id = path::base(&target.end_path).to_owned();
        self.reuse_depth += 1;
        let spliced = self.with_decoding_path(target.file.clone(), |conv| {
            conv.splice_range(&mut referenced, first, &end_id)
        });
        self.reuse_depth -= 1;

        if spliced? {
            Ok(())
        } else {
            self.reuse_failed(ResolutionError::EndNotFound(start.attr("conrefend").to_owned()))
        }
    }

    /// Dispatch tokens from `first` through the element with id `end_id`.
    ///
    /// Returns `false` if the enclosing element or the document ended first.
    fn splice_range(
        &mut self,
        stream: &mut dyn TokenSource,
        first: StartTag,
        end_id: &str,
    ) -> Result<bool, ConvertError> {
        let mut token = Token::Start(first);
        loop {
            if matches!(token, Token::End(_)) {
                return Ok(false);
            }
            let is_last = matches!(&token, Token::Start(start) if eq_fold(start.id(), end_id));
            self.handle(stream, token)?;
            if is_last {
                return Ok(true);
            }
            match stream.next_token()? {
                Some(next) => token = next,
                None => return Ok(false),
            }
        }
    }

    /// Record a reuse failure and apply the resolution policy.
    fn reuse_failed(&mut self, err: ResolutionError) -> Result<(), ConvertError> {
        self.report(DiagnosticKind::Resolution, err.to_string());
        match self.options().resolution_policy {
            ResolutionPolicy::Omit => Ok(()),
            ResolutionPolicy::Abort => Err(err.into()),
        }
    }
}
