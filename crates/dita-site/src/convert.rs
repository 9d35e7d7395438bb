//! Topic conversion driver.

use dita_renderer::{
    Conversion, ConversionOptions, ConvertError, Diagnostic, DiagnosticKind, ReplayStream, Rules,
};

use crate::error::PageError;
use crate::index::{DocumentIndex, TopicId};
use crate::model::TopicDocument;

/// HTML fragment produced for one topic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TopicOutput {
    /// Short description paragraph followed by the converted body.
    pub content: String,
    /// Problems recorded during the conversion.
    pub diagnostics: Vec<Diagnostic>,
}

/// Convert the short description and body of a topic.
///
/// Only the first body is converted. Output is flushed whether or not the
/// conversion succeeds.
///
/// # Errors
///
/// Returns [`PageError::NoDocument`] for placeholder topics and
/// [`PageError::Convert`] with the diagnostics gathered so far when the
/// conversion aborts.
pub fn convert_topic(
    index: &DocumentIndex,
    rules: &Rules,
    options: &ConversionOptions,
    id: TopicId,
) -> Result<TopicOutput, PageError> {
    let topic = index.topic(id);
    let Some(document) = &topic.document else {
        return Err(PageError::NoDocument(topic.path.clone()));
    };

    let mut out: Vec<u8> = Vec::new();
    let mut conv = Conversion::new(index, rules, options, &topic.path, &mut out);
    let result = render_document(&mut conv, document);
    let flushed = conv.flush();
    let diagnostics = conv.into_diagnostics();

    if let Err(source) = result.and(flushed) {
        return Err(PageError::Convert {
            path: topic.path.clone(),
            diagnostics,
            source,
        });
    }

    tracing::debug!(path = %topic.path, diagnostics = diagnostics.len(), "Converted topic");
    Ok(TopicOutput {
        content: String::from_utf8_lossy(&out).into_owned(),
        diagnostics,
    })
}

fn render_document(conv: &mut Conversion<'_>, document: &TopicDocument) -> Result<(), ConvertError> {
    if let Some(short_desc) = document.short_desc.as_ref().filter(|s| s.has_content()) {
        conv.encoder().open_tag("p")?;
        let result = conv.recurse(&mut ReplayStream::new(short_desc.content_tokens()));
        let closed = conv.encoder().close("p");
        result.and(closed)?;
    }

    if document.bodies.len() > 1 {
        conv.report(DiagnosticKind::Validation, "multiple body tags");
    }

    match document.bodies.first() {
        Some(body) if body.has_content() => {
            conv.recurse(&mut ReplayStream::new(body.content_tokens()))
        }
        _ => {
            conv.report(DiagnosticKind::Validation, "empty body tag");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dita_renderer::{ResolutionPolicy, StartTag, StructuralError};
    use dita_storage::MockStorage;
    use pretty_assertions::assert_eq;

    use super::*;

    fn convert(storage: MockStorage, path: &str) -> Result<TopicOutput, PageError> {
        convert_with(storage, path, &ConversionOptions::default())
    }

    fn convert_with(
        storage: MockStorage,
        path: &str,
        options: &ConversionOptions,
    ) -> Result<TopicOutput, PageError> {
        let mut index = DocumentIndex::new(Arc::new(storage));
        let id = index.load_topic(path);
        convert_topic(&index, &Rules::default_dita(), options, id)
    }

    #[test]
    fn test_convert_topic() {
        let storage = MockStorage::new().with_file(
            "a.dita",
            r#"<task id="a"><title>A</title><shortdesc>Do <b>it</b>.</shortdesc>
<taskbody><steps><step><cmd>Run</cmd></step></steps></taskbody></task>"#,
        );

        let output = convert(storage, "a.dita").unwrap();

        assert_eq!(
            output.content,
            concat!(
                r#"<p>Do <strong>it</strong>.</p>"#,
                r#"<ol><li><span class="cmd">Run</span></li></ol>"#,
            )
        );
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_empty_shortdesc_is_not_rendered() {
        let storage = MockStorage::new().with_file(
            "a.dita",
            "<topic><title>A</title><shortdesc> </shortdesc><body><p>body</p></body></topic>",
        );

        let output = convert(storage, "a.dita").unwrap();

        assert_eq!(output.content, "<p>body</p>");
    }

    #[test]
    fn test_multiple_bodies_first_wins() {
        let storage = MockStorage::new().with_file(
            "a.dita",
            "<topic><title>A</title><body><p>one</p></body><body><p>two</p></body></topic>",
        );

        let output = convert(storage, "a.dita").unwrap();

        assert_eq!(output.content, "<p>one</p>");
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].message, "multiple body tags");
        assert_eq!(output.diagnostics[0].kind, DiagnosticKind::Validation);
    }

    #[test]
    fn test_empty_body_is_reported() {
        for content in [
            "<topic><title>A</title><body>  </body></topic>",
            "<topic><title>A</title></topic>",
        ] {
            let output = convert(MockStorage::new().with_file("a.dita", content), "a.dita").unwrap();

            assert_eq!(output.content, "");
            assert_eq!(output.diagnostics.len(), 1);
            assert_eq!(output.diagnostics[0].message, "empty body tag");
        }
    }

    #[test]
    fn test_placeholder_topic() {
        let err = convert(MockStorage::new(), "gone.dita").unwrap_err();

        assert!(matches!(err, PageError::NoDocument(path) if path == "gone.dita"));
    }

    #[test]
    fn test_abort_keeps_diagnostics() {
        let storage = MockStorage::new().with_file(
            "a.dita",
            r#"<topic><title>A</title><body><p conkeyref="nokey/x"/></body></topic>"#,
        );
        let options = ConversionOptions::default().with_resolution_policy(ResolutionPolicy::Abort);

        let err = convert_with(storage, "a.dita", &options).unwrap_err();

        let PageError::Convert {
            path, diagnostics, ..
        } = err
        else {
            panic!("expected conversion error");
        };
        assert_eq!(path, "a.dita");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Resolution);
    }

    #[test]
    fn test_structural_error_aborts() {
        struct Unclosed;

        impl dita_renderer::TagProcessor for Unclosed {
            fn name(&self) -> &str {
                "unclosed"
            }

            fn process(
                &self,
                conv: &mut Conversion<'_>,
                stream: &mut dyn dita_renderer::TokenSource,
                _start: StartTag,
            ) -> Result<(), ConvertError> {
                stream.skip()?;
                conv.encoder().close("div")
            }
        }

        let storage = MockStorage::new()
            .with_file("a.dita", "<topic><title>A</title><body><x/></body></topic>");
        let mut index = DocumentIndex::new(Arc::new(storage));
        let id = index.load_topic("a.dita");
        let mut rules = Rules::default_dita();
        rules.table.insert("x", dita_renderer::Rule::Custom("unclosed".to_owned()));
        rules.processors.register(Unclosed);

        let err = convert_topic(&index, &rules, &ConversionOptions::default(), id).unwrap_err();

        assert!(matches!(
            err,
            PageError::Convert {
                source: ConvertError::Structural(StructuralError::NoOpenTags(_)),
                ..
            }
        ));
    }
}
