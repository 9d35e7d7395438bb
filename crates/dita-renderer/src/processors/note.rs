use crate::conversion::Conversion;
use crate::error::ConvertError;
use crate::rules::TagProcessor;
use crate::token::{StartTag, TokenSource};

/// Note, tip or caution block.
///
/// Renders a `div.note` holding an icon titled with the note type followed
/// by the note content in a `span`.
pub struct NoteProcessor;

fn icon(note_type: &str) -> &'static str {
    match note_type {
        "tip" => "lightbulb-outline",
        "caution" | "warning" | "danger" => "alert",
        _ => "note-outline",
    }
}

impl TagProcessor for NoteProcessor {
    fn name(&self) -> &str {
        "note"
    }

    fn process(
        &self,
        conv: &mut Conversion<'_>,
        stream: &mut dyn TokenSource,
        mut start: StartTag,
    ) -> Result<(), ConvertError> {
        let mut note_type = start.take_attr("type");
        let other = start.take_attr("othertype");
        if note_type == "other" {
            note_type = other;
        }
        if note_type.is_empty() {
            note_type = "note".to_owned();
        }

        start.name = "div".to_owned();
        start.set_attr("class", "note");

        let encoder = conv.encoder();
        encoder.open(&start)?;
        encoder.open(
            &StartTag::new("i")
                .with_attr("class", format!("mdi mdi-{}", icon(&note_type)))
                .with_attr("title", note_type),
        )?;
        encoder.close("i")?;
        encoder.text(" ")?;

        conv.emit_with_children(stream, StartTag::new("span"))?;
        conv.encoder().close("div")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::conversion::tests::TestHost;
    use crate::processors::tests::render;

    #[test]
    fn test_default_note() {
        let (html, _) = render(&TestHost::default(), "a.dita", "<note>Read <b>this</b>.</note>");

        assert_eq!(
            html,
            r#"<div class="note"><i class="mdi mdi-note-outline" title="note"></i> <span>Read <strong>this</strong>.</span></div>"#
        );
    }

    #[test]
    fn test_tip_and_caution_icons() {
        let (tip, _) = render(&TestHost::default(), "a.dita", r#"<note type="tip">t</note>"#);
        let (caution, _) = render(&TestHost::default(), "a.dita", r#"<note type="caution">c</note>"#);

        assert!(tip.contains(r#"class="mdi mdi-lightbulb-outline" title="tip""#));
        assert!(caution.contains(r#"class="mdi mdi-alert" title="caution""#));
    }

    #[test]
    fn test_other_type_uses_othertype() {
        let (html, _) = render(
            &TestHost::default(),
            "a.dita",
            r#"<note id="n1" type="other" othertype="hint">x</note>"#,
        );

        assert!(html.starts_with(
            r#"<div id="n1" class="note"><i class="mdi mdi-note-outline" title="hint"></i>"#
        ));
    }
}
