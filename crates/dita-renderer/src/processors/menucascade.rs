use crate::conversion::Conversion;
use crate::error::ConvertError;
use crate::rules::TagProcessor;
use crate::token::{StartTag, Token, TokenSource};

/// Separator written between menu items.
const SEPARATOR: &str = " > ";

/// Menu path such as `File > Save`.
///
/// Child elements go through the normal rules with a separator between
/// them; whitespace between children is dropped.
pub struct MenuCascadeProcessor;

impl TagProcessor for MenuCascadeProcessor {
    fn name(&self) -> &str {
        "menucascade"
    }

    fn process(
        &self,
        conv: &mut Conversion<'_>,
        stream: &mut dyn TokenSource,
        _start: StartTag,
    ) -> Result<(), ConvertError> {
        conv.encoder()
            .open(&StartTag::new("span").with_attr("class", "menucascade"))?;

        let result = render_items(conv, stream);
        let closed = conv.encoder().close("span");
        result.and(closed)
    }
}

fn render_items(
    conv: &mut Conversion<'_>,
    stream: &mut dyn TokenSource,
) -> Result<(), ConvertError> {
    let mut first = true;
    while let Some(token) = stream.next_token()? {
        match token {
            Token::End(_) => break,
            Token::Start(_) => {
                if !first {
                    conv.encoder().text(SEPARATOR)?;
                }
                first = false;
                conv.handle(stream, token)?;
            }
            Token::Text(text) if text.trim().is_empty() => {}
            other => conv.handle(stream, other)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::conversion::tests::TestHost;
    use crate::processors::tests::render;

    #[test]
    fn test_menucascade_separates_items() {
        let (html, _) = render(
            &TestHost::default(),
            "a.dita",
            "<menucascade>\n  <uicontrol>File</uicontrol>\n  <uicontrol>Save</uicontrol>\n</menucascade>",
        );

        assert_eq!(
            html,
            r#"<span class="menucascade"><b class="uicontrol">File</b> &gt; <b class="uicontrol">Save</b></span>"#
        );
    }

    #[test]
    fn test_empty_menucascade_is_closed() {
        let (html, _) = render(&TestHost::default(), "a.dita", "<menucascade/>");

        assert_eq!(html, r#"<span class="menucascade"></span>"#);
    }
}
