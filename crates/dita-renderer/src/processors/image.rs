use crate::conversion::Conversion;
use crate::error::ConvertError;
use crate::rules::TagProcessor;
use crate::token::{StartTag, TokenSource, read_element};

/// Image element.
///
/// Rewrites `href` to a `src` relative to the output page, turns an `alt`
/// child into the `alt` attribute and wraps `placement="break"` images in a
/// paragraph.
pub struct ImageProcessor;

impl TagProcessor for ImageProcessor {
    fn name(&self) -> &str {
        "image"
    }

    fn process(
        &self,
        conv: &mut Conversion<'_>,
        stream: &mut dyn TokenSource,
        start: StartTag,
    ) -> Result<(), ConvertError> {
        let element = read_element(stream, start)?;
        let mut img = element.start.clone();

        let href = img.take_attr("href");
        let src = conv.resolve_media(&href);
        img.set_attr("src", src);

        if img.attr("alt").is_empty()
            && let Some(alt) = element.child("alt")
        {
            img.set_attr("alt", alt.text().trim());
        }

        let placement = img.take_attr("placement");
        img.set_attr("scope", "");
        img.set_attr("format", "");
        img.set_attr("keyref", "");

        let block = placement == "break";
        if block {
            conv.encoder()
                .open(&StartTag::new("p").with_attr("class", "image"))?;
        }
        conv.encoder().open(&img)?;
        conv.encoder().close(&img.name)?;
        if block {
            conv.encoder().close("p")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::conversion::tests::TestHost;
    use crate::processors::tests::render;

    fn host() -> TestHost {
        TestHost::default().with_file("guide/img/panel.png", "png")
    }

    #[test]
    fn test_image_src_relative_to_page() {
        let (html, diagnostics) = render(
            &host(),
            "guide/setup.dita",
            r#"<image href="img/panel.png"><alt>Control panel</alt></image>"#,
        );

        assert_eq!(html, r#"<img src="img/panel.png" alt="Control panel">"#);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_break_placement_wraps_in_paragraph() {
        let (html, _) = render(
            &host(),
            "guide/setup.dita",
            r#"<image href="img/panel.png" placement="break" width="200"/>"#,
        );

        assert_eq!(
            html,
            r#"<p class="image"><img width="200" src="img/panel.png"></p>"#
        );
    }

    #[test]
    fn test_missing_image_is_reported() {
        let (html, diagnostics) = render(&host(), "guide/setup.dita", r#"<image href="nope.png"/>"#);

        assert_eq!(html, r#"<img src="nope.png">"#);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_external_image_unchanged() {
        let (html, diagnostics) = render(
            &host(),
            "guide/setup.dita",
            r#"<image href="https://cdn.example.com/a.png"/>"#,
        );

        assert_eq!(html, r#"<img src="https://cdn.example.com/a.png">"#);
        assert!(diagnostics.is_empty());
    }
}
