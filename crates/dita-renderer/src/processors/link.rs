use dita_storage::path;

use crate::conversion::Conversion;
use crate::error::ConvertError;
use crate::rules::TagProcessor;
use crate::token::{ReplayStream, StartTag, TokenSource, read_element};

/// Extensions offered as downloads instead of opened in a new window.
const DOWNLOAD_EXTENSIONS: &[&str] = &[".pdf", ".doc", ".xml", ".rtf", ".zip", ".exe"];

/// Cross-reference anchor.
///
/// Rewrites `href` to the output page of the target, takes the `title`
/// attribute from the target synopsis and fills empty links with the target
/// title. Links with a non-DITA `format` become downloads or open in a new
/// window.
pub struct LinkProcessor;

impl TagProcessor for LinkProcessor {
    fn name(&self) -> &str {
        "link"
    }

    fn process(
        &self,
        conv: &mut Conversion<'_>,
        stream: &mut dyn TokenSource,
        mut start: StartTag,
    ) -> Result<(), ConvertError> {
        let href = start.attr("href").to_owned();
        let resolved = if href.is_empty() {
            None
        } else {
            conv.resolve_link(&href)
        };

        if let Some(link) = &resolved {
            start.set_attr("href", link.href.clone());
            if start.attr("title").is_empty() {
                start.set_attr("title", link.synopsis.clone());
            }
        }
        start.set_attr("scope", "");
        start.set_attr("type", "");
        start.set_attr("keyref", "");

        let format = start.take_attr("format");
        let href = start.attr("href").to_owned();
        if !format.is_empty() && format != "dita" && !href.is_empty() {
            let ext = path::ext(path::split_fragment(&href).0).to_ascii_lowercase();
            if DOWNLOAD_EXTENSIONS.contains(&ext.as_str()) {
                start.set_attr("download", path::base(&href));
            } else {
                start.set_attr("target", "_blank");
            }
        }

        let element = read_element(stream, start)?;
        conv.encoder().open(&element.start)?;
        let result = if element.has_content() {
            conv.recurse(&mut ReplayStream::new(element.content_tokens()))
        } else {
            let label = resolved
                .as_ref()
                .map(|link| link.title.as_str())
                .filter(|title| !title.is_empty())
                .unwrap_or(href.as_str());
            conv.encoder().text(label)
        };
        let closed = conv.encoder().close(&element.start.name);
        result.and(closed)
    }
}
