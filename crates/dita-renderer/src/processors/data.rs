use crate::conversion::Conversion;
use crate::error::ConvertError;
use crate::rules::TagProcessor;
use crate::token::{StartTag, TokenSource};

/// `datatype` value marking an embedded tutorial video.
const VIDEO_DATATYPE: &str = "rttutorial";

/// Metadata element.
///
/// A `data` element with `datatype="rttutorial"` becomes an MP4 `<video>`
/// player for its `href`; its children are dropped. Any other `data`
/// element is emitted with its children.
pub struct DataProcessor;

impl TagProcessor for DataProcessor {
    fn name(&self) -> &str {
        "data"
    }

    fn process(
        &self,
        conv: &mut Conversion<'_>,
        stream: &mut dyn TokenSource,
        start: StartTag,
    ) -> Result<(), ConvertError> {
        if !start.attr("datatype").eq_ignore_ascii_case(VIDEO_DATATYPE) {
            return conv.emit_with_children(stream, start);
        }
        stream.skip()?;

        let src = conv.resolve_media(start.attr("href"));
        conv.encoder()
            .open(&StartTag::new("video").with_attr("controls", "controls"))?;
        conv.encoder().open(
            &StartTag::new("source")
                .with_attr("src", src)
                .with_attr("type", "video/mp4"),
        )?;
        conv.encoder().close("source")?;
        conv.encoder().open_tag("p")?;
        conv.encoder().text("Video playback not supported")?;
        conv.encoder().close("p")?;
        conv.encoder().close("video")
    }
}
