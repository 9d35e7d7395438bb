use crate::conversion::Conversion;
use crate::error::ConvertError;
use crate::rules::TagProcessor;
use crate::token::{StartTag, TokenSource};

/// Task step rendered as a list item.
///
/// Optional steps are prefixed with `(Optional) `.
pub struct StepProcessor;

impl TagProcessor for StepProcessor {
    fn name(&self) -> &str {
        "step"
    }

    fn process(
        &self,
        conv: &mut Conversion<'_>,
        stream: &mut dyn TokenSource,
        mut start: StartTag,
    ) -> Result<(), ConvertError> {
        let importance = start.take_attr("importance");
        start.name = "li".to_owned();

        conv.encoder().open(&start)?;
        if importance == "optional" {
            conv.encoder().text("(Optional) ")?;
        }
        let result = conv.recurse(stream);
        let closed = conv.encoder().close("li");
        result.and(closed)
    }
}
