//! Tag-balance HTML encoder.
//!
//! [`Encoder`] tracks the stack of open tags and refuses to close a tag that
//! is not on top of it. Void elements (`img`, `br`, ...) are popped like any
//! other tag but never produce an end tag, and may not contain text or
//! comments. Output is buffered and written to the underlying writer once
//! the buffer grows past [`FLUSH_THRESHOLD`] bytes or on [`Encoder::flush`].

use std::io::Write;

use crate::error::{ConvertError, StructuralError};
use crate::token::StartTag;

/// Buffered bytes that trigger a write to the underlying writer.
pub const FLUSH_THRESHOLD: usize = 256;

/// HTML elements that have a start tag only.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input", "keygen", "link",
    "meta", "param", "source", "track", "wbr",
];

/// Whether `name` is an HTML void element.
#[must_use]
pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Escape text for use in HTML content or a quoted attribute value.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    escape_into(&mut result, s);
    result
}

fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
}

/// Streaming HTML writer enforcing open/close balance.
pub struct Encoder<W: Write> {
    out: W,
    buf: String,
    stack: Vec<String>,
}

impl<W: Write> Encoder<W> {
    /// Create an encoder writing to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            buf: String::new(),
            stack: Vec::new(),
        }
    }

    /// Number of currently open tags.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Currently open tags, outermost first.
    #[must_use]
    pub fn stack(&self) -> &[String] {
        &self.stack
    }

    /// Write a start tag and push it onto the stack.
    pub fn open(&mut self, tag: &StartTag) -> Result<(), ConvertError> {
        self.stack.push(tag.name.clone());

        self.buf.push('<');
        self.buf.push_str(&tag.name);
        for attr in &tag.attrs {
            if attr.name.is_empty() {
                continue;
            }
            self.buf.push(' ');
            self.buf.push_str(&attr.name);
            self.buf.push_str("=\"");
            escape_into(&mut self.buf, &attr.value);
            self.buf.push('"');
        }
        self.buf.push('>');

        self.maybe_flush()
    }

    /// Write a start tag without attributes.
    pub fn open_tag(&mut self, name: &str) -> Result<(), ConvertError> {
        self.open(&StartTag::new(name))
    }

    /// Pop `name` from the stack and write its end tag unless it is void.
    ///
    /// # Errors
    ///
    /// Returns [`StructuralError::NoOpenTags`] if nothing is open and
    /// [`StructuralError::MismatchedEnd`] if `name` is not on top.
    pub fn close(&mut self, name: &str) -> Result<(), ConvertError> {
        let Some(open) = self.stack.pop() else {
            return Err(StructuralError::NoOpenTags(name.to_owned()).into());
        };
        if open != name {
            return Err(StructuralError::MismatchedEnd {
                requested: name.to_owned(),
                open,
            }
            .into());
        }

        if is_void(name) {
            return Ok(());
        }

        self.buf.push_str("</");
        self.buf.push_str(name);
        self.buf.push('>');

        self.maybe_flush()
    }

    /// Write escaped character data.
    ///
    /// # Errors
    ///
    /// Returns [`StructuralError::ContentInVoid`] if a void tag is open.
    pub fn text(&mut self, text: &str) -> Result<(), ConvertError> {
        self.check_not_void()?;
        escape_into(&mut self.buf, text);
        self.maybe_flush()
    }

    /// Write an HTML comment.
    ///
    /// # Errors
    ///
    /// Returns [`StructuralError::ContentInVoid`] if a void tag is open.
    pub fn comment(&mut self, text: &str) -> Result<(), ConvertError> {
        self.check_not_void()?;
        self.buf.push_str("<!--");
        self.buf.push_str(text);
        self.buf.push_str("-->");
        self.maybe_flush()
    }

    /// Write buffered output to the underlying writer.
    pub fn flush(&mut self) -> Result<(), ConvertError> {
        if !self.buf.is_empty() {
            self.out.write_all(self.buf.as_bytes())?;
            self.buf.clear();
        }
        self.out.flush()?;
        Ok(())
    }

    fn check_not_void(&self) -> Result<(), StructuralError> {
        match self.stack.last() {
            Some(top) if is_void(top) => Err(StructuralError::ContentInVoid(top.clone())),
            _ => Ok(()),
        }
    }

    fn maybe_flush(&mut self) -> Result<(), ConvertError> {
        if self.buf.len() > FLUSH_THRESHOLD {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn encode(f: impl FnOnce(&mut Encoder<&mut Vec<u8>>) -> Result<(), ConvertError>) -> String {
        let mut out = Vec::new();
        let mut encoder = Encoder::new(&mut out);
        f(&mut encoder).unwrap();
        encoder.flush().unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_open_close_with_attributes() {
        let html = encode(|enc| {
            enc.open(&StartTag::new("a").with_attr("href", "x.html?a=1&b=\"2\""))?;
            enc.text("link")?;
            enc.close("a")
        });

        assert_eq!(html, r#"<a href="x.html?a=1&amp;b=&quot;2&quot;">link</a>"#);
    }

    #[test]
    fn test_text_is_escaped() {
        let html = encode(|enc| {
            enc.open_tag("p")?;
            enc.text("a < b & c")?;
            enc.close("p")
        });

        assert_eq!(html, "<p>a &lt; b &amp; c</p>");
    }

    #[test]
    fn test_void_element_has_no_end_tag() {
        let html = encode(|enc| {
            enc.open_tag("p")?;
            enc.open(&StartTag::new("img").with_attr("src", "a.png"))?;
            enc.close("img")?;
            enc.close("p")
        });

        assert_eq!(html, r#"<p><img src="a.png"></p>"#);
    }

    #[test]
    fn test_close_without_open_is_error() {
        let mut out = Vec::new();
        let mut encoder = Encoder::new(&mut out);

        let err = encoder.close("p").unwrap_err();

        assert!(matches!(
            err,
            ConvertError::Structural(StructuralError::NoOpenTags(_))
        ));
    }

    #[test]
    fn test_mismatched_close_is_error() {
        let mut out = Vec::new();
        let mut encoder = Encoder::new(&mut out);
        encoder.open_tag("div").unwrap();

        let err = encoder.close("span").unwrap_err();

        assert!(matches!(
            err,
            ConvertError::Structural(StructuralError::MismatchedEnd { .. })
        ));
    }

    #[test]
    fn test_content_in_void_is_error() {
        let mut out = Vec::new();
        let mut encoder = Encoder::new(&mut out);
        encoder.open_tag("br").unwrap();

        assert!(encoder.text("x").is_err());
        assert!(encoder.comment("x").is_err());
        encoder.close("br").unwrap();
        assert!(encoder.text("x").is_ok());
    }

    #[test]
    fn test_depth_tracks_stack() {
        let mut out = Vec::new();
        let mut encoder = Encoder::new(&mut out);

        encoder.open_tag("div").unwrap();
        encoder.open_tag("p").unwrap();
        assert_eq!(encoder.depth(), 2);
        assert_eq!(encoder.stack(), ["div".to_owned(), "p".to_owned()]);
        encoder.close("p").unwrap();
        encoder.close("div").unwrap();
        assert_eq!(encoder.depth(), 0);
    }

    #[test]
    fn test_buffer_flushes_past_threshold() {
        let mut out = Vec::new();
        {
            let mut encoder = Encoder::new(&mut out);
            encoder.open_tag("p").unwrap();
            encoder.text(&"x".repeat(FLUSH_THRESHOLD)).unwrap();
        }

        assert_eq!(out.len(), FLUSH_THRESHOLD + 3);
    }

    #[test]
    fn test_small_output_stays_buffered_until_flush() {
        let mut out = Vec::new();
        let mut encoder = Encoder::new(&mut out);
        encoder.open_tag("p").unwrap();
        encoder.close("p").unwrap();
        encoder.flush().unwrap();
        drop(encoder);

        assert_eq!(out, b"<p></p>".to_vec());
    }

    #[test]
    fn test_comment() {
        let html = encode(|enc| enc.comment(" note "));

        assert_eq!(html, "<!-- note -->");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
    }
}
