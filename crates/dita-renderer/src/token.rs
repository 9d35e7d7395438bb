//! Structural token stream over DITA XML.
//!
//! [`XmlTokenStream`] decodes a document with `quick-xml` into a lazy
//! sequence of [`Token`]s. Self-closing elements are reported as a start
//! token followed by an end token, so consumers only ever see balanced
//! start/end pairs. Element and attribute names are namespace-local.
//!
//! [`ReplayStream`] replays already-collected tokens, which lets custom
//! processors buffer a subtree ([`read_element`]) and feed parts of it back
//! through the dispatcher.

use std::collections::VecDeque;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::ConvertError;

/// A single name/value attribute of a start tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    /// Local attribute name.
    pub name: String,
    /// Unescaped attribute value.
    pub value: String,
}

/// Start tag with its attributes in document order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StartTag {
    /// Local element name.
    pub name: String,
    /// Attributes in document order.
    pub attrs: Vec<Attribute>,
}

impl StartTag {
    /// Create a start tag without attributes.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
        }
    }

    /// Builder form of [`set_attr`](Self::set_attr).
    #[must_use]
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Attribute value, or empty string when absent.
    #[must_use]
    pub fn attr(&self, name: &str) -> &str {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map_or("", |a| a.value.as_str())
    }

    /// The `id` attribute, or empty string.
    #[must_use]
    pub fn id(&self) -> &str {
        self.attr("id")
    }

    /// Set an attribute in place, appending it if absent.
    ///
    /// An empty value removes the attribute.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        let position = self.attrs.iter().position(|a| a.name == name);
        match (position, value.is_empty()) {
            (Some(i), true) => {
                self.attrs.remove(i);
            }
            (Some(i), false) => self.attrs[i].value = value,
            (None, true) => {}
            (None, false) => self.attrs.push(Attribute {
                name: name.to_owned(),
                value,
            }),
        }
    }

    /// Remove an attribute and return its value (empty when absent).
    pub fn take_attr(&mut self, name: &str) -> String {
        match self.attrs.iter().position(|a| a.name == name) {
            Some(i) => self.attrs.remove(i).value,
            None => String::new(),
        }
    }
}

/// One structural token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// Opening tag.
    Start(StartTag),
    /// Closing tag (local name).
    End(String),
    /// Character data with entities already decoded.
    Text(String),
    /// Comment body.
    Comment(String),
    /// `<?...?>` including the XML declaration.
    ProcessingInstruction,
    /// `<!DOCTYPE ...>` and similar.
    Directive,
}

/// Lazy source of tokens.
///
/// `Ok(None)` marks the end of the stream.
pub trait TokenSource {
    /// Read the next token.
    fn next_token(&mut self) -> Result<Option<Token>, ConvertError>;

    /// Discard the rest of the element whose start token was just read,
    /// including its matching end token.
    fn skip(&mut self) -> Result<(), ConvertError> {
        let mut depth = 0usize;
        while let Some(token) = self.next_token()? {
            match token {
                Token::Start(_) => depth += 1,
                Token::End(_) if depth == 0 => return Ok(()),
                Token::End(_) => depth -= 1,
                _ => {}
            }
        }
        Ok(())
    }
}

/// Token stream decoding an XML document or fragment.
pub struct XmlTokenStream<'a> {
    reader: Reader<&'a [u8]>,
    pending_end: Option<String>,
}

impl<'a> XmlTokenStream<'a> {
    /// Create a stream over XML text.
    ///
    /// The text may be a fragment with several top-level nodes.
    #[must_use]
    pub fn new(content: &'a str) -> Self {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(false);
        Self {
            reader,
            pending_end: None,
        }
    }

    /// Create a stream over raw document bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Utf8`] if the bytes are not UTF-8.
    pub fn from_bytes(data: &'a [u8], path: &str) -> Result<Self, ConvertError> {
        let content = std::str::from_utf8(data).map_err(|source| ConvertError::Utf8 {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self::new(content))
    }

    fn decode_name(&self, name: &[u8]) -> String {
        self.reader.decoder().decode(name).map_or_else(
            |_| String::from_utf8_lossy(name).into_owned(),
            std::borrow::Cow::into_owned,
        )
    }

    fn start_tag(&self, e: &BytesStart<'_>) -> Result<StartTag, ConvertError> {
        let mut tag = StartTag::new(self.decode_name(e.local_name().as_ref()));
        for attr in e.attributes() {
            let attr = attr?;
            // Skip namespace declarations
            if attr.key.as_ref().starts_with(b"xmlns") {
                continue;
            }
            let value = attr.unescape_value().map_or_else(
                |_| String::from_utf8_lossy(&attr.value).into_owned(),
                std::borrow::Cow::into_owned,
            );
            tag.attrs.push(Attribute {
                name: self.decode_name(attr.key.local_name().as_ref()),
                value,
            });
        }
        Ok(tag)
    }
}

impl TokenSource for XmlTokenStream<'_> {
    fn next_token(&mut self) -> Result<Option<Token>, ConvertError> {
        if let Some(name) = self.pending_end.take() {
            return Ok(Some(Token::End(name)));
        }

        let token = match self.reader.read_event()? {
            Event::Start(e) => Token::Start(self.start_tag(&e)?),
            Event::Empty(e) => {
                let tag = self.start_tag(&e)?;
                self.pending_end = Some(tag.name.clone());
                Token::Start(tag)
            }
            Event::End(e) => Token::End(self.decode_name(e.local_name().as_ref())),
            Event::Text(e) => Token::Text(self.reader.decoder().decode(&e)?.into_owned()),
            Event::GeneralRef(e) => {
                let entity = self.reader.decoder().decode(&e)?;
                Token::Text(decode_entity(&entity))
            }
            Event::CData(e) => Token::Text(String::from_utf8_lossy(&e).into_owned()),
            Event::Comment(e) => Token::Comment(self.reader.decoder().decode(&e)?.into_owned()),
            Event::Decl(_) | Event::PI(_) => Token::ProcessingInstruction,
            Event::DocType(_) => Token::Directive,
            Event::Eof => return Ok(None),
        };
        Ok(Some(token))
    }
}

/// Token stream replaying buffered tokens.
#[derive(Debug, Default)]
pub struct ReplayStream {
    tokens: VecDeque<Token>,
}

impl ReplayStream {
    /// Create a stream over the given tokens.
    pub fn new(tokens: impl IntoIterator<Item = Token>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }
}

impl TokenSource for ReplayStream {
    fn next_token(&mut self) -> Result<Option<Token>, ConvertError> {
        Ok(self.tokens.pop_front())
    }
}

/// Child node of a buffered [`Element`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// Nested element.
    Element(Element),
    /// Character data.
    Text(String),
    /// Comment body.
    Comment(String),
}

/// Buffered element subtree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    /// Start tag of the element.
    pub start: StartTag,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

impl Element {
    /// Element name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.start.name
    }

    /// Attribute value, or empty string when absent.
    #[must_use]
    pub fn attr(&self, name: &str) -> &str {
        self.start.attr(name)
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Child elements with the given name.
    pub fn elements_named<'s, 'n>(
        &'s self,
        name: &'n str,
    ) -> impl Iterator<Item = &'s Element> + use<'s, 'n> {
        self.elements().filter(move |e| e.name() == name)
    }

    /// First child element with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name() == name)
    }

    /// Concatenated text of all descendants.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(e) => e.collect_text(out),
                Node::Comment(_) => {}
            }
        }
    }

    /// Whether the element has child elements or non-blank text.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.children.iter().any(|node| match node {
            Node::Element(_) => true,
            Node::Text(text) => !text.trim().is_empty(),
            Node::Comment(_) => false,
        })
    }

    /// Tokens of the children, without the element's own start and end.
    #[must_use]
    pub fn content_tokens(&self) -> Vec<Token> {
        let mut tokens = Vec::new();
        for node in &self.children {
            node.push_tokens(&mut tokens);
        }
        tokens
    }
}

impl Node {
    fn push_tokens(&self, out: &mut Vec<Token>) {
        match self {
            Self::Text(text) => out.push(Token::Text(text.clone())),
            Self::Comment(text) => out.push(Token::Comment(text.clone())),
            Self::Element(e) => {
                out.push(Token::Start(e.start.clone()));
                for child in &e.children {
                    child.push_tokens(out);
                }
                out.push(Token::End(e.start.name.clone()));
            }
        }
    }
}

/// Buffer the subtree of an element whose start tag was just read.
///
/// Consumes tokens up to and including the matching end token.
pub fn read_element(
    stream: &mut dyn TokenSource,
    start: StartTag,
) -> Result<Element, ConvertError> {
    let mut element = Element {
        start,
        children: Vec::new(),
    };
    while let Some(token) = stream.next_token()? {
        match token {
            Token::Start(child) => {
                let child = read_element(stream, child)?;
                element.children.push(Node::Element(child));
            }
            Token::End(_) => break,
            Token::Text(text) => element.children.push(Node::Text(text)),
            Token::Comment(text) => element.children.push(Node::Comment(text)),
            Token::ProcessingInstruction | Token::Directive => {}
        }
    }
    Ok(element)
}

/// Advance the stream to the start tag addressed by a slash-separated id path.
///
/// Successive segments are matched case-insensitively against the `id`
/// attributes of start tags in document order. Returns `None` when the
/// stream ends before the full path was matched.
pub fn walk_node_path(
    stream: &mut dyn TokenSource,
    id_path: &str,
) -> Result<Option<StartTag>, ConvertError> {
    let segments: Vec<&str> = id_path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Ok(None);
    }

    let mut matched = 0;
    while let Some(token) = stream.next_token()? {
        if let Token::Start(start) = token
            && eq_fold(start.id(), segments[matched])
        {
            matched += 1;
            if matched == segments.len() {
                return Ok(Some(start));
            }
        }
    }
    Ok(None)
}

/// Case-insensitive string comparison without allocation.
pub(crate) fn eq_fold(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Decode XML and common HTML entity references to their character values.
fn decode_entity(entity: &str) -> String {
    match entity {
        "lt" => "<".to_owned(),
        "gt" => ">".to_owned(),
        "amp" => "&".to_owned(),
        "apos" => "'".to_owned(),
        "quot" => "\"".to_owned(),
        "nbsp" => "\u{a0}".to_owned(),
        "ndash" => "\u{2013}".to_owned(),
        "mdash" => "\u{2014}".to_owned(),
        "hellip" => "\u{2026}".to_owned(),
        "copy" => "\u{a9}".to_owned(),
        "reg" => "\u{ae}".to_owned(),
        "trade" => "\u{2122}".to_owned(),
        // Numeric character references
        s if s.starts_with('#') => {
            let code = if s.starts_with("#x") || s.starts_with("#X") {
                u32::from_str_radix(&s[2..], 16).ok()
            } else {
                s[1..].parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
                .map_or_else(|| format!("&{entity};"), |c| c.to_string())
        }
        // Unknown entity - preserve as-is
        _ => format!("&{entity};"),
    }
}
