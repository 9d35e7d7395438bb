//! Topic and map document models.
//!
//! Documents are decoded into the renderer's buffered [`Element`] tree, then
//! the parts the index needs are picked out. Topic bodies and short
//! descriptions stay as element trees and are replayed through the
//! conversion dispatcher later.

use dita_renderer::{Element, Node, Token, TokenSource, XmlTokenStream, read_element};

use crate::error::LoadError;

/// Which relations a group of sibling map entries generates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CollectionType {
    /// Parent and child links only.
    #[default]
    Unordered,
    /// Parent, child and sibling links.
    Family,
    /// Parent, child and previous/next links.
    Sequence,
}

impl CollectionType {
    /// Parse a `collection-type` attribute; empty means inherit.
    #[must_use]
    pub fn from_attr(value: &str) -> Option<Self> {
        match value {
            "" => None,
            "family" => Some(Self::Family),
            "sequence" => Some(Self::Sequence),
            _ => Some(Self::Unordered),
        }
    }
}

/// Whether an entry may be the source and/or target of generated links.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Linking {
    /// Source and target.
    #[default]
    Normal,
    /// Neither source nor target.
    None,
    /// Source only.
    SourceOnly,
    /// Target only.
    TargetOnly,
}

impl Linking {
    /// Parse a `linking` attribute; empty means inherit.
    #[must_use]
    pub fn from_attr(value: &str) -> Option<Self> {
        match value {
            "" => None,
            "none" => Some(Self::None),
            "sourceonly" | "source-only" => Some(Self::SourceOnly),
            "targetonly" | "target-only" => Some(Self::TargetOnly),
            _ => Some(Self::Normal),
        }
    }

    /// Whether an entry with this mode may carry generated links.
    #[must_use]
    pub fn can_link_from(self) -> bool {
        !matches!(self, Self::None | Self::TargetOnly)
    }

    /// Whether generated links may point at an entry with this mode.
    #[must_use]
    pub fn can_link_to(self) -> bool {
        !matches!(self, Self::None | Self::SourceOnly)
    }
}

/// `othermeta` name/content pair from a topic prolog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtherMeta {
    /// Metadata name.
    pub name: String,
    /// Metadata value.
    pub content: String,
}

/// Topic prolog metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Prolog {
    /// Index terms; nested terms are joined with `:`.
    pub keywords: Vec<String>,
    /// Additional name/value metadata.
    pub other_meta: Vec<OtherMeta>,
}

/// Entry of a topic's `related-links` section.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelatedLink {
    /// Link target.
    pub href: String,
    /// `format` attribute.
    pub format: String,
    /// `scope` attribute.
    pub scope: String,
    /// `type` attribute (concept, task, ...).
    pub kind: String,
    /// `linktext` content.
    pub text: String,
}

/// Parsed topic document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TopicDocument {
    /// Root element name (`topic`, `concept`, `task`, ...).
    pub kind: String,
    /// Root `id` attribute.
    pub id: String,
    /// Title text.
    pub title: String,
    /// `titlealts/navtitle` text.
    pub nav_title: String,
    /// Short description markup.
    pub short_desc: Option<Element>,
    /// Short description as plain text.
    pub synopsis: String,
    /// Prolog metadata.
    pub prolog: Prolog,
    /// Declared related links.
    pub related_links: Vec<RelatedLink>,
    /// Direct children whose name contains `body`, in document order.
    pub bodies: Vec<Element>,
}

impl TopicDocument {
    /// Parse a topic from raw bytes.
    pub fn parse(data: &[u8], path: &str) -> Result<Self, LoadError> {
        Ok(Self::from_element(&parse_root(data, path)?))
    }

    /// Extract the topic model from a decoded root element.
    #[must_use]
    pub fn from_element(root: &Element) -> Self {
        let short_desc = root.child("shortdesc").cloned();
        let synopsis = short_desc
            .as_ref()
            .map(|desc| normalize_space(&desc.text()))
            .unwrap_or_default();

        Self {
            kind: root.name().to_owned(),
            id: root.attr("id").to_owned(),
            title: child_text(root, "title"),
            nav_title: root
                .child("titlealts")
                .map(|alts| child_text(alts, "navtitle"))
                .unwrap_or_default(),
            short_desc,
            synopsis,
            prolog: root.child("prolog").map(parse_prolog).unwrap_or_default(),
            related_links: root
                .child("related-links")
                .map(|links| links.elements_named("link").map(parse_related_link).collect())
                .unwrap_or_default(),
            bodies: root
                .elements()
                .filter(|e| e.name().contains("body"))
                .cloned()
                .collect(),
        }
    }
}

fn parse_prolog(prolog: &Element) -> Prolog {
    let mut result = Prolog::default();
    for metadata in prolog.elements_named("metadata") {
        for keywords in metadata.elements_named("keywords") {
            for term in keywords.elements_named("indexterm") {
                index_terms(term, "", &mut result.keywords);
            }
        }
        for meta in metadata.elements_named("othermeta") {
            result.other_meta.push(OtherMeta {
                name: meta.attr("name").to_owned(),
                content: meta.attr("content").to_owned(),
            });
        }
    }
    result
}

/// Flatten nested index terms into `outer:inner` strings, leaves only.
fn index_terms(term: &Element, prefix: &str, out: &mut Vec<String>) {
    let own = normalize_space(&own_text(term));
    let name = if prefix.is_empty() {
        own
    } else {
        format!("{prefix}:{own}")
    };

    let mut nested = term.elements_named("indexterm").peekable();
    if nested.peek().is_none() {
        out.push(name);
        return;
    }
    for child in nested {
        index_terms(child, &name, out);
    }
}

fn parse_related_link(link: &Element) -> RelatedLink {
    RelatedLink {
        href: link.attr("href").to_owned(),
        format: link.attr("format").to_owned(),
        scope: link.attr("scope").to_owned(),
        kind: link.attr("type").to_owned(),
        text: child_text(link, "linktext"),
    }
}

/// Node of a navigation map.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapNode {
    /// Element name (`map`, `topicref`, `mapref`, `reltable`, ...).
    pub name: String,
    /// `<title>` child, falling back to `topicmeta/navtitle`.
    pub title: String,
    /// `navtitle` attribute.
    pub nav_title: String,
    /// `href` attribute as written.
    pub href: String,
    /// Space-separated `keys` attribute.
    pub keys: String,
    /// `type` attribute.
    pub kind: String,
    /// `collection-type`, `None` when absent.
    pub coll_type: Option<CollectionType>,
    /// `linking`, `None` when absent.
    pub linking: Option<Linking>,
    /// `format` attribute.
    pub format: String,
    /// `toc` attribute (`yes`/`no`/empty).
    pub toc: String,
    /// Whether `locktitle="yes"`.
    pub lock_title: bool,
    /// `audience` attribute.
    pub audience: String,
    /// `print` attribute.
    pub print: String,
    /// `deliveryTarget` attribute.
    pub delivery_target: String,
    /// Child nodes, without `title` and `topicmeta`.
    pub children: Vec<MapNode>,
}

impl MapNode {
    /// Parse a map from raw bytes.
    pub fn parse(data: &[u8], path: &str) -> Result<Self, LoadError> {
        Ok(Self::from_element(&parse_root(data, path)?))
    }

    /// Build the node tree from a decoded element.
    #[must_use]
    pub fn from_element(element: &Element) -> Self {
        let mut title = child_text(element, "title");
        if title.is_empty()
            && let Some(meta) = element.child("topicmeta")
        {
            title = child_text(meta, "navtitle");
        }

        Self {
            name: element.name().to_owned(),
            title,
            nav_title: element.attr("navtitle").to_owned(),
            href: element.attr("href").to_owned(),
            keys: element.attr("keys").to_owned(),
            kind: element.attr("type").to_owned(),
            coll_type: CollectionType::from_attr(element.attr("collection-type")),
            linking: Linking::from_attr(element.attr("linking")),
            format: element.attr("format").to_owned(),
            toc: element.attr("toc").to_owned(),
            lock_title: element.attr("locktitle") == "yes",
            audience: element.attr("audience").to_owned(),
            print: element.attr("print").to_owned(),
            delivery_target: element.attr("deliveryTarget").to_owned(),
            children: element
                .elements()
                .filter(|child| !matches!(child.name(), "title" | "topicmeta"))
                .map(Self::from_element)
                .collect(),
        }
    }
}

/// Decode a document and return its root element.
fn parse_root(data: &[u8], path: &str) -> Result<Element, LoadError> {
    let parse_error = |source| LoadError::Parse {
        path: path.to_owned(),
        source,
    };

    let mut stream = XmlTokenStream::from_bytes(data, path).map_err(parse_error)?;
    while let Some(token) = stream.next_token().map_err(parse_error)? {
        if let Token::Start(start) = token {
            return read_element(&mut stream, start).map_err(parse_error);
        }
    }
    Err(LoadError::NoRoot {
        path: path.to_owned(),
    })
}

fn child_text(element: &Element, name: &str) -> String {
    element
        .child(name)
        .map(|child| normalize_space(&child.text()))
        .unwrap_or_default()
}

/// Text directly inside an element, without descendants.
fn own_text(element: &Element) -> String {
    element
        .children
        .iter()
        .filter_map(|node| match node {
            Node::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// Collapse runs of whitespace to single spaces and trim.
pub(crate) fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const TOPIC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE task PUBLIC "-//OASIS//DTD DITA Task//EN" "task.dtd">
<task id="install">
  <title>Installing the
    agent</title>
  <titlealts><navtitle>Install</navtitle></titlealts>
  <shortdesc>Set up the <b>agent</b> on a host.</shortdesc>
  <prolog><metadata>
    <keywords><indexterm>agent<indexterm>install</indexterm><indexterm>upgrade</indexterm></indexterm><indexterm>setup</indexterm></keywords>
    <othermeta name="product" content="Agent"/>
  </metadata></prolog>
  <taskbody><steps><step><cmd>Run it.</cmd></step></steps></taskbody>
  <related-links>
    <link href="concepts/agent.dita" type="concept"><linktext>About the agent</linktext></link>
    <link href="https://example.com" scope="external" format="html"/>
  </related-links>
</task>"#;

    #[test]
    fn test_parse_topic() {
        let topic = TopicDocument::parse(TOPIC.as_bytes(), "install.dita").unwrap();

        assert_eq!(topic.kind, "task");
        assert_eq!(topic.id, "install");
        assert_eq!(topic.title, "Installing the agent");
        assert_eq!(topic.nav_title, "Install");
        assert_eq!(topic.synopsis, "Set up the agent on a host.");
        assert_eq!(topic.bodies.len(), 1);
        assert_eq!(topic.bodies[0].name(), "taskbody");
    }

    #[test]
    fn test_parse_prolog_keywords_and_meta() {
        let topic = TopicDocument::parse(TOPIC.as_bytes(), "install.dita").unwrap();

        assert_eq!(
            topic.prolog.keywords,
            vec!["agent:install", "agent:upgrade", "setup"]
        );
        assert_eq!(
            topic.prolog.other_meta,
            vec![OtherMeta {
                name: "product".to_owned(),
                content: "Agent".to_owned()
            }]
        );
    }

    #[test]
    fn test_parse_related_links() {
        let topic = TopicDocument::parse(TOPIC.as_bytes(), "install.dita").unwrap();

        assert_eq!(topic.related_links.len(), 2);
        assert_eq!(topic.related_links[0].href, "concepts/agent.dita");
        assert_eq!(topic.related_links[0].kind, "concept");
        assert_eq!(topic.related_links[0].text, "About the agent");
        assert_eq!(topic.related_links[1].scope, "external");
    }

    #[test]
    fn test_multiple_bodies_are_kept_in_order() {
        let topic = TopicDocument::parse(
            br#"<topic id="t"><title>T</title><body>a</body><conbody>b</conbody></topic>"#,
            "t.dita",
        )
        .unwrap();

        let names: Vec<_> = topic.bodies.iter().map(Element::name).collect();
        assert_eq!(names, vec!["body", "conbody"]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            TopicDocument::parse(b"<topic><title>x</topic>", "bad.dita"),
            Err(LoadError::Parse { .. })
        ));
        assert!(matches!(
            TopicDocument::parse(b"<?xml version=\"1.0\"?>", "empty.dita"),
            Err(LoadError::NoRoot { .. })
        ));
    }

    #[test]
    fn test_parse_map() {
        let map = MapNode::parse(
            br#"<map title="ignored">
  <title>Guide</title>
  <topicref href="a.dita" navtitle="A" collection-type="sequence" linking="targetonly" toc="no">
    <topicmeta><navtitle>Meta A</navtitle></topicmeta>
    <topicref href="a1.dita" locktitle="yes" deliveryTarget="KB F1"/>
  </topicref>
  <topicgroup><topicref href="b.dita" type="concept" keys="bee"/></topicgroup>
</map>"#,
            "guide.ditamap",
        )
        .unwrap();

        assert_eq!(map.name, "map");
        assert_eq!(map.title, "Guide");
        assert_eq!(map.children.len(), 2);

        let a = &map.children[0];
        assert_eq!(a.nav_title, "A");
        assert_eq!(a.title, "Meta A");
        assert_eq!(a.coll_type, Some(CollectionType::Sequence));
        assert_eq!(a.linking, Some(Linking::TargetOnly));
        assert_eq!(a.toc, "no");
        assert_eq!(a.children.len(), 1);
        assert!(a.children[0].lock_title);
        assert_eq!(a.children[0].delivery_target, "KB F1");

        let b = &map.children[1].children[0];
        assert_eq!(b.kind, "concept");
        assert_eq!(b.keys, "bee");
        assert_eq!(b.coll_type, None);
    }

    #[test]
    fn test_linking_predicates() {
        assert!(Linking::Normal.can_link_from() && Linking::Normal.can_link_to());
        assert!(!Linking::None.can_link_from() && !Linking::None.can_link_to());
        assert!(Linking::SourceOnly.can_link_from() && !Linking::SourceOnly.can_link_to());
        assert!(!Linking::TargetOnly.can_link_from() && Linking::TargetOnly.can_link_to());
    }

    #[test]
    fn test_attribute_parsing() {
        assert_eq!(CollectionType::from_attr(""), None);
        assert_eq!(CollectionType::from_attr("family"), Some(CollectionType::Family));
        assert_eq!(CollectionType::from_attr("choice"), Some(CollectionType::Unordered));
        assert_eq!(Linking::from_attr("source-only"), Some(Linking::SourceOnly));
        assert_eq!(Linking::from_attr("normal"), Some(Linking::Normal));
    }
}
