//! HTML output helpers.
//!
//! Render the navigation tree, the related links of a topic and the page
//! shell around converted topic content. All hrefs are relative to the page
//! being written.

use std::fmt::Write;

use dita_renderer::{escape_html, html_path};
use dita_storage::path;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::index::{DocumentIndex, EntryId, TopicId};
use crate::linking::{Link, LinkTarget};
use crate::model::CollectionType;

/// Characters kept as-is in local hrefs.
const HREF: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/')
    .remove(b'#');

/// Output file of the table of contents.
pub const TOC_FILE: &str = "_toc.html";

/// Order of sibling link groups.
const KIND_ORDER: [&str; 5] = ["tutorial", "concept", "task", "reference", "information"];

fn kind_class(kind: &str) -> &'static str {
    match kind {
        "tutorial" | "concept" => "relconcepts",
        "task" => "reltasks",
        "reference" => "relref",
        _ => "",
    }
}

/// Href from page `from` to the page of topic `to`.
fn topic_href(from: &str, to: &str, fragment: Option<&str>) -> String {
    let mut href = path::relative_path(from, &html_path(to));
    if let Some(fragment) = fragment {
        href.push('#');
        href.push_str(path::base(fragment));
    }
    utf8_percent_encode(&href, HREF).to_string()
}

/// Navigation tree as nested lists.
///
/// Entries with `toc="no"` are left out together with their children.
/// `page` is the path of the page the list is embedded in.
#[must_use]
pub fn toc_html(index: &DocumentIndex, page: &str) -> String {
    let mut out = String::from(r#"<ul class="toc">"#);
    for &child in &index.entry(index.nav()).children {
        toc_entry(index, child, page, &mut out);
    }
    out.push_str("</ul>");
    out
}

fn toc_entry(index: &DocumentIndex, id: EntryId, page: &str, out: &mut String) {
    let entry = index.entry(id);
    if !entry.toc {
        return;
    }

    match entry.topic {
        Some(topic) => {
            let href = topic_href(page, &index.topic(topic).path, None);
            let _ = write!(
                out,
                r#"<li><a href="{href}">{}</a>"#,
                escape_html(&entry.title)
            );
        }
        None => {
            let _ = write!(out, "<li>{}", escape_html(&entry.title));
        }
    }

    if entry.children.iter().any(|&child| index.entry(child).toc) {
        out.push_str("<ul>");
        for &child in &entry.children {
            toc_entry(index, child, page, out);
        }
        out.push_str("</ul>");
    }
    out.push_str("</li>");
}

/// Stand-alone table of contents page.
#[must_use]
pub fn render_toc_page(index: &DocumentIndex) -> String {
    let mut out = String::from("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">");
    out.push_str("<title>Contents</title><base target=\"dynamic\"></head><body>");
    out.push_str(&toc_html(index, TOC_FILE));
    out.push_str("</body></html>\n");
    out
}

/// Anchor for a link found on the page of topic `from`.
fn link_anchor(index: &DocumentIndex, from: &str, link: &Link, with_synopsis: bool) -> String {
    let title = escape_html(&link.title);
    match &link.target {
        LinkTarget::External(url) => format!(
            r#"<a href="{}" class="external-link" target="_blank" rel="nofollow">{title}</a>"#,
            escape_html(url)
        ),
        LinkTarget::Topic { id, fragment } => {
            let topic = index.topic(*id);
            if topic.is_placeholder() {
                return format!(r#"<span class="broken-link">{title}</span>"#);
            }
            let href = topic_href(from, &topic.path, fragment.as_deref());
            if with_synopsis && !topic.synopsis.is_empty() {
                format!(
                    r#"<a href="{href}" title="{}">{title}</a>"#,
                    escape_html(&topic.synopsis)
                )
            } else {
                format!(r#"<a href="{href}">{title}</a>"#)
            }
        }
    }
}

/// Related links section of a topic page.
///
/// Child lists come first (ordered for sequences), then the
/// parent/previous/next block, then sibling links grouped by target kind.
/// Returns an empty string when the topic has no relation.
#[must_use]
pub fn related_links_html(index: &DocumentIndex, id: TopicId) -> String {
    let topic = index.topic(id);
    if topic.link_sets.iter().all(|set| set.is_empty()) {
        return String::new();
    }
    let from = topic.path.as_str();
    let mut out = String::from(r#"<div class="related-links">"#);

    for set in topic.link_sets.iter().filter(|set| !set.children.is_empty()) {
        let list = if set.coll_type == CollectionType::Sequence {
            "ol"
        } else {
            "ul"
        };
        let _ = write!(out, r#"<{list} class="ullinks">"#);
        for link in &set.children {
            out.push_str(r#"<li class="ulchildlink">"#);
            out.push_str(&link_anchor(index, from, link, false));
            if let Some(target) = link.topic()
                && !index.topic(target).synopsis.is_empty()
            {
                let _ = write!(out, "<p>{}</p>", escape_html(&index.topic(target).synopsis));
            }
            out.push_str("</li>");
        }
        let _ = write!(out, "</{list}>");
    }

    let family: Vec<_> = topic
        .link_sets
        .iter()
        .filter(|set| set.parent.is_some() || set.prev.is_some() || set.next.is_some())
        .collect();
    if !family.is_empty() {
        out.push_str(r#"<div class="familylinks">"#);
        for set in family {
            let rows = [
                ("parentlink", "Parent topic", &set.parent),
                ("previouslink", "Previous topic", &set.prev),
                ("nextlink", "Next topic", &set.next),
            ];
            for (class, label, link) in rows {
                if let Some(link) = link {
                    let _ = write!(
                        out,
                        r#"<div class="{class}"><strong>{label}: </strong>{}</div>"#,
                        link_anchor(index, from, link, true)
                    );
                }
            }
        }
        out.push_str("</div>");
    }

    let mut grouped: Vec<Vec<&Link>> = vec![Vec::new(); KIND_ORDER.len()];
    for link in topic.link_sets.iter().flat_map(|set| &set.siblings) {
        let group = KIND_ORDER
            .iter()
            .position(|kind| *kind == link.kind)
            .unwrap_or(KIND_ORDER.len() - 1);
        grouped[group].push(link);
    }
    for (kind, links) in KIND_ORDER.iter().zip(grouped) {
        if links.is_empty() {
            continue;
        }
        if *kind == "information" {
            out.push_str(r#"<div class="relinfo"><strong>Related information</strong>"#);
        } else {
            let plural = if links.len() > 1 { "s" } else { "" };
            let _ = write!(
                out,
                r#"<div class="relinfo {}"><strong>Related {kind}{plural}</strong>"#,
                kind_class(kind)
            );
        }
        for link in links {
            let _ = write!(out, "<div>{}</div>", link_anchor(index, from, link, true));
        }
        out.push_str("</div>");
    }

    out.push_str("</div>");
    out
}

/// Complete HTML page for a converted topic.
///
/// Prolog keywords and other metadata become `<meta>` elements.
#[must_use]
pub fn render_page(index: &DocumentIndex, id: TopicId, content: &str) -> String {
    let topic = index.topic(id);
    let mut out = String::from("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">");
    let _ = write!(out, "<title>{}</title>", escape_html(&topic.title));

    let mut body_id = "";
    if let Some(document) = &topic.document {
        body_id = document.id.as_str();
        if !document.prolog.keywords.is_empty() {
            let _ = write!(
                out,
                r#"<meta name="keywords" content="{}">"#,
                escape_html(&document.prolog.keywords.join(","))
            );
        }
        for meta in &document.prolog.other_meta {
            let _ = write!(
                out,
                r#"<meta name="{}" content="{}">"#,
                escape_html(&meta.name),
                escape_html(&meta.content)
            );
        }
    }
    out.push_str("</head>");

    if body_id.is_empty() {
        out.push_str("<body>");
    } else {
        let _ = write!(out, r#"<body id="{}">"#, escape_html(body_id));
    }
    let _ = write!(
        out,
        r#"<h1>{}</h1><div class="body">{content}</div>"#,
        escape_html(&topic.title)
    );
    out.push_str(&related_links_html(index, id));
    out.push_str("</body></html>\n");
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dita_storage::MockStorage;
    use pretty_assertions::assert_eq;

    use super::*;

    fn load(storage: MockStorage) -> DocumentIndex {
        let mut index = DocumentIndex::new(Arc::new(storage));
        index.load_map("index.ditamap").unwrap();
        index
    }

    fn topic(name: &str) -> String {
        format!(r#"<topic id="{name}"><title>{}</title><shortdesc>About {name}.</shortdesc></topic>"#, name.to_uppercase())
    }

    #[test]
    fn test_topic_href() {
        assert_eq!(topic_href("guide/a.dita", "guide/b.dita", None), "b.html");
        assert_eq!(
            topic_href("guide/a.dita", "api/my ref.dita", Some("t/s1")),
            "../api/my%20ref.html#s1"
        );
    }

    #[test]
    fn test_toc_html() {
        let index = load(
            MockStorage::new()
                .with_file(
                    "index.ditamap",
                    r#"<map><topicref href="guide/a.dita"><topicref href="guide/b.dita"/><topicref href="c.dita" toc="no"/></topicref><topichead navtitle="Misc &amp; more"/></map>"#,
                )
                .with_file("guide/a.dita", topic("a"))
                .with_file("guide/b.dita", topic("b"))
                .with_file("c.dita", topic("c")),
        );

        assert_eq!(
            toc_html(&index, TOC_FILE),
            concat!(
                r#"<ul class="toc"><li><a href="guide/a.html">A</a>"#,
                r#"<ul><li><a href="guide/b.html">B</a></li></ul></li>"#,
                r#"<li>Misc &amp; more</li></ul>"#,
            )
        );
    }

    #[test]
    fn test_related_links_sequence() {
        let index = load(
            MockStorage::new()
                .with_file(
                    "index.ditamap",
                    r#"<map><topicref href="p.dita" collection-type="sequence"><topicref href="a.dita"/><topicref href="b.dita"/></topicref></map>"#,
                )
                .with_file("p.dita", topic("p"))
                .with_file("a.dita", topic("a"))
                .with_file("b.dita", topic("b")),
        );

        let p = index.find_topic("p.dita").unwrap();
        assert_eq!(
            related_links_html(&index, p),
            concat!(
                r#"<div class="related-links"><ol class="ullinks">"#,
                r#"<li class="ulchildlink"><a href="a.html">A</a><p>About a.</p></li>"#,
                r#"<li class="ulchildlink"><a href="b.html">B</a><p>About b.</p></li>"#,
                r#"</ol></div>"#,
            )
        );

        let b = index.find_topic("b.dita").unwrap();
        assert_eq!(
            related_links_html(&index, b),
            concat!(
                r#"<div class="related-links"><div class="familylinks">"#,
                r#"<div class="parentlink"><strong>Parent topic: </strong><a href="p.html" title="About p.">P</a></div>"#,
                r#"<div class="previouslink"><strong>Previous topic: </strong><a href="a.html" title="About a.">A</a></div>"#,
                r#"</div></div>"#,
            )
        );
    }

    #[test]
    fn test_related_links_grouped_by_kind() {
        let index = load(
            MockStorage::new()
                .with_file(
                    "index.ditamap",
                    r#"<map><topicref href="a.dita"/></map>"#,
                )
                .with_file(
                    "a.dita",
                    r#"<topic id="a"><title>A</title><related-links>
<link href="t1.dita"/><link href="t2.dita"/><link href="r.dita"/>
<link href="https://example.com/?q=1&amp;x=2" scope="external"><linktext>Site</linktext></link>
<link href="gone.dita"><linktext>Gone</linktext></link>
</related-links></topic>"#,
                )
                .with_file("t1.dita", r#"<task id="t1"><title>T1</title></task>"#)
                .with_file("t2.dita", r#"<task id="t2"><title>T2</title></task>"#)
                .with_file("r.dita", r#"<reference id="r"><title>R</title></reference>"#),
        );

        let a = index.find_topic("a.dita").unwrap();
        assert_eq!(
            related_links_html(&index, a),
            concat!(
                r#"<div class="related-links">"#,
                r#"<div class="relinfo reltasks"><strong>Related tasks</strong>"#,
                r#"<div><a href="t1.html">T1</a></div><div><a href="t2.html">T2</a></div></div>"#,
                r#"<div class="relinfo relref"><strong>Related reference</strong>"#,
                r#"<div><a href="r.html">R</a></div></div>"#,
                r#"<div class="relinfo"><strong>Related information</strong>"#,
                r#"<div><a href="https://example.com/?q=1&amp;x=2" class="external-link" target="_blank" rel="nofollow">Site</a></div>"#,
                r#"<div><span class="broken-link">Gone</span></div></div>"#,
                r#"</div>"#,
            )
        );
    }

    #[test]
    fn test_no_relations_render_nothing() {
        let index = load(
            MockStorage::new()
                .with_file("index.ditamap", r#"<map><topicref href="a.dita"/></map>"#)
                .with_file("a.dita", topic("a")),
        );

        assert_eq!(related_links_html(&index, index.find_topic("a.dita").unwrap()), "");
    }

    #[test]
    fn test_render_page() {
        let index = load(
            MockStorage::new()
                .with_file("index.ditamap", r#"<map><topicref href="a.dita"/></map>"#)
                .with_file(
                    "a.dita",
                    r#"<topic id="a"><title>A &lt;1&gt;</title><prolog><metadata>
<keywords><indexterm>x<indexterm>y</indexterm></indexterm></keywords>
<othermeta name="product" content="Tool"/></metadata></prolog><body/></topic>"#,
                ),
        );

        let page = render_page(&index, index.find_topic("a.dita").unwrap(), "<p>hi</p>");

        assert_eq!(
            page,
            concat!(
                "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>A &lt;1&gt;</title>",
                r#"<meta name="keywords" content="x:y"><meta name="product" content="Tool">"#,
                r#"</head><body id="a"><h1>A &lt;1&gt;</h1><div class="body"><p>hi</p></div>"#,
                "</body></html>\n",
            )
        );
    }
}
