//! Map loading.
//!
//! A map is interpreted recursively into navigation [`Entry`] trees. While
//! walking, the loader prunes nodes not meant for web output, registers keys,
//! loads referenced topics and runs the link graph builder on every group of
//! siblings it produced.

use std::time::Instant;

use dita_renderer::DiagnosticKind;
use dita_storage::path;
use percent_encoding::percent_decode_str;

use crate::error::LoadError;
use crate::index::{DocumentIndex, Entry, EntryId, LoadedMap};
use crate::model::{Linking, MapNode};

/// Convert Duration to milliseconds as f64.
fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// State inherited from enclosing map nodes.
#[derive(Clone, Debug)]
struct LoadContext {
    /// Directory hrefs are resolved against.
    dir: String,
    linking: Linking,
    toc: bool,
}

impl LoadContext {
    fn root(map_path: &str) -> Self {
        Self {
            dir: path::dir(map_path).to_owned(),
            linking: Linking::Normal,
            toc: true,
        }
    }
}

impl DocumentIndex {
    /// Load a map and attach its entries below the navigation root.
    ///
    /// Loading is memoized by canonical path: a second call returns the same
    /// entries without reading anything, and maps that include themselves
    /// terminate.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the map itself cannot be read or parsed.
    /// Problems with referenced topics and nested maps are recorded as
    /// diagnostics instead.
    pub fn load_map(&mut self, map_path: &str) -> Result<Vec<EntryId>, LoadError> {
        let start = Instant::now();
        let map_path = path::join("", map_path);
        let first_load = self.map(&map_path).is_none();
        let topics_before = self.topic_count();

        let entries = self.load_map_from(&map_path, &LoadContext::root(&map_path))?;

        if first_load {
            let nav = self.nav();
            self.entries[nav.index()].children.extend(&entries);
            tracing::info!(
                path = %map_path,
                entries = entries.len(),
                topics = self.topic_count() - topics_before,
                maps = self.map_count(),
                diagnostics = self.diagnostics().len(),
                elapsed_ms = elapsed_ms(start),
                "Map loaded"
            );
        }
        Ok(entries)
    }

    fn load_map_from(
        &mut self,
        map_path: &str,
        ctx: &LoadContext,
    ) -> Result<Vec<EntryId>, LoadError> {
        let key = path::canonical(map_path);
        if let Some(map) = self.maps.get(&key) {
            tracing::debug!(path = %map_path, "Map already loaded");
            return Ok(map.entries.clone());
        }

        let source = self.storage().read(map_path)?;
        let root = MapNode::parse(&source.data, map_path)?;

        // Registered before the walk so that self-inclusion sees an empty map.
        self.maps.insert(
            key.clone(),
            LoadedMap {
                path: map_path.to_owned(),
                title: root.title.clone(),
                entries: Vec::new(),
            },
        );

        let ctx = LoadContext {
            dir: path::dir(map_path).to_owned(),
            ..ctx.clone()
        };
        let entries = self.process_node(&root, &ctx);

        if let Some(map) = self.maps.get_mut(&key) {
            map.entries.clone_from(&entries);
        }
        Ok(entries)
    }

    fn process_children(&mut self, node: &MapNode, ctx: &LoadContext) -> Vec<EntryId> {
        let mut entries = Vec::new();
        for child in &node.children {
            entries.extend(self.process_node(child, ctx));
        }
        entries
    }

    fn process_node(&mut self, node: &MapNode, ctx: &LoadContext) -> Vec<EntryId> {
        if !node.format.is_empty()
            || !self
                .audience()
                .is_web_audience(&node.audience, &node.print, &node.delivery_target)
        {
            tracing::trace!(name = %node.name, href = %node.href, "Pruned map node");
            return Vec::new();
        }

        let href = match percent_decode_str(&node.href).decode_utf8() {
            Ok(decoded) => decoded.into_owned(),
            Err(err) => {
                self.report(
                    DiagnosticKind::Validation,
                    &ctx.dir,
                    format!("unable to decode href {}: {err}", node.href),
                );
                node.href.clone()
            }
        };
        let target = (!href.is_empty()).then(|| path::join(&ctx.dir, path::split_fragment(&href).0));

        if let Some(target) = &target {
            for key in node.keys.split_whitespace() {
                self.define_key(key, target);
            }
        }

        let child_ctx = LoadContext {
            dir: ctx.dir.clone(),
            linking: node.linking.unwrap_or(ctx.linking),
            toc: match node.toc.as_str() {
                "yes" => true,
                "no" => false,
                _ => ctx.toc,
            },
        };
        let coll_type = node.coll_type.unwrap_or_default();

        match node.name.as_str() {
            "map" | "topicgroup" => {
                let entries = self.process_children(node, &child_ctx);
                self.add_family_links(None, &entries, coll_type);
                entries
            }
            "mapref" => {
                let Some(target) = target else {
                    return Vec::new();
                };
                match self.load_map_from(&target, &child_ctx) {
                    Ok(entries) => entries,
                    Err(err) => {
                        let kind = if err.is_not_found() {
                            DiagnosticKind::NotFound
                        } else {
                            DiagnosticKind::Validation
                        };
                        self.report(kind, &target, format!("unable to load map: {err}"));
                        Vec::new()
                    }
                }
            }
            "reltable" => {
                let rows: Vec<&MapNode> = node
                    .children
                    .iter()
                    .filter(|row| {
                        row.name == "relrow"
                            && self.audience().is_web_audience(
                                &row.audience,
                                &row.print,
                                &row.delivery_target,
                            )
                    })
                    .collect();
                for row in rows {
                    self.process_rel_row(row, &child_ctx);
                }
                Vec::new()
            }
            "keydef" => Vec::new(),
            _ => vec![self.process_leaf(node, target.as_deref(), &child_ctx)],
        }
    }

    fn process_leaf(&mut self, node: &MapNode, target: Option<&str>, ctx: &LoadContext) -> EntryId {
        let topic = target.map(|target| self.load_topic(target));

        let title = if !node.nav_title.is_empty() {
            node.nav_title.clone()
        } else if let Some(topic) = topic
            && !node.lock_title
            && !self.topic(topic).is_placeholder()
        {
            self.topic(topic).display_title().to_owned()
        } else if !node.title.is_empty() {
            node.title.clone()
        } else {
            topic.map(|topic| self.topic(topic).title.clone()).unwrap_or_default()
        };

        let entry = self.add_entry(Entry {
            title,
            kind: node.kind.clone(),
            coll_type: node.coll_type.unwrap_or_default(),
            linking: ctx.linking,
            toc: ctx.toc,
            topic,
            children: Vec::new(),
        });

        let children = self.process_children(node, ctx);
        self.entries[entry.index()].children.clone_from(&children);
        self.add_family_links(Some(entry), &children, node.coll_type.unwrap_or_default());

        if let Some(topic) = topic {
            self.create_related_links(topic);
        }
        entry
    }

    /// Cross-link the cells of a relationship table row.
    fn process_rel_row(&mut self, row: &MapNode, ctx: &LoadContext) {
        let cells: Vec<Vec<EntryId>> = row
            .children
            .iter()
            .filter(|cell| cell.name == "relcell")
            .map(|cell| self.process_children(cell, ctx))
            .collect();

        for (i, from) in cells.iter().enumerate() {
            for (j, to) in cells.iter().enumerate() {
                if i != j {
                    self.inter_link(from, to);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dita_renderer::AudienceFilter;
    use dita_storage::MockStorage;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::CollectionType;

    fn topic(name: &str) -> String {
        format!(r#"<topic id="{name}"><title>Topic {name}</title></topic>"#)
    }

    fn titles(index: &DocumentIndex, entries: &[EntryId]) -> Vec<String> {
        entries
            .iter()
            .map(|&id| index.entry(id).title.clone())
            .collect()
    }

    #[test]
    fn test_load_simple_map() {
        let storage = MockStorage::new()
            .with_file(
                "docs/index.ditamap",
                r#"<map><title>Guide</title>
<topicref href="a.dita" navtitle="Start here"/>
<topicref href="sub/b.dita"><topicref href="c.dita"/></topicref>
</map>"#,
            )
            .with_file("docs/a.dita", topic("a"))
            .with_file("docs/sub/b.dita", topic("b"))
            .with_file("docs/c.dita", topic("c"));
        let mut index = DocumentIndex::new(Arc::new(storage));

        let entries = index.load_map("docs/index.ditamap").unwrap();

        assert_eq!(titles(&index, &entries), vec!["Start here", "Topic b"]);
        let b = index.entry(entries[1]);
        assert_eq!(titles(&index, &b.children), vec!["Topic c"]);
        assert_eq!(index.entry(index.nav()).children, entries);
        assert_eq!(index.map("docs/index.ditamap").unwrap().title, "Guide");
        assert!(index.diagnostics().is_empty());
    }

    #[test]
    fn test_format_and_audience_prune() {
        let storage = MockStorage::new()
            .with_file(
                "index.ditamap",
                r#"<map>
<topicref href="a.dita"/>
<topicref href="guide.pdf" format="pdf"/>
<topicref href="p.dita" audience="print"/>
<topicref href="o.dita" print="printonly"/>
<topicref href="d.dita" deliveryTarget="PDF"/>
<topicref href="k.dita" deliveryTarget="PDF KB"/>
</map>"#,
            )
            .with_file("a.dita", topic("a"))
            .with_file("k.dita", topic("k"));
        let mut index = DocumentIndex::new(Arc::new(storage));

        let entries = index.load_map("index.ditamap").unwrap();

        assert_eq!(titles(&index, &entries), vec!["Topic a", "Topic k"]);
        assert_eq!(index.topic_count(), 2);
    }

    #[test]
    fn test_delivery_target_is_configurable() {
        let storage = MockStorage::new()
            .with_file(
                "index.ditamap",
                r#"<map><topicref href="a.dita" deliveryTarget="F1"/><topicref href="b.dita" deliveryTarget="KB"/></map>"#,
            )
            .with_file("a.dita", topic("a"))
            .with_file("b.dita", topic("b"));
        let mut index =
            DocumentIndex::new(Arc::new(storage)).with_audience(AudienceFilter::new("F1"));

        let entries = index.load_map("index.ditamap").unwrap();

        assert_eq!(titles(&index, &entries), vec!["Topic a"]);
    }

    #[test]
    fn test_title_resolution() {
        let storage = MockStorage::new()
            .with_file(
                "index.ditamap",
                r#"<map>
<topicref href="a.dita"><topicmeta><navtitle>Meta</navtitle></topicmeta></topicref>
<topicref href="b.dita" locktitle="yes"><topicmeta><navtitle>Locked</navtitle></topicmeta></topicref>
<topicref href="missing.dita"/>
<topichead navtitle="Heading"/>
</map>"#,
            )
            .with_file("a.dita", topic("a"))
            .with_file("b.dita", topic("b"));
        let mut index = DocumentIndex::new(Arc::new(storage));

        let entries = index.load_map("index.ditamap").unwrap();

        assert_eq!(
            titles(&index, &entries),
            vec!["Topic a", "Locked", "missing", "Heading"]
        );
        assert_eq!(index.entry(entries[3]).topic, None);
        assert_eq!(index.diagnostics().len(), 1);
        assert_eq!(index.diagnostics()[0].kind, DiagnosticKind::NotFound);
    }

    #[test]
    fn test_href_is_percent_decoded() {
        let storage = MockStorage::new()
            .with_file(
                "index.ditamap",
                r#"<map><topicref href="my%20topic.dita#t"/></map>"#,
            )
            .with_file("my topic.dita", topic("t"));
        let mut index = DocumentIndex::new(Arc::new(storage));

        index.load_map("index.ditamap").unwrap();

        assert!(index.find_topic("my topic.dita").is_some());
        assert!(index.diagnostics().is_empty());
    }

    #[test]
    fn test_invalid_percent_encoding_is_reported() {
        let storage = MockStorage::new()
            .with_file("index.ditamap", r#"<map><topicref href="bad%FF.dita"/></map>"#);
        let mut index = DocumentIndex::new(Arc::new(storage));

        index.load_map("index.ditamap").unwrap();

        assert_eq!(index.diagnostics()[0].kind, DiagnosticKind::Validation);
    }

    #[test]
    fn test_keys_registered_first_wins() {
        let storage = MockStorage::new()
            .with_file(
                "maps/index.ditamap",
                r#"<map>
<keydef keys="shared" href="../common/shared.dita"/>
<topicref keys="intro start" href="intro.dita"/>
<topicref keys="intro" href="other.dita"/>
</map>"#,
            )
            .with_file("maps/intro.dita", topic("intro"))
            .with_file("maps/other.dita", topic("other"));
        let mut index = DocumentIndex::new(Arc::new(storage));

        let entries = index.load_map("maps/index.ditamap").unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(index.key("shared"), Some("common/shared.dita"));
        assert_eq!(index.key("intro"), Some("maps/intro.dita"));
        assert_eq!(index.key("start"), Some("maps/intro.dita"));
        assert_eq!(index.find_topic("common/shared.dita"), None);
    }

    #[test]
    fn test_mapref_splices_entries_and_toc() {
        let storage = MockStorage::new()
            .with_file(
                "index.ditamap",
                r#"<map><topicref href="a.dita"/><mapref href="sub/more.ditamap" toc="no"/></map>"#,
            )
            .with_file(
                "sub/more.ditamap",
                r#"<map><topicref href="b.dita"/></map>"#,
            )
            .with_file("a.dita", topic("a"))
            .with_file("sub/b.dita", topic("b"));
        let mut index = DocumentIndex::new(Arc::new(storage));

        let entries = index.load_map("index.ditamap").unwrap();

        assert_eq!(titles(&index, &entries), vec!["Topic a", "Topic b"]);
        assert!(index.entry(entries[0]).toc);
        assert!(!index.entry(entries[1]).toc);
        assert_eq!(index.map_count(), 2);
    }

    #[test]
    fn test_missing_mapref_is_reported() {
        let storage = MockStorage::new()
            .with_file("index.ditamap", r#"<map><mapref href="gone.ditamap"/></map>"#);
        let mut index = DocumentIndex::new(Arc::new(storage));

        let entries = index.load_map("index.ditamap").unwrap();

        assert!(entries.is_empty());
        assert_eq!(index.diagnostics()[0].kind, DiagnosticKind::NotFound);
        assert_eq!(index.diagnostics()[0].path, "gone.ditamap");
    }

    #[test]
    fn test_missing_root_map_is_error() {
        let mut index = DocumentIndex::new(Arc::new(MockStorage::new()));

        let err = index.load_map("index.ditamap").unwrap_err();

        assert!(err.is_not_found());
    }

    #[test]
    fn test_linking_inherited_coll_type_not() {
        let storage = MockStorage::new()
            .with_file(
                "index.ditamap",
                r#"<map><topicref href="p.dita" linking="none" collection-type="family">
<topicref href="a.dita"><topicref href="b.dita"/></topicref>
</topicref></map>"#,
            )
            .with_file("p.dita", topic("p"))
            .with_file("a.dita", topic("a"))
            .with_file("b.dita", topic("b"));
        let mut index = DocumentIndex::new(Arc::new(storage));

        let entries = index.load_map("index.ditamap").unwrap();

        let p = index.entry(entries[0]);
        assert_eq!(p.coll_type, CollectionType::Family);
        let a = index.entry(p.children[0]);
        assert_eq!(a.linking, Linking::None);
        assert_eq!(a.coll_type, CollectionType::Unordered);
        assert_eq!(index.entry(a.children[0]).linking, Linking::None);
    }

    #[test]
    fn test_reltable_entries_are_not_navigation() {
        let storage = MockStorage::new()
            .with_file(
                "index.ditamap",
                r#"<map><topicref href="x.dita"/>
<reltable><relheader><relcolspec/><relcolspec/></relheader>
<relrow><relcell><topicref href="x.dita"/></relcell><relcell><topicref href="y.dita"/></relcell></relrow>
</reltable></map>"#,
            )
            .with_file("x.dita", topic("x"))
            .with_file("y.dita", topic("y"));
        let mut index = DocumentIndex::new(Arc::new(storage));

        let entries = index.load_map("index.ditamap").unwrap();

        assert_eq!(titles(&index, &entries), vec!["Topic x"]);
        let x = index.find_topic("x.dita").unwrap();
        let y = index.find_topic("y.dita").unwrap();
        assert_eq!(index.topic(x).link_sets.len(), 1);
        assert_eq!(index.topic(x).link_sets[0].siblings[0].topic(), Some(y));
    }

    #[test]
    fn test_reltable_rows_outside_web_audience_are_pruned() {
        let storage = MockStorage::new()
            .with_file(
                "index.ditamap",
                r#"<map><reltable>
<relrow audience="print"><relcell><topicref href="x.dita"/></relcell><relcell><topicref href="y.dita"/></relcell></relrow>
<relrow deliveryTarget="PDF"><relcell><topicref href="x.dita"/></relcell><relcell><topicref href="z.dita"/></relcell></relrow>
<relrow deliveryTarget="PDF KB"><relcell><topicref href="y.dita"/></relcell><relcell><topicref href="z.dita"/></relcell></relrow>
</reltable></map>"#,
            )
            .with_file("x.dita", topic("x"))
            .with_file("y.dita", topic("y"))
            .with_file("z.dita", topic("z"));
        let mut index = DocumentIndex::new(Arc::new(storage));

        index.load_map("index.ditamap").unwrap();

        assert!(index.find_topic("x.dita").is_none());
        let y = index.find_topic("y.dita").unwrap();
        let z = index.find_topic("z.dita").unwrap();
        assert_eq!(index.topic(y).link_sets.len(), 1);
        assert_eq!(index.topic(y).link_sets[0].siblings[0].topic(), Some(z));
        assert_eq!(index.topic(z).link_sets[0].siblings[0].topic(), Some(y));
    }
}
