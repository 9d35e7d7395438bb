//! Relationship graph between topics.
//!
//! Every pass over a group of sibling entries appends [`LinkSet`]s to the
//! topics involved. Link sets are never merged: a topic reached from several
//! map contexts carries one set per context.

use dita_renderer::is_external;
use dita_storage::path;

use crate::index::{DocumentIndex, EntryId, TopicId};
use crate::model::{CollectionType, Linking};

/// Where a [`Link`] points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkTarget {
    /// A topic of the index, optionally at an element.
    Topic {
        /// Target topic.
        id: TopicId,
        /// Element id path inside the topic.
        fragment: Option<String>,
    },
    /// A URL outside the document set.
    External(String),
}

/// One generated or imported relation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    /// Target.
    pub target: LinkTarget,
    /// Display title.
    pub title: String,
    /// Kind of the target (`concept`, `task`, ...), empty if unknown.
    pub kind: String,
}

impl Link {
    /// Target topic, `None` for external links.
    #[must_use]
    pub fn topic(&self) -> Option<TopicId> {
        match self.target {
            LinkTarget::Topic { id, .. } => Some(id),
            LinkTarget::External(_) => None,
        }
    }
}

/// Relations produced for one topic by one pass of the builder.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkSet {
    /// Collection type of the group that produced the set.
    pub coll_type: CollectionType,
    /// Parent topic.
    pub parent: Option<Link>,
    /// Previous topic in a sequence.
    pub prev: Option<Link>,
    /// Next topic in a sequence.
    pub next: Option<Link>,
    /// Related topics at the same level.
    pub siblings: Vec<Link>,
    /// Child topics.
    pub children: Vec<Link>,
}

impl LinkSet {
    /// Whether the set carries no relation at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parent.is_none()
            && self.prev.is_none()
            && self.next.is_none()
            && self.siblings.is_empty()
            && self.children.is_empty()
    }
}

/// Entry that owns a topic.
#[derive(Clone, Copy)]
struct Linkable {
    entry: EntryId,
    topic: TopicId,
    linking: Linking,
}

impl DocumentIndex {
    fn linkable(&self, entries: &[EntryId]) -> Vec<Linkable> {
        entries
            .iter()
            .filter_map(|&id| {
                let entry = self.entry(id);
                entry.topic.map(|topic| Linkable {
                    entry: id,
                    topic,
                    linking: entry.linking,
                })
            })
            .collect()
    }

    fn entry_link(&self, id: EntryId, topic: TopicId) -> Link {
        let entry = self.entry(id);
        let kind = if entry.kind.is_empty() {
            self.topic(topic).kind().to_owned()
        } else {
            entry.kind.clone()
        };
        Link {
            target: LinkTarget::Topic {
                id: topic,
                fragment: None,
            },
            title: entry.title.clone(),
            kind,
        }
    }

    fn push_link_set(&mut self, topic: TopicId, set: LinkSet) {
        if !set.is_empty() {
            self.topic_mut(topic).link_sets.push(set);
        }
    }

    /// Link a group of sibling entries with their parent and each other.
    ///
    /// Only entries owning a topic take part. The parent and each sibling
    /// get parent/child relations; `family` groups add sibling relations and
    /// `sequence` groups add previous/next relations between neighbors.
    /// Linking modes decide which entries may be a source or a target.
    pub fn add_family_links(
        &mut self,
        parent: Option<EntryId>,
        siblings: &[EntryId],
        coll_type: CollectionType,
    ) {
        let linkable = self.linkable(siblings);
        if linkable.is_empty() {
            return;
        }

        let links: Vec<Link> = linkable
            .iter()
            .map(|item| self.entry_link(item.entry, item.topic))
            .collect();
        let mut sets: Vec<LinkSet> = linkable
            .iter()
            .map(|_| LinkSet {
                coll_type,
                ..LinkSet::default()
            })
            .collect();

        let parent = parent.and_then(|id| {
            let entry = self.entry(id);
            entry.topic.map(|topic| Linkable {
                entry: id,
                topic,
                linking: entry.linking,
            })
        });

        if let Some(parent) = parent {
            if parent.linking.can_link_to() {
                let link = self.entry_link(parent.entry, parent.topic);
                for (item, set) in linkable.iter().zip(&mut sets) {
                    if item.linking.can_link_from() {
                        set.parent = Some(link.clone());
                    }
                }
            }

            if parent.linking.can_link_from() {
                let children = linkable
                    .iter()
                    .zip(&links)
                    .filter(|(item, _)| item.linking.can_link_to())
                    .map(|(_, link)| link.clone())
                    .collect();
                self.push_link_set(
                    parent.topic,
                    LinkSet {
                        coll_type,
                        children,
                        ..LinkSet::default()
                    },
                );
            }
        }

        match coll_type {
            CollectionType::Family => {
                for (i, item) in linkable.iter().enumerate() {
                    if !item.linking.can_link_from() {
                        continue;
                    }
                    sets[i].siblings = linkable
                        .iter()
                        .zip(&links)
                        .enumerate()
                        .filter(|(j, (other, _))| *j != i && other.linking.can_link_to())
                        .map(|(_, (_, link))| link.clone())
                        .collect();
                }
            }
            CollectionType::Sequence => {
                for (i, item) in linkable.iter().enumerate() {
                    if !item.linking.can_link_from() {
                        continue;
                    }
                    if i > 0 && linkable[i - 1].linking.can_link_to() {
                        sets[i].prev = Some(links[i - 1].clone());
                    }
                    if i + 1 < linkable.len() && linkable[i + 1].linking.can_link_to() {
                        sets[i].next = Some(links[i + 1].clone());
                    }
                }
            }
            CollectionType::Unordered => {}
        }

        for (item, set) in linkable.iter().zip(sets) {
            self.push_link_set(item.topic, set);
        }
    }

    /// Give every source entry of `from` a sibling relation to every target
    /// entry of `to`.
    ///
    /// Only one direction is produced; relationship tables call it for both.
    pub fn inter_link(&mut self, from: &[EntryId], to: &[EntryId]) {
        let targets: Vec<Link> = self
            .linkable(to)
            .into_iter()
            .filter(|item| item.linking.can_link_to())
            .map(|item| self.entry_link(item.entry, item.topic))
            .collect();
        if targets.is_empty() {
            return;
        }

        for item in self.linkable(from) {
            if item.linking.can_link_from() {
                self.push_link_set(
                    item.topic,
                    LinkSet {
                        coll_type: CollectionType::Family,
                        siblings: targets.clone(),
                        ..LinkSet::default()
                    },
                );
            }
        }
    }

    /// Turn the `related-links` declared in a topic into a link set.
    ///
    /// Runs at most once per topic. Local targets are loaded into the index;
    /// an empty file part refers to the topic itself.
    pub fn create_related_links(&mut self, id: TopicId) {
        let topic = self.topic_mut(id);
        if topic.related_links_created {
            return;
        }
        topic.related_links_created = true;

        let topic_path = topic.path.clone();
        let Some(declared) = topic
            .document
            .as_ref()
            .map(|doc| doc.related_links.clone())
        else {
            return;
        };

        let mut links = Vec::with_capacity(declared.len());
        for related in declared {
            if related.href.is_empty() {
                continue;
            }

            if related.scope == "external" || is_external(&related.href) {
                let title = if related.text.is_empty() {
                    related.href.clone()
                } else {
                    related.text
                };
                links.push(Link {
                    target: LinkTarget::External(related.href),
                    title,
                    kind: related.kind,
                });
                continue;
            }

            let (file, fragment) = path::split_fragment(&related.href);
            let target = if file.is_empty() {
                id
            } else {
                self.load_topic(&path::join(path::dir(&topic_path), file))
            };
            let target_topic = self.topic(target);
            let title = if related.text.is_empty() {
                target_topic.display_title().to_owned()
            } else {
                related.text
            };
            let kind = if related.kind.is_empty() {
                target_topic.kind().to_owned()
            } else {
                related.kind
            };

            links.push(Link {
                target: LinkTarget::Topic {
                    id: target,
                    fragment: fragment.filter(|f| !f.is_empty()).map(str::to_owned),
                },
                title,
                kind,
            });
        }

        tracing::debug!(path = %topic_path, count = links.len(), "Imported related links");
        self.push_link_set(
            id,
            LinkSet {
                siblings: links,
                ..LinkSet::default()
            },
        );
    }
}
