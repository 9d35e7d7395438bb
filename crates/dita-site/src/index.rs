//! Document index.
//!
//! Topics and navigation entries are stored in flat arenas and refer to each
//! other by [`TopicId`] and [`EntryId`]. Topics and maps are keyed by their
//! canonical (case-folded) path, so every document is loaded at most once per
//! run no matter how often the maps reference it.

use std::collections::HashMap;
use std::sync::Arc;

use dita_renderer::{AudienceFilter, ConversionHost, Diagnostic, DiagnosticKind, TopicSummary};
use dita_storage::{Source, Storage, StorageError, path};

use crate::error::LoadError;
use crate::linking::LinkSet;
use crate::model::{CollectionType, Linking, TopicDocument};

/// Index of a topic in the [`DocumentIndex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicId(pub(crate) usize);

impl TopicId {
    /// Position in load order.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of a navigation entry in the [`DocumentIndex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub(crate) usize);

impl EntryId {
    /// Position in creation order.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A loaded topic, or a placeholder for one that failed to load.
#[derive(Clone, Debug)]
pub struct Topic {
    /// Root-relative source path as first referenced.
    pub path: String,
    /// Topic title; the file name for placeholders.
    pub title: String,
    /// Navigation title from `titlealts`, empty if absent.
    pub nav_title: String,
    /// Plain-text short description.
    pub synopsis: String,
    /// Source modification time, zero for placeholders.
    pub mtime: f64,
    /// Parsed document, `None` for placeholders.
    pub document: Option<TopicDocument>,
    /// Relations accumulated from every map context the topic appears in.
    pub link_sets: Vec<LinkSet>,
    pub(crate) related_links_created: bool,
}

impl Topic {
    fn new(path: &str, mtime: f64, document: TopicDocument) -> Self {
        Self {
            path: path.to_owned(),
            title: document.title.clone(),
            nav_title: document.nav_title.clone(),
            synopsis: document.synopsis.clone(),
            mtime,
            document: Some(document),
            link_sets: Vec::new(),
            related_links_created: false,
        }
    }

    fn placeholder(path: &str) -> Self {
        Self {
            path: path.to_owned(),
            title: path::trim_ext(path::base(path)).to_owned(),
            nav_title: String::new(),
            synopsis: String::new(),
            mtime: 0.0,
            document: None,
            link_sets: Vec::new(),
            related_links_created: false,
        }
    }

    /// Title for navigation: the navigation title if set, else the title.
    #[must_use]
    pub fn display_title(&self) -> &str {
        if self.nav_title.is_empty() {
            &self.title
        } else {
            &self.nav_title
        }
    }

    /// Root element name of the document (`concept`, `task`, ...).
    #[must_use]
    pub fn kind(&self) -> &str {
        self.document.as_ref().map_or("", |doc| doc.kind.as_str())
    }

    /// Whether the topic failed to load.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.document.is_none()
    }
}

/// Node of the navigation tree.
#[derive(Clone, Debug, Default)]
pub struct Entry {
    /// Resolved title.
    pub title: String,
    /// `type` attribute of the map node.
    pub kind: String,
    /// Collection type governing the entry's children.
    pub coll_type: CollectionType,
    /// Effective linking mode.
    pub linking: Linking,
    /// Whether the entry is shown in the table of contents.
    pub toc: bool,
    /// Topic owned by the entry.
    pub topic: Option<TopicId>,
    /// Child entries in map order.
    pub children: Vec<EntryId>,
}

/// A map that has been loaded.
#[derive(Clone, Debug, Default)]
pub struct LoadedMap {
    /// Root-relative path.
    pub path: String,
    /// Map title.
    pub title: String,
    /// Top-level entries.
    pub entries: Vec<EntryId>,
}

/// Registries of loaded topics, maps, entries and keys.
///
/// Loading needs `&mut self`; once the maps are loaded the index is only
/// read, and is shared between concurrent topic conversions through its
/// [`ConversionHost`] implementation.
pub struct DocumentIndex {
    storage: Arc<dyn Storage>,
    audience: AudienceFilter,
    topics: Vec<Topic>,
    topic_index: HashMap<String, TopicId>,
    pub(crate) maps: HashMap<String, LoadedMap>,
    pub(crate) entries: Vec<Entry>,
    nav: EntryId,
    keys: HashMap<String, String>,
    diagnostics: Vec<Diagnostic>,
}

impl DocumentIndex {
    /// Create an empty index reading from `storage`.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let nav = Entry {
            title: "Navigation".to_owned(),
            toc: true,
            ..Entry::default()
        };
        Self {
            storage,
            audience: AudienceFilter::default(),
            topics: Vec::new(),
            topic_index: HashMap::new(),
            maps: HashMap::new(),
            entries: vec![nav],
            nav: EntryId(0),
            keys: HashMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Set the audience filter applied to map nodes.
    #[must_use]
    pub fn with_audience(mut self, audience: AudienceFilter) -> Self {
        self.audience = audience;
        self
    }

    /// Audience filter applied to map nodes.
    #[must_use]
    pub fn audience(&self) -> &AudienceFilter {
        &self.audience
    }

    /// Byte source.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Root of the navigation tree; loaded maps are attached below it.
    #[must_use]
    pub fn nav(&self) -> EntryId {
        self.nav
    }

    /// Look up a topic.
    ///
    /// # Panics
    ///
    /// Panics if the id belongs to another index.
    #[must_use]
    pub fn topic(&self, id: TopicId) -> &Topic {
        &self.topics[id.0]
    }

    pub(crate) fn topic_mut(&mut self, id: TopicId) -> &mut Topic {
        &mut self.topics[id.0]
    }

    /// All topics in load order.
    pub fn topics(&self) -> impl Iterator<Item = (TopicId, &Topic)> {
        self.topics
            .iter()
            .enumerate()
            .map(|(i, topic)| (TopicId(i), topic))
    }

    /// Number of topics, placeholders included.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Find a loaded topic by path, compared canonically.
    #[must_use]
    pub fn find_topic(&self, path: &str) -> Option<TopicId> {
        self.topic_index.get(&path::canonical(path)).copied()
    }

    /// Look up a navigation entry.
    ///
    /// # Panics
    ///
    /// Panics if the id belongs to another index.
    #[must_use]
    pub fn entry(&self, id: EntryId) -> &Entry {
        &self.entries[id.0]
    }

    pub(crate) fn add_entry(&mut self, entry: Entry) -> EntryId {
        let id = EntryId(self.entries.len());
        self.entries.push(entry);
        id
    }

    /// A loaded map, looked up canonically.
    #[must_use]
    pub fn map(&self, path: &str) -> Option<&LoadedMap> {
        self.maps.get(&path::canonical(path))
    }

    /// Number of loaded maps.
    #[must_use]
    pub fn map_count(&self) -> usize {
        self.maps.len()
    }

    /// Path bound to a key.
    #[must_use]
    pub fn key(&self, key: &str) -> Option<&str> {
        self.keys.get(key).map(String::as_str)
    }

    /// Bind a key to a path unless it is already bound.
    pub(crate) fn define_key(&mut self, key: &str, target: &str) {
        self.keys
            .entry(key.to_owned())
            .or_insert_with(|| target.to_owned());
    }

    /// Problems recorded while loading.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Remove and return the problems recorded so far.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub(crate) fn report(&mut self, kind: DiagnosticKind, path: &str, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(kind, path, message);
        tracing::warn!(
            path = %diagnostic.path,
            kind = %diagnostic.kind,
            message = %diagnostic.message,
            "Load diagnostic"
        );
        self.diagnostics.push(diagnostic);
    }

    /// Load a topic, or return the one already loaded under the same
    /// canonical path.
    ///
    /// A topic that cannot be read or parsed is recorded as a diagnostic and
    /// replaced by a placeholder titled after its file name.
    pub fn load_topic(&mut self, topic_path: &str) -> TopicId {
        let key = path::canonical(topic_path);
        if let Some(&id) = self.topic_index.get(&key) {
            return id;
        }

        let topic_path = path::join("", topic_path);
        let topic = match self.read_topic(&topic_path) {
            Ok(topic) => topic,
            Err(err) => {
                let kind = if err.is_not_found() {
                    DiagnosticKind::NotFound
                } else {
                    DiagnosticKind::Validation
                };
                self.report(kind, &topic_path, format!("unable to load topic: {err}"));
                Topic::placeholder(&topic_path)
            }
        };

        tracing::debug!(path = %topic_path, placeholder = topic.is_placeholder(), "Loaded topic");
        let id = TopicId(self.topics.len());
        self.topics.push(topic);
        self.topic_index.insert(key, id);
        id
    }

    fn read_topic(&self, topic_path: &str) -> Result<Topic, LoadError> {
        let source = self.storage.read(topic_path)?;
        let document = TopicDocument::parse(&source.data, topic_path)?;
        Ok(Topic::new(topic_path, source.mtime, document))
    }
}

impl ConversionHost for DocumentIndex {
    fn read_source(&self, path: &str) -> Result<Source, StorageError> {
        self.storage.read(path)
    }

    fn exists(&self, path: &str) -> bool {
        self.storage.exists(path)
    }

    fn key_target(&self, key: &str) -> Option<String> {
        self.key(key).map(str::to_owned)
    }

    /// Topics outside the maps are read on demand and not memoized, since the
    /// index is shared read-only during conversion.
    fn topic(&self, topic_path: &str) -> Option<TopicSummary> {
        if let Some(id) = self.find_topic(topic_path) {
            let topic = self.topic(id);
            return (!topic.is_placeholder()).then(|| TopicSummary {
                title: topic.title.clone(),
                synopsis: topic.synopsis.clone(),
            });
        }

        let topic = self.read_topic(topic_path).ok()?;
        Some(TopicSummary {
            title: topic.title,
            synopsis: topic.synopsis,
        })
    }
}
