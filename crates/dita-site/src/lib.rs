//! Document index, map loading and link graph for DITA documentation sets.
//!
//! A [`DocumentIndex`] loads navigation maps from a [`Storage`] backend into
//! an arena of topics and navigation entries, and derives the relations
//! between topics (parent, children, siblings, previous/next) from the map
//! structure and relationship tables. Once loaded, the index serves as the
//! [`ConversionHost`] for topic conversions, which may run concurrently.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use dita_renderer::{ConversionOptions, Rules};
//! use dita_site::{DocumentIndex, convert_topic, render_page};
//! use dita_storage::MockStorage;
//!
//! let storage = MockStorage::new()
//!     .with_file("index.ditamap", r#"<map><topicref href="intro.dita"/></map>"#)
//!     .with_file(
//!         "intro.dita",
//!         "<topic id=\"intro\"><title>Intro</title><body><p>Hello</p></body></topic>",
//!     );
//!
//! let mut index = DocumentIndex::new(Arc::new(storage));
//! index.load_map("index.ditamap").unwrap();
//!
//! let id = index.find_topic("intro.dita").unwrap();
//! let output = convert_topic(&index, &Rules::default_dita(), &ConversionOptions::default(), id).unwrap();
//! assert_eq!(output.content, "<p>Hello</p>");
//!
//! let page = render_page(&index, id, &output.content);
//! assert!(page.contains("<h1>Intro</h1>"));
//! ```
//!
//! [`Storage`]: dita_storage::Storage
//! [`ConversionHost`]: dita_renderer::ConversionHost

mod convert;
mod error;
mod html;
mod index;
mod linking;
mod loader;
mod model;

pub use convert::{TopicOutput, convert_topic};
pub use error::{LoadError, PageError};
pub use html::{TOC_FILE, related_links_html, render_page, render_toc_page, toc_html};
pub use index::{DocumentIndex, Entry, EntryId, LoadedMap, Topic, TopicId};
pub use linking::{Link, LinkSet, LinkTarget};
pub use model::{
    CollectionType, Linking, MapNode, OtherMeta, Prolog, RelatedLink, TopicDocument,
};
