//! Rule table and custom processor registry.
//!
//! The [`RuleTable`] maps a literal tag name to one [`Rule`]. The dispatcher
//! consults it twice per start tag: once for the original name and, after a
//! rename, once more for the new name, so a custom processor can be attached
//! to either.

use std::collections::HashMap;

use crate::conversion::Conversion;
use crate::error::ConvertError;
use crate::token::{StartTag, TokenSource};

/// Action applied to a start tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rule {
    /// Emit under a different name, replacing the `class` attribute.
    Rename {
        /// New element name.
        name: String,
        /// Class set on the renamed element; `None` removes the attribute.
        class: Option<String>,
    },
    /// Drop the element and its whole subtree.
    Skip,
    /// Drop the element but process its children.
    Unwrap,
    /// Hand the element to a registered [`TagProcessor`].
    Custom(String),
}

/// Mapping from tag name to [`Rule`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuleTable {
    rules: HashMap<String, Rule>,
}

impl RuleTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rule for a tag, looked up case-sensitively.
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&Rule> {
        self.rules.get(tag)
    }

    /// Set the rule for a tag, replacing any previous one.
    pub fn insert(&mut self, tag: impl Into<String>, rule: Rule) {
        self.rules.insert(tag.into(), rule);
    }

    /// Remove the rule for a tag.
    pub fn remove(&mut self, tag: &str) -> Option<Rule> {
        self.rules.remove(tag)
    }

    /// Number of configured tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no tags are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Add a rename rule.
    #[must_use]
    pub fn with_rename(mut self, tag: &str, name: &str, class: &str) -> Self {
        let class = (!class.is_empty()).then(|| class.to_owned());
        self.insert(
            tag,
            Rule::Rename {
                name: name.to_owned(),
                class,
            },
        );
        self
    }

    /// Add a skip rule.
    #[must_use]
    pub fn with_skip(mut self, tag: &str) -> Self {
        self.insert(tag, Rule::Skip);
        self
    }

    /// Add an unwrap rule.
    #[must_use]
    pub fn with_unwrap(mut self, tag: &str) -> Self {
        self.insert(tag, Rule::Unwrap);
        self
    }

    /// Attach a custom processor by name.
    #[must_use]
    pub fn with_custom(mut self, tag: &str, processor: &str) -> Self {
        self.insert(tag, Rule::Custom(processor.to_owned()));
        self
    }

    /// Names of custom processors referenced by the table.
    pub fn processor_names(&self) -> impl Iterator<Item = &str> {
        self.rules.values().filter_map(|rule| match rule {
            Rule::Custom(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

/// Custom handler for a tag.
///
/// A processor receives the start tag with the stream positioned right
/// after it. It must consume exactly that element's subtree, including the
/// matching end token, and leave the encoder at the depth it found it.
/// Children it wants rendered normally go back through
/// [`Conversion::recurse`] or [`Conversion::handle`].
///
/// Processors are shared across concurrent conversions, hence
/// `Send + Sync`.
///
/// # Example
///
/// ```
/// use dita_renderer::{Conversion, ConvertError, StartTag, TagProcessor, TokenSource};
///
/// struct Keyword;
///
/// impl TagProcessor for Keyword {
///     fn name(&self) -> &str { "keyword" }
///
///     fn process(
///         &self,
///         conv: &mut Conversion<'_>,
///         stream: &mut dyn TokenSource,
///         _start: StartTag,
///     ) -> Result<(), ConvertError> {
///         conv.emit_with_children(stream, StartTag::new("code"))
///     }
/// }
/// ```
pub trait TagProcessor: Send + Sync {
    /// Processor name referenced from [`Rule::Custom`].
    fn name(&self) -> &str;

    /// Render the element started by `start`.
    fn process(
        &self,
        conv: &mut Conversion<'_>,
        stream: &mut dyn TokenSource,
        start: StartTag,
    ) -> Result<(), ConvertError>;
}

/// Registry of custom processors by name.
#[derive(Default)]
pub struct ProcessorRegistry {
    processors: HashMap<String, Box<dyn TagProcessor>>,
}

impl ProcessorRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a processor under its [`TagProcessor::name`].
    #[must_use]
    pub fn with<P: TagProcessor + 'static>(mut self, processor: P) -> Self {
        self.register(processor);
        self
    }

    /// Register a processor, replacing one with the same name.
    pub fn register<P: TagProcessor + 'static>(&mut self, processor: P) {
        self.processors
            .insert(processor.name().to_owned(), Box::new(processor));
    }

    /// Look up a processor.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn TagProcessor> {
        self.processors.get(name).map(Box::as_ref)
    }

    /// Whether a processor with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.processors.contains_key(name)
    }
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.processors.keys().collect();
        names.sort();
        f.debug_struct("ProcessorRegistry")
            .field("processors", &names)
            .finish()
    }
}

/// Rule table together with the processors it references.
#[derive(Debug, Default)]
pub struct Rules {
    /// Tag rules.
    pub table: RuleTable,
    /// Custom processors.
    pub processors: ProcessorRegistry,
}

impl Rules {
    /// Combine a table and a registry.
    #[must_use]
    pub fn new(table: RuleTable, processors: ProcessorRegistry) -> Self {
        Self { table, processors }
    }

    /// Built-in DITA to HTML catalog with all built-in processors.
    #[must_use]
    pub fn default_dita() -> Self {
        Self::new(
            crate::catalog::default_rule_table(),
            crate::processors::builtin_registry(),
        )
    }

    /// Processor names referenced by the table but not registered.
    #[must_use]
    pub fn missing_processors(&self) -> Vec<String> {
        let mut missing: Vec<String> = self
            .table
            .processor_names()
            .filter(|name| !self.processors.contains(name))
            .map(ToOwned::to_owned)
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_rule_table_builders() {
        let table = RuleTable::new()
            .with_rename("b", "strong", "")
            .with_rename("codeph", "samp", "codeph")
            .with_skip("draft-comment")
            .with_unwrap("tgroup")
            .with_custom("note", "note");

        assert_eq!(
            table.get("b"),
            Some(&Rule::Rename {
                name: "strong".to_owned(),
                class: None
            })
        );
        assert_eq!(
            table.get("codeph"),
            Some(&Rule::Rename {
                name: "samp".to_owned(),
                class: Some("codeph".to_owned())
            })
        );
        assert_eq!(table.get("draft-comment"), Some(&Rule::Skip));
        assert_eq!(table.get("tgroup"), Some(&Rule::Unwrap));
        assert_eq!(table.get("note"), Some(&Rule::Custom("note".to_owned())));
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_rule_lookup_is_case_sensitive() {
        let table = RuleTable::new().with_skip("br");

        assert!(table.get("BR").is_none());
    }

    #[test]
    fn test_missing_processors() {
        let rules = Rules::new(
            RuleTable::new()
                .with_custom("a", "link")
                .with_custom("x", "unknown"),
            crate::processors::builtin_registry(),
        );

        assert_eq!(rules.missing_processors(), vec!["unknown".to_owned()]);
    }

    #[test]
    fn test_default_rules_reference_registered_processors() {
        assert!(Rules::default_dita().missing_processors().is_empty());
    }
}
