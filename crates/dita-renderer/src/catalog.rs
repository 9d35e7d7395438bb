//! Built-in DITA to HTML rule catalog.

use crate::rules::RuleTable;

/// Renames as `(dita tag, html tag, class)`.
const RENAMES: &[(&str, &str, &str)] = &[
    // links
    ("xref", "a", ""),
    ("link", "a", ""),
    // lists
    ("choices", "ul", ""),
    ("choice", "li", ""),
    ("steps-unordered", "ul", ""),
    ("steps", "ol", ""),
    ("substeps", "ol", ""),
    // inline
    ("b", "strong", ""),
    ("i", "em", ""),
    ("u", "u", ""),
    ("tt", "code", ""),
    ("q", "q", ""),
    ("term", "dfn", "term"),
    ("keyword", "span", "keyword"),
    ("ph", "span", "ph"),
    ("lines", "pre", ""),
    ("codeblock", "pre", "codeblock"),
    ("pre", "pre", "pre"),
    ("codeph", "samp", "codeph"),
    ("cmdname", "span", "cmdname"),
    ("cmd", "span", "cmd"),
    ("shortcut", "span", "shortcut"),
    ("wintitle", "span", "wintitle"),
    ("filepath", "span", "filepath"),
    ("msgph", "span", "msgph"),
    ("msgblock", "pre", "msgblock"),
    ("varname", "var", "varname"),
    ("apiname", "span", "apiname"),
    ("option", "span", "option"),
    ("synph", "span", ""),
    ("delim", "span", ""),
    ("sep", "span", ""),
    ("parmname", "span", ""),
    ("systemoutput", "samp", "systemoutput"),
    ("userinput", "kbd", "userinput"),
    ("uicontrol", "b", "uicontrol"),
    ("image", "img", ""),
    // blocks
    ("context", "div", "context"),
    ("result", "div", "result"),
    ("stepresult", "div", ""),
    ("stepxmp", "div", ""),
    ("info", "div", ""),
    ("refsyn", "div", ""),
    ("bodydiv", "div", ""),
    ("fig", "div", "fig"),
    ("prereq", "div", "prereq"),
    ("postreq", "div", "postreq"),
    ("section", "div", "section"),
    ("example", "div", "example"),
    ("sectiondiv", "div", ""),
    ("title", "h2", "sectiontitle"),
    ("lq", "blockquote", "lq"),
    // definition lists
    ("dlentry", "div", ""),
    ("dt", "dt", "dlterm"),
    ("dd", "dd", ""),
    // properties table
    ("properties", "table", "properties"),
    ("property", "tr", ""),
    ("proptype", "td", ""),
    ("propvalue", "td", ""),
    ("propdesc", "td", ""),
    // tables
    ("colspec", "colgroup", ""),
    ("row", "tr", ""),
    ("entry", "td", ""),
];

/// Elements dropped with their content.
const SKIPS: &[&str] = &["br", "draft-comment", "required-cleanup", "indexterm"];

/// Elements replaced by their content.
const UNWRAPS: &[&str] = &["tgroup"];

/// Elements handled by built-in processors as `(tag, processor)`.
const CUSTOM: &[(&str, &str)] = &[
    ("a", "link"),
    ("img", "image"),
    ("note", "note"),
    ("step", "step"),
    ("substep", "step"),
    ("menucascade", "menucascade"),
    ("simpletable", "simpletable"),
    ("table", "table"),
    ("imagemap", "imagemap"),
    ("data", "data"),
];

/// Default rule table for DITA topics.
#[must_use]
pub fn default_rule_table() -> RuleTable {
    let mut table = RuleTable::new();
    for (tag, name, class) in RENAMES {
        table = table.with_rename(tag, name, class);
    }
    for tag in SKIPS {
        table = table.with_skip(tag);
    }
    for tag in UNWRAPS {
        table = table.with_unwrap(tag);
    }
    for (tag, processor) in CUSTOM {
        table = table.with_custom(tag, processor);
    }
    table
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::rules::Rule;

    #[test]
    fn test_default_table_renames_links_to_custom_anchor() {
        let table = default_rule_table();

        assert_eq!(
            table.get("xref"),
            Some(&Rule::Rename {
                name: "a".to_owned(),
                class: None
            })
        );
        assert_eq!(table.get("a"), Some(&Rule::Custom("link".to_owned())));
    }

    #[test]
    fn test_default_table_skip_and_unwrap() {
        let table = default_rule_table();

        assert_eq!(table.get("draft-comment"), Some(&Rule::Skip));
        assert_eq!(table.get("tgroup"), Some(&Rule::Unwrap));
    }

    #[test]
    fn test_catalog_has_no_duplicate_tags() {
        let count = RENAMES.len() + SKIPS.len() + UNWRAPS.len() + CUSTOM.len();

        assert_eq!(default_rule_table().len(), count);
    }
}
