//! Forward-slash path helpers.
//!
//! Documents refer to each other with slash-separated paths relative to the
//! referencing document's directory. These helpers join, split and compare
//! such paths without touching the filesystem. Paths are never made absolute:
//! `..` segments that would leave the root are dropped.

/// Join a relative reference onto a base directory.
///
/// `.` and empty segments are skipped, `..` removes the previous segment.
/// A reference starting with `/` is resolved from the root.
///
/// # Example
///
/// ```
/// use dita_storage::path::join;
///
/// assert_eq!(join("topics/guide", "../shared/notes.dita"), "topics/shared/notes.dita");
/// assert_eq!(join("topics", "/index.ditamap"), "index.ditamap");
/// ```
#[must_use]
pub fn join(base: &str, relative: &str) -> String {
    let mut segments: Vec<&str> = if relative.starts_with('/') {
        Vec::new()
    } else {
        base.split('/').filter(|s| !s.is_empty() && *s != ".").collect()
    };

    for component in relative.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(component),
        }
    }

    segments.join("/")
}

/// Canonical, case-folded form of a path used as an index key.
///
/// Two references name the same document if and only if their canonical
/// forms are equal.
#[must_use]
pub fn canonical(path: &str) -> String {
    join("", path).to_lowercase()
}

/// Directory part of a path, empty for a bare file name.
#[must_use]
pub fn dir(path: &str) -> &str {
    path.rfind('/').map_or("", |i| &path[..i])
}

/// Final segment of a path.
#[must_use]
pub fn base(path: &str) -> &str {
    path.rfind('/').map_or(path, |i| &path[i + 1..])
}

/// Extension of the final segment including the leading dot, or empty.
#[must_use]
pub fn ext(path: &str) -> &str {
    let name = base(path);
    match name.rfind('.') {
        Some(i) if i > 0 => &name[i..],
        _ => "",
    }
}

/// Path without the extension of its final segment.
#[must_use]
pub fn trim_ext(path: &str) -> &str {
    &path[..path.len() - ext(path).len()]
}

/// Split an href into the document part and an optional `#fragment`.
///
/// # Example
///
/// ```
/// use dita_storage::path::split_fragment;
///
/// assert_eq!(split_fragment("a.dita#t/s"), ("a.dita", Some("t/s")));
/// assert_eq!(split_fragment("a.dita"), ("a.dita", None));
/// ```
#[must_use]
pub fn split_fragment(href: &str) -> (&str, Option<&str>) {
    match href.split_once('#') {
        Some((url, fragment)) => (url, Some(fragment)),
        None => (href, None),
    }
}

/// Calculate relative path from one document to another.
///
/// `from` is a document path, so its last segment is dropped before
/// computing the common prefix.
///
/// # Example
///
/// ```
/// use dita_storage::path::relative_path;
///
/// assert_eq!(relative_path("guide/intro.html", "guide/setup.html"), "setup.html");
/// assert_eq!(relative_path("guide/intro.html", "api/ref.html"), "../api/ref.html");
/// ```
#[must_use]
pub fn relative_path(from: &str, to: &str) -> String {
    let from_segs: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
    let to_segs: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    let from_dir = if from.ends_with('/') || from_segs.is_empty() {
        &from_segs[..]
    } else {
        &from_segs[..from_segs.len() - 1]
    };

    let common = from_dir
        .iter()
        .zip(&to_segs)
        .take_while(|(a, b)| a.eq_ignore_ascii_case(b))
        .count();

    let mut result = "../".repeat(from_dir.len() - common);
    result.push_str(&to_segs[common..].join("/"));
    if result.is_empty() {
        "./".to_owned()
    } else {
        result
    }
}
