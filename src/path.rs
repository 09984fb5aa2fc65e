//! Slash-delimited path helpers for the realtime store and object storage.

/// Normalizes a path by dropping empty segments and surrounding slashes.
///
/// `"/newsletters//abc/"` becomes `"newsletters/abc"`. The root is `""`.
pub fn normalize(path: &str) -> String {
    segments(path).collect::<Vec<_>>().join("/")
}

/// Iterates the non-empty segments of a path.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Joins a child key onto a parent path.
pub fn join(parent: &str, child: &str) -> String {
    let parent = normalize(parent);
    let child = normalize(child);
    match (parent.is_empty(), child.is_empty()) {
        (true, _) => child,
        (_, true) => parent,
        _ => format!("{parent}/{child}"),
    }
}

/// Returns the last segment of a path, or `""` for the root.
pub fn file_name(path: &str) -> &str {
    segments(path).last().unwrap_or("")
}

/// Returns true when `ancestor` is `path` itself or one of its parents.
pub(crate) fn is_ancestor_or_self(ancestor: &[String], path: &[String]) -> bool {
    ancestor.len() <= path.len() && ancestor.iter().zip(path).all(|(a, b)| a == b)
}
