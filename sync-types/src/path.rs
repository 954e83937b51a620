//! Remote-name normalization.
//!
//! Remote names are slash-separated relative paths. Normalization works on
//! path segments rather than on URLs, so characters that are reserved in URLs
//! (`%`, `?`, `#`) are ordinary segment characters and survive untouched.

/// Normalize a slash-separated path into a remote name.
///
/// - repeated slashes collapse into one
/// - `.` segments are dropped
/// - `..` removes the preceding segment; above the root it is dropped
/// - leading slashes are removed
/// - a trailing slash is kept, and a trailing `..` leaves one behind
///
/// ```
/// use distsync_types::normalize_path;
///
/// assert_eq!(normalize_path("foo/../../../bar"), "bar");
/// assert_eq!(normalize_path("foo/bar/.."), "foo/");
/// assert_eq!(normalize_path("foo/bar?x/../baz"), "foo/baz");
/// ```
pub fn normalize_path(path: &str) -> String {
    let trailing = path.ends_with('/') || path.rsplit('/').next() == Some("..");

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut normalized = segments.join("/");
    if trailing && !normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}

/// Iterate over every strict ancestor folder of a remote name, shallowest first.
///
/// `a/b/c` yields `a` then `a/b`.
pub fn ancestors(name: &str) -> impl Iterator<Item = &str> + '_ {
    name.match_indices('/')
        .map(move |(i, _)| &name[..i])
        .filter(|folder| !folder.is_empty())
}

/// Number of segments in a folder path (`a` is 1, `a/b` is 2).
pub fn depth(folder: &str) -> usize {
    folder.split('/').filter(|s| !s.is_empty()).count()
}
