//! Path resolution
//!
//! Walks a slash-delimited path from the root. Leading, trailing and repeated
//! separators are ignored, so `""`, `"/"` and `"//"` all name the root.

use crate::error::FsError;
use crate::tree::node::Node;
use crate::types::SEPARATOR;

/// Split `path` into its non-empty components.
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|segment| !segment.is_empty())
}

/// Canonical form of `path`: a leading separator and no empty components.
pub fn normalize(path: &str) -> String {
    let mut out = String::new();
    for component in components(path) {
        out.push(SEPARATOR);
        out.push_str(component);
    }
    if out.is_empty() {
        out.push(SEPARATOR);
    }
    out
}

/// Resolve `path` against `root`.
///
/// Fails with [`FsError::NotFound`] when a component is missing or when an
/// intermediate component names a file.
pub fn resolve<'a>(root: &'a Node, path: &str) -> Result<&'a Node, FsError> {
    let mut current = root;
    for component in components(path) {
        let next = match current {
            Node::Directory(dir) => dir.get(component),
            Node::File(_) => None,
        };
        current = next.ok_or_else(|| {
            tracing::debug!(path, component, "Path did not resolve");
            FsError::NotFound {
                path: normalize(path),
            }
        })?;
    }
    Ok(current)
}
