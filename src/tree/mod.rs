//! Namespace tree
//!
//! One [`Tree`] is an immutable snapshot of the whole namespace, built from a
//! single fetch of the backend's records. Refreshing the namespace means
//! building a new tree and swapping it in; a live tree is never mutated.

pub mod builder;
pub mod node;
pub mod resolver;
pub mod sanitize;
pub mod template;

use crate::error::FsError;
use crate::types::SEPARATOR;
use std::time::SystemTime;

pub use builder::TreeBuilder;
pub use node::{Directory, FileEntry, Node};
pub use sanitize::Sanitizer;
pub use template::PathTemplate;

/// Immutable namespace snapshot
#[derive(Debug, Clone)]
pub struct Tree {
    /// Always `Node::Directory`, named ""
    root: Node,
    built_at: SystemTime,
    file_count: usize,
    total_bytes: u64,
}

impl Tree {
    pub(crate) fn new(
        root: Directory,
        built_at: SystemTime,
        file_count: usize,
        total_bytes: u64,
    ) -> Self {
        Self {
            root: Node::Directory(root),
            built_at,
            file_count,
            total_bytes,
        }
    }

    pub fn root(&self) -> &Directory {
        match &self.root {
            Node::Directory(dir) => dir,
            Node::File(_) => unreachable!("tree root is always a directory"),
        }
    }

    pub fn root_node(&self) -> &Node {
        &self.root
    }

    pub fn built_at(&self) -> SystemTime {
        self.built_at
    }

    /// Number of recording files in the tree
    pub fn file_count(&self) -> usize {
        self.file_count
    }

    /// Sum of all recording sizes
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn resolve(&self, path: &str) -> Result<&Node, FsError> {
        resolver::resolve(&self.root, path)
    }

    /// Every node below the root with its absolute path, depth first in
    /// directory order.
    pub fn walk(&self) -> Vec<(String, &Node)> {
        let mut out = Vec::new();
        walk_dir(self.root(), "", &mut out);
        out
    }

    /// Every recording file with its absolute path.
    pub fn files(&self) -> impl Iterator<Item = (String, &FileEntry)> {
        self.walk()
            .into_iter()
            .filter_map(|(path, node)| node.as_file().map(|file| (path, file)))
    }
}

fn walk_dir<'a>(dir: &'a Directory, prefix: &str, out: &mut Vec<(String, &'a Node)>) {
    for child in dir.children() {
        let path = format!("{prefix}{SEPARATOR}{}", child.name());
        out.push((path.clone(), child));
        if let Node::Directory(sub) = child {
            walk_dir(sub, &path, out);
        }
    }
}
