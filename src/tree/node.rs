//! Namespace node types

use crate::record::Record;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

/// A directory in the projected namespace
#[derive(Debug, Clone)]
pub struct Directory {
    name: String,
    /// Children in first-seen order
    children: Vec<Node>,
    /// name -> position in `children`
    index: HashMap<String, usize>,
    /// Build time of the owning tree
    created: SystemTime,
    /// Whether policy allows removing entries here
    deletable: bool,
}

impl Directory {
    pub(crate) fn new(name: impl Into<String>, created: SystemTime, deletable: bool) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            index: HashMap::new(),
            created,
            deletable,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created(&self) -> SystemTime {
        self.created
    }

    pub fn deletable(&self) -> bool {
        self.deletable
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|&i| &self.children[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.children.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(Node::name)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Insert `node` under its own name. The caller guarantees the name is free.
    pub(crate) fn insert(&mut self, node: Node) {
        debug_assert!(!self.contains(node.name()), "duplicate child {}", node.name());
        self.index.insert(node.name().to_string(), self.children.len());
        self.children.push(node);
    }

    /// Child directory `name`, created when missing.
    ///
    /// Returns `None` when `name` is already taken by a file.
    pub(crate) fn dir_entry(&mut self, name: &str) -> Option<&mut Directory> {
        let position = match self.index.get(name) {
            Some(&position) => position,
            None => {
                let dir = Directory::new(name, self.created, self.deletable);
                let position = self.children.len();
                self.index.insert(name.to_string(), position);
                self.children.push(Node::Directory(dir));
                position
            }
        };
        match &mut self.children[position] {
            Node::Directory(dir) => Some(dir),
            Node::File(_) => None,
        }
    }
}

/// A recording file
#[derive(Debug, Clone)]
pub struct FileEntry {
    name: String,
    record: Arc<Record>,
}

impl FileEntry {
    pub(crate) fn new(name: impl Into<String>, record: Arc<Record>) -> Self {
        Self {
            name: name.into(),
            record,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record(&self) -> &Arc<Record> {
        &self.record
    }

    pub fn size(&self) -> u64 {
        self.record.size
    }

    /// Recording start, reported as the creation time
    pub fn created(&self) -> SystemTime {
        self.record.start_time()
    }

    pub fn modified(&self) -> SystemTime {
        self.record.end_time()
    }

    pub fn changed(&self) -> SystemTime {
        self.record.end_time()
    }

    pub fn accessed(&self) -> SystemTime {
        self.modified()
    }
}

/// Namespace node
#[derive(Debug, Clone)]
pub enum Node {
    Directory(Directory),
    File(FileEntry),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Directory(dir) => dir.name(),
            Node::File(file) => file.name(),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Directory(_))
    }

    pub fn as_dir(&self) -> Option<&Directory> {
        match self {
            Node::Directory(dir) => Some(dir),
            Node::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileEntry> {
        match self {
            Node::File(file) => Some(file),
            Node::Directory(_) => None,
        }
    }
}
