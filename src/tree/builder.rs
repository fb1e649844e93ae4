//! Tree construction
//!
//! Projects the flat record set into a directory tree. Every record becomes
//! exactly one file; names that collide within a directory get a numeric
//! ` (n)` suffix in enumeration order.

use crate::record::Record;
use crate::tree::node::{Directory, FileEntry, Node};
use crate::tree::sanitize::Sanitizer;
use crate::tree::template::PathTemplate;
use crate::tree::Tree;
use std::sync::Arc;
use std::time::SystemTime;

/// Builds [`Tree`] instances from record snapshots.
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    template: PathTemplate,
    sanitizer: Sanitizer,
    deletable: bool,
}

impl TreeBuilder {
    pub fn new(template: PathTemplate, sanitizer: Sanitizer) -> Self {
        Self {
            template,
            sanitizer,
            deletable: false,
        }
    }

    /// Mark directories as permitting deletion of their entries.
    pub fn deletable(mut self, deletable: bool) -> Self {
        self.deletable = deletable;
        self
    }

    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    /// Build a tree from `records`, stamping directories with `built_at`.
    pub fn build(&self, records: impl IntoIterator<Item = Record>, built_at: SystemTime) -> Tree {
        let mut root = Directory::new("", built_at, self.deletable);
        let mut file_count = 0;
        let mut total_bytes = 0;

        for record in records {
            let rendered = self.template.render(&record);
            let mut dir = &mut root;
            for component in &rendered.dirs {
                let name = self.sanitizer.sanitize(component);
                dir = descend(dir, &name);
            }

            let base = self.sanitizer.sanitize(&rendered.base);
            let name = unique_name(&base, |candidate| !dir.contains(candidate));
            if name != base {
                tracing::debug!(record = %record.id, name = %name, "Disambiguated duplicate name");
            }

            total_bytes += record.size;
            file_count += 1;
            dir.insert(Node::File(FileEntry::new(name, Arc::new(record))));
        }

        Tree::new(root, built_at, file_count, total_bytes)
    }
}

/// Step into child directory `name`, creating it when missing.
///
/// When a file already holds `name`, the first suffixed name that is free or
/// already a directory is used instead.
fn descend<'a>(dir: &'a mut Directory, name: &str) -> &'a mut Directory {
    let name = unique_name(name, |candidate| {
        dir.get(candidate).map_or(true, Node::is_dir)
    });
    match dir.dir_entry(&name) {
        Some(child) => child,
        None => unreachable!("{name} was checked to be free or a directory"),
    }
}

/// First of `base`, `base (1)`, `base (2)`, ... accepted by `available`.
fn unique_name(base: &str, available: impl Fn(&str) -> bool) -> String {
    if available(base) {
        return base.to_string();
    }
    (1u64..)
        .map(|n| format!("{base} ({n})"))
        .find(|candidate| available(candidate))
        .unwrap_or_else(|| unreachable!("suffix space is unbounded"))
}
