//! Attribute projection
//!
//! Turns a namespace node into the stat-like shape the filesystem boundary
//! reports. Only the owner gets any access: read (and search) everywhere,
//! write only on directories and only while deletion is enabled.

use crate::tree::Node;
use std::time::SystemTime;

const OWNER_READ: u16 = 0o400;
const OWNER_WRITE: u16 = 0o200;
const OWNER_EXEC: u16 = 0o100;

/// Node kind as reported to the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
}

/// Stat-like node attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    pub kind: NodeKind,
    pub size: u64,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
    pub crtime: SystemTime,
    /// Permission bits, without file type bits
    pub perm: u16,
    pub nlink: u32,
}

impl Attributes {
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn writable(&self) -> bool {
        self.perm & OWNER_WRITE != 0
    }

    /// Full mode including the file type bits
    pub fn mode(&self) -> u32 {
        let kind = match self.kind {
            NodeKind::Directory => libc::S_IFDIR,
            NodeKind::File => libc::S_IFREG,
        };
        kind as u32 | self.perm as u32
    }
}

/// Project `node` into [`Attributes`].
pub fn project(node: &Node, delete_permitted: bool) -> Attributes {
    match node {
        Node::Directory(dir) => {
            let mut perm = OWNER_READ | OWNER_EXEC;
            if delete_permitted && dir.deletable() {
                perm |= OWNER_WRITE;
            }
            Attributes {
                kind: NodeKind::Directory,
                size: 0,
                atime: dir.created(),
                mtime: dir.created(),
                ctime: dir.created(),
                crtime: dir.created(),
                perm,
                nlink: 2,
            }
        }
        Node::File(file) => Attributes {
            kind: NodeKind::File,
            size: file.size(),
            atime: file.accessed(),
            mtime: file.modified(),
            ctime: file.changed(),
            crtime: file.created(),
            perm: OWNER_READ,
            nlink: 1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crate::tree::TreeBuilder;
    use chrono::{TimeZone, Utc};
    use std::time::{Duration, SystemTime};

    fn tree(deletable: bool) -> crate::tree::Tree {
        let start = Utc.with_ymd_and_hms(2024, 4, 4, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 4, 4, 10, 0, 0).unwrap();
        let record = Record::new("7", 2048, start, end)
            .with_title("Film")
            .with_subtitle("Part One");
        TreeBuilder::default()
            .deletable(deletable)
            .build(vec![record], SystemTime::UNIX_EPOCH + Duration::from_secs(60))
    }

    #[test]
    fn test_file_attributes() {
        let tree = tree(true);
        let attrs = project(tree.resolve("/Film/Film - Part One").unwrap(), true);
        let end: SystemTime = Utc.with_ymd_and_hms(2024, 4, 4, 10, 0, 0).unwrap().into();
        assert_eq!(attrs.kind, NodeKind::File);
        assert_eq!(attrs.size, 2048);
        assert_eq!(attrs.mtime, end);
        assert_eq!(attrs.ctime, end);
        assert_eq!(attrs.atime, attrs.mtime);
        assert_eq!(attrs.perm, 0o400);
        assert!(!attrs.writable());
        assert_eq!(attrs.mode(), libc::S_IFREG as u32 | 0o400);
    }

    #[test]
    fn test_directory_attributes() {
        let tree = tree(false);
        let attrs = project(tree.resolve("/Film").unwrap(), false);
        assert!(attrs.is_dir());
        assert_eq!(attrs.size, 0);
        assert_eq!(attrs.mtime, SystemTime::UNIX_EPOCH + Duration::from_secs(60));
        assert_eq!(attrs.perm, 0o500);
        assert_eq!(attrs.nlink, 2);
    }

    #[test]
    fn test_directory_writable_only_when_delete_enabled() {
        let tree = tree(true);
        assert!(project(tree.root_node(), true).writable());
        assert!(!project(tree.root_node(), false).writable());
        assert!(!project(tree.resolve("/Film/Film - Part One").unwrap(), true).writable());
    }
}
