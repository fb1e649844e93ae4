//! Kernel mount over FUSE
//!
//! The kernel speaks in inodes while [`RecordingFs`] speaks in paths, so this
//! adapter keeps a path <-> inode table and otherwise forwards every call.
//! Inodes are handed out on first sight of a path and kept while the kernel
//! holds a lookup on them. Inodes only seen through `readdir` are dropped the
//! next time a directory is listed against a rebuilt tree.

use crate::attr::{Attributes, NodeKind};
use crate::error::{ApiError, FsError};
use crate::fs::{join, RecordingFs};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, FileType, MountOption, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyStatfs, Request,
};

const ROOT_INODE: u64 = 1;

// establish a block size to report - the recordings do not live on any
// local disk so this only needs to be realistic for tools like du
const BLOCK_SIZE: u32 = 512;

/// Options for the mounted filesystem
#[derive(Debug, Clone)]
pub struct MountConfig {
    /// Owner reported for every node
    pub uid: u32,
    pub gid: u32,
    /// How long the kernel may cache attributes and entries
    pub attr_ttl: Duration,
    pub options: Vec<MountOption>,
}

impl MountConfig {
    /// Build mount options from configuration, defaulting ownership to the
    /// current user.
    pub fn from_config(config: &crate::config::MythfsConfig) -> Self {
        // SAFETY: getuid and getgid cannot fail
        let uid = config.mount.uid.unwrap_or_else(|| unsafe { libc::getuid() });
        let gid = config.mount.gid.unwrap_or_else(|| unsafe { libc::getgid() });
        let mut options = vec![
            MountOption::FSName(config.mount.fs_name.clone()),
            MountOption::Subtype("mythfs".to_string()),
            MountOption::NoDev,
            MountOption::NoSuid,
            MountOption::NoExec,
        ];
        if config.mutation.allow_delete {
            options.push(MountOption::RW);
        } else {
            options.push(MountOption::RO);
        }
        if config.mount.allow_other {
            options.push(MountOption::AllowOther);
        }
        Self {
            uid,
            gid,
            attr_ttl: Duration::from_secs(1),
            options,
        }
    }
}

#[derive(Default)]
struct InodeTable {
    /// inode -> (path, outstanding kernel lookups)
    paths: HashMap<u64, (String, u64)>,
    inodes: HashMap<String, u64>,
    next: u64,
}

impl InodeTable {
    fn new() -> Self {
        let mut table = Self {
            next: ROOT_INODE + 1,
            ..Default::default()
        };
        table.paths.insert(ROOT_INODE, ("/".to_string(), 0));
        table.inodes.insert("/".to_string(), ROOT_INODE);
        table
    }

    fn path(&self, ino: u64) -> Option<String> {
        self.paths.get(&ino).map(|(path, _)| path.clone())
    }

    /// Inode for `path`, allocated on first sight.
    fn inode(&mut self, path: &str) -> u64 {
        if let Some(&ino) = self.inodes.get(path) {
            return ino;
        }
        let ino = self.next;
        self.next += 1;
        self.paths.insert(ino, (path.to_string(), 0));
        self.inodes.insert(path.to_string(), ino);
        ino
    }

    /// Inode for `path`, counting one kernel reference to it.
    fn lookup(&mut self, path: &str) -> u64 {
        let ino = self.inode(path);
        if let Some((_, lookups)) = self.paths.get_mut(&ino) {
            *lookups += 1;
        }
        ino
    }

    /// Drop `count` kernel references, releasing the inode at zero.
    fn forget(&mut self, ino: u64, count: u64) {
        if ino == ROOT_INODE {
            return;
        }
        let Some((path, lookups)) = self.paths.get_mut(&ino) else {
            return;
        };
        *lookups = lookups.saturating_sub(count);
        if *lookups == 0 {
            let path = path.clone();
            self.paths.remove(&ino);
            self.inodes.remove(&path);
        }
    }

    fn forget_path(&mut self, path: &str) {
        if let Some(ino) = self.inodes.remove(path) {
            self.paths.remove(&ino);
        }
    }

    /// Release every inode the kernel holds no reference to.
    fn prune_unreferenced(&mut self) {
        self.paths
            .retain(|&ino, (_, lookups)| ino == ROOT_INODE || *lookups > 0);
        let paths = &self.paths;
        self.inodes.retain(|_, ino| paths.contains_key(ino));
    }

    fn len(&self) -> usize {
        self.paths.len()
    }
}

/// A mountable session over a [`RecordingFs`]
pub struct Session {
    fs: Arc<RecordingFs>,
    config: MountConfig,
    inodes: RwLock<InodeTable>,
    /// Build time of the tree the inode table was last pruned against
    pruned_for: Option<SystemTime>,
}

/// Reply with an error to FUSE and return
macro_rules! err {
    ($reply:ident, $err:expr) => {{
        let err: FsError = $err;
        tracing::debug!("{err}");
        $reply.error(err.errno());
        return;
    }};
}

/// Extract the ok value from a result, or reply with an error in FUSE
macro_rules! unwrap {
    ($reply:ident, $op:expr) => {{
        match $op {
            Ok(r) => r,
            Err(err) => err!($reply, err),
        }
    }};
}

impl Session {
    pub fn new(fs: Arc<RecordingFs>, config: MountConfig) -> Self {
        Self {
            fs,
            config,
            inodes: RwLock::new(InodeTable::new()),
            pruned_for: None,
        }
    }

    /// Mount at `mountpoint` and serve until unmounted.
    pub fn mount(self, mountpoint: &Path) -> Result<(), ApiError> {
        let options = self.config.options.clone();
        tracing::info!(mountpoint = %mountpoint.display(), "Mounting recordings");
        fuser::mount2(self, mountpoint, &options)?;
        Ok(())
    }

    /// Drop inodes left over from superseded trees once a new tree is seen.
    fn prune_after_rebuild(&mut self) {
        let Ok(tree) = self.fs.current_tree() else {
            return;
        };
        if self.pruned_for == Some(tree.built_at()) {
            return;
        }
        let mut inodes = self.inodes.write();
        let before = inodes.len();
        inodes.prune_unreferenced();
        tracing::trace!("pruned {} inodes", before - inodes.len());
        self.pruned_for = Some(tree.built_at());
    }

    fn path_of(&self, ino: u64) -> Result<String, FsError> {
        self.inodes
            .read()
            .path(ino)
            .ok_or_else(|| FsError::NotFound {
                path: format!("<inode {ino}>"),
            })
    }

    fn child_path(&self, parent: u64, name: &OsStr) -> Result<String, FsError> {
        let parent = self.path_of(parent)?;
        let name = name.to_str().ok_or_else(|| FsError::NotFound {
            path: join(&parent, &name.to_string_lossy()),
        })?;
        Ok(join(&parent, name))
    }

    fn file_attr(&self, ino: u64, attrs: &Attributes) -> FileAttr {
        FileAttr {
            ino,
            size: attrs.size,
            blocks: attrs.size.div_ceil(BLOCK_SIZE as u64),
            atime: attrs.atime,
            mtime: attrs.mtime,
            ctime: attrs.ctime,
            crtime: attrs.crtime,
            kind: file_type(attrs.kind),
            perm: attrs.perm,
            nlink: attrs.nlink,
            uid: self.config.uid,
            gid: self.config.gid,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }
}

fn file_type(kind: NodeKind) -> FileType {
    match kind {
        NodeKind::Directory => FileType::Directory,
        NodeKind::File => FileType::RegularFile,
    }
}

// these functions mirror the actual fuse ones and
// so we don't have much control over the shape
#[allow(clippy::too_many_arguments)]
impl fuser::Filesystem for Session {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let parent = unwrap!(reply, self.path_of(parent));
        let Some(name) = name.to_str() else {
            err!(reply, FsError::NotFound {
                path: join(&parent, &name.to_string_lossy()),
            })
        };
        let (path, attrs) = unwrap!(reply, self.fs.lookup(&parent, name));
        let ino = self.inodes.write().lookup(&path);
        tracing::trace!("lookup {path} = {ino}");
        reply.entry(&self.config.attr_ttl, &self.file_attr(ino, &attrs), 0);
    }

    fn forget(&mut self, _req: &Request<'_>, ino: u64, nlookup: u64) {
        self.inodes.write().forget(ino, nlookup);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let path = unwrap!(reply, self.path_of(ino));
        let attrs = unwrap!(reply, self.fs.get_attributes(&path));
        reply.attr(&self.config.attr_ttl, &self.file_attr(ino, &attrs));
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        if flags & (libc::O_WRONLY | libc::O_RDWR) != 0 {
            tracing::debug!("open {flags} = EROFS");
            reply.error(libc::EROFS);
            return;
        }
        let path = unwrap!(reply, self.path_of(ino));
        let fh = unwrap!(reply, self.fs.open_for_read(&path));
        tracing::trace!("open {ino} = {fh}");
        reply.opened(fh, 0);
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Ok(offset) = u64::try_from(offset) else {
            reply.error(libc::EINVAL);
            return;
        };
        let data = unwrap!(reply, self.fs.read_at(fh, offset, size as usize));
        reply.data(&data);
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        // ignore flush because we don't support write operations
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        unwrap!(reply, self.fs.close_handle(fh));
        reply.ok();
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        if offset == 0 {
            self.prune_after_rebuild();
        }
        let path = unwrap!(reply, self.path_of(ino));
        let entries = unwrap!(reply, self.fs.list_directory_plus(&path));

        let mut listing = vec![
            (ino, FileType::Directory, ".".to_string()),
            (ino, FileType::Directory, "..".to_string()),
        ];
        {
            let mut inodes = self.inodes.write();
            for (name, attrs) in entries {
                let child = inodes.inode(&join(&path, &name));
                listing.push((child, file_type(attrs.kind), name));
            }
        }

        // offsets are positions in the listing, so a tree rebuilt between
        // calls can at worst repeat or skip an entry
        let skip = usize::try_from(offset).unwrap_or(0);
        for (i, (child, kind, name)) in listing.into_iter().enumerate().skip(skip) {
            let buffer_full = reply.add(child, (i + 1) as i64, kind, name);
            if buffer_full {
                break;
            }
        }
        reply.ok();
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = unwrap!(reply, self.child_path(parent, name));
        unwrap!(reply, self.fs.unlink(&path));
        self.inodes.write().forget_path(&path);
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        let stats = unwrap!(reply, self.fs.statfs());
        let blocks = stats.bytes.div_ceil(BLOCK_SIZE as u64);
        reply.statfs(
            blocks,
            0,
            0,
            stats.files,
            0,
            BLOCK_SIZE,
            255,
            BLOCK_SIZE,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inode_table() {
        let mut table = InodeTable::new();
        assert_eq!(table.path(ROOT_INODE).as_deref(), Some("/"));
        let a = table.inode("/a");
        assert_eq!(table.inode("/a"), a);
        assert_ne!(table.inode("/b"), a);
        table.forget_path("/a");
        assert!(table.path(a).is_none());
        assert_ne!(table.inode("/a"), a);
    }

    #[test]
    fn test_forget_releases_after_last_lookup() {
        let mut table = InodeTable::new();
        let a = table.lookup("/a");
        assert_eq!(table.lookup("/a"), a);
        table.forget(a, 1);
        assert_eq!(table.path(a).as_deref(), Some("/a"));
        table.forget(a, 1);
        assert!(table.path(a).is_none());

        table.forget(ROOT_INODE, 10);
        assert_eq!(table.path(ROOT_INODE).as_deref(), Some("/"));
    }

    #[test]
    fn test_prune_keeps_referenced_inodes() {
        let mut table = InodeTable::new();
        let held = table.lookup("/held");
        let listed = table.inode("/listed");
        table.prune_unreferenced();

        assert_eq!(table.path(held).as_deref(), Some("/held"));
        assert!(table.path(listed).is_none());
        assert_eq!(table.path(ROOT_INODE).as_deref(), Some("/"));
        assert_eq!(table.len(), 2);
        assert_ne!(table.inode("/listed"), listed);
    }
}
