use std::collections::HashMap;
use std::ffi::OsStr;
use std::time::{Duration, UNIX_EPOCH};

use fuser::{FileAttr, FileType, Filesystem, ReplyAttr, ReplyData, ReplyDirectory, ReplyEntry, Request};
use log::warn;

use crate::consts::{InodePointer, BLOCK_SIZE, ROOT_INODE};
use crate::driver::DeviceDriver;
use crate::ops::{DirEntry, FileSystem};
use crate::structure::inode::{Inode, InodeKind};
use crate::util::error::Result;

const TTL: Duration = Duration::from_secs(1);
const SECTOR_SIZE: u64 = 512;

// FUSE reserves inode number 0 and gives the root number 1
fn to_ino(index: InodePointer) -> u64 {
    index as u64 + 1
}

fn to_index(ino: u64) -> Option<InodePointer> {
    ino.checked_sub(1).and_then(|index| InodePointer::try_from(index).ok())
}

/// Read-only view of a filesystem for the kernel.
pub struct FuseDriver<A: DeviceDriver> {
    fs: FileSystem<A>,
    // directory -> parent, learned from lookups and listings
    parents: HashMap<InodePointer, InodePointer>,
    uid: u32,
    gid: u32,
}

impl<A: DeviceDriver> FuseDriver<A> {
    pub fn new(fs: FileSystem<A>) -> FuseDriver<A> {
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
        FuseDriver { fs, parents: HashMap::new(), uid, gid }
    }

    /// Lists `index` and remembers it as the parent of every directory in it.
    fn children(&mut self, index: InodePointer) -> Result<Vec<DirEntry>> {
        let listing = self.fs.read_directory(index)?;
        for entry in listing.iter().filter(|entry| entry.inode.is_directory()) {
            self.parents.insert(entry.inode.index(), index);
        }
        Ok(listing)
    }

    /// The root is its own parent. A directory the kernel reached without a
    /// lookup through us falls back to the root.
    fn parent_of(&self, index: InodePointer) -> InodePointer {
        self.parents.get(&index).copied().unwrap_or(ROOT_INODE)
    }

    fn inode_to_fileattr(&self, inode: &Inode) -> FileAttr {
        let (kind, perm, nlink) = match inode.kind() {
            InodeKind::File => (FileType::RegularFile, 0o444, 1),
            InodeKind::Directory => (FileType::Directory, 0o555, 2),
        };

        FileAttr {
            ino: to_ino(inode.index()),
            size: inode.size() as u64,
            blocks: inode.used_pointers() as u64 * BLOCK_SIZE as u64 / SECTOR_SIZE,
            atime: UNIX_EPOCH,
            mtime: UNIX_EPOCH,
            ctime: UNIX_EPOCH,
            crtime: UNIX_EPOCH,
            kind,
            perm,
            nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            flags: 0,
            blksize: BLOCK_SIZE as u32,
        }
    }
}

impl<A: DeviceDriver> Filesystem for FuseDriver<A> {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let name = match name.to_str() {
            Some(name) => name,
            None => return reply.error(libc::ENOENT),
        };

        let parent = match to_index(parent) {
            Some(parent) => parent,
            None => return reply.error(libc::ENOENT),
        };
        let listing = match self.children(parent) {
            Ok(listing) => listing,
            Err(error) => return reply.error(error.errno()),
        };

        match listing.iter().find(|entry| entry.name == name) {
            Some(entry) => reply.entry(&TTL, &self.inode_to_fileattr(&entry.inode), 0),
            None => reply.error(libc::ENOENT),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        let index = match to_index(ino) {
            Some(index) => index,
            None => return reply.error(libc::ENOENT),
        };
        match self.fs.get_inode(index) {
            Ok(Some(inode)) => reply.attr(&TTL, &self.inode_to_fileattr(inode)),
            Ok(None) => reply.error(libc::ENOENT),
            Err(error) => reply.error(error.errno()),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let index = match to_index(ino) {
            Some(index) => index,
            None => return reply.error(libc::ENOENT),
        };
        match self.fs.read_file(index) {
            Ok(data) => {
                let start = (offset.max(0) as usize).min(data.len());
                let end = (start + size as usize).min(data.len());
                reply.data(&data[start..end]);
            }
            Err(error) => {
                warn!("read of inode {} failed: {}", index, error);
                reply.error(error.errno())
            }
        }
    }

    fn readdir(&mut self, _req: &Request<'_>, ino: u64, _fh: u64, offset: i64, mut reply: ReplyDirectory) {
        let index = match to_index(ino) {
            Some(index) => index,
            None => return reply.error(libc::ENOENT),
        };
        let listing = match self.children(index) {
            Ok(listing) => listing,
            Err(error) => return reply.error(error.errno()),
        };

        let parent = to_ino(self.parent_of(index));
        let mut entries = vec![(ino, FileType::Directory, ".".to_string()), (parent, FileType::Directory, "..".to_string())];
        for entry in listing {
            let kind = match entry.inode.kind() {
                InodeKind::File => FileType::RegularFile,
                InodeKind::Directory => FileType::Directory,
            };
            entries.push((to_ino(entry.inode.index()), kind, entry.name));
        }

        for (i, (ino, kind, name)) in entries.into_iter().enumerate().skip(offset.max(0) as usize) {
            // the offset handed back is where the next call resumes
            if reply.add(ino, (i + 1) as i64, kind, name) {
                break;
            }
        }
        reply.ok();
    }
}
