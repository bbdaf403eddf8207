//! A very small inode filesystem on a fixed-size block device.
//!
//! Block 0 holds the superblock magic, blocks 1 and 2 the inode and data
//! bitmaps, then come the inode table and the data region. Directories are
//! ordinary inodes whose content is a list of `"<index> <name>"` lines.

pub mod config;
pub mod consts;
pub mod driver;
pub mod fuse;
pub mod io;
pub mod ops;
pub mod structure;
pub mod util;

pub use config::Config;
pub use ops::{DirEntry, FileSystem};
pub use structure::inode::{Inode, InodeKind};
pub use util::error::{FsError, Result};
