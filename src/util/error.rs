use std::fmt;
use std::io;
use std::os::raw::c_int;

use thiserror::Error;

use crate::consts::InodePointer;

pub type ErrorNum = c_int;

pub type Result<T> = std::result::Result<T, FsError>;

/// Which bitmap ran dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    InodeSlot,
    DataBlock,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::InodeSlot => write!(f, "inode slots"),
            Resource::DataBlock => write!(f, "data blocks"),
        }
    }
}

#[derive(Error, Debug)]
pub enum FsError {
    #[error("corrupt filesystem: {0}")]
    CorruptFilesystem(String),
    #[error("index {index} out of bounds (capacity {capacity})")]
    OutOfBounds { index: u32, capacity: u32 },
    #[error("no free {0} left")]
    ResourceExhausted(Resource),
    #[error("{0}: no such file or directory")]
    NotFound(String),
    #[error("{0}: not a directory")]
    NotADirectory(String),
    #[error("inode {0} is not a file")]
    NotAFile(InodePointer),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("name is {length} bytes long, at most {limit} are allowed")]
    NameTooLong { length: usize, limit: usize },
    #[error("{required} blocks required, an inode holds at most {limit}")]
    CapacityExceeded { required: usize, limit: usize },
    #[error("malformed record: {0}")]
    SerializationError(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FsError {
    pub fn errno(&self) -> ErrorNum {
        match self {
            FsError::NotFound(_) | FsError::OutOfBounds { .. } => libc::ENOENT,
            FsError::NotADirectory(_) => libc::ENOTDIR,
            FsError::NotAFile(_) => libc::EISDIR,
            FsError::ResourceExhausted(_) => libc::ENOSPC,
            FsError::NameTooLong { .. } => libc::ENAMETOOLONG,
            FsError::CapacityExceeded { .. } => libc::EFBIG,
            FsError::InvalidPath(_) | FsError::InvalidConfig(_) => libc::EINVAL,
            FsError::CorruptFilesystem(_) | FsError::SerializationError(_) => libc::EIO,
            FsError::Io(error) => error.raw_os_error().unwrap_or(libc::EIO),
        }
    }
}
