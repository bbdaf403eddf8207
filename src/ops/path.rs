use crate::consts::{InodePointer, ROOT_INODE};
use crate::driver::DeviceDriver;
use crate::ops::directory::Directory;
use crate::structure::Structure;
use crate::util::error::{FsError, Result};

pub const SEPARATOR: char = '/';

/// Splits an absolute path into its segments. `"/"` has none.
pub fn split(path: &str) -> Result<Vec<&str>> {
    let relative = path
        .strip_prefix(SEPARATOR)
        .ok_or_else(|| FsError::InvalidPath(format!("{:?} is not absolute", path)))?;

    if relative.is_empty() {
        return Ok(Vec::new());
    }

    let segments: Vec<&str> = relative.split(SEPARATOR).collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(FsError::InvalidPath(format!("{:?} has an empty segment", path)));
    }
    Ok(segments)
}

/// Walks `segments` from the root. Each step must be a directory holding the
/// next name.
fn walk<A: DeviceDriver>(structure: &Structure<A>, segments: &[&str]) -> Result<InodePointer> {
    let mut current = ROOT_INODE;

    for (i, segment) in segments.iter().enumerate() {
        let directory = open_directory(structure, current, &segments[..i])?;
        current = directory
            .lookup(structure, segment)?
            .ok_or_else(|| FsError::NotFound(join(&segments[..=i])))?;
    }

    Ok(current)
}

/// Like `Directory::open`, but a type mismatch reports the path walked so far.
fn open_directory<A: DeviceDriver>(structure: &Structure<A>, index: InodePointer, visited: &[&str]) -> Result<Directory> {
    Directory::open(structure, index).map_err(|error| match error {
        FsError::NotADirectory(_) => FsError::NotADirectory(join(visited)),
        other => other,
    })
}

fn join(segments: &[&str]) -> String {
    if segments.is_empty() {
        return SEPARATOR.to_string();
    }
    segments.iter().map(|segment| format!("{}{}", SEPARATOR, segment)).collect()
}

pub fn resolve<A: DeviceDriver>(structure: &Structure<A>, path: &str) -> Result<InodePointer> {
    walk(structure, &split(path)?)
}

/// Resolves everything but the last segment and returns the containing
/// directory together with that last segment.
pub fn resolve_parent<'p, A: DeviceDriver>(structure: &Structure<A>, path: &'p str) -> Result<(Directory, &'p str)> {
    let segments = split(path)?;
    let (name, parents) = segments
        .split_last()
        .ok_or_else(|| FsError::InvalidPath(format!("{:?} has no final segment", path)))?;

    let parent = walk(structure, parents)?;
    Ok((open_directory(structure, parent, parents)?, *name))
}
