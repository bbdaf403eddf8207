use log::debug;

use crate::consts::InodePointer;
use crate::driver::DeviceDriver;
use crate::ops::directory::{validate_name, Directory};
use crate::structure::inode::{Inode, InodeKind};
use crate::structure::Structure;
use crate::util::error::{FsError, Result};

pub struct File {
    index: InodePointer,
}

impl File {
    /// Fails `NotAFile` unless `index` names a regular file.
    pub fn open<A: DeviceDriver>(structure: &Structure<A>, index: InodePointer) -> Result<File> {
        let inode = structure.read_inode(index)?;
        if inode.kind() != InodeKind::File {
            return Err(FsError::NotAFile(index));
        }
        Ok(File { index })
    }

    pub fn get_data<A: DeviceDriver>(&self, structure: &Structure<A>) -> Result<Vec<u8>> {
        structure.read_data(structure.read_inode(self.index)?)
    }
}

/// Creates a child of `parent` and links it in.
///
/// Name, capacity and free-space checks (including room for the parent's
/// new entry) all happen before the first write. After that the order is:
/// inode table, content, bitmaps, parent directory.
pub(crate) fn create_child<A: DeviceDriver>(
    structure: &mut Structure<A>,
    parent: &Directory,
    name: &str,
    kind: InodeKind,
    data: &[u8],
) -> Result<Inode> {
    validate_name(name)?;
    // first fit: create_inode takes the same slot, so the entry can be sized exactly
    let index = structure.inode_map.allocate_one()?;
    let reserve = parent.growth_needed(structure, name, index)?;

    let inode = structure.create_inode(kind, name, data, reserve)?;
    parent.add_entry(structure, name, inode.index())?;

    debug!("created {:?} '{}' as inode {} ({} bytes)", kind, name, inode.index(), inode.size());
    Ok(inode)
}
