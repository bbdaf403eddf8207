use log::debug;

use crate::consts::InodePointer;
use crate::driver::DeviceDriver;
use crate::ops::path::SEPARATOR;
use crate::structure::inode::{check_name_length, Inode, InodeKind};
use crate::structure::Structure;
use crate::util::error::{FsError, Result};
use crate::util::serializable::ByteSerializable;

const FIELD_SEPARATOR: char = ' ';
const RECORD_SEPARATOR: char = '\n';

/// One line of a directory: `"<index> <name>\n"`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Entry {
    pub name: String,
    pub index: InodePointer,
}

impl Entry {
    fn to_line(&self) -> String {
        format!("{}{}{}{}", self.index, FIELD_SEPARATOR, self.name, RECORD_SEPARATOR)
    }
}

pub type EntryList = Vec<Entry>;

impl ByteSerializable for EntryList {
    fn to_bytes(&self) -> Vec<u8> {
        self.iter().map(Entry::to_line).collect::<String>().into_bytes()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| FsError::SerializationError("directory content is not UTF-8".into()))?;

        let mut entries = EntryList::new();
        if text.is_empty() {
            return Ok(entries);
        }

        let body = text.strip_suffix(RECORD_SEPARATOR).unwrap_or(text);
        for line in body.split(RECORD_SEPARATOR) {
            let (index, name) = line
                .split_once(FIELD_SEPARATOR)
                .ok_or_else(|| FsError::SerializationError(format!("invalid line in directory: {:?}", line)))?;
            let index = index
                .parse::<InodePointer>()
                .map_err(|_| FsError::SerializationError(format!("invalid inode index in directory: {:?}", index)))?;
            if name.is_empty() || name.contains(FIELD_SEPARATOR) {
                return Err(FsError::SerializationError(format!("invalid name in directory: {:?}", name)));
            }
            entries.push(Entry { name: name.to_string(), index });
        }

        Ok(entries)
    }
}

/// First entry called `name`. Later duplicates are shadowed.
pub fn lookup(entries: &[Entry], name: &str) -> Option<InodePointer> {
    entries.iter().find(|entry| entry.name == name).map(|entry| entry.index)
}

/// Names have to survive the line format: no separators, not empty, and
/// short enough for the inode's name field.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(FsError::InvalidPath("empty name".into()));
    }
    if name.contains(|c: char| c == SEPARATOR || c == FIELD_SEPARATOR || c == RECORD_SEPARATOR) {
        return Err(FsError::InvalidPath(format!("{:?} contains a reserved character", name)));
    }
    check_name_length(name)
}

pub struct Directory {
    pub(crate) index: InodePointer,
}

impl Directory {
    /// Fails `NotADirectory` unless `index` names a directory inode.
    pub fn open<A: DeviceDriver>(structure: &Structure<A>, index: InodePointer) -> Result<Directory> {
        let inode = structure.read_inode(index)?;
        if inode.kind() != InodeKind::Directory {
            return Err(FsError::NotADirectory(inode.name().to_string()));
        }
        Ok(Directory { index })
    }

    pub fn get_entries<A: DeviceDriver>(&self, structure: &Structure<A>) -> Result<EntryList> {
        let inode = structure.read_inode(self.index)?;
        let data = structure.read_data(inode)?;
        EntryList::from_bytes(&data)
    }

    pub fn lookup<A: DeviceDriver>(&self, structure: &Structure<A>, name: &str) -> Result<Option<InodePointer>> {
        Ok(lookup(&self.get_entries(structure)?, name))
    }

    /// Data blocks the directory would have to grow by to take the entry
    /// `index name`.
    pub fn growth_needed<A: DeviceDriver>(&self, structure: &Structure<A>, name: &str, index: InodePointer) -> Result<usize> {
        let inode = structure.read_inode(self.index)?;
        let line = Entry { name: name.to_string(), index }.to_line();
        inode.block_deficit(inode.size() as usize + line.len())
    }

    /// Appends one entry and persists the directory, growing its block list
    /// when the new content spills into another block.
    pub fn add_entry<A: DeviceDriver>(&self, structure: &mut Structure<A>, name: &str, index: InodePointer) -> Result<()> {
        validate_name(name)?;

        let inode = structure.read_inode(self.index)?;
        let mut data = structure.read_data(inode)?;
        data.extend_from_slice(Entry { name: name.to_string(), index }.to_line().as_bytes());

        debug!("directory {} gets entry {} -> {}", self.index, name, index);
        structure.rewrite_data(self.index, &data)
    }

    pub fn inode<'a, A: DeviceDriver>(&self, structure: &'a Structure<A>) -> Result<&'a Inode> {
        structure.read_inode(self.index)
    }
}
