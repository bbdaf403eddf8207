use crate::consts::{
    BlockPointer, DirectPointers, InodePointer, BLOCK_SIZE, DIRECT_POINTERS, FILE_NAME_LENGTH,
    INODE_SIZE, NULL_POINTER,
};
use crate::util::error::{FsError, Result};
use crate::util::serializable::{ByteSerializable, KnownSize};

// slot layout, little-endian
const SIZE_OFFSET: usize = 0;
const INDEX_OFFSET: usize = 4;
const KIND_OFFSET: usize = 8;
const POINTERS_OFFSET: usize = 12;
const NAME_LENGTH_OFFSET: usize = POINTERS_OFFSET + DIRECT_POINTERS * 4;
const NAME_OFFSET: usize = NAME_LENGTH_OFFSET + 1;

#[repr(u8)]
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum InodeKind {
    File = 1,
    Directory = 2,
}

impl InodeKind {
    fn from_byte(byte: u8) -> Result<InodeKind> {
        match byte {
            1 => Ok(InodeKind::File),
            2 => Ok(InodeKind::Directory),
            other => Err(FsError::SerializationError(format!("unknown inode kind {}", other))),
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Inode {
    pub(crate) size: u32,
    pub(crate) index: InodePointer,
    pub(crate) kind: InodeKind,
    pub(crate) pointers: DirectPointers,
    pub(crate) name: String,
}

impl Inode {
    /// Empty inode with no blocks. Fails `NameTooLong` instead of truncating.
    pub fn new(index: InodePointer, kind: InodeKind, name: &str) -> Result<Inode> {
        check_name_length(name)?;
        Ok(Inode { size: 0, index, kind, pointers: [NULL_POINTER; DIRECT_POINTERS], name: name.to_string() })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn index(&self) -> InodePointer {
        self.index
    }

    pub fn kind(&self) -> InodeKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_directory(&self) -> bool {
        self.kind == InodeKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == InodeKind::File
    }

    /// Allocated block numbers, in content order.
    pub fn pointers(&self) -> &[BlockPointer] {
        &self.pointers[..self.used_pointers()]
    }

    pub fn used_pointers(&self) -> usize {
        count_used_pointers(&self.pointers)
    }

    /// Blocks needed to hold `size` bytes.
    pub fn blocks_for(size: usize) -> usize {
        (size + BLOCK_SIZE - 1) / BLOCK_SIZE
    }

    /// Blocks that must be added before the content can grow to `size`.
    pub fn block_deficit(&self, size: usize) -> Result<usize> {
        let required = Inode::blocks_for(size);
        if required > DIRECT_POINTERS {
            return Err(FsError::CapacityExceeded { required, limit: DIRECT_POINTERS });
        }
        Ok(required.saturating_sub(self.used_pointers()))
    }

    pub(crate) fn push_pointers(&mut self, pointers: &[BlockPointer]) -> Result<()> {
        let used = self.used_pointers();
        let required = used + pointers.len();
        if required > DIRECT_POINTERS {
            return Err(FsError::CapacityExceeded { required, limit: DIRECT_POINTERS });
        }
        self.pointers[used..required].copy_from_slice(pointers);
        Ok(())
    }

    pub(crate) fn set_size(&mut self, size: u32) {
        self.size = size;
    }
}

pub(crate) fn check_name_length(name: &str) -> Result<()> {
    if name.len() > FILE_NAME_LENGTH {
        return Err(FsError::NameTooLong { length: name.len(), limit: FILE_NAME_LENGTH });
    }
    Ok(())
}

fn count_used_pointers(pointers: &DirectPointers) -> usize {
    pointers.iter().take_while(|pointer| **pointer != NULL_POINTER).count()
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

impl KnownSize for Inode {
    fn size_on_disk() -> usize {
        INODE_SIZE
    }
}

impl ByteSerializable for Inode {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; INODE_SIZE];
        bytes[SIZE_OFFSET..SIZE_OFFSET + 4].copy_from_slice(&self.size.to_le_bytes());
        bytes[INDEX_OFFSET..INDEX_OFFSET + 4].copy_from_slice(&self.index.to_le_bytes());
        bytes[KIND_OFFSET] = self.kind as u8;
        for (i, pointer) in self.pointers.iter().enumerate() {
            let offset = POINTERS_OFFSET + i * 4;
            bytes[offset..offset + 4].copy_from_slice(&pointer.to_le_bytes());
        }
        let name = self.name.as_bytes();
        bytes[NAME_LENGTH_OFFSET] = name.len() as u8;
        bytes[NAME_OFFSET..NAME_OFFSET + name.len()].copy_from_slice(name);
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Inode> {
        if bytes.len() < INODE_SIZE {
            return Err(FsError::SerializationError(format!(
                "inode record is {} bytes, expected {}",
                bytes.len(),
                INODE_SIZE
            )));
        }

        let size = read_u32(bytes, SIZE_OFFSET);
        let index = read_u32(bytes, INDEX_OFFSET);
        let kind = InodeKind::from_byte(bytes[KIND_OFFSET])?;

        let mut pointers = [NULL_POINTER; DIRECT_POINTERS];
        for (i, pointer) in pointers.iter_mut().enumerate() {
            *pointer = read_u32(bytes, POINTERS_OFFSET + i * 4);
        }
        let used = count_used_pointers(&pointers);
        if pointers[used..].iter().any(|pointer| *pointer != NULL_POINTER) {
            return Err(FsError::SerializationError(format!("inode {} has a gap in its block list", index)));
        }
        if Inode::blocks_for(size as usize) > used {
            return Err(FsError::SerializationError(format!(
                "inode {} claims {} bytes but owns {} blocks",
                index, size, used
            )));
        }

        let name_length = bytes[NAME_LENGTH_OFFSET] as usize;
        if name_length > FILE_NAME_LENGTH {
            return Err(FsError::SerializationError(format!("inode {} name length {}", index, name_length)));
        }
        let name = std::str::from_utf8(&bytes[NAME_OFFSET..NAME_OFFSET + name_length])
            .map_err(|_| FsError::SerializationError(format!("inode {} name is not UTF-8", index)))?
            .to_string();

        Ok(Inode { size, index, kind, pointers, name })
    }
}
