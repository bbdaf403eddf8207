use log::debug;

use crate::consts::{BlockPointer, InodePointer, BLOCK_SIZE, INODES_PER_BLOCK};
use crate::driver::DeviceDriver;
use crate::io::IO;
use crate::structure::inode::Inode;
use crate::util::error::{FsError, Result};
use crate::util::serializable::{ByteSerializable, KnownSize};

/// In-memory mirror of the on-disk inode table. Slot number == inode index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeTable {
    table_index: BlockPointer,
    slots: Vec<Option<Inode>>,
}

impl InodeTable {
    pub fn new(table_index: BlockPointer, inode_count: u32) -> InodeTable {
        InodeTable { table_index, slots: vec![None; inode_count as usize] }
    }

    /// Rebuilds the table from disk, decoding only the slots listed in
    /// `occupied` (normally the used entries of the inode map).
    pub fn read<A: DeviceDriver, I: IntoIterator<Item = InodePointer>>(
        io: &IO<A>,
        table_index: BlockPointer,
        inode_count: u32,
        occupied: I,
    ) -> Result<InodeTable> {
        let mut table = InodeTable::new(table_index, inode_count);

        for index in occupied {
            table.check_index(index)?;
            let inode_block = table.inode_block(index);
            let offset = Self::inode_offset(index);
            debug!("inode {} is in block {} at offset {}", index, inode_block, offset);

            let block = io.read_block(inode_block)?;
            let inode = Inode::from_bytes(&block[offset..offset + Inode::size_on_disk()])?;
            if inode.index != index {
                return Err(FsError::SerializationError(format!(
                    "slot {} holds a record for inode {}",
                    index, inode.index
                )));
            }
            table.slots[index as usize] = Some(inode);
        }

        Ok(table)
    }

    /// Rewrites every table block. Empty slots are written as zeros.
    pub fn write<A: DeviceDriver>(&self, io: &mut IO<A>) -> Result<()> {
        for (i, chunk) in self.slots.chunks(INODES_PER_BLOCK).enumerate() {
            let mut block = vec![0u8; BLOCK_SIZE];
            for (j, slot) in chunk.iter().enumerate() {
                if let Some(inode) = slot {
                    let offset = j * Inode::size_on_disk();
                    block[offset..offset + Inode::size_on_disk()].copy_from_slice(&inode.to_bytes());
                }
            }
            io.write_block(self.table_index + i as BlockPointer, &block)?;
        }
        debug!("inode table written ({} blocks)", self.block_count());
        Ok(())
    }

    pub fn get(&self, index: InodePointer) -> Result<Option<&Inode>> {
        self.check_index(index)?;
        Ok(self.slots[index as usize].as_ref())
    }

    pub(crate) fn get_mut(&mut self, index: InodePointer) -> Result<Option<&mut Inode>> {
        self.check_index(index)?;
        Ok(self.slots[index as usize].as_mut())
    }

    pub(crate) fn insert(&mut self, inode: Inode) -> Result<()> {
        self.check_index(inode.index)?;
        let index = inode.index as usize;
        self.slots[index] = Some(inode);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Inode> {
        self.slots.iter().flatten()
    }

    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn block_count(&self) -> usize {
        (self.slots.len() + INODES_PER_BLOCK - 1) / INODES_PER_BLOCK
    }

    #[inline]
    fn inode_block(&self, index: InodePointer) -> BlockPointer {
        self.table_index + index / INODES_PER_BLOCK as u32
    }

    #[inline]
    fn inode_offset(index: InodePointer) -> usize {
        (index as usize % INODES_PER_BLOCK) * Inode::size_on_disk()
    }

    fn check_index(&self, index: InodePointer) -> Result<()> {
        if index >= self.capacity() {
            return Err(FsError::OutOfBounds { index, capacity: self.capacity() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::memory_drive::MemoryDrive;
    use crate::structure::inode::InodeKind;

    fn io() -> IO<MemoryDrive> {
        IO::new(MemoryDrive::new(8 * 4096, 512)).unwrap()
    }

    #[test]
    fn read_write_table() {
        let mut io = io();
        let mut table = InodeTable::new(3, 32);
        assert_eq!(table.block_count(), 4);

        table.insert(Inode::new(0, InodeKind::Directory, "/").unwrap()).unwrap();
        let mut file = Inode::new(9, InodeKind::File, "foo").unwrap();
        file.push_pointers(&[7]).unwrap();
        file.set_size(5);
        table.insert(file).unwrap();
        table.write(&mut io).unwrap();

        let read = InodeTable::read(&io, 3, 32, vec![0, 9]).unwrap();
        assert_eq!(read, table);
        assert_eq!(read.iter().count(), 2);
    }

    #[test]
    fn slot_placement() {
        let mut io = io();
        let mut table = InodeTable::new(3, 32);
        table.insert(Inode::new(9, InodeKind::File, "foo").unwrap()).unwrap();
        table.write(&mut io).unwrap();

        // inode 9 is the second slot of the second table block
        let bytes = io.device().as_bytes();
        let offset = 4 * 4096 + 512;
        assert_eq!(&bytes[offset + 4..offset + 8], &[9, 0, 0, 0]);
        assert!(bytes[3 * 4096..4 * 4096].iter().all(|byte| *byte == 0));
    }

    #[test]
    fn write_clears_empty_slots() {
        let mut io = io();
        io.write_block(5, &vec![0xff; 4096]).unwrap();
        InodeTable::new(3, 32).write(&mut io).unwrap();
        assert!(io.device().as_bytes()[3 * 4096..7 * 4096].iter().all(|byte| *byte == 0));
    }

    #[test]
    fn rejects_misplaced_record() {
        let mut io = io();
        let mut table = InodeTable::new(3, 32);
        table.insert(Inode::new(2, InodeKind::File, "a").unwrap()).unwrap();
        table.write(&mut io).unwrap();

        let mut block = io.read_block(3).unwrap();
        let record = block[2 * 512..3 * 512].to_vec();
        block[4 * 512..5 * 512].copy_from_slice(&record);
        io.write_block(3, &block).unwrap();

        let error = InodeTable::read(&io, 3, 32, vec![4]).unwrap_err();
        assert!(matches!(error, FsError::SerializationError(_)));
    }

    #[test]
    fn empty_claimed_slot_is_malformed() {
        let io = io();
        let error = InodeTable::read(&io, 3, 32, vec![5]).unwrap_err();
        assert!(matches!(error, FsError::SerializationError(_)));
    }

    #[test]
    fn out_of_bounds() {
        let table = InodeTable::new(3, 32);
        assert!(table.get(31).unwrap().is_none());
        assert!(matches!(table.get(32), Err(FsError::OutOfBounds { index: 32, capacity: 32 })));
    }
}
