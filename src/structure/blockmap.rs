use log::debug;

use crate::consts::{BlockPointer, BLOCK_SIZE};
use crate::driver::DeviceDriver;
use crate::io::IO;
use crate::util::error::{FsError, Resource, Result};

const FREE: u8 = 0;
const USED: u8 = 1;

/// First-fit allocation map persisted in a single block, one byte per slot.
///
/// Slot `i` is handed out as `base + i`: the inode map uses a base of 0 so
/// slots are inode indices, the data map uses the start of the data region
/// so slots come out as absolute block numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMap {
    block: BlockPointer,
    base: u32,
    resource: Resource,
    data: Vec<bool>,
}

impl BlockMap {
    pub fn new(block: BlockPointer, base: u32, capacity: u32, resource: Resource) -> BlockMap {
        BlockMap { block, base, resource, data: vec![false; capacity as usize] }
    }

    pub fn read<A: DeviceDriver>(
        io: &IO<A>,
        block: BlockPointer,
        base: u32,
        capacity: u32,
        resource: Resource,
    ) -> Result<BlockMap> {
        let buffer = io.read_block(block)?;
        let mut data = Vec::with_capacity(capacity as usize);
        for (i, byte) in buffer[..capacity as usize].iter().enumerate() {
            match *byte {
                FREE => data.push(false),
                USED => data.push(true),
                other => {
                    return Err(FsError::SerializationError(format!(
                        "{} map slot {} holds {:#04x}",
                        resource, i, other
                    )))
                }
            }
        }
        Ok(BlockMap { block, base, resource, data })
    }

    pub fn write<A: DeviceDriver>(&self, io: &mut IO<A>) -> Result<()> {
        let mut buffer = vec![FREE; BLOCK_SIZE];
        for (i, used) in self.data.iter().enumerate() {
            if *used {
                buffer[i] = USED;
            }
        }
        debug!("persisting {} map ({} used)", self.resource, self.used_count());
        io.write_block(self.block, &buffer)
    }

    /// Lowest `count` free slots, left to right. Nothing is marked: the caller
    /// commits with `mark_used` once the whole operation is known to fit.
    pub fn allocate(&self, count: usize) -> Result<Vec<u32>> {
        let found: Vec<u32> = self
            .data
            .iter()
            .enumerate()
            .filter(|(_, used)| !**used)
            .take(count)
            .map(|(i, _)| self.base + i as u32)
            .collect();

        if found.len() < count {
            return Err(FsError::ResourceExhausted(self.resource));
        }

        debug!("found {} free {}: {:?}", count, self.resource, found);
        Ok(found)
    }

    pub fn allocate_one(&self) -> Result<u32> {
        let found = self.allocate(1)?;
        Ok(found[0])
    }

    pub fn is_used(&self, pointer: u32) -> bool {
        match self.slot(pointer) {
            Ok(slot) => self.data[slot],
            Err(_) => false,
        }
    }

    pub fn is_free(&self, pointer: u32) -> bool {
        !self.is_used(pointer)
    }

    pub fn mark_used(&mut self, pointer: u32) -> Result<()> {
        let slot = self.slot(pointer)?;
        self.data[slot] = true;
        Ok(())
    }

    pub fn mark_free(&mut self, pointer: u32) -> Result<()> {
        let slot = self.slot(pointer)?;
        self.data[slot] = false;
        Ok(())
    }

    /// Used pointers in ascending order.
    pub fn used(&self) -> impl Iterator<Item = u32> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, used)| **used)
            .map(move |(i, _)| self.base + i as u32)
    }

    pub fn used_count(&self) -> usize {
        self.data.iter().filter(|used| **used).count()
    }

    pub fn free_count(&self) -> usize {
        self.data.len() - self.used_count()
    }

    pub fn capacity(&self) -> u32 {
        self.data.len() as u32
    }

    fn slot(&self, pointer: u32) -> Result<usize> {
        if pointer < self.base || pointer - self.base >= self.capacity() {
            return Err(FsError::OutOfBounds { index: pointer, capacity: self.capacity() });
        }
        Ok((pointer - self.base) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::memory_drive::MemoryDrive;

    fn io() -> IO<MemoryDrive> {
        IO::new(MemoryDrive::new(8 * 4096, 512)).unwrap()
    }

    #[test]
    fn read_write() {
        let mut io = io();
        let mut blockmap = BlockMap::new(2, 7, 32, Resource::DataBlock);
        blockmap.mark_used(7).unwrap();
        blockmap.mark_used(38).unwrap();
        blockmap.write(&mut io).unwrap();

        let bytes = &io.device().as_bytes()[2 * 4096..3 * 4096];
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes[31], 1);
        assert_eq!(bytes.iter().filter(|byte| **byte != 0).count(), 2);

        let read = BlockMap::read(&io, 2, 7, 32, Resource::DataBlock).unwrap();
        assert_eq!(read, blockmap);
    }

    #[test]
    fn allocate_first_fit() {
        let mut blockmap = BlockMap::new(1, 0, 8, Resource::InodeSlot);
        blockmap.mark_used(0).unwrap();
        blockmap.mark_used(2).unwrap();

        assert_eq!(blockmap.allocate_one().unwrap(), 1);
        assert_eq!(blockmap.allocate(3).unwrap(), vec![1, 3, 4]);
        assert_eq!(blockmap.allocate(0).unwrap(), Vec::<u32>::new());

        // allocation alone commits nothing
        assert!(blockmap.is_free(1));
        assert_eq!(blockmap.used_count(), 2);
    }

    #[test]
    fn allocate_applies_base() {
        let mut blockmap = BlockMap::new(2, 7, 4, Resource::DataBlock);
        blockmap.mark_used(7).unwrap();
        assert_eq!(blockmap.allocate(2).unwrap(), vec![8, 9]);
        assert_eq!(blockmap.used().collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn exhaustion_commits_nothing() {
        let mut blockmap = BlockMap::new(2, 7, 4, Resource::DataBlock);
        blockmap.mark_used(8).unwrap();
        let before = blockmap.clone();

        let error = blockmap.allocate(4).unwrap_err();
        assert!(matches!(error, FsError::ResourceExhausted(Resource::DataBlock)));
        assert_eq!(blockmap, before);
        assert_eq!(blockmap.free_count(), 3);
    }

    #[test]
    fn mark_free() {
        let mut blockmap = BlockMap::new(1, 0, 8, Resource::InodeSlot);
        let index = blockmap.allocate_one().unwrap();
        blockmap.mark_used(index).unwrap();
        assert!(blockmap.is_used(index));
        blockmap.mark_free(index).unwrap();
        assert!(blockmap.is_free(index));
    }

    #[test]
    fn out_of_range_pointers() {
        let mut blockmap = BlockMap::new(2, 7, 4, Resource::DataBlock);
        assert!(matches!(blockmap.mark_used(6), Err(FsError::OutOfBounds { .. })));
        assert!(matches!(blockmap.mark_used(11), Err(FsError::OutOfBounds { .. })));
        assert!(!blockmap.is_used(0));
    }

    #[test]
    fn rejects_garbage_bytes() {
        let mut io = io();
        let mut block = vec![0; 4096];
        block[3] = 0x7f;
        io.write_block(1, &block).unwrap();
        let error = BlockMap::read(&io, 1, 0, 32, Resource::InodeSlot).unwrap_err();
        assert!(matches!(error, FsError::SerializationError(_)));

        // bytes past the capacity are padding
        let mut block = vec![0; 4096];
        block[40] = 0x7f;
        io.write_block(1, &block).unwrap();
        assert!(BlockMap::read(&io, 1, 0, 32, Resource::InodeSlot).is_ok());
    }
}
