use log::{debug, info};

use crate::config::Config;
use crate::consts::{
    BlockPointer, InodePointer, BLOCK_SIZE, DATA_MAP_INDEX, INODE_MAP_INDEX, INODE_TABLE_INDEX, ROOT_INODE,
    ROOT_NAME,
};
use crate::driver::DeviceDriver;
use crate::io::IO;
use crate::structure::blockmap::BlockMap;
use crate::structure::inode::{Inode, InodeKind};
use crate::structure::inode_table::InodeTable;
use crate::structure::superblock::SuperBlock;
use crate::util::error::{FsError, Resource, Result};

pub mod blockmap;
pub mod inode;
pub mod inode_table;
pub mod superblock;

/// Everything that lives on disk, mirrored in memory. Every mutation is
/// written through before the call returns.
///
/// Multi-block updates are not atomic: an I/O failure half way leaves the
/// device in whatever state the completed writes produced.
pub struct Structure<A: DeviceDriver> {
    pub(crate) io: IO<A>,
    pub(crate) config: Config,
    pub(crate) superblock: SuperBlock,
    pub(crate) inode_map: BlockMap,
    pub(crate) data_map: BlockMap,
    pub(crate) inode_table: InodeTable,
}

impl<A: DeviceDriver> Structure<A> {
    /// Lays out a fresh filesystem: superblock, bitmaps, and an inode table
    /// holding only the root directory.
    pub fn new(device: A, config: Config) -> Result<Structure<A>> {
        let mut io = IO::new(device)?;
        config.check_device(io.get_block_count())?;

        let superblock = SuperBlock::new();
        superblock.write(&mut io)?;

        let mut inode_map = BlockMap::new(INODE_MAP_INDEX, 0, config.inode_count(), Resource::InodeSlot);
        let data_map =
            BlockMap::new(DATA_MAP_INDEX, config.data_start(), config.data_block_count(), Resource::DataBlock);
        let mut inode_table = InodeTable::new(INODE_TABLE_INDEX, config.inode_count());

        inode_table.insert(Inode::new(ROOT_INODE, InodeKind::Directory, ROOT_NAME)?)?;
        inode_map.mark_used(ROOT_INODE)?;

        inode_map.write(&mut io)?;
        data_map.write(&mut io)?;
        inode_table.write(&mut io)?;

        info!(
            "formatted {} inodes, {} data blocks starting at block {}",
            config.inode_count(),
            config.data_block_count(),
            config.data_start()
        );
        Ok(Structure { io, config, superblock, inode_map, data_map, inode_table })
    }

    pub fn mount(device: A, config: Config) -> Result<Structure<A>> {
        let io = IO::new(device)?;
        config.check_device(io.get_block_count())?;

        let superblock = SuperBlock::read(&io)?;
        let inode_map = BlockMap::read(&io, INODE_MAP_INDEX, 0, config.inode_count(), Resource::InodeSlot)?;
        let data_map = BlockMap::read(
            &io,
            DATA_MAP_INDEX,
            config.data_start(),
            config.data_block_count(),
            Resource::DataBlock,
        )?;
        let inode_table = InodeTable::read(&io, INODE_TABLE_INDEX, config.inode_count(), inode_map.used())?;

        match inode_table.get(ROOT_INODE)? {
            Some(root) if root.is_directory() => {}
            Some(_) => return Err(FsError::CorruptFilesystem("root inode is not a directory".into())),
            None => return Err(FsError::CorruptFilesystem("root inode is missing".into())),
        }

        info!(
            "mounted: {} inodes used, {} data blocks used",
            inode_map.used_count(),
            data_map.used_count()
        );
        Ok(Structure { io, config, superblock, inode_map, data_map, inode_table })
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    pub fn get_block_size(&self) -> usize {
        self.io.get_block_size()
    }

    pub fn get_inode(&self, index: InodePointer) -> Result<Option<&Inode>> {
        self.inode_table.get(index)
    }

    /// Like `get_inode`, but an empty slot is `NotFound`.
    pub fn read_inode(&self, index: InodePointer) -> Result<&Inode> {
        self.inode_table.get(index)?.ok_or_else(|| FsError::NotFound(format!("inode {}", index)))
    }

    /// Content of any inode, truncated to its recorded size.
    pub fn read_data(&self, inode: &Inode) -> Result<Vec<u8>> {
        let mut result = Vec::with_capacity(inode.used_pointers() * BLOCK_SIZE);
        for pointer in inode.pointers() {
            result.append(&mut self.io.read_block(*pointer)?);
        }
        result.truncate(inode.size() as usize);
        Ok(result)
    }

    /// Writes `data` over the inode's blocks, zero-padding the last one.
    pub(crate) fn write_data(&mut self, inode: &Inode, data: &[u8]) -> Result<()> {
        let required = Inode::blocks_for(data.len());
        if required > inode.used_pointers() {
            return Err(FsError::CapacityExceeded { required, limit: inode.used_pointers() });
        }

        for (chunk, pointer) in data.chunks(BLOCK_SIZE).zip(inode.pointers()) {
            let mut block = chunk.to_vec();
            block.resize(BLOCK_SIZE, 0);
            self.io.write_block(*pointer, &block)?;
        }
        Ok(())
    }

    /// Creates and persists a new inode holding `data`. `reserve` extra data
    /// blocks must stay available for the caller's follow-up (the parent
    /// directory growing), so a shortage is reported before anything is
    /// written.
    pub(crate) fn create_inode(&mut self, kind: InodeKind, name: &str, data: &[u8], reserve: usize) -> Result<Inode> {
        let mut inode = Inode::new(0, kind, name)?;
        let block_count = inode.block_deficit(data.len())?;

        let index = self.inode_map.allocate_one()?;
        let pointers = self.data_map.allocate(block_count)?;
        if self.data_map.free_count() < block_count + reserve {
            return Err(FsError::ResourceExhausted(Resource::DataBlock));
        }

        inode.index = index;
        inode.push_pointers(&pointers)?;
        inode.set_size(data.len() as u32);
        debug!("creating {:?} inode {} '{}' with blocks {:?}", kind, index, name, pointers);

        self.inode_table.insert(inode.clone())?;
        self.inode_table.write(&mut self.io)?;

        self.write_data(&inode, data)?;

        self.inode_map.mark_used(index)?;
        for pointer in &pointers {
            self.data_map.mark_used(*pointer)?;
        }
        self.persist_maps()?;

        Ok(inode)
    }

    /// Replaces an inode's content, growing its block list first when the new
    /// content needs more blocks than it owns.
    pub(crate) fn rewrite_data(&mut self, index: InodePointer, data: &[u8]) -> Result<()> {
        let deficit = self.read_inode(index)?.block_deficit(data.len())?;
        let new_blocks = self.data_map.allocate(deficit)?;

        let inode = self
            .inode_table
            .get_mut(index)?
            .ok_or_else(|| FsError::NotFound(format!("inode {}", index)))?;
        inode.push_pointers(&new_blocks)?;
        inode.set_size(data.len() as u32);
        let inode = inode.clone();
        if !new_blocks.is_empty() {
            debug!("inode {} grows by blocks {:?}", index, new_blocks);
        }

        self.inode_table.write(&mut self.io)?;
        self.write_data(&inode, data)?;

        if !new_blocks.is_empty() {
            for pointer in &new_blocks {
                self.data_map.mark_used(*pointer)?;
            }
            self.data_map.write(&mut self.io)?;
        }
        Ok(())
    }

    pub(crate) fn persist_maps(&mut self) -> Result<()> {
        self.inode_map.write(&mut self.io)?;
        self.data_map.write(&mut self.io)
    }

    pub fn free_data_blocks(&self) -> usize {
        self.data_map.free_count()
    }

    pub fn data_start(&self) -> BlockPointer {
        self.config.data_start()
    }
}
