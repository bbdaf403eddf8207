use crate::consts::{BlockPointer, BLOCK_SIZE, INODES_PER_BLOCK, INODE_TABLE_INDEX};
use crate::util::error::{FsError, Result};

const DEFAULT_INODE_COUNT: u32 = 32;
const DEFAULT_DATA_BLOCK_COUNT: u32 = 32;

/// Capacities chosen at format time.
///
/// Nothing but the magic is stored in the superblock, so a device has to be
/// loaded with the same `Config` it was formatted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    inode_count: u32,
    data_block_count: u32,
}

impl Default for Config {
    fn default() -> Config {
        Config { inode_count: DEFAULT_INODE_COUNT, data_block_count: DEFAULT_DATA_BLOCK_COUNT }
    }
}

impl Config {
    pub fn new(inode_count: u32, data_block_count: u32) -> Result<Config> {
        if inode_count == 0 {
            return Err(FsError::InvalidConfig("at least one inode (the root) is required".into()));
        }

        // each bitmap is a single block holding one byte per slot
        if inode_count as usize > BLOCK_SIZE {
            return Err(FsError::InvalidConfig(format!("at most {} inodes are supported", BLOCK_SIZE)));
        }

        if data_block_count as usize > BLOCK_SIZE {
            return Err(FsError::InvalidConfig(format!("at most {} data blocks are supported", BLOCK_SIZE)));
        }

        Ok(Config { inode_count, data_block_count })
    }

    pub fn inode_count(&self) -> u32 {
        self.inode_count
    }

    pub fn data_block_count(&self) -> u32 {
        self.data_block_count
    }

    pub fn inode_table_blocks(&self) -> u32 {
        let per_block = INODES_PER_BLOCK as u32;
        (self.inode_count + per_block - 1) / per_block
    }

    pub fn data_start(&self) -> BlockPointer {
        INODE_TABLE_INDEX + self.inode_table_blocks()
    }

    pub fn total_blocks(&self) -> u64 {
        self.data_start() as u64 + self.data_block_count as u64
    }

    pub(crate) fn check_device(&self, block_count: u64) -> Result<()> {
        if block_count < self.total_blocks() {
            return Err(FsError::InvalidConfig(format!(
                "device holds {} blocks, layout needs {}",
                block_count,
                self.total_blocks()
            )));
        }
        Ok(())
    }
}
