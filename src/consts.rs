pub const BLOCK_SIZE: usize = 4096;
pub const INODE_SIZE: usize = 512;
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_SIZE;
pub const DIRECT_POINTERS: usize = 16;
pub const FILE_NAME_LENGTH: usize = 128;

pub const SUPERBLOCK_INDEX: BlockPointer = 0;
pub const INODE_MAP_INDEX: BlockPointer = 1;
pub const DATA_MAP_INDEX: BlockPointer = 2;
pub const INODE_TABLE_INDEX: BlockPointer = 3;

pub const ROOT_INODE: InodePointer = 0;
pub const ROOT_NAME: &str = "/";

// block 0 always holds the superblock, so it doubles as the "unused" pointer
pub const NULL_POINTER: BlockPointer = 0;

pub type BlockPointer = u32;
pub type InodePointer = u32;
pub type DirectPointers = [BlockPointer; DIRECT_POINTERS];
