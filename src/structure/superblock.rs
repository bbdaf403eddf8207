use log::debug;

use crate::consts::{BLOCK_SIZE, SUPERBLOCK_INDEX};
use crate::driver::DeviceDriver;
use crate::io::IO;
use crate::util::error::{FsError, Result};
use crate::util::serializable::{ByteSerializable, KnownSize};

pub const MAGIC: u32 = 0xbafdb0;
const MAGIC_LENGTH: usize = 3;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SuperBlock {
    pub magic: u32,
}

impl SuperBlock {
    pub fn new() -> SuperBlock {
        SuperBlock { magic: MAGIC }
    }

    /// Reads block 0 and checks the magic.
    pub fn read<A: DeviceDriver>(io: &IO<A>) -> Result<SuperBlock> {
        let buffer = io.read_block(SUPERBLOCK_INDEX)?;
        let superblock = SuperBlock::from_bytes(&buffer)?;

        if superblock.magic != MAGIC {
            return Err(FsError::CorruptFilesystem(format!(
                "bad magic {:#08x}, expected {:#08x}",
                superblock.magic, MAGIC
            )));
        }

        Ok(superblock)
    }

    pub fn write<A: DeviceDriver>(&self, io: &mut IO<A>) -> Result<()> {
        let mut buffer = self.to_bytes();
        buffer.resize(BLOCK_SIZE, 0);
        debug!("writing superblock {:#08x}", self.magic);
        io.write_block(SUPERBLOCK_INDEX, &buffer)
    }
}

impl Default for SuperBlock {
    fn default() -> SuperBlock {
        SuperBlock::new()
    }
}

impl KnownSize for SuperBlock {
    fn size_on_disk() -> usize {
        MAGIC_LENGTH
    }
}

impl ByteSerializable for SuperBlock {
    fn to_bytes(&self) -> Vec<u8> {
        self.magic.to_le_bytes()[..MAGIC_LENGTH].to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<SuperBlock> {
        if bytes.len() < MAGIC_LENGTH {
            return Err(FsError::CorruptFilesystem("superblock is truncated".into()));
        }
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]);
        Ok(SuperBlock { magic })
    }
}

#[cfg(test)]
mod tests {
    use crate::driver::memory_drive::MemoryDrive;
    use crate::io::IO;
    use crate::util::error::FsError;

    #[test]
    fn read_write_superblock() {
        let drive = MemoryDrive::new(4 * 4096, 512);
        let mut io = IO::new(drive).unwrap();
        let superblock = super::SuperBlock::new();
        superblock.write(&mut io).unwrap();
        assert_eq!(super::SuperBlock::read(&io).unwrap(), superblock);
    }

    #[test]
    fn magic_is_little_endian() {
        let drive = MemoryDrive::new(4 * 4096, 4096);
        let mut io = IO::new(drive).unwrap();
        super::SuperBlock::new().write(&mut io).unwrap();

        let bytes = io.device().as_bytes();
        assert_eq!(&bytes[0..4], &[0xb0, 0xfd, 0xba, 0x00]);
        assert!(bytes[3..4096].iter().all(|byte| *byte == 0));
    }

    #[test]
    fn blank_device_is_corrupt() {
        let drive = MemoryDrive::new(4 * 4096, 4096);
        let io = IO::new(drive).unwrap();
        assert!(matches!(super::SuperBlock::read(&io), Err(FsError::CorruptFilesystem(_))));
    }
}
