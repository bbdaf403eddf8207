use std::io;

use log::trace;

use crate::consts::{BlockPointer, BLOCK_SIZE};
use crate::driver::DeviceDriver;
use crate::util::error::{FsError, Result};
use raw::{raw_read_block, raw_write_block};

mod raw;

/// Block-level access to a device. One block is `BLOCK_SIZE / sector size`
/// consecutive sectors.
pub struct IO<A: DeviceDriver> {
    device: A,
    block_size: usize,
    block_count: u64,
}

impl<A: DeviceDriver> IO<A> {
    pub fn new(device: A) -> Result<IO<A>> {
        let sector_size = device.get_sector_size();
        if sector_size == 0 || sector_size > BLOCK_SIZE || BLOCK_SIZE % sector_size != 0 {
            return Err(FsError::InvalidConfig(format!(
                "sector size {} does not divide the block size {}",
                sector_size, BLOCK_SIZE
            )));
        }

        let block_count = device.get_size() / BLOCK_SIZE as u64;
        Ok(IO { device, block_size: BLOCK_SIZE, block_count })
    }

    pub fn get_block_size(&self) -> usize {
        self.block_size
    }

    pub fn get_block_count(&self) -> u64 {
        self.block_count
    }

    pub fn device(&self) -> &A {
        &self.device
    }

    pub fn into_device(self) -> A {
        self.device
    }

    pub(crate) fn write_block(&mut self, index: BlockPointer, block: &[u8]) -> Result<()> {
        if block.len() != self.block_size {
            return Err(invalid_input(format!(
                "block size mismatch - expected {}, got {}",
                self.block_size,
                block.len()
            )));
        }

        self.check_index(index)?;
        trace!("writing block {}", index);
        raw_write_block(&mut self.device, self.block_size, block, index)?;
        Ok(())
    }

    pub(crate) fn read_block(&self, index: BlockPointer) -> Result<Vec<u8>> {
        self.check_index(index)?;
        trace!("reading block {}", index);
        Ok(raw_read_block(&self.device, self.block_size, index)?)
    }

    fn check_index(&self, index: BlockPointer) -> Result<()> {
        if index as u64 >= self.block_count {
            return Err(invalid_input(format!(
                "block {} out of range ({} blocks)",
                index, self.block_count
            )));
        }
        Ok(())
    }
}

fn invalid_input(message: String) -> FsError {
    FsError::Io(io::Error::new(io::ErrorKind::InvalidInput, message))
}

#[cfg(test)]
mod tests {
    use crate::driver::memory_drive::MemoryDrive;
    use crate::driver::DeviceDriver;
    use crate::util::error::FsError;

    #[test]
    fn read_write() {
        let drive = MemoryDrive::new(8 * 4096, 4096);
        let mut io = super::IO::new(drive).unwrap();
        assert_eq!(io.get_block_count(), 8);

        let block = vec![42; 4096];
        io.write_block(0, &block).unwrap();
        assert_eq!(io.read_block(0).unwrap(), block);
    }

    #[test]
    fn read_write_sectored_block() {
        let drive = MemoryDrive::new(16 * 4096, 512);
        let mut io = super::IO::new(drive).unwrap();

        let block1 = vec![0x42; 4096];
        io.write_block(3, &block1).unwrap();
        assert_eq!(io.read_block(3).unwrap(), block1);

        let mut block2 = vec![0x1; 4096];
        block2[4095] = 0x7;
        io.write_block(4, &block2).unwrap();
        assert_eq!(io.read_block(4).unwrap(), block2);
        assert_eq!(io.read_block(3).unwrap(), block1);

        // block 4 starts at sector 32
        assert_eq!(io.device().as_bytes()[4 * 4096], 0x1);
        assert_eq!(io.device().as_bytes()[5 * 4096 - 1], 0x7);
    }

    #[test]
    fn rejects_out_of_range_and_short_blocks() {
        let drive = MemoryDrive::new(2 * 4096, 512);
        let mut io = super::IO::new(drive).unwrap();
        assert!(matches!(io.read_block(2), Err(FsError::Io(_))));
        assert!(matches!(io.write_block(0, &vec![0; 100]), Err(FsError::Io(_))));
    }

    #[test]
    fn rejects_incompatible_sector_size() {
        let drive = MemoryDrive::new(3000 * 3, 3000);
        assert!(matches!(super::IO::new(drive), Err(FsError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_zero_sector_size() {
        let drive = MemoryDrive::new(8 * 4096, 0);
        assert_eq!(drive.get_sector_count(), 0);
        assert!(matches!(super::IO::new(drive), Err(FsError::InvalidConfig(_))));
    }
}
