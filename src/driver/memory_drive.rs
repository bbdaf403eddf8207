use std::io;

use crate::driver::{out_of_range, size_mismatch, DeviceDriver};

/// Zero-filled byte array standing in for a disk.
pub struct MemoryDrive {
    data: Vec<u8>,
    sector_size: usize,
}

impl MemoryDrive {
    /// `bytes` is rounded down to a whole number of sectors. A zero sector
    /// size gives an empty drive, which `IO::new` refuses.
    pub fn new(bytes: u64, sector_size: usize) -> MemoryDrive {
        let sectors = bytes.checked_div(sector_size as u64).unwrap_or(0) as usize;
        MemoryDrive { data: vec![0; sectors * sector_size], sector_size }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl DeviceDriver for MemoryDrive {
    fn get_sector_count(&self) -> u64 {
        self.data.len().checked_div(self.sector_size).unwrap_or(0) as u64
    }

    fn get_sector_size(&self) -> usize {
        self.sector_size
    }

    fn read_sector(&self, index: u64) -> io::Result<Vec<u8>> {
        if index >= self.get_sector_count() {
            return Err(out_of_range(index, self.get_sector_count()));
        }
        let offset = index as usize * self.sector_size;
        Ok(self.data[offset..offset + self.sector_size].to_vec())
    }

    fn write_sector(&mut self, index: u64, data: &[u8]) -> io::Result<()> {
        if data.len() != self.sector_size {
            return Err(size_mismatch(self.sector_size, data.len()));
        }
        if index >= self.get_sector_count() {
            return Err(out_of_range(index, self.get_sector_count()));
        }
        let offset = index as usize * self.sector_size;
        self.data[offset..offset + self.sector_size].copy_from_slice(data);
        Ok(())
    }
}
