use std::io;
use std::io::Write;

pub mod file_drive;
pub mod memory_drive;

const DUMP_WIDTH: usize = 16;

pub trait DeviceDriver {
    fn get_sector_count(&self) -> u64;
    fn get_sector_size(&self) -> usize;
    fn read_sector(&self, index: u64) -> io::Result<Vec<u8>>;
    fn write_sector(&mut self, index: u64, data: &[u8]) -> io::Result<()>;

    fn get_size(&self) -> u64 {
        self.get_sector_count() * self.get_sector_size() as u64
    }

    /// Hex dump of every non-zero line on the device. Diagnostics only.
    fn dump(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{} sectors of {} bytes", self.get_sector_count(), self.get_sector_size())?;
        for sector in 0..self.get_sector_count() {
            let data = self.read_sector(sector)?;
            let base = sector * self.get_sector_size() as u64;
            for (i, line) in data.chunks(DUMP_WIDTH).enumerate() {
                if line.iter().all(|byte| *byte == 0) {
                    continue;
                }
                let hex: Vec<String> = line.iter().map(|byte| format!("{:02x}", byte)).collect();
                writeln!(out, "{:08x}: {}", base + (i * DUMP_WIDTH) as u64, hex.join(" "))?;
            }
        }
        Ok(())
    }
}

pub(crate) fn out_of_range(index: u64, count: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("sector {} out of range ({} sectors)", index, count),
    )
}

pub(crate) fn size_mismatch(expected: usize, got: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("sector size mismatch - expected {}, got {}", expected, got),
    )
}
