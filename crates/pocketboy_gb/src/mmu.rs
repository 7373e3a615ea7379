use std::fs;
use std::path::Path;

use thiserror::Error;

/// Size of the flat address space: 0x0000..=0xFFFF.
pub const MEMORY_SIZE: usize = 0x10000;

/// Largest boot image accepted by `load_boot_image`, in bytes.
pub const BOOT_IMAGE_MAX: usize = 256;

/// End of the cartridge ROM area (exclusive).
pub const ROM_END: usize = 0x8000;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("boot image is {0} bytes, the limit is {BOOT_IMAGE_MAX}")]
    BootImageTooLarge(usize),
}

/// Flat 64KB memory unit.
///
/// The DMG memory map this backs:
///
/// 0x0000-0x3FFF  ROM bank 0
/// 0x4000-0x7FFF  switchable ROM bank
/// 0x8000-0x9FFF  video RAM
/// 0xA000-0xBFFF  external RAM
/// 0xC000-0xDFFF  work RAM
/// 0xE000-0xFDFF  echo RAM
/// 0xFE00-0xFE9F  OAM
/// 0xFF00-0xFF7F  IO registers
/// 0xFF80-0xFFFE  high RAM
/// 0xFFFF         interrupt enable register
///
/// No banking or region semantics are modeled yet; every address reads and
/// writes the same backing byte.
pub struct Mmu {
    memory: Box<[u8; MEMORY_SIZE]>,
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new()
    }
}

impl Mmu {
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; MEMORY_SIZE]),
        }
    }

    pub fn read_byte(&self, addr: u16) -> u8 {
        self.memory[addr as usize]
    }

    /// Read a 16-bit word stored little-endian at `addr`.
    pub fn read_word(&self, addr: u16) -> u16 {
        u16::from_le_bytes([
            self.read_byte(addr),
            self.read_byte(addr.wrapping_add(1)),
        ])
    }

    pub fn write_byte(&mut self, addr: u16, value: u8) {
        self.memory[addr as usize] = value;
    }

    /// Write a run of bytes starting at `addr`, auto-incrementing the
    /// address for each byte.
    pub fn write_bytes(&mut self, bytes: &[u8], addr: u16) {
        let mut addr = addr;
        for &byte in bytes {
            self.memory[addr as usize] = byte;
            addr = addr.wrapping_add(1);
        }
    }

    /// Copy of the full address space, for debugger consumption.
    pub fn snapshot(&self) -> Vec<u8> {
        self.memory.to_vec()
    }

    /// Load a boot image from disk into address 0.
    ///
    /// Images larger than `BOOT_IMAGE_MAX` bytes are rejected without
    /// touching memory.
    pub fn load_boot_image(&mut self, path: &Path) -> Result<(), MemoryError> {
        let image = fs::read(path)?;
        if image.len() > BOOT_IMAGE_MAX {
            return Err(MemoryError::BootImageTooLarge(image.len()));
        }
        log::info!("loading {} byte boot image at 0x0000", image.len());
        self.write_bytes(&image, 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn read_word_is_little_endian() {
        let mut mmu = Mmu::new();
        mmu.write_bytes(&[0x34, 0x12], 0xC000);
        assert_eq!(mmu.read_word(0xC000), 0x1234);
    }

    #[test]
    fn write_bytes_auto_increments() {
        let mut mmu = Mmu::new();
        mmu.write_bytes(&[0xAA, 0xBB, 0xCC], 0x8000);
        assert_eq!(mmu.read_byte(0x8000), 0xAA);
        assert_eq!(mmu.read_byte(0x8001), 0xBB);
        assert_eq!(mmu.read_byte(0x8002), 0xCC);
    }

    #[test]
    fn top_of_address_space_is_usable() {
        let mut mmu = Mmu::new();
        mmu.write_byte(0xFFFF, 0x42);
        assert_eq!(mmu.read_byte(0xFFFF), 0x42);
    }

    #[test]
    fn boot_image_loads_at_zero() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x31, 0xFE, 0xFF]).unwrap();

        let mut mmu = Mmu::new();
        mmu.load_boot_image(file.path()).unwrap();
        assert_eq!(mmu.read_byte(0x0000), 0x31);
        assert_eq!(mmu.read_word(0x0001), 0xFFFE);
    }

    #[test]
    fn oversized_boot_image_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; BOOT_IMAGE_MAX + 1]).unwrap();

        let mut mmu = Mmu::new();
        let err = mmu.load_boot_image(file.path()).unwrap_err();
        assert!(matches!(err, MemoryError::BootImageTooLarge(n) if n == BOOT_IMAGE_MAX + 1));
        // Memory must be untouched after a rejected load.
        assert_eq!(mmu.read_byte(0x0000), 0x00);
    }

    #[test]
    fn missing_boot_image_is_an_io_error() {
        let mut mmu = Mmu::new();
        let err = mmu
            .load_boot_image(Path::new("/no/such/boot.bin"))
            .unwrap_err();
        assert!(matches!(err, MemoryError::Io(_)));
    }
}
