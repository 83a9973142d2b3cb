//! NES cartridge implementation: iNES parsing and board selection.

use crate::{
    mapper::{
        self, Axrom, Bf909x, Bnrom, Cnrom, ColorDreams, Dxrom, Fxrom, Gxrom, Mapper, Nina001,
        Nina003006, Nrom, Pxrom, Sxrom, Txrom, Uxrom,
    },
    mem::{Memory, RamState},
    ppu::Mirroring,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

const PRG_ROM_BANK_SIZE: usize = 0x4000;
const CHR_ROM_BANK_SIZE: usize = 0x2000;
const PRG_RAM_SIZE: usize = 0x2000;
const TRAINER_SIZE: usize = 512;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
#[must_use]
pub enum Error {
    #[error("invalid nes header (found: ${value:02X} at byte: {byte}). {message}")]
    InvalidHeader { byte: u8, value: u8, message: String },
    #[error("unsupported mapper: {0:03}")]
    UnsupportedMapper(u16),
    #[error("mapper: {0}")]
    InvalidMapper(#[from] mapper::Error),
}

/// Compute an IEEE CRC32 (polynomial `0xEDB88320`) over `data`, continuing
/// from `crc`.
#[must_use]
pub fn compute_crc32(mut crc: u32, data: &[u8]) -> u32 {
    crc = !crc;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            let mask = (crc & 0x01).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

/// An `iNES` 1.0 formatted header representing hardware specs of a given NES
/// cartridge.
///
/// <http://wiki.nesdev.com/w/index.php/INES>
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct NesHeader {
    pub mapper_num: u16,   // High nibble of flags 7 | low nibble of flags 6
    pub flags: u8,         // Mirroring, battery, trainer, four-screen
    pub prg_rom_banks: u8, // Number of 16K PRG-ROM banks
    pub chr_rom_banks: u8, // Number of 8K CHR-ROM banks (0 means CHR-RAM)
}

impl NesHeader {
    const MAGIC: [u8; 4] = *b"NES\x1a";

    /// Parse a 16-byte `iNES` header from the front of `rom`.
    ///
    /// # Errors
    ///
    /// If the magic is missing or the data is shorter than the header, an
    /// error is returned.
    pub fn load(rom: &[u8]) -> Result<Self> {
        let header: &[u8; 16] = rom
            .get(0..16)
            .and_then(|slice| slice.try_into().ok())
            .ok_or_else(|| Error::InvalidHeader {
                byte: 0,
                value: 0,
                message: "expected 16-byte header".to_string(),
            })?;

        if header[0..4] != Self::MAGIC {
            return Err(Error::InvalidHeader {
                byte: 0,
                value: header[0],
                message: "nes header signature not found".to_string(),
            });
        }

        // Upper nibble of flags 6 holds mapper D0..D3, flags 7 holds D4..D7
        let mapper_num = u16::from(((header[6] & 0xF0) >> 4) | (header[7] & 0xF0));
        let flags = (header[6] & 0x0F) | ((header[7] & 0x0F) << 4);

        Ok(Self {
            mapper_num,
            flags,
            prg_rom_banks: header[4],
            chr_rom_banks: header[5],
        })
    }

    #[must_use]
    pub const fn battery_backed(&self) -> bool {
        self.flags & 0x02 == 0x02
    }

    #[must_use]
    pub const fn has_trainer(&self) -> bool {
        self.flags & 0x04 == 0x04
    }

    /// Hardware-configured nametable mirroring.
    pub const fn mirroring(&self) -> Mirroring {
        if self.flags & 0x08 == 0x08 {
            Mirroring::FourScreen
        } else if self.flags & 0x01 == 0x01 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        }
    }
}

/// An NES cartridge: parsed ROM data plus its board.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Cart {
    pub header: NesHeader,
    pub crc32: u32,
    pub mapper: Mapper,
    #[serde(skip)]
    pub chr_rom: Memory,
    pub chr_ram: Memory,
    #[serde(skip)]
    pub prg_rom: Memory,
    pub prg_ram: Memory,
}

impl Default for Cart {
    fn default() -> Self {
        Self::empty()
    }
}

impl Cart {
    /// An empty cartridge, for power-on before any ROM is loaded.
    pub fn empty() -> Self {
        let mut empty = Self {
            header: NesHeader {
                prg_rom_banks: 1,
                ..NesHeader::default()
            },
            crc32: 0,
            mapper: Mapper::none(),
            chr_rom: Memory::with_size(CHR_ROM_BANK_SIZE),
            chr_ram: Memory::new(),
            prg_rom: Memory::with_size(PRG_ROM_BANK_SIZE),
            prg_ram: Memory::new(),
        };
        empty.mapper = Nrom::load(&mut empty).expect("valid empty mapper");
        empty
    }

    /// Load a `Cart` from raw `iNES` bytes.
    ///
    /// # Errors
    ///
    /// If the header is invalid, the declared PRG/CHR sizes exceed the bytes
    /// supplied, or the mapper number is unsupported, an error is returned.
    pub fn from_rom(rom: &[u8], ram_state: RamState) -> Result<Self> {
        let header = NesHeader::load(rom)?;
        debug!("{header:?}");

        let mut offset = 16;
        if header.has_trainer() {
            // 512 bytes of trainer data precede PRG-ROM; nothing maps it
            offset += TRAINER_SIZE;
        }

        let prg_rom_len = usize::from(header.prg_rom_banks) * PRG_ROM_BANK_SIZE;
        let prg_rom: Memory = rom
            .get(offset..offset + prg_rom_len)
            .ok_or_else(|| Error::InvalidHeader {
                byte: 4,
                value: header.prg_rom_banks,
                message: format!(
                    "expected {} prg-rom banks ({prg_rom_len} total bytes)",
                    header.prg_rom_banks
                ),
            })?
            .to_vec()
            .into();
        offset += prg_rom_len;

        let chr_rom_len = usize::from(header.chr_rom_banks) * CHR_ROM_BANK_SIZE;
        let chr_rom: Memory = rom
            .get(offset..offset + chr_rom_len)
            .ok_or_else(|| Error::InvalidHeader {
                byte: 5,
                value: header.chr_rom_banks,
                message: format!(
                    "expected {} chr-rom banks ({chr_rom_len} total bytes)",
                    header.chr_rom_banks
                ),
            })?
            .to_vec()
            .into();
        let chr_ram = if chr_rom.is_empty() {
            Memory::ram(ram_state, CHR_ROM_BANK_SIZE)
        } else {
            Memory::new()
        };

        let crc32 = compute_crc32(compute_crc32(0, &prg_rom), &chr_rom);

        let mut cart = Self {
            header,
            crc32,
            mapper: Mapper::none(),
            chr_rom,
            chr_ram,
            prg_rom,
            prg_ram: Memory::ram(ram_state, PRG_RAM_SIZE),
        };
        cart.mapper = match header.mapper_num {
            0 => Nrom::load(&mut cart)?,
            1 => Sxrom::load(&mut cart)?,
            2 => Uxrom::load(&mut cart)?,
            3 => Cnrom::load(&mut cart)?,
            4 => Txrom::load(&mut cart)?,
            7 => Axrom::load(&mut cart)?,
            9 => Pxrom::load(&mut cart)?,
            10 => Fxrom::load(&mut cart)?,
            11 => ColorDreams::load(&mut cart)?,
            34 => {
                // >= 16K of CHR-ROM implies NINA-001; CHR-RAM implies BNROM
                if cart.has_chr_rom() && cart.chr_rom.len() >= 0x4000 {
                    Nina001::load(&mut cart)?
                } else {
                    Bnrom::load(&mut cart)?
                }
            }
            66 => Gxrom::load(&mut cart)?,
            71 => Bf909x::load(&mut cart)?,
            79 => Nina003006::load(&mut cart)?,
            206 => Dxrom::load(&mut cart)?,
            num => return Err(Error::UnsupportedMapper(num)),
        };

        info!(
            "loaded ROM: mapper {:03}, PRG-ROM: {}K, CHR-ROM: {}K, CHR-RAM: {}K, \
             mirroring: {:?}, battery: {}, CRC32: {:#010X}",
            header.mapper_num,
            cart.prg_rom.len() / 0x0400,
            cart.chr_rom.len() / 0x0400,
            cart.chr_ram.len() / 0x0400,
            cart.mirroring(),
            cart.battery_backed(),
            cart.crc32,
        );
        Ok(cart)
    }

    #[must_use]
    pub fn has_chr_rom(&self) -> bool {
        !self.chr_rom.is_empty()
    }

    #[must_use]
    pub fn has_chr_ram(&self) -> bool {
        !self.chr_ram.is_empty()
    }

    #[must_use]
    pub fn has_prg_ram(&self) -> bool {
        !self.prg_ram.is_empty()
    }

    #[must_use]
    pub const fn battery_backed(&self) -> bool {
        self.header.battery_backed()
    }

    pub const fn mirroring(&self) -> Mirroring {
        self.header.mirroring()
    }

    /// Allows mappers to add PRG-RAM.
    pub(crate) fn add_prg_ram(&mut self, capacity: usize) {
        self.prg_ram.resize(capacity);
    }

    /// Allows mappers to add CHR-RAM.
    pub(crate) fn add_chr_ram(&mut self, capacity: usize) {
        self.chr_ram.resize(capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom_with_header(header: [u8; 16]) -> Vec<u8> {
        let prg = usize::from(header[4]) * PRG_ROM_BANK_SIZE;
        let chr = usize::from(header[5]) * CHR_ROM_BANK_SIZE;
        let mut rom = header.to_vec();
        rom.resize(16 + prg + chr, 0x00);
        rom
    }

    #[test]
    fn header_parsing() {
        let header = NesHeader::load(&[
            0x4E, 0x45, 0x53, 0x1A, 0x02, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
        ])
        .expect("valid header");
        assert_eq!(header.mapper_num, 0);
        assert_eq!(header.prg_rom_banks, 2);
        assert_eq!(header.chr_rom_banks, 1);
        assert_eq!(header.mirroring(), Mirroring::Vertical);
        assert!(!header.battery_backed());
    }

    #[test]
    fn header_mapper_nibbles() {
        let header = NesHeader::load(&[
            0x4E, 0x45, 0x53, 0x1A, 0x08, 0x00, 0x40, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
        ])
        .expect("valid header");
        assert_eq!(header.mapper_num, 0xC4);
    }

    #[test]
    fn bad_magic() {
        let err = NesHeader::load(b"NEX\x1athis is not a rom").unwrap_err();
        assert!(matches!(err, Error::InvalidHeader { .. }));
    }

    #[test]
    fn short_rom_rejected() {
        let mut rom = rom_with_header([
            0x4E, 0x45, 0x53, 0x1A, 0x02, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
        ]);
        rom.truncate(16 + PRG_ROM_BANK_SIZE); // missing second PRG bank + CHR
        let err = Cart::from_rom(&rom, RamState::AllZeros).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader { byte: 4, .. }));
    }

    #[test]
    fn unsupported_mapper_rejected() {
        let rom = rom_with_header([
            0x4E, 0x45, 0x53, 0x1A, 0x01, 0x01, 0x50, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
        ]);
        let err = Cart::from_rom(&rom, RamState::AllZeros).unwrap_err();
        assert!(matches!(err, Error::UnsupportedMapper(5)));
    }

    #[test]
    fn chr_ram_when_no_chr_banks() {
        let rom = rom_with_header([
            0x4E, 0x45, 0x53, 0x1A, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
        ]);
        let cart = Cart::from_rom(&rom, RamState::AllZeros).expect("valid cart");
        assert!(!cart.has_chr_rom());
        assert_eq!(cart.chr_ram.len(), CHR_ROM_BANK_SIZE);
    }

    #[test]
    fn trainer_skipped() {
        let mut rom = vec![
            0x4E, 0x45, 0x53, 0x1A, 0x01, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
        ];
        rom.extend_from_slice(&[0xAA; TRAINER_SIZE]);
        let mut prg = vec![0x00; PRG_ROM_BANK_SIZE];
        prg[0] = 0x60; // RTS at $8000
        rom.extend_from_slice(&prg);
        let cart = Cart::from_rom(&rom, RamState::AllZeros).expect("valid cart");
        assert_eq!(cart.prg_rom[0], 0x60, "prg starts after the trainer");
    }

    #[test]
    fn crc32_known_vector() {
        // CRC32("123456789") == 0xCBF43926
        assert_eq!(compute_crc32(0, b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn crc32_covers_prg_and_chr() {
        let mut rom = rom_with_header([
            0x4E, 0x45, 0x53, 0x1A, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
        ]);
        let a = Cart::from_rom(&rom, RamState::AllZeros).unwrap().crc32;
        let chr_start = 16 + PRG_ROM_BANK_SIZE;
        rom[chr_start] = 0xFF;
        let b = Cart::from_rom(&rom, RamState::AllZeros).unwrap().crc32;
        assert_ne!(a, b, "CHR bytes affect the checksum");
    }
}
