//! PPU memory/data bus: CHR, nametable RAM, and palette RAM.

use crate::{
    mapper::{Mapped, MappedRead, MappedWrite, Mapper, MemMap},
    mem::{Mem, Memory},
    ppu::Mirroring,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Bus {
    pub mapper: Mapper,
    #[serde(skip)]
    pub chr_rom: Memory,
    pub chr_ram: Memory,
    /// Console-internal nametable RAM (two 1K pages).
    pub ciram: Memory,
    /// Extra cartridge nametable RAM for four-screen boards.
    pub exram: Memory,
    pub palette: [u8; Self::PALETTE_SIZE],
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus {
    pub const CIRAM_SIZE: usize = 0x0800;
    pub const PALETTE_SIZE: usize = 32;

    pub fn new() -> Self {
        Self {
            mapper: Mapper::none(),
            chr_rom: Memory::new(),
            chr_ram: Memory::new(),
            ciram: Memory::with_size(Self::CIRAM_SIZE),
            exram: Memory::new(),
            palette: [0x00; Self::PALETTE_SIZE],
        }
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mapper.mirroring()
    }

    // Maps a $2000-$2FFF address to a CIRAM index based on mirroring mode.
    //
    // Vertical:        [ A ] [ B ]    Horizontal:      [ A ] [ a ]
    //                  [ a ] [ b ]                     [ B ] [ b ]
    //
    // Single Screen A: [ A ] [ a ]    Single Screen B: [ b ] [ B ]
    //                  [ a ] [ a ]                     [ b ] [ b ]
    //
    // The enum discriminant is the shift that moves the selecting address
    // bit into the nametable-page position: A10 for vertical, A11 for
    // horizontal, A12/A13 (constant within $2xxx) for the single screens.
    pub const fn ciram_mirror(addr: u16, mirroring: Mirroring) -> usize {
        let page = (addr >> mirroring as u16) & 0x0400;
        (page | (addr & 0x03FF)) as usize
    }

    const fn palette_mirror(addr: u16) -> usize {
        let addr = addr & 0x001F;
        // $3F10/$3F14/$3F18/$3F1C alias the backdrop entries
        match addr {
            0x10 | 0x14 | 0x18 | 0x1C => (addr & 0x0F) as usize,
            _ => addr as usize,
        }
    }

    pub fn read_ciram(&mut self, addr: u16) -> u8 {
        self.peek_ciram(addr)
    }

    #[must_use]
    pub fn peek_ciram(&self, addr: u16) -> u8 {
        if self.mirroring() == Mirroring::FourScreen {
            let idx = (addr & 0x0FFF) as usize;
            if idx < Self::CIRAM_SIZE {
                self.ciram.get(idx).copied().unwrap_or(0)
            } else {
                self.exram.get(idx - Self::CIRAM_SIZE).copied().unwrap_or(0)
            }
        } else {
            let idx = Self::ciram_mirror(addr, self.mirroring());
            self.ciram.get(idx).copied().unwrap_or(0)
        }
    }

    fn write_ciram(&mut self, addr: u16, val: u8) {
        if self.mirroring() == Mirroring::FourScreen {
            let idx = (addr & 0x0FFF) as usize;
            let slot = if idx < Self::CIRAM_SIZE {
                self.ciram.get_mut(idx)
            } else {
                self.exram.get_mut(idx - Self::CIRAM_SIZE)
            };
            if let Some(v) = slot {
                *v = val;
            }
        } else {
            let idx = Self::ciram_mirror(addr, self.mirroring());
            if let Some(v) = self.ciram.get_mut(idx) {
                *v = val;
            }
        }
    }

    pub fn read_chr(&mut self, addr: u16) -> u8 {
        let mapped = match self.mapper.map_read(addr) {
            MappedRead::Chr(mapped) => mapped,
            _ => addr.into(),
        };
        if self.chr_ram.is_empty() {
            self.chr_rom.get(mapped).copied().unwrap_or(0)
        } else {
            self.chr_ram.get(mapped).copied().unwrap_or(0)
        }
    }

    #[must_use]
    pub fn peek_chr(&self, addr: u16) -> u8 {
        let mapped = match self.mapper.map_peek(addr) {
            MappedRead::Chr(mapped) => mapped,
            _ => addr.into(),
        };
        if self.chr_ram.is_empty() {
            self.chr_rom.get(mapped).copied().unwrap_or(0)
        } else {
            self.chr_ram.get(mapped).copied().unwrap_or(0)
        }
    }

    pub fn read_palette(&mut self, addr: u16) -> u8 {
        self.peek_palette(addr)
    }

    #[must_use]
    pub const fn peek_palette(&self, addr: u16) -> u8 {
        self.palette[Self::palette_mirror(addr)]
    }

    pub fn write_palette(&mut self, addr: u16, val: u8) {
        self.palette[Self::palette_mirror(addr)] = val;
    }
}

impl Mem for Bus {
    fn read(&mut self, addr: u16) -> u8 {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => self.read_chr(addr),
            0x2000..=0x3EFF => self.read_ciram(addr),
            0x3F00..=0x3FFF => self.read_palette(addr),
            _ => 0x00,
        }
    }

    fn peek(&self, addr: u16) -> u8 {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => self.peek_chr(addr),
            0x2000..=0x3EFF => self.peek_ciram(addr),
            0x3F00..=0x3FFF => self.peek_palette(addr),
            _ => 0x00,
        }
    }

    fn write(&mut self, addr: u16, val: u8) {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => {
                if let MappedWrite::ChrRam(mapped, val) = self.mapper.map_write(addr, val) {
                    if let Some(v) = self.chr_ram.get_mut(mapped) {
                        *v = val;
                    }
                }
            }
            0x2000..=0x3EFF => self.write_ciram(addr, val),
            0x3F00..=0x3FFF => self.write_palette(addr, val),
            _ => (),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ciram_mirror_horizontal() {
        assert_eq!(Bus::ciram_mirror(0x2000, Mirroring::Horizontal), 0x0000);
        assert_eq!(Bus::ciram_mirror(0x2405, Mirroring::Horizontal), 0x0005);
        assert_eq!(Bus::ciram_mirror(0x2800, Mirroring::Horizontal), 0x0400);
        assert_eq!(Bus::ciram_mirror(0x2C05, Mirroring::Horizontal), 0x0405);
    }

    #[test]
    fn ciram_mirror_vertical() {
        assert_eq!(Bus::ciram_mirror(0x2000, Mirroring::Vertical), 0x0000);
        assert_eq!(Bus::ciram_mirror(0x2405, Mirroring::Vertical), 0x0405);
        assert_eq!(Bus::ciram_mirror(0x2800, Mirroring::Vertical), 0x0000);
        assert_eq!(Bus::ciram_mirror(0x2C05, Mirroring::Vertical), 0x0405);
    }

    #[test]
    fn ciram_mirror_single_screens() {
        for addr in [0x2000, 0x2400, 0x2800, 0x2C00] {
            assert_eq!(Bus::ciram_mirror(addr, Mirroring::SingleScreenA), 0x0000);
            assert_eq!(Bus::ciram_mirror(addr, Mirroring::SingleScreenB), 0x0400);
        }
    }

    #[test]
    fn palette_mirroring_both_ways() {
        let mut bus = Bus::new();
        bus.write_palette(0x3F10, 0x21);
        assert_eq!(bus.peek_palette(0x3F00), 0x21, "write mirrors to $3F00");
        bus.write_palette(0x3F04, 0x13);
        assert_eq!(bus.peek_palette(0x3F14), 0x13, "read mirrors from $3F04");
        bus.write_palette(0x3F08, 0x0A);
        assert_eq!(bus.peek_palette(0x3F18), 0x0A);
        bus.write_palette(0x3F1C, 0x0B);
        assert_eq!(bus.peek_palette(0x3F0C), 0x0B);
    }
}
