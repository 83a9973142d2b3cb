//! `NINA-001` (Mapper 034).
//!
//! <https://wiki.nesdev.com/w/index.php/NINA-001>

use crate::{
    cart::Cart,
    common::Reset,
    mapper::{self, Mapped, MappedRead, MappedWrite, Mapper, MemMap},
    mem::Banks,
    ppu::Mirroring,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Nina001 {
    pub mirroring: Mirroring,
    pub chr_banks: Banks,
    pub prg_rom_banks: Banks,
}

impl Nina001 {
    const PRG_ROM_WINDOW: usize = 32 * 1024;
    const CHR_WINDOW: usize = 4 * 1024;
    const PRG_RAM_SIZE: usize = 8 * 1024;

    pub fn load(cart: &mut Cart) -> Result<Mapper, mapper::Error> {
        if !cart.has_prg_ram() {
            cart.add_prg_ram(Self::PRG_RAM_SIZE);
        }
        let mut nina001 = Self {
            mirroring: cart.mirroring(),
            chr_banks: Banks::new(0x0000, 0x1FFF, cart.chr_rom.len(), Self::CHR_WINDOW)?,
            prg_rom_banks: Banks::new(0x8000, 0xFFFF, cart.prg_rom.len(), Self::PRG_ROM_WINDOW)?,
        };
        nina001.chr_banks.set(1, 1);
        Ok(nina001.into())
    }
}

impl MemMap for Nina001 {
    // PPU $0000..=$0FFF 4K switchable CHR-ROM bank ($7FFE)
    // PPU $1000..=$1FFF 4K switchable CHR-ROM bank ($7FFF)
    // CPU $6000..=$7FFF 8K PRG-RAM bank, registers overlaid at $7FFD-$7FFF
    // CPU $8000..=$FFFF 32K switchable PRG-ROM bank ($7FFD)

    fn map_peek(&self, addr: u16) -> MappedRead {
        match addr {
            0x0000..=0x1FFF => MappedRead::Chr(self.chr_banks.translate(addr)),
            0x6000..=0x7FFF => MappedRead::PrgRam((addr & 0x1FFF).into()),
            0x8000..=0xFFFF => MappedRead::PrgRom(self.prg_rom_banks.translate(addr)),
            _ => MappedRead::Bus,
        }
    }

    fn map_write(&mut self, addr: u16, val: u8) -> MappedWrite {
        match addr {
            0x6000..=0x7FFF => {
                // Registers live inside PRG-RAM space; the RAM write still
                // happens
                match addr {
                    0x7FFD => self.prg_rom_banks.set(0, (val & 0x01).into()),
                    0x7FFE => self.chr_banks.set(0, (val & 0x0F).into()),
                    0x7FFF => self.chr_banks.set(1, (val & 0x0F).into()),
                    _ => (),
                }
                MappedWrite::PrgRam((addr & 0x1FFF).into(), val)
            }
            _ => MappedWrite::Bus,
        }
    }
}

impl Mapped for Nina001 {
    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring = mirroring;
    }
}

impl Reset for Nina001 {}
