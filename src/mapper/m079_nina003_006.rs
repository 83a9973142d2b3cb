//! `NINA-003`/`NINA-006` (Mapper 079).
//!
//! <https://wiki.nesdev.com/w/index.php/INES_Mapper_079>

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
pub struct Nina003006 {
    pub mirroring: Mirroring,
    pub chr_banks: Banks,
    pub prg_rom_banks: Banks,
}

impl Nina003006 {
    const PRG_ROM_WINDOW: usize = 32 * 1024;
    const CHR_WINDOW: usize = 8 * 1024;

    pub fn load(cart: &mut Cart) -> Result<Mapper, mapper::Error> {
        let nina = Self {
            mirroring: cart.mirroring(),
            chr_banks: Banks::new(0x0000, 0x1FFF, cart.chr_rom.len(), Self::CHR_WINDOW)?,
            prg_rom_banks: Banks::new(0x8000, 0xFFFF, cart.prg_rom.len(), Self::PRG_ROM_WINDOW)?,
        };
        Ok(nina.into())
    }
}

impl MemMap for Nina003006 {
    // PPU $0000..=$1FFF 8K switchable CHR-ROM bank (bits 0-2)
    // CPU $8000..=$FFFF 32K switchable PRG-ROM bank (bit 3)
    // Register decoded at $4100-$5FFF when A14 clear and A8 set

    fn map_peek(&self, addr: u16) -> MappedRead {
        match addr {
            0x0000..=0x1FFF => MappedRead::Chr(self.chr_banks.translate(addr)),
            0x8000..=0xFFFF => MappedRead::PrgRom(self.prg_rom_banks.translate(addr)),
            _ => MappedRead::Bus,
        }
    }

    fn map_write(&mut self, addr: u16, val: u8) -> MappedWrite {
        if addr & 0xE100 == 0x4100 {
            self.chr_banks.set(0, (val & 0x07).into());
            self.prg_rom_banks.set(0, ((val >> 3) & 0x01).into());
        }
        MappedWrite::Bus
    }
}

impl Mapped for Nina003006 {
    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring = mirroring;
    }
}

impl Reset for Nina003006 {}
