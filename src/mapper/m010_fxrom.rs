//! `FxROM`/`MMC4` (Mapper 010).
//!
//! <https://wiki.nesdev.com/w/index.php/FxROM>
//! <https://wiki.nesdev.com/w/index.php/MMC4>

use crate::{
    cart::Cart,
    common::{Reset, ResetKind},
    mapper::{self, m009_pxrom::Latch, Mapped, MappedRead, MappedWrite, Mapper, MemMap},
    mem::Banks,
    ppu::Mirroring,
};
use serde::{Deserialize, Serialize};

/// `FxROM`/`MMC4` (Mapper 010).
///
/// Same $FD/$FE CHR latch scheme as MMC2, except both latches respond to
/// 8-byte trigger ranges and PRG switches in 16K units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Fxrom {
    pub mirroring: Mirroring,
    pub chr_fd: [u8; 2],
    pub chr_fe: [u8; 2],
    pub latch: [Latch; 2],
    pub chr_banks: Banks,
    pub prg_rom_banks: Banks,
}

impl Fxrom {
    const PRG_ROM_WINDOW: usize = 16 * 1024;
    const CHR_WINDOW: usize = 4 * 1024;
    const PRG_RAM_SIZE: usize = 8 * 1024;

    pub fn load(cart: &mut Cart) -> Result<Mapper, mapper::Error> {
        if !cart.has_prg_ram() {
            cart.add_prg_ram(Self::PRG_RAM_SIZE);
        }
        let mut fxrom = Self {
            mirroring: cart.mirroring(),
            chr_fd: [0x00; 2],
            chr_fe: [0x00; 2],
            latch: [Latch::Fe; 2],
            chr_banks: Banks::new(0x0000, 0x1FFF, cart.chr_rom.len(), Self::CHR_WINDOW)?,
            prg_rom_banks: Banks::new(0x8000, 0xFFFF, cart.prg_rom.len(), Self::PRG_ROM_WINDOW)?,
        };
        fxrom.prg_rom_banks.set(1, fxrom.prg_rom_banks.last());
        Ok(fxrom.into())
    }

    fn update_chr_banks(&mut self) {
        for half in 0..2 {
            let bank = match self.latch[half] {
                Latch::Fd => self.chr_fd[half],
                Latch::Fe => self.chr_fe[half],
            };
            self.chr_banks.set(half, bank.into());
        }
    }

    fn update_latch(&mut self, addr: u16) {
        let half = usize::from(addr >= 0x1000);
        match addr & 0x0FF8 {
            0x0FD8 => {
                self.latch[half] = Latch::Fd;
                self.update_chr_banks();
            }
            0x0FE8 => {
                self.latch[half] = Latch::Fe;
                self.update_chr_banks();
            }
            _ => (),
        }
    }
}

impl MemMap for Fxrom {
    // PPU $0000..=$0FFF 4K CHR bank, latch 0 selects $FD or $FE register
    // PPU $1000..=$1FFF 4K CHR bank, latch 1 selects $FD or $FE register
    // CPU $6000..=$7FFF 8K PRG-RAM bank
    // CPU $8000..=$BFFF 16K switchable PRG-ROM bank
    // CPU $C000..=$FFFF 16K PRG-ROM fixed to last bank

    fn map_read(&mut self, addr: u16) -> MappedRead {
        let mapped = self.map_peek(addr);
        if addr < 0x2000 {
            self.update_latch(addr);
        }
        mapped
    }

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
            0x6000..=0x7FFF => MappedWrite::PrgRam((addr & 0x1FFF).into(), val),
            0xA000..=0xFFFF => {
                match addr & 0xF000 {
                    0xA000 => self.prg_rom_banks.set(0, (val & 0x0F).into()),
                    0xB000 => self.chr_fd[0] = val & 0x1F,
                    0xC000 => self.chr_fe[0] = val & 0x1F,
                    0xD000 => self.chr_fd[1] = val & 0x1F,
                    0xE000 => self.chr_fe[1] = val & 0x1F,
                    0xF000 => {
                        self.mirroring = if val & 0x01 == 0x01 {
                            Mirroring::Horizontal
                        } else {
                            Mirroring::Vertical
                        };
                    }
                    _ => (),
                }
                self.update_chr_banks();
                MappedWrite::Bus
            }
            _ => MappedWrite::Bus,
        }
    }
}

impl Mapped for Fxrom {
    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring = mirroring;
    }
}

impl Reset for Fxrom {
    fn reset(&mut self, _kind: ResetKind) {
        self.latch = [Latch::Fe; 2];
        self.update_chr_banks();
    }
}
