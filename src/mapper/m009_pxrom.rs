//! `PxROM`/`MMC2` (Mapper 009).
//!
//! <https://wiki.nesdev.com/w/index.php/PxROM>
//! <https://wiki.nesdev.com/w/index.php/MMC2>

use crate::{
    cart::Cart,
    common::{Reset, ResetKind},
    mapper::{self, Mapped, MappedRead, MappedWrite, Mapper, MemMap},
    mem::Banks,
    ppu::Mirroring,
};
use serde::{Deserialize, Serialize};

/// Which CHR bank register a latch points at.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum Latch {
    Fd,
    Fe,
}

/// `PxROM`/`MMC2` (Mapper 009).
///
/// CHR switching is driven by PPU fetches of the magic tiles $FD/$FE: reading
/// the trigger addresses flips a latch *after* the triggering fetch, so the
/// old bank still supplies that tile's pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Pxrom {
    pub mirroring: Mirroring,
    pub chr_fd: [u8; 2],
    pub chr_fe: [u8; 2],
    pub latch: [Latch; 2],
    pub chr_banks: Banks,
    pub prg_rom_banks: Banks,
}

impl Pxrom {
    const PRG_ROM_WINDOW: usize = 8 * 1024;
    const CHR_WINDOW: usize = 4 * 1024;
    const PRG_RAM_SIZE: usize = 8 * 1024;

    // Latch 0 triggers on exact addresses; latch 1 on 8-byte ranges
    const LATCH0_FD: u16 = 0x0FD8;
    const LATCH0_FE: u16 = 0x0FE8;
    const LATCH1_FD: u16 = 0x0FD8; // $1FD8..=$1FDF after masking
    const LATCH1_FE: u16 = 0x0FE8; // $1FE8..=$1FEF after masking

    pub fn load(cart: &mut Cart) -> Result<Mapper, mapper::Error> {
        if !cart.has_prg_ram() {
            cart.add_prg_ram(Self::PRG_RAM_SIZE);
        }
        let mut pxrom = Self {
            mirroring: cart.mirroring(),
            chr_fd: [0x00; 2],
            chr_fe: [0x00; 2],
            // Power-on state is $FE
            latch: [Latch::Fe; 2],
            chr_banks: Banks::new(0x0000, 0x1FFF, cart.chr_rom.len(), Self::CHR_WINDOW)?,
            prg_rom_banks: Banks::new(0x8000, 0xFFFF, cart.prg_rom.len(), Self::PRG_ROM_WINDOW)?,
        };
        // $A000-$FFFF fixed to the last three 8K banks
        let last = pxrom.prg_rom_banks.last();
        pxrom.prg_rom_banks.set(1, last.saturating_sub(2));
        pxrom.prg_rom_banks.set(2, last.saturating_sub(1));
        pxrom.prg_rom_banks.set(3, last);
        Ok(pxrom.into())
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
        let (half, fd, fe) = if addr < 0x1000 {
            (0, Self::LATCH0_FD, Self::LATCH0_FE)
        } else {
            (1, Self::LATCH1_FD, Self::LATCH1_FE)
        };
        // Latch 0 matches a single address on MMC2; latch 1 matches a range
        let masked = if half == 0 { addr } else { addr & 0x0FF8 };
        if masked == fd {
            self.latch[half] = Latch::Fd;
            self.update_chr_banks();
        } else if masked == fe {
            self.latch[half] = Latch::Fe;
            self.update_chr_banks();
        }
    }
}

impl MemMap for Pxrom {
    // PPU $0000..=$0FFF 4K CHR bank, latch 0 selects $FD or $FE register
    // PPU $1000..=$1FFF 4K CHR bank, latch 1 selects $FD or $FE register
    // CPU $6000..=$7FFF 8K PRG-RAM bank
    // CPU $8000..=$9FFF 8K switchable PRG-ROM bank
    // CPU $A000..=$FFFF 24K PRG-ROM fixed to the last three banks

    fn map_read(&mut self, addr: u16) -> MappedRead {
        let mapped = self.map_peek(addr);
        if addr < 0x2000 {
            // Bank flips after the triggering fetch
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

impl Mapped for Pxrom {
    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring = mirroring;
    }
}

impl Reset for Pxrom {
    fn reset(&mut self, _kind: ResetKind) {
        self.latch = [Latch::Fe; 2];
        self.update_chr_banks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::Memory;

    fn load_pxrom() -> Pxrom {
        let mut cart = Cart::empty();
        cart.prg_rom = Memory::with_size(128 * 1024);
        cart.chr_rom = Memory::with_size(128 * 1024);
        match Pxrom::load(&mut cart).unwrap() {
            Mapper::Pxrom(pxrom) => pxrom,
            _ => unreachable!(),
        }
    }

    #[test]
    fn latch_flips_after_trigger_fetch() {
        let mut pxrom = load_pxrom();
        let _ = pxrom.map_write(0xB000, 0x02); // latch 0, $FD bank
        let _ = pxrom.map_write(0xC000, 0x04); // latch 0, $FE bank

        // Power-on latch is $FE
        assert_eq!(pxrom.chr_banks.page(0), 4);

        // The trigger fetch itself still reads the old bank
        let before = pxrom.map_read(Pxrom::LATCH0_FD);
        assert_eq!(before, MappedRead::Chr(0x4000 | 0x0FD8));
        assert_eq!(pxrom.chr_banks.page(0), 2, "latch flipped to $FD");

        let _ = pxrom.map_read(Pxrom::LATCH0_FE);
        assert_eq!(pxrom.chr_banks.page(0), 4, "latch flipped back to $FE");
    }

    #[test]
    fn latch_one_matches_range() {
        let mut pxrom = load_pxrom();
        let _ = pxrom.map_write(0xD000, 0x01);
        let _ = pxrom.map_write(0xE000, 0x03);
        assert_eq!(pxrom.chr_banks.page(1), 3);

        let _ = pxrom.map_read(0x1FDC); // anywhere in $1FD8..=$1FDF
        assert_eq!(pxrom.chr_banks.page(1), 1);
        let _ = pxrom.map_read(0x1FEF);
        assert_eq!(pxrom.chr_banks.page(1), 3);
    }
}
