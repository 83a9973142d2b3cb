//! `SxROM`/`MMC1` (Mapper 001).
//!
//! <https://wiki.nesdev.org/w/index.php/SxROM>
//! <https://wiki.nesdev.org/w/index.php/MMC1>

use crate::{
    cart::Cart,
    common::{Reset, ResetKind},
    mapper::{self, Mapped, MappedRead, MappedWrite, Mapper, MemMap},
    mem::Banks,
    ppu::Mirroring,
};
use serde::{Deserialize, Serialize};

/// `SxROM` serial-port registers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Regs {
    write_buffer: u8, // 5-bit shift register filled LSB first
    shift_count: u8,
    control: u8, // $8000-$9FFF
    chr0: u8,    // $A000-$BFFF
    chr1: u8,    // $C000-$DFFF
    prg: u8,     // $E000-$FFFF bits 0-3, bit 4 disables PRG-RAM
}

/// `SxROM`/`MMC1` (Mapper 001).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Sxrom {
    pub regs: Regs,
    pub mirroring: Mirroring,
    pub chr_banks: Banks,
    pub prg_rom_banks: Banks,
}

impl Sxrom {
    const PRG_ROM_WINDOW: usize = 16 * 1024;
    const CHR_WINDOW: usize = 4 * 1024;
    const PRG_RAM_SIZE: usize = 8 * 1024;
    const CHR_RAM_SIZE: usize = 8 * 1024;

    const SHIFT_REG_RESET: u8 = 0x80;
    const MIRRORING_MASK: u8 = 0x03;
    const PRG_MODE_MASK: u8 = 0x0C;
    const CHR_MODE_MASK: u8 = 0x10;
    // Reset locks PRG-ROM at $C000 to the last bank
    const DEFAULT_CONTROL: u8 = 0x0C;
    const PRG_RAM_DISABLED: u8 = 0x10;

    pub fn load(cart: &mut Cart) -> Result<Mapper, mapper::Error> {
        if !cart.has_prg_ram() {
            cart.add_prg_ram(Self::PRG_RAM_SIZE);
        }
        let chr_len = if cart.has_chr_rom() {
            cart.chr_rom.len()
        } else {
            if cart.chr_ram.is_empty() {
                cart.add_chr_ram(Self::CHR_RAM_SIZE);
            }
            cart.chr_ram.len()
        };
        let mut sxrom = Self {
            regs: Regs {
                write_buffer: 0x00,
                shift_count: 0,
                control: Self::DEFAULT_CONTROL,
                chr0: 0x00,
                chr1: 0x00,
                prg: 0x00,
            },
            mirroring: Mirroring::SingleScreenA,
            chr_banks: Banks::new(0x0000, 0x1FFF, chr_len, Self::CHR_WINDOW)?,
            prg_rom_banks: Banks::new(0x8000, 0xFFFF, cart.prg_rom.len(), Self::PRG_ROM_WINDOW)?,
        };
        sxrom.update_banks();
        Ok(sxrom.into())
    }

    fn reset_buffer(&mut self) {
        self.regs.shift_count = 0;
        self.regs.write_buffer = 0x00;
    }

    const fn prg_ram_enabled(&self) -> bool {
        self.regs.prg & Self::PRG_RAM_DISABLED == 0
    }

    fn register_write(&mut self, addr: u16, val: u8) {
        match addr & 0xE000 {
            0x8000 => self.regs.control = val,
            0xA000 => self.regs.chr0 = val & 0x1F,
            0xC000 => self.regs.chr1 = val & 0x1F,
            0xE000 => self.regs.prg = val & 0x1F,
            _ => (),
        }
        self.update_banks();
    }

    fn update_banks(&mut self) {
        self.mirroring = match self.regs.control & Self::MIRRORING_MASK {
            0 => Mirroring::SingleScreenA,
            1 => Mirroring::SingleScreenB,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        };

        let prg = usize::from(self.regs.prg & 0x0F);
        match (self.regs.control & Self::PRG_MODE_MASK) >> 2 {
            // 32K mode, low bit ignored
            0 | 1 => self.prg_rom_banks.set_range(0, 1, prg & 0x0E),
            // Fix first bank at $8000, switch $C000
            2 => {
                self.prg_rom_banks.set(0, 0);
                self.prg_rom_banks.set(1, prg);
            }
            // Fix last bank at $C000, switch $8000
            _ => {
                self.prg_rom_banks.set(0, prg);
                self.prg_rom_banks.set(1, self.prg_rom_banks.last());
            }
        }

        if self.regs.control & Self::CHR_MODE_MASK == 0 {
            // 8K mode, low bit ignored
            let chr = usize::from(self.regs.chr0 & 0x1E);
            self.chr_banks.set(0, chr);
            self.chr_banks.set(1, chr + 1);
        } else {
            self.chr_banks.set(0, self.regs.chr0.into());
            self.chr_banks.set(1, self.regs.chr1.into());
        }
    }
}

impl MemMap for Sxrom {
    // PPU $0000..=$1FFF two 4K CHR banks, or one 8K bank
    // CPU $6000..=$7FFF 8K PRG-RAM bank (disable via $E000 bit 4)
    // CPU $8000..=$FFFF 16K+16K or 32K PRG-ROM per control mode

    fn map_peek(&self, addr: u16) -> MappedRead {
        match addr {
            0x0000..=0x1FFF => MappedRead::Chr(self.chr_banks.translate(addr)),
            0x6000..=0x7FFF if self.prg_ram_enabled() => {
                MappedRead::PrgRam((addr & 0x1FFF).into())
            }
            0x8000..=0xFFFF => MappedRead::PrgRom(self.prg_rom_banks.translate(addr)),
            _ => MappedRead::Bus,
        }
    }

    fn map_write(&mut self, addr: u16, val: u8) -> MappedWrite {
        match addr {
            0x0000..=0x1FFF => MappedWrite::ChrRam(self.chr_banks.translate(addr), val),
            0x6000..=0x7FFF if self.prg_ram_enabled() => {
                MappedWrite::PrgRam((addr & 0x1FFF).into(), val)
            }
            0x8000..=0xFFFF => {
                // Serial port: five writes assemble one register, LSB first.
                // Bit 7 resets the shift register and ORs $0C into control.
                if val & Self::SHIFT_REG_RESET != 0 {
                    self.reset_buffer();
                    self.regs.control |= Self::DEFAULT_CONTROL;
                    self.update_banks();
                } else {
                    self.regs.write_buffer >>= 1;
                    self.regs.write_buffer |= (val & 0x01) << 4;
                    self.regs.shift_count += 1;
                    if self.regs.shift_count == 5 {
                        let val = self.regs.write_buffer;
                        self.reset_buffer();
                        self.register_write(addr, val);
                    }
                }
                MappedWrite::Bus
            }
            _ => MappedWrite::Bus,
        }
    }
}

impl Mapped for Sxrom {
    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring = mirroring;
    }
}

impl Reset for Sxrom {
    fn reset(&mut self, _kind: ResetKind) {
        self.reset_buffer();
        self.regs.control |= Self::DEFAULT_CONTROL;
        self.update_banks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::Memory;

    fn serial_write(sxrom: &mut Sxrom, addr: u16, val: u8) {
        for i in 0..5 {
            let _ = sxrom.map_write(addr, (val >> i) & 0x01);
        }
    }

    fn load_sxrom(prg_banks: usize) -> Sxrom {
        let mut cart = Cart::empty();
        cart.prg_rom = Memory::with_size(prg_banks * 0x4000);
        cart.chr_rom = Memory::with_size(4 * 0x2000);
        match Sxrom::load(&mut cart).unwrap() {
            Mapper::Sxrom(sxrom) => sxrom,
            _ => unreachable!(),
        }
    }

    #[test]
    fn power_on_fixes_last_bank() {
        let sxrom = load_sxrom(8);
        assert_eq!(sxrom.prg_rom_banks.page(0), 0);
        assert_eq!(sxrom.prg_rom_banks.page(1), 7);
    }

    #[test]
    fn serial_prg_switch() {
        let mut sxrom = load_sxrom(8);
        serial_write(&mut sxrom, 0xE000, 0x05);
        assert_eq!(sxrom.prg_rom_banks.page(0), 5, "switchable bank at $8000");
        assert_eq!(sxrom.prg_rom_banks.page(1), 7, "fixed last bank at $C000");
    }

    #[test]
    fn reset_bit_locks_prg_mode() {
        let mut sxrom = load_sxrom(8);
        // Select 32K mode
        serial_write(&mut sxrom, 0x8000, 0x00);
        assert_eq!(sxrom.prg_rom_banks.page(1), 1);
        // A write with bit 7 set restores fix-last mode
        let _ = sxrom.map_write(0x8000, 0x80);
        assert_eq!(sxrom.prg_rom_banks.page(1), 7);
    }

    #[test]
    fn mirroring_modes() {
        let mut sxrom = load_sxrom(2);
        serial_write(&mut sxrom, 0x8000, 0x02 | Sxrom::DEFAULT_CONTROL);
        assert_eq!(sxrom.mirroring(), Mirroring::Vertical);
        serial_write(&mut sxrom, 0x8000, 0x03 | Sxrom::DEFAULT_CONTROL);
        assert_eq!(sxrom.mirroring(), Mirroring::Horizontal);
        serial_write(&mut sxrom, 0x8000, Sxrom::DEFAULT_CONTROL);
        assert_eq!(sxrom.mirroring(), Mirroring::SingleScreenA);
    }
}
