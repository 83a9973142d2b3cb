//! `TxROM`/`MMC3` (Mapper 004).
//!
//! <https://wiki.nesdev.org/w/index.php/TxROM>
//! <https://wiki.nesdev.org/w/index.php/MMC3>

use crate::{
    cart::Cart,
    common::{Reset, ResetKind},
    mapper::{self, Mapped, MappedRead, MappedWrite, Mapper, MemMap, FRAME_CYCLE_WRAP},
    mem::Banks,
    ppu::Mirroring,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// `TxROM` bank registers and IRQ state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Regs {
    pub bank_select: u8,
    pub bank_values: [u8; 8],
    pub prg_mode: bool,
    pub chr_mode: bool,
    pub irq_latch: u8,
    pub irq_counter: u8,
    pub irq_enabled: bool,
    pub irq_reload: bool,
    pub irq_pending: bool,
}

/// `TxROM`/`MMC3` (Mapper 004).
///
/// The scanline counter is clocked by rising edges of PPU address line A12
/// that follow at least [`Txrom::A12_FILTER`] dots of A12 low, which on a
/// standard $0000-background/$1000-sprite layout fires once per rendered
/// scanline during the sprite fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Txrom {
    pub regs: Regs,
    pub mirroring: Mirroring,
    pub hardwired_mirroring: bool,
    pub last_a12: bool,
    pub last_a12_cycle: u32,
    pub irq_pending_at_cycle: u32,
    pub chr_banks: Banks,
    pub prg_rom_banks: Banks,
}

impl Txrom {
    const PRG_ROM_WINDOW: usize = 8 * 1024;
    const CHR_WINDOW: usize = 1024;
    const PRG_RAM_SIZE: usize = 8 * 1024;
    const CHR_RAM_SIZE: usize = 8 * 1024;

    /// Minimum dots of continuous A12 low before a rising edge clocks the
    /// counter.
    const A12_FILTER: u32 = 16;
    /// Dots between the counter reaching zero and the IRQ line asserting.
    const IRQ_DELAY_CYCLES: u32 = 0;

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
        let hardwired_mirroring = cart.mirroring() == Mirroring::FourScreen;
        let mut txrom = Self {
            regs: Regs {
                bank_select: 0x00,
                bank_values: [0x00; 8],
                prg_mode: false,
                chr_mode: false,
                irq_latch: 0x00,
                irq_counter: 0x00,
                irq_enabled: false,
                irq_reload: false,
                irq_pending: false,
            },
            mirroring: cart.mirroring(),
            hardwired_mirroring,
            last_a12: false,
            last_a12_cycle: 0,
            irq_pending_at_cycle: 0,
            chr_banks: Banks::new(0x0000, 0x1FFF, chr_len, Self::CHR_WINDOW)?,
            prg_rom_banks: Banks::new(0x8000, 0xFFFF, cart.prg_rom.len(), Self::PRG_ROM_WINDOW)?,
        };
        txrom.update_banks();
        Ok(txrom.into())
    }

    pub fn update_banks(&mut self) {
        let last = self.prg_rom_banks.last();
        // MMC3 exposes six PRG address lines
        let r6 = usize::from(self.regs.bank_values[6] & 0x3F);
        let r7 = usize::from(self.regs.bank_values[7] & 0x3F);
        if self.regs.prg_mode {
            // $C000 swappable, $8000 fixed to second-to-last
            self.prg_rom_banks.set(0, last.saturating_sub(1));
            self.prg_rom_banks.set(1, r7);
            self.prg_rom_banks.set(2, r6);
            self.prg_rom_banks.set(3, last);
        } else {
            // $8000 swappable, $C000 fixed to second-to-last
            self.prg_rom_banks.set(0, r6);
            self.prg_rom_banks.set(1, r7);
            self.prg_rom_banks.set(2, last.saturating_sub(1));
            self.prg_rom_banks.set(3, last);
        }

        // R0-R1 select 2K banks (low bit ignored), R2-R5 select 1K banks
        let r = &self.regs.bank_values;
        if self.regs.chr_mode {
            self.chr_banks.set(0, r[2].into());
            self.chr_banks.set(1, r[3].into());
            self.chr_banks.set(2, r[4].into());
            self.chr_banks.set(3, r[5].into());
            self.chr_banks.set(4, (r[0] & 0xFE).into());
            self.chr_banks.set(5, usize::from(r[0] & 0xFE) + 1);
            self.chr_banks.set(6, (r[1] & 0xFE).into());
            self.chr_banks.set(7, usize::from(r[1] & 0xFE) + 1);
        } else {
            self.chr_banks.set(0, (r[0] & 0xFE).into());
            self.chr_banks.set(1, usize::from(r[0] & 0xFE) + 1);
            self.chr_banks.set(2, (r[1] & 0xFE).into());
            self.chr_banks.set(3, usize::from(r[1] & 0xFE) + 1);
            self.chr_banks.set(4, r[2].into());
            self.chr_banks.set(5, r[3].into());
            self.chr_banks.set(6, r[4].into());
            self.chr_banks.set(7, r[5].into());
        }
    }

    /// Clock the scanline counter on a filtered A12 rising edge.
    fn clock_irq_counter(&mut self, frame_cycle: u32) {
        if self.regs.irq_counter == 0 || self.regs.irq_reload {
            self.regs.irq_counter = self.regs.irq_latch;
            self.regs.irq_reload = false;
        } else {
            self.regs.irq_counter -= 1;
        }
        if self.regs.irq_counter == 0 && self.regs.irq_enabled {
            trace!("MMC3 IRQ scheduled at frame cycle {frame_cycle}");
            if self.irq_pending_at_cycle == 0 && !self.regs.irq_pending {
                self.irq_pending_at_cycle = frame_cycle.max(1);
            }
        }
    }

    fn clock_a12(&mut self, a12: bool, frame_cycle: u32) {
        if !a12 {
            if self.last_a12 {
                // Falling edge: remember when A12 went low
                self.last_a12_cycle = frame_cycle;
            }
        } else if !self.last_a12 {
            let cycles_low = if frame_cycle >= self.last_a12_cycle {
                frame_cycle - self.last_a12_cycle
            } else {
                frame_cycle + FRAME_CYCLE_WRAP - self.last_a12_cycle
            };
            if cycles_low >= Self::A12_FILTER {
                self.clock_irq_counter(frame_cycle);
            }
        }
        self.last_a12 = a12;
    }
}

impl MemMap for Txrom {
    // PPU $0000..=$1FFF eight 1K CHR banks (two of them 2K-paired)
    // CPU $6000..=$7FFF 8K PRG-RAM bank
    // CPU $8000..=$FFFF four 8K PRG-ROM banks, two fixed

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
            0x0000..=0x1FFF => MappedWrite::ChrRam(self.chr_banks.translate(addr), val),
            0x6000..=0x7FFF => MappedWrite::PrgRam((addr & 0x1FFF).into(), val),
            0x8000..=0xFFFF => {
                let even = addr & 0x01 == 0x00;
                match (addr & 0xE000, even) {
                    (0x8000, true) => {
                        self.regs.bank_select = val & 0x07;
                        self.regs.prg_mode = val & 0x40 != 0;
                        self.regs.chr_mode = val & 0x80 != 0;
                        self.update_banks();
                    }
                    (0x8000, false) => {
                        self.regs.bank_values[usize::from(self.regs.bank_select)] = val;
                        self.update_banks();
                    }
                    (0xA000, true) => {
                        if !self.hardwired_mirroring {
                            self.mirroring = if val & 0x01 == 0x01 {
                                Mirroring::Horizontal
                            } else {
                                Mirroring::Vertical
                            };
                        }
                    }
                    // $A001 PRG-RAM protect: not emulated (bus conflicts and
                    // write protection are out of scope)
                    (0xA000, false) => (),
                    (0xC000, true) => self.regs.irq_latch = val,
                    (0xC000, false) => self.regs.irq_reload = true,
                    (0xE000, true) => {
                        self.regs.irq_enabled = false;
                        self.regs.irq_pending = false;
                        self.irq_pending_at_cycle = 0;
                    }
                    (0xE000, false) => self.regs.irq_enabled = true,
                    _ => (),
                }
                MappedWrite::Bus
            }
            _ => MappedWrite::Bus,
        }
    }
}

impl Mapped for Txrom {
    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring = mirroring;
    }

    fn notify_address_bus(&mut self, addr: u16, frame_cycle: u32) {
        let a12 = addr & 0x1000 != 0;
        if a12 == self.last_a12 {
            return;
        }
        self.clock_a12(a12, frame_cycle);
    }

    fn notify_addr_change(&mut self, _old: u16, new: u16, frame_cycle: u32) {
        // Only CHR-space addresses participate in A12 clocking
        if new & 0x3FFF >= 0x2000 {
            return;
        }
        self.notify_address_bus(new, frame_cycle);
    }

    fn notify_frame_start(&mut self) {
        // Reset the cycle reference so filter math never spans a frame
        // boundary; the A12 wire itself does not reset.
        self.last_a12_cycle = 0;
        self.irq_pending_at_cycle = 0;
    }

    fn irq_pending(&mut self, frame_cycle: u32) -> bool {
        if self.regs.irq_pending {
            return true;
        }
        if self.irq_pending_at_cycle > 0 && self.regs.irq_enabled {
            let elapsed = if frame_cycle >= self.irq_pending_at_cycle {
                frame_cycle - self.irq_pending_at_cycle
            } else {
                frame_cycle + FRAME_CYCLE_WRAP - self.irq_pending_at_cycle
            };
            if elapsed >= Self::IRQ_DELAY_CYCLES {
                self.regs.irq_pending = true;
                self.irq_pending_at_cycle = 0;
                return true;
            }
        }
        false
    }

    fn irq_clear(&mut self) {
        self.regs.irq_pending = false;
    }
}

impl Reset for Txrom {
    fn reset(&mut self, _kind: ResetKind) {
        self.regs = Regs {
            bank_select: 0x00,
            bank_values: [0x00; 8],
            prg_mode: false,
            chr_mode: false,
            irq_latch: 0x00,
            irq_counter: 0x00,
            irq_enabled: false,
            irq_reload: false,
            irq_pending: false,
        };
        self.last_a12 = false;
        self.last_a12_cycle = 0;
        self.irq_pending_at_cycle = 0;
        self.update_banks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::Memory;

    fn load_txrom() -> Txrom {
        let mut cart = Cart::empty();
        cart.prg_rom = Memory::with_size(128 * 1024);
        cart.chr_rom = Memory::with_size(128 * 1024);
        match Txrom::load(&mut cart).unwrap() {
            Mapper::Txrom(txrom) => txrom,
            _ => unreachable!(),
        }
    }

    /// One filtered rising edge: >= 16 dots low, then high.
    fn pulse_a12(txrom: &mut Txrom, low_at: u32, high_at: u32) {
        txrom.notify_address_bus(0x0000, low_at);
        txrom.notify_address_bus(0x1000, high_at);
    }

    #[test]
    fn prg_mode_banks() {
        let mut txrom = load_txrom();
        let last = txrom.prg_rom_banks.last();

        // R6 = 2 in mode 0: $8000 switchable
        let _ = txrom.map_write(0x8000, 0x06);
        let _ = txrom.map_write(0x8001, 0x02);
        assert_eq!(txrom.prg_rom_banks.page(0), 2);
        assert_eq!(txrom.prg_rom_banks.page(2), last - 1);
        assert_eq!(txrom.prg_rom_banks.page(3), last);

        // Mode 1: $C000 switchable, $8000 fixed to second-to-last
        let _ = txrom.map_write(0x8000, 0x46);
        assert_eq!(txrom.prg_rom_banks.page(0), last - 1);
        assert_eq!(txrom.prg_rom_banks.page(2), 2);
    }

    #[test]
    fn chr_two_kib_pairs_ignore_low_bit() {
        let mut txrom = load_txrom();
        let _ = txrom.map_write(0x8000, 0x00);
        let _ = txrom.map_write(0x8001, 0x05); // R0 = 5, low bit dropped
        assert_eq!(txrom.chr_banks.page(0), 4);
        assert_eq!(txrom.chr_banks.page(1), 5);
    }

    #[test]
    fn a12_filter_requires_sixteen_dots_low() {
        let mut txrom = load_txrom();
        let _ = txrom.map_write(0xC000, 3); // latch
        let _ = txrom.map_write(0xC001, 0); // reload
        let _ = txrom.map_write(0xE001, 0); // enable

        // First filtered edge reloads the counter from the latch
        txrom.notify_address_bus(0x1000, 50);
        assert_eq!(txrom.regs.irq_counter, 3);

        // Rapid toggling (8 dots low) must not clock the counter
        pulse_a12(&mut txrom, 100, 108);
        assert_eq!(txrom.regs.irq_counter, 3, "filtered edge ignored");

        pulse_a12(&mut txrom, 200, 220);
        pulse_a12(&mut txrom, 300, 320);
        assert_eq!(txrom.regs.irq_counter, 1);
        assert!(!txrom.irq_pending(320), "no IRQ until counter hits zero");

        pulse_a12(&mut txrom, 400, 420);
        assert_eq!(txrom.regs.irq_counter, 0);
        assert!(txrom.irq_pending(420), "IRQ on reaching zero");
    }

    #[test]
    fn a12_filter_wraps_frame_boundary() {
        let mut txrom = load_txrom();
        let _ = txrom.map_write(0xC000, 1);
        let _ = txrom.map_write(0xC001, 0);
        let _ = txrom.map_write(0xE001, 0);

        txrom.notify_address_bus(0x1000, 100);
        assert_eq!(txrom.regs.irq_counter, 1);

        // Low near the end of a frame, high shortly after the wrap
        pulse_a12(&mut txrom, FRAME_CYCLE_WRAP - 10, 10);
        assert!(txrom.irq_pending(10), "wrap counted as 20 dots low");
    }

    #[test]
    fn irq_disable_clears_pending() {
        let mut txrom = load_txrom();
        let _ = txrom.map_write(0xC000, 0);
        let _ = txrom.map_write(0xC001, 0);
        let _ = txrom.map_write(0xE001, 0);
        pulse_a12(&mut txrom, 100, 120);
        assert!(txrom.irq_pending(120));

        let _ = txrom.map_write(0xE000, 0);
        assert!(!txrom.irq_pending(120), "disable acknowledges the IRQ");
    }

    #[test]
    fn mirroring_register() {
        let mut txrom = load_txrom();
        let _ = txrom.map_write(0xA000, 0x01);
        assert_eq!(txrom.mirroring(), Mirroring::Horizontal);
        let _ = txrom.map_write(0xA000, 0x00);
        assert_eq!(txrom.mirroring(), Mirroring::Vertical);
    }
}
