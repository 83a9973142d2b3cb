//! NES CPU memory/data bus.
//!
//! <http://wiki.nesdev.com/w/index.php/CPU_memory_map>

use crate::{
    apu::Apu,
    cart::Cart,
    common::{Reset, ResetKind},
    input::{Input, Player},
    mapper::{MappedRead, MappedWrite, MemMap},
    mem::{Mem, Memory, RamState},
    ppu::Ppu,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// NES CPU bus.
///
/// |-----------------| $FFFF
/// | PRG-ROM         |
/// |-----------------| $8000
/// | PRG-RAM or SRAM |
/// |-----------------| $6000
/// | Expansion       |
/// |-----------------| $4020
/// | APU/Input       |
/// |- - - - - - - - -| $4000
/// | PPU mirrors     |
/// |- - - - - - - - -| $2008
/// | PPU registers   |
/// |-----------------| $2000
/// | WRAM mirrors    |
/// |- - - - - - - - -| $0800
/// | 2K work RAM     |
/// |-----------------| $0000
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Bus {
    pub wram: Memory,
    pub ram_state: RamState,
    #[serde(skip)]
    pub prg_rom: Memory,
    pub prg_ram: Memory,
    pub ppu: Ppu,
    pub apu: Apu,
    pub input: Input,
    pub open_bus: u8,
    /// CPU stall cycles owed for the last OAM DMA, consumed by the frame
    /// loop.
    pub pending_dma_cycles: u16,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(RamState::default())
    }
}

impl Bus {
    const WRAM_SIZE: usize = 0x0800;
    const OAM_DMA_CYCLES: u16 = 513;

    pub fn new(ram_state: RamState) -> Self {
        Self {
            wram: Memory::ram(ram_state, Self::WRAM_SIZE),
            ram_state,
            prg_rom: Memory::new(),
            prg_ram: Memory::new(),
            ppu: Ppu::new(),
            apu: Apu::new(),
            input: Input::new(),
            open_bus: 0x00,
            pending_dma_cycles: 0,
        }
    }

    /// Wire a parsed cartridge into the bus: PRG here, CHR and the mapper on
    /// the PPU bus.
    pub fn load_cart(&mut self, cart: Cart) {
        self.prg_rom = cart.prg_rom;
        self.prg_ram = cart.prg_ram;
        self.ppu.bus.chr_rom = cart.chr_rom;
        self.ppu.bus.chr_ram = cart.chr_ram;
        if cart.header.mirroring() == crate::ppu::Mirroring::FourScreen {
            self.ppu.bus.exram = Memory::with_size(0x0800);
        }
        self.ppu.load_mapper(cart.mapper);
    }

    /// Take the stall cycles owed for a just-run OAM DMA.
    pub fn take_dma_cycles(&mut self) -> u16 {
        std::mem::take(&mut self.pending_dma_cycles)
    }

    /// $4014 write: copy a 256-byte page into OAM through 256 bus reads and
    /// `$2004` writes, starting at the current OAMADDR.
    fn oam_dma(&mut self, page: u8) {
        trace!("OAM DMA from page ${page:02X}");
        let base = u16::from(page) << 8;
        for offset in 0..256 {
            let val = self.read(base + offset);
            self.ppu.write_oamdata(val);
        }
        self.pending_dma_cycles = Self::OAM_DMA_CYCLES;
    }
}

impl Mem for Bus {
    fn read(&mut self, addr: u16) -> u8 {
        let val = match addr {
            0x0000..=0x1FFF => self.wram[usize::from(addr & 0x07FF)],
            0x2000..=0x3FFF => match addr & 0x2007 {
                0x2002 => self.ppu.read_status(),
                0x2004 => self.ppu.read_oamdata(),
                0x2007 => self.ppu.read_data(),
                _ => self.open_bus,
            },
            0x4015 => self.apu.read_status(),
            0x4016 => self.input.read(Player::One),
            0x4017 => self.input.read(Player::Two),
            0x4000..=0x401F => self.open_bus,
            0x4020..=0xFFFF => match self.ppu.bus.mapper.map_read(addr) {
                MappedRead::Data(val) => val,
                MappedRead::PrgRam(mapped) => self.prg_ram.get(mapped).copied().unwrap_or(0),
                MappedRead::PrgRom(mapped) => self.prg_rom.get(mapped).copied().unwrap_or(0),
                _ => self.open_bus,
            },
        };
        self.open_bus = val;
        val
    }

    fn peek(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.wram[usize::from(addr & 0x07FF)],
            0x2000..=0x3FFF => match addr & 0x2007 {
                0x2002 => self.ppu.peek_status(),
                0x2004 => self.ppu.peek_oamdata(),
                0x2007 => self.ppu.peek_data(),
                _ => self.open_bus,
            },
            0x4015 => self.apu.peek_status(),
            0x4016 => self.input.peek(Player::One),
            0x4017 => self.input.peek(Player::Two),
            0x4000..=0x401F => self.open_bus,
            0x4020..=0xFFFF => match self.ppu.bus.mapper.map_peek(addr) {
                MappedRead::Data(val) => val,
                MappedRead::PrgRam(mapped) => self.prg_ram.get(mapped).copied().unwrap_or(0),
                MappedRead::PrgRom(mapped) => self.prg_rom.get(mapped).copied().unwrap_or(0),
                _ => self.open_bus,
            },
        }
    }

    fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x1FFF => self.wram[usize::from(addr & 0x07FF)] = val,
            0x2000..=0x3FFF => match addr & 0x2007 {
                0x2000 => self.ppu.write_ctrl(val),
                0x2001 => self.ppu.write_mask(val),
                0x2003 => self.ppu.write_oamaddr(val),
                0x2004 => self.ppu.write_oamdata(val),
                0x2005 => self.ppu.write_scroll(val),
                0x2006 => self.ppu.write_addr(val),
                0x2007 => self.ppu.write_data(val),
                _ => (),
            },
            0x4014 => self.oam_dma(val),
            0x4016 => self.input.write(val),
            0x4000..=0x4013 | 0x4015 | 0x4017 => self.apu.write_register(addr, val),
            0x4018..=0x401F => (),
            0x4020..=0xFFFF => {
                if let MappedWrite::PrgRam(mapped, val) = self.ppu.bus.mapper.map_write(addr, val) {
                    if let Some(slot) = self.prg_ram.get_mut(mapped) {
                        *slot = val;
                    }
                }
            }
        }
        self.open_bus = val;
    }
}

impl Reset for Bus {
    fn reset(&mut self, kind: ResetKind) {
        if kind == ResetKind::Hard {
            self.wram.fill_ram(self.ram_state);
        }
        self.open_bus = 0x00;
        self.pending_dma_cycles = 0;
        self.input = Input::new();
        self.ppu.reset(kind);
        self.apu.reset(kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::VirtualButtons;

    #[test]
    fn wram_mirrors() {
        let mut bus = Bus::default();
        bus.write(0x0001, 0x66);
        assert_eq!(bus.read(0x0001), 0x66);
        assert_eq!(bus.read(0x0801), 0x66);
        assert_eq!(bus.read(0x1001), 0x66);
        assert_eq!(bus.read(0x1801), 0x66);

        bus.write(0x0802, 0x77);
        assert_eq!(bus.read(0x0002), 0x77);
    }

    #[test]
    fn ppu_register_mirrors() {
        let mut bus = Bus::default();
        // $2006 mirrors every 8 bytes through $3FFF
        bus.write(0x3FFE, 0x23);
        bus.write(0x3FFE, 0x05);
        bus.write(0x2007, 0x66);
        bus.write(0x2006, 0x23);
        bus.write(0x2006, 0x05);
        bus.read(0x2007); // buffered
        assert_eq!(bus.read(0x2007), 0x66);
    }

    #[test]
    fn unmapped_reads_return_open_bus() {
        let mut bus = Bus::default();
        assert_eq!(bus.read(0x5000), 0x00, "no cart mapped");
    }

    #[test]
    fn oam_dma_copies_page_at_oamaddr() {
        let mut bus = Bus::default();
        for i in 0..=255u16 {
            bus.write(0x0700 + i, i as u8);
        }
        bus.write(0x2003, 0x10); // OAMADDR
        bus.write(0x4014, 0x07);

        assert_eq!(bus.take_dma_cycles(), 513);
        assert_eq!(bus.take_dma_cycles(), 0, "stall cycles are consumed once");
        assert_eq!(bus.ppu.oam[0x10], 0x00, "first byte lands at OAMADDR");
        assert_eq!(bus.ppu.oam[0x11], 0x01);
        assert_eq!(bus.ppu.oam[0x0F], 0xFF, "wraps around OAM");
    }

    #[test]
    fn controller_strobe_and_read() {
        let mut bus = Bus::default();
        bus.input
            .set_buttons(Player::One, VirtualButtons::A | VirtualButtons::RIGHT);
        bus.write(0x4016, 0x01);
        bus.write(0x4016, 0x00);

        let bits: Vec<u8> = (0..8).map(|_| bus.read(0x4016) & 0x01).collect();
        assert_eq!(bits, [1, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(bus.read(0x4016) & 0x41, 0x41, "post-drain reads 1 + open bus");
    }
}
