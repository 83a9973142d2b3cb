//! NES control deck: the public emulation facade.

use crate::{
    bus::Bus,
    cart::Cart,
    common::{Reset, ResetKind},
    cpu::Cpu,
    error::{Error, Result},
    input::{Player, VirtualButtons},
    mapper::Mapped,
    mem::{Mem, RamState},
    ppu::NmiSignal,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Serialized machine state. The whole machine hangs off the CPU, so one
/// tree captures everything except ROM data, which is re-injected on load.
#[derive(Serialize, Deserialize)]
struct SaveState {
    crc32: u32,
    frame_count: u64,
    cycle_count: u64,
    cpu: Cpu,
}

/// An NES console: CPU, PPU, APU, bus, and the loaded cartridge.
///
/// The host drives it one video frame at a time:
///
/// ```no_run
/// # fn rom_bytes() -> Vec<u8> { Vec::new() }
/// use velones_core::prelude::*;
///
/// let mut deck = ControlDeck::new();
/// deck.load_rom(&rom_bytes()).expect("valid rom");
/// loop {
///     deck.run_frame(VirtualButtons::START, VirtualButtons::empty());
///     let _pixels = deck.framebuffer();
///     let mut audio = [0.0; 1024];
///     let _n = deck.drain_audio(&mut audio);
/// }
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct ControlDeck {
    cpu: Cpu,
    running: bool,
    crc32: u32,
    battery_backed: bool,
    frame_count: u64,
    cycle_count: u64,
    ram_state: RamState,
}

impl Default for ControlDeck {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlDeck {
    pub fn new() -> Self {
        Self::with_ram_state(RamState::default())
    }

    /// Create a deck with a specific power-on RAM fill.
    pub fn with_ram_state(ram_state: RamState) -> Self {
        Self {
            cpu: Cpu::new(Bus::new(ram_state)),
            running: false,
            crc32: 0,
            battery_backed: false,
            frame_count: 0,
            cycle_count: 0,
            ram_state,
        }
    }

    /// Load an `iNES` ROM image. On failure the deck keeps its previous
    /// state.
    ///
    /// # Errors
    ///
    /// If the header is invalid, the data is shorter than the header
    /// declares, or the mapper is unsupported, an error is returned.
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<()> {
        let cart = Cart::from_rom(rom, self.ram_state)?;
        self.crc32 = cart.crc32;
        self.battery_backed = cart.battery_backed();
        self.cpu.bus.load_cart(cart);
        self.reset(ResetKind::Hard);
        self.running = true;
        Ok(())
    }

    /// Reset the console. `Soft` is the reset button; `Hard` a power cycle.
    pub fn reset(&mut self, kind: ResetKind) {
        self.cpu.reset(kind);
        self.frame_count = 0;
        self.cycle_count = 0;
    }

    /// Run the machine until the PPU completes one frame (the start of
    /// scanline 241).
    ///
    /// The controller state is latched *after* the frame so the NMI handler
    /// that runs at the start of the next frame reads these buttons.
    pub fn run_frame(&mut self, input1: VirtualButtons, input2: VirtualButtons) {
        if !self.running {
            return;
        }

        let mut frame_done = false;
        while !frame_done {
            // One instruction, plus any DMA stall it caused
            let cycles = u16::from(self.cpu.step()) + self.cpu.bus.take_dma_cycles();
            self.cycle_count += u64::from(cycles);

            // Three dots per CPU cycle, polling per dot for NMI and
            // frame completion
            for _ in 0..3 * u32::from(cycles) {
                self.cpu.bus.ppu.clock();
                match self.cpu.bus.ppu.poll_nmi() {
                    Some(NmiSignal::Immediate) => self.cpu.trigger_nmi(),
                    Some(NmiSignal::Delayed) => self.cpu.trigger_nmi_delayed(),
                    None => (),
                }
                if self.cpu.bus.ppu.take_frame_complete() {
                    frame_done = true;
                }
            }

            self.cpu.bus.apu.clock(cycles);

            let frame_cycle = self.cpu.bus.ppu.frame_cycle();
            if self.cpu.bus.ppu.bus.mapper.irq_pending(frame_cycle) {
                self.cpu.trigger_irq();
                self.cpu.bus.ppu.bus.mapper.irq_clear();
            }
        }

        self.cpu.bus.input.set_buttons(Player::One, input1);
        self.cpu.bus.input.set_buttons(Player::Two, input2);
        self.frame_count += 1;
    }

    /// The last completed 256x240 frame as row-major RGBA8888 (ABGR
    /// little-endian), valid until the next `run_frame`.
    #[must_use]
    pub fn framebuffer(&self) -> &[u32] {
        self.cpu.bus.ppu.framebuffer()
    }

    /// Move buffered interleaved stereo samples into `out`, returning how
    /// many were written.
    pub fn drain_audio(&mut self, out: &mut [f32]) -> usize {
        self.cpu.bus.apu.drain_samples(out)
    }

    /// Buffered interleaved audio sample count.
    #[must_use]
    pub fn audio_len(&self) -> usize {
        self.cpu.bus.apu.sample_len()
    }

    /// Discard all buffered audio.
    pub fn clear_audio(&mut self) {
        self.cpu.bus.apu.clear_samples();
    }

    /// Debug read, free of side effects.
    #[must_use]
    pub fn read_memory(&self, addr: u16) -> u8 {
        self.cpu.bus.peek(addr)
    }

    /// Debug write through the CPU bus.
    pub fn write_memory(&mut self, addr: u16, val: u8) {
        self.cpu.bus.write(addr, val);
    }

    /// Serialize the machine into an opaque blob keyed by the ROM CRC32.
    ///
    /// # Errors
    ///
    /// If no ROM is loaded or serialization fails, an error is returned.
    pub fn save_state(&self) -> Result<Vec<u8>> {
        if !self.running {
            return Err(Error::RomNotLoaded);
        }
        let state = SaveState {
            crc32: self.crc32,
            frame_count: self.frame_count,
            cycle_count: self.cycle_count,
            cpu: self.cpu.clone(),
        };
        let data =
            bincode::serialize(&state).map_err(|err| Error::InvalidSaveState(err.to_string()))?;
        debug!("saved state: {} bytes", data.len());
        Ok(data)
    }

    /// Restore a blob from [`ControlDeck::save_state`]. The same ROM must be
    /// loaded; on failure the deck keeps its previous state.
    ///
    /// # Errors
    ///
    /// If no ROM is loaded, the blob does not parse, or it was taken from a
    /// different ROM, an error is returned.
    pub fn load_state(&mut self, data: &[u8]) -> Result<()> {
        if !self.running {
            return Err(Error::RomNotLoaded);
        }
        let mut state: SaveState =
            bincode::deserialize(data).map_err(|err| Error::InvalidSaveState(err.to_string()))?;
        if state.crc32 != self.crc32 {
            return Err(Error::SaveStateCrcMismatch {
                expected: self.crc32,
                found: state.crc32,
            });
        }
        // ROM data is not serialized; carry it over from the loaded cart
        state.cpu.bus.prg_rom = std::mem::take(&mut self.cpu.bus.prg_rom);
        state.cpu.bus.ppu.bus.chr_rom = std::mem::take(&mut self.cpu.bus.ppu.bus.chr_rom);
        self.cpu = state.cpu;
        self.frame_count = state.frame_count;
        self.cycle_count = state.cycle_count;
        info!("loaded state at frame {}", self.frame_count);
        Ok(())
    }

    /// CRC32 of the loaded ROM's PRG+CHR data.
    #[must_use]
    pub const fn rom_crc32(&self) -> u32 {
        self.crc32
    }

    /// Whether the loaded cartridge has battery-backed PRG-RAM.
    #[must_use]
    pub const fn battery_backed(&self) -> bool {
        self.battery_backed
    }

    /// Battery-backed PRG-RAM contents, for host persistence.
    #[must_use]
    pub fn sram(&self) -> &[u8] {
        &self.cpu.bus.prg_ram
    }

    /// Replace PRG-RAM contents, for host persistence.
    pub fn load_sram(&mut self, sram: Vec<u8>) {
        self.cpu.bus.prg_ram = sram.into();
    }

    /// Frames completed since the last reset.
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// CPU cycles executed since the last reset.
    #[must_use]
    pub const fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    pub const fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub const fn ppu(&self) -> &crate::ppu::Ppu {
        &self.cpu.bus.ppu
    }

    pub const fn apu(&self) -> &crate::apu::Apu {
        &self.cpu.bus.apu
    }
}
