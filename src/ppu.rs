//! NES 2C02 PPU (Picture Processing Unit) implementation.
//!
//! <https://wiki.nesdev.org/w/index.php/PPU>

use crate::{
    common::{Reset, ResetKind},
    mapper::{Mapped, Mapper},
    mem::{Mem, Memory},
    ppu::{bus::Bus, ctrl::Ctrl, frame::Frame, mask::Mask, scroll::Scroll, sprite::Sprite, status::Status},
};
use serde::{Deserialize, Serialize};
use tracing::trace;

pub mod bus;
pub mod ctrl;
pub mod frame;
pub mod mask;
pub mod scroll;
pub mod sprite;
pub mod status;

/// Nametable mirroring mode.
///
/// The discriminant doubles as the address shift used by
/// [`Bus::ciram_mirror`].
///
/// <https://wiki.nesdev.org/w/index.php/Mirroring#Nametable_Mirroring>
#[derive(Default, Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[must_use]
pub enum Mirroring {
    Vertical = 0,
    #[default]
    Horizontal = 1,
    SingleScreenA = 2,
    SingleScreenB = 3,
    FourScreen = 4,
}

/// How a pending NMI should be delivered to the CPU.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[must_use]
pub enum NmiSignal {
    /// Service before the next instruction.
    Immediate,
    /// Service after the next instruction completes (PPUCTRL enable edge
    /// mid-VBlank).
    Delayed,
}

/// NES 2C02 PPU.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Ppu {
    /// $2000 PPUCTRL (write-only).
    pub ctrl: Ctrl,
    /// $2001 PPUMASK (write-only).
    pub mask: Mask,
    /// $2002 PPUSTATUS (read-only).
    pub status: Status,
    /// $2003 OAMADDR (write-only).
    pub oam_addr: u8,
    /// Internal v/t/x/w scrolling state.
    pub scroll: Scroll,
    /// $2007 PPUDATA read buffer.
    pub data_buffer: u8,

    // Timing
    pub scanline: u16,
    pub cycle: u16,
    pub odd_frame: bool,
    pub cycle_count: u64,

    // VBlank/NMI lifecycle
    nmi_occurred: bool,
    nmi_output: bool,
    nmi_latched: bool,
    nmi_delay: u8,
    nmi_immediate: bool,
    nmi_delayed: bool,
    vbl_suppress: bool,
    suppress_nmi: bool,
    frame_complete: bool,

    // Background pipeline
    tile_shift_lo: u16,
    tile_shift_hi: u16,
    attr_shift_lo: u16,
    attr_shift_hi: u16,
    next_tile_id: u8,
    next_tile_attr: u8,
    next_tile_lo: u8,
    next_tile_hi: u8,

    // Sprite pipeline
    pub oam: Memory,
    sprites: [Sprite; 8],
    sprite_shift_lo: [u8; 8],
    sprite_shift_hi: [u8; 8],
    sprite_count: u8,
    sprite_eval_scanline: u16,
    sprite_zero_possible: bool,
    sprite_zero_rendering: bool,

    // PPUMASK writes land mid-instruction; the odd-frame skip decision has
    // to know whether the write was "recent" relative to dot (261, 339)
    mask_prev: u8,
    mask_write_cycle: u64,

    pub bus: Bus,
    pub frame: Frame,
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

impl Ppu {
    pub const WIDTH: u32 = 256;
    pub const HEIGHT: u32 = 240;

    pub const OAM_SIZE: usize = 256;

    pub const VISIBLE_END: u16 = 239;
    pub const VBLANK_SCANLINE: u16 = 241;
    pub const PRERENDER_SCANLINE: u16 = 261;
    pub const CYCLE_END: u16 = 340;

    /// Dots an NMI waits after the VBL flag rises before the CPU sees it.
    const NMI_DELAY: u8 = 15;

    pub fn new() -> Self {
        Self {
            ctrl: Ctrl::default(),
            mask: Mask::default(),
            status: Status::default(),
            oam_addr: 0x00,
            scroll: Scroll::new(),
            data_buffer: 0x00,

            scanline: 0,
            cycle: 0,
            odd_frame: false,
            cycle_count: 0,

            nmi_occurred: false,
            nmi_output: false,
            nmi_latched: false,
            nmi_delay: 0,
            nmi_immediate: false,
            nmi_delayed: false,
            vbl_suppress: false,
            suppress_nmi: false,
            frame_complete: false,

            tile_shift_lo: 0x0000,
            tile_shift_hi: 0x0000,
            attr_shift_lo: 0x0000,
            attr_shift_hi: 0x0000,
            next_tile_id: 0x00,
            next_tile_attr: 0x00,
            next_tile_lo: 0x00,
            next_tile_hi: 0x00,

            oam: Memory::with_size(Self::OAM_SIZE),
            sprites: [Sprite::new(); 8],
            sprite_shift_lo: [0x00; 8],
            sprite_shift_hi: [0x00; 8],
            sprite_count: 0,
            sprite_eval_scanline: 0,
            sprite_zero_possible: false,
            sprite_zero_rendering: false,

            mask_prev: 0x00,
            mask_write_cycle: 0,

            bus: Bus::new(),
            frame: Frame::new(),
        }
    }

    /// Load a mapper into the PPU bus.
    pub fn load_mapper(&mut self, mapper: Mapper) {
        self.bus.mapper = mapper;
    }

    pub fn mirroring(&self) -> Mirroring {
        self.bus.mirroring()
    }

    /// The current dot position as `scanline * 341 + cycle`, passed to the
    /// mapper for A12 filtering.
    #[inline]
    #[must_use]
    pub const fn frame_cycle(&self) -> u32 {
        self.scanline as u32 * 341 + self.cycle as u32
    }

    #[must_use]
    pub fn framebuffer(&self) -> &[u32] {
        self.frame.buffer()
    }

    /// One-shot: any NMI ready for the CPU.
    pub fn poll_nmi(&mut self) -> Option<NmiSignal> {
        if self.nmi_immediate {
            self.nmi_immediate = false;
            Some(NmiSignal::Immediate)
        } else if self.nmi_delayed {
            self.nmi_delayed = false;
            Some(NmiSignal::Delayed)
        } else {
            None
        }
    }

    /// One-shot: the frame finished at the start of scanline 241.
    pub fn take_frame_complete(&mut self) -> bool {
        std::mem::take(&mut self.frame_complete)
    }

    // Register access, CPU side

    /// $2000 PPUCTRL write.
    pub fn write_ctrl(&mut self, val: u8) {
        let was_enabled = self.nmi_output;
        self.ctrl.write(val);
        self.scroll.write_nametable_select(val);
        self.nmi_output = self.ctrl.nmi_enabled();

        trace!(
            "$2000 write: {val:02X} NMI output: {} - PPU:{:3},{:3}",
            self.nmi_output, self.scanline, self.cycle
        );

        if !was_enabled && self.nmi_output && self.nmi_occurred {
            // Enabling NMI mid-VBlank raises one, but only after the next
            // instruction finishes
            self.nmi_delayed = true;
        }
        if was_enabled
            && !self.nmi_output
            && self.scanline == Self::VBLANK_SCANLINE
            && matches!(self.cycle, 1..=2)
        {
            // Disabling right at VBL onset cancels the in-flight NMI
            self.nmi_latched = false;
            self.nmi_delay = 0;
            self.nmi_immediate = false;
            self.nmi_delayed = false;
        }
    }

    /// $2001 PPUMASK write.
    pub fn write_mask(&mut self, val: u8) {
        self.mask_prev = self.mask.bits();
        self.mask_write_cycle = self.cycle_count;
        self.mask.write(val);
    }

    /// $2002 PPUSTATUS read: clears VBL and the shared write toggle.
    pub fn read_status(&mut self) -> u8 {
        let status = self.peek_status();
        self.status.remove(Status::VBLANK);
        self.nmi_occurred = false;
        self.scroll.reset_latch();

        if self.scanline == Self::VBLANK_SCANLINE {
            match self.cycle {
                // One dot before the flag rises: it never rises this frame
                0 => {
                    trace!("$2002 read suppresses VBL - PPU:{:3},{:3}", self.scanline, self.cycle);
                    self.vbl_suppress = true;
                    self.suppress_nmi = true;
                }
                // Flag already returned, but the NMI is swallowed
                1..=2 => {
                    self.nmi_latched = false;
                    self.nmi_delay = 0;
                    self.nmi_immediate = false;
                }
                _ => (),
            }
        }
        status
    }

    /// Non-mutating version of `read_status`.
    #[must_use]
    pub fn peek_status(&self) -> u8 {
        (self.status.bits() & 0xE0) | (self.data_buffer & 0x1F)
    }

    /// $2003 OAMADDR write.
    pub fn write_oamaddr(&mut self, val: u8) {
        self.oam_addr = val;
    }

    /// $2004 OAMDATA read.
    pub fn read_oamdata(&mut self) -> u8 {
        self.peek_oamdata()
    }

    #[must_use]
    pub fn peek_oamdata(&self) -> u8 {
        self.oam[usize::from(self.oam_addr)]
    }

    /// $2004 OAMDATA write; increments OAMADDR.
    pub fn write_oamdata(&mut self, val: u8) {
        self.oam[usize::from(self.oam_addr)] = val;
        self.oam_addr = self.oam_addr.wrapping_add(1);
    }

    /// Direct OAM write, bypassing OAMADDR.
    pub fn oam_write(&mut self, idx: u8, val: u8) {
        self.oam[usize::from(idx)] = val;
    }

    /// $2005 PPUSCROLL write.
    pub fn write_scroll(&mut self, val: u8) {
        self.scroll.write_scroll(val);
    }

    /// $2006 PPUADDR write.
    pub fn write_addr(&mut self, val: u8) {
        let old = self.scroll.v;
        if let Some(new) = self.scroll.write_addr(val) {
            let frame_cycle = self.frame_cycle();
            self.bus.mapper.notify_addr_change(old, new, frame_cycle);
        }
    }

    /// $2007 PPUDATA read: buffered except for palette RAM.
    pub fn read_data(&mut self) -> u8 {
        let addr = self.scroll.addr();
        let val = self.bus.read(addr);
        let val = if addr >= 0x3F00 {
            // Palette reads bypass the buffer, which instead latches the
            // nametable byte underneath
            self.data_buffer = self.bus.read(addr - 0x1000);
            val
        } else {
            std::mem::replace(&mut self.data_buffer, val)
        };
        self.increment_vram_addr();
        val
    }

    /// Non-mutating version of `read_data`.
    #[must_use]
    pub fn peek_data(&self) -> u8 {
        let addr = self.scroll.addr();
        if addr >= 0x3F00 {
            self.bus.peek(addr)
        } else {
            self.data_buffer
        }
    }

    /// $2007 PPUDATA write.
    pub fn write_data(&mut self, val: u8) {
        let addr = self.scroll.addr();
        self.bus.write(addr, val);
        self.increment_vram_addr();
    }

    fn increment_vram_addr(&mut self) {
        let old = self.scroll.v;
        self.scroll.increment(self.ctrl.vram_increment());
        let frame_cycle = self.frame_cycle();
        self.bus.mapper.notify_addr_change(old, self.scroll.v, frame_cycle);
    }

    // Dot clock

    /// Advance one PPU dot.
    pub fn clock(&mut self) {
        self.cycle_count = self.cycle_count.wrapping_add(1);

        if self.nmi_delay > 0 {
            self.nmi_delay -= 1;
            if self.nmi_delay == 0 && self.nmi_latched {
                self.nmi_latched = false;
                self.nmi_immediate = true;
            }
        }

        // On odd rendering frames (261, 340) is skipped entirely
        if self.scanline == Self::PRERENDER_SCANLINE
            && self.cycle == Self::CYCLE_END - 1
            && self.odd_frame
            && self.skip_rendering_enabled()
        {
            trace!("odd frame skip: {}", self.frame.number);
            self.wrap_frame();
        } else if self.cycle >= Self::CYCLE_END {
            self.cycle = 0;
            if self.scanline >= Self::PRERENDER_SCANLINE {
                self.wrap_frame();
            } else {
                self.scanline += 1;
            }
        } else {
            self.cycle += 1;
        }

        self.tick();
    }

    fn wrap_frame(&mut self) {
        self.scanline = 0;
        self.cycle = 0;
        self.frame.increment();
        self.odd_frame = !self.odd_frame;
        self.bus.mapper.notify_frame_start();
    }

    /// Whether rendering counts as enabled for the odd-frame-skip decision.
    ///
    /// The CPU runs whole instructions before the PPU catches up, so a
    /// PPUMASK write in the last couple of dots is visible "too early"; use
    /// the pre-write value in that case.
    fn skip_rendering_enabled(&self) -> bool {
        let bits = if self.cycle_count.wrapping_sub(self.mask_write_cycle) <= 2 {
            self.mask_prev
        } else {
            self.mask.bits()
        };
        bits & (Mask::SHOW_BG | Mask::SHOW_SPR).bits() != 0
    }

    fn tick(&mut self) {
        let scanline = self.scanline;
        let cycle = self.cycle;
        let visible = scanline <= Self::VISIBLE_END;
        let prerender = scanline == Self::PRERENDER_SCANLINE;

        if prerender && cycle == 1 {
            self.status
                .remove(Status::VBLANK | Status::SPR_ZERO_HIT | Status::SPR_OVERFLOW);
            self.nmi_occurred = false;
        }

        if scanline == Self::VBLANK_SCANLINE && cycle == 1 {
            self.start_vblank();
        }

        // Pixels come out even with rendering disabled (backdrop color)
        if visible && matches!(cycle, 1..=256) {
            self.render_pixel();
        }

        if (visible || prerender) && self.mask.rendering_enabled() {
            match cycle {
                1..=256 => {
                    self.shift_background();
                    self.fetch_background(cycle);
                    if cycle == 256 {
                        self.scroll.increment_y();
                    }
                }
                257 => {
                    self.scroll.copy_x();
                    let target = if prerender { 0 } else { scanline + 1 };
                    self.evaluate_sprites(target);
                    self.sprite_fetch(cycle);
                }
                258..=320 => {
                    if prerender && matches!(cycle, 280..=304) {
                        self.scroll.copy_y();
                    }
                    self.sprite_fetch(cycle);
                }
                321..=336 => {
                    self.shift_background();
                    self.fetch_background(cycle);
                }
                // Dummy nametable fetches; their only effect is clocking
                // A12-watching mappers
                337 => {
                    self.shift_background();
                    self.load_background_shifters();
                    self.dummy_nt_fetch();
                }
                339 => self.dummy_nt_fetch(),
                _ => (),
            }
        }
    }

    fn start_vblank(&mut self) {
        trace!("VBL start - frame {}", self.frame.number);
        if !self.vbl_suppress {
            self.status.insert(Status::VBLANK);
            self.nmi_occurred = true;
            if self.nmi_output && !self.suppress_nmi {
                self.nmi_latched = true;
                self.nmi_delay = Self::NMI_DELAY;
            }
        }
        self.vbl_suppress = false;
        self.suppress_nmi = false;
        self.frame_complete = true;
    }

    // Background pipeline

    fn shift_background(&mut self) {
        self.tile_shift_lo <<= 1;
        self.tile_shift_hi <<= 1;
        self.attr_shift_lo <<= 1;
        self.attr_shift_hi <<= 1;
    }

    fn load_background_shifters(&mut self) {
        self.tile_shift_lo = (self.tile_shift_lo & 0xFF00) | u16::from(self.next_tile_lo);
        self.tile_shift_hi = (self.tile_shift_hi & 0xFF00) | u16::from(self.next_tile_hi);
        let attr_lo = if self.next_tile_attr & 0x01 != 0 { 0xFF } else { 0x00 };
        let attr_hi = if self.next_tile_attr & 0x02 != 0 { 0xFF } else { 0x00 };
        self.attr_shift_lo = (self.attr_shift_lo & 0xFF00) | attr_lo;
        self.attr_shift_hi = (self.attr_shift_hi & 0xFF00) | attr_hi;
    }

    fn fetch_background(&mut self, cycle: u16) {
        match (cycle - 1) & 0x07 {
            0 => {
                self.load_background_shifters();
                self.fetch_nt_byte();
            }
            2 => self.fetch_attr_byte(),
            4 => self.fetch_pattern_lo(),
            6 => self.fetch_pattern_hi(),
            7 => self.scroll.increment_x(),
            _ => (),
        }
    }

    fn fetch_nt_byte(&mut self) {
        let addr = self.scroll.nt_addr();
        let frame_cycle = self.frame_cycle();
        self.bus.mapper.notify_address_bus(addr, frame_cycle);
        self.next_tile_id = self.bus.read_ciram(addr);
    }

    fn fetch_attr_byte(&mut self) {
        let addr = self.scroll.attr_addr();
        let frame_cycle = self.frame_cycle();
        self.bus.mapper.notify_address_bus(addr, frame_cycle);
        self.next_tile_attr = self.bus.read_ciram(addr) >> self.scroll.attr_shift() & 0x03;
    }

    fn tile_addr(&self) -> u16 {
        self.ctrl.bg_select() | (u16::from(self.next_tile_id) << 4) | self.scroll.fine_y()
    }

    fn fetch_pattern_lo(&mut self) {
        let addr = self.tile_addr();
        let frame_cycle = self.frame_cycle();
        self.bus.mapper.notify_address_bus(addr, frame_cycle);
        self.next_tile_lo = self.bus.read_chr(addr);
    }

    fn fetch_pattern_hi(&mut self) {
        let addr = self.tile_addr() + 8;
        let frame_cycle = self.frame_cycle();
        self.bus.mapper.notify_address_bus(addr, frame_cycle);
        self.next_tile_hi = self.bus.read_chr(addr);
    }

    fn dummy_nt_fetch(&mut self) {
        let addr = self.scroll.nt_addr();
        let frame_cycle = self.frame_cycle();
        self.bus.mapper.notify_address_bus(addr, frame_cycle);
        let _ = self.bus.read_ciram(addr);
    }

    // Sprite pipeline

    /// Select up to eight OAM sprites for `target` and prime the slots.
    /// Pattern data arrives during the dot 257-320 fetch phases.
    fn evaluate_sprites(&mut self, target: u16) {
        self.sprite_count = 0;
        self.sprite_zero_possible = false;
        self.sprite_shift_lo = [0x00; 8];
        self.sprite_shift_hi = [0x00; 8];
        self.sprite_eval_scanline = target;

        let height = self.ctrl.spr_height();
        for i in 0..64 {
            let y = u16::from(self.oam[i * 4]);
            let row = target.wrapping_sub(y);
            if row >= height {
                continue;
            }
            if self.sprite_count < 8 {
                if i == 0 {
                    self.sprite_zero_possible = true;
                }
                self.sprites[usize::from(self.sprite_count)] = Sprite {
                    y: self.oam[i * 4],
                    tile: self.oam[i * 4 + 1],
                    attr: self.oam[i * 4 + 2],
                    x: self.oam[i * 4 + 3],
                };
                self.sprite_count += 1;
            } else {
                self.status.insert(Status::SPR_OVERFLOW);
                break;
            }
        }
    }

    /// Eight 8-dot sprite phases at dots 257-320. Phases 0/2 replay the
    /// garbage NT/AT bus cycles; phases 4/6 fetch the slot's pattern bytes.
    /// Slots past `sprite_count` fetch the dummy $FF tile so A12 toggles as
    /// on hardware.
    fn sprite_fetch(&mut self, cycle: u16) {
        let slot = usize::from((cycle - 257) / 8);
        match (cycle - 257) & 0x07 {
            0 => {
                let addr = self.scroll.nt_addr();
                let frame_cycle = self.frame_cycle();
                self.bus.mapper.notify_address_bus(addr, frame_cycle);
            }
            2 => {
                let addr = self.scroll.attr_addr();
                let frame_cycle = self.frame_cycle();
                self.bus.mapper.notify_address_bus(addr, frame_cycle);
            }
            4 => self.fetch_sprite_pattern(slot, false),
            6 => self.fetch_sprite_pattern(slot, true),
            _ => (),
        }
    }

    fn fetch_sprite_pattern(&mut self, slot: usize, hi: bool) {
        let height = self.ctrl.spr_height();
        let in_range = slot < usize::from(self.sprite_count);
        let (tile, attr, row) = if in_range {
            let sprite = self.sprites[slot];
            let mut row = self.sprite_eval_scanline.wrapping_sub(u16::from(sprite.y)) % height;
            if sprite.flip_vertical() {
                row = height - 1 - row;
            }
            (sprite.tile, sprite.attr, row)
        } else {
            (0xFF, 0x00, 0)
        };

        let mut addr = if height == 16 {
            let mut row = row;
            if row >= 8 {
                row += 8;
            }
            (u16::from(tile & 0x01) << 12) | (u16::from(tile & 0xFE) << 4) | row
        } else {
            self.ctrl.spr_select() | (u16::from(tile) << 4) | row
        };
        if hi {
            addr += 8;
        }

        let frame_cycle = self.frame_cycle();
        self.bus.mapper.notify_address_bus(addr, frame_cycle);
        let mut pattern = self.bus.read_chr(addr);

        if in_range {
            if attr & 0x40 != 0 {
                pattern = pattern.reverse_bits();
            }
            if hi {
                self.sprite_shift_hi[slot] = pattern;
            } else {
                self.sprite_shift_lo[slot] = pattern;
            }
        }
    }

    // Pixel mux

    fn render_pixel(&mut self) {
        let x = u32::from(self.cycle - 1);
        let y = u32::from(self.scanline);

        // Pointing v into palette RAM with rendering disabled shows that
        // entry instead of the backdrop
        if !self.mask.rendering_enabled() {
            let addr = self.scroll.addr();
            let color = if addr >= 0x3F00 {
                self.bus.peek_palette(addr)
            } else {
                self.bus.peek_palette(0x3F00)
            };
            self.frame.set_pixel(x, y, color & 0x3F);
            return;
        }

        let mut bg_pixel = 0x00;
        let mut bg_palette = 0x00;
        if self.mask.show_bg() && (self.mask.show_left_bg() || x >= 8) {
            let bit = 0x8000 >> self.scroll.fine_x;
            bg_pixel = u8::from(self.tile_shift_lo & bit != 0)
                | (u8::from(self.tile_shift_hi & bit != 0) << 1);
            bg_palette = u8::from(self.attr_shift_lo & bit != 0)
                | (u8::from(self.attr_shift_hi & bit != 0) << 1);
        }

        let mut spr_pixel = 0x00;
        let mut spr_palette = 0x00;
        let mut spr_behind = false;
        if self.mask.show_spr() && (self.mask.show_left_spr() || x >= 8) {
            self.sprite_zero_rendering = false;
            for i in 0..usize::from(self.sprite_count) {
                if self.sprites[i].x != 0 {
                    continue;
                }
                let pixel = ((self.sprite_shift_hi[i] & 0x80) >> 6)
                    | ((self.sprite_shift_lo[i] & 0x80) >> 7);
                if pixel != 0 {
                    if i == 0 {
                        self.sprite_zero_rendering = true;
                    }
                    spr_pixel = pixel;
                    spr_palette = self.sprites[i].palette();
                    spr_behind = self.sprites[i].behind_background();
                    break;
                }
            }
        }

        let (pixel, palette) = match (bg_pixel, spr_pixel) {
            (0, 0) => (0, 0),
            (0, spr) => (spr, spr_palette),
            (bg, 0) => (bg, bg_palette),
            (bg, spr) => {
                self.detect_sprite_zero_hit(x);
                if spr_behind {
                    (bg, bg_palette)
                } else {
                    (spr, spr_palette)
                }
            }
        };

        let color = self
            .bus
            .peek_palette(0x3F00 + (u16::from(palette) << 2) + u16::from(pixel));
        self.frame.set_pixel(x, y, color & 0x3F);

        // Sprite x positions count down to activate each sprite's shifters
        for i in 0..usize::from(self.sprite_count) {
            if self.sprites[i].x > 0 {
                self.sprites[i].x -= 1;
            } else {
                self.sprite_shift_lo[i] <<= 1;
                self.sprite_shift_hi[i] <<= 1;
            }
        }
    }

    fn detect_sprite_zero_hit(&mut self, x: u32) {
        if !self.sprite_zero_possible || !self.sprite_zero_rendering {
            return;
        }
        if !self.mask.show_bg() || !self.mask.show_spr() {
            return;
        }
        if x == 255 {
            return;
        }
        if x < 8 && !(self.mask.show_left_bg() && self.mask.show_left_spr()) {
            return;
        }
        self.status.insert(Status::SPR_ZERO_HIT);
    }
}

impl Reset for Ppu {
    fn reset(&mut self, kind: ResetKind) {
        self.ctrl.write(0x00);
        self.mask.write(0x00);
        self.status = Status::default();
        self.scroll = Scroll::new();
        self.data_buffer = 0x00;
        self.scanline = 0;
        self.cycle = 0;
        self.odd_frame = false;
        self.cycle_count = 0;
        self.nmi_occurred = false;
        self.nmi_output = false;
        self.nmi_latched = false;
        self.nmi_delay = 0;
        self.nmi_immediate = false;
        self.nmi_delayed = false;
        self.vbl_suppress = false;
        self.suppress_nmi = false;
        self.frame_complete = false;
        self.tile_shift_lo = 0x0000;
        self.tile_shift_hi = 0x0000;
        self.attr_shift_lo = 0x0000;
        self.attr_shift_hi = 0x0000;
        self.next_tile_id = 0x00;
        self.next_tile_attr = 0x00;
        self.next_tile_lo = 0x00;
        self.next_tile_hi = 0x00;
        self.sprites = [Sprite::new(); 8];
        self.sprite_shift_lo = [0x00; 8];
        self.sprite_shift_hi = [0x00; 8];
        self.sprite_count = 0;
        self.sprite_zero_possible = false;
        self.sprite_zero_rendering = false;
        self.mask_prev = 0x00;
        self.mask_write_cycle = 0;
        self.frame.clear();
        if kind == ResetKind::Hard {
            self.oam_addr = 0x00;
            self.oam = Memory::with_size(Self::OAM_SIZE);
            self.bus.ciram = Memory::with_size(bus::Bus::CIRAM_SIZE);
            self.bus.palette = [0x00; bus::Bus::PALETTE_SIZE];
            if !self.bus.exram.is_empty() {
                self.bus.exram = Memory::with_size(bus::Bus::CIRAM_SIZE);
            }
        }
        self.bus.mapper.reset(kind);
    }
}
