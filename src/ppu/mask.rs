//! PPUMASK register implementation.
//!
//! <https://wiki.nesdev.org/w/index.php/PPU_registers#PPUMASK>

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    // $2001 PPUMASK
    //
    // BGRs bMmG
    // |||| |||+- Grayscale
    // |||| ||+-- Show background in leftmost 8 pixels
    // |||| |+--- Show sprites in leftmost 8 pixels
    // |||| +---- Show background
    // |||+------ Show sprites
    // ||+------- Emphasize red
    // |+-------- Emphasize green
    // +--------- Emphasize blue
    #[derive(Default, Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
    #[must_use]
    pub struct Mask: u8 {
        const GRAYSCALE = 0x01;
        const SHOW_LEFT_BG = 0x02;
        const SHOW_LEFT_SPR = 0x04;
        const SHOW_BG = 0x08;
        const SHOW_SPR = 0x10;
        const EMPHASIZE_RED = 0x20;
        const EMPHASIZE_GREEN = 0x40;
        const EMPHASIZE_BLUE = 0x80;
    }
}

impl Mask {
    pub fn write(&mut self, val: u8) {
        *self = Self::from_bits_truncate(val);
    }

    #[inline]
    #[must_use]
    pub const fn show_bg(&self) -> bool {
        self.contains(Self::SHOW_BG)
    }

    #[inline]
    #[must_use]
    pub const fn show_spr(&self) -> bool {
        self.contains(Self::SHOW_SPR)
    }

    #[inline]
    #[must_use]
    pub const fn show_left_bg(&self) -> bool {
        self.contains(Self::SHOW_LEFT_BG)
    }

    #[inline]
    #[must_use]
    pub const fn show_left_spr(&self) -> bool {
        self.contains(Self::SHOW_LEFT_SPR)
    }

    #[inline]
    #[must_use]
    pub const fn rendering_enabled(&self) -> bool {
        self.show_bg() || self.show_spr()
    }
}
