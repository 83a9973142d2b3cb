//! PPUCTRL register implementation.
//!
//! <https://wiki.nesdev.org/w/index.php/PPU_registers#PPUCTRL>

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    // $2000 PPUCTRL
    //
    // VPHB SINN
    // |||| ||++- Nametable select: $2000/$2400/$2800/$2C00
    // |||| |+--- VRAM increment: 0 = add 1 across, 1 = add 32 down
    // |||| +---- Sprite pattern table for 8x8: 0 = $0000, 1 = $1000
    // |||+------ Background pattern table: 0 = $0000, 1 = $1000
    // ||+------- Sprite size: 0 = 8x8, 1 = 8x16
    // |+-------- PPU master/slave
    // +--------- NMI enable at start of vblank
    #[derive(Default, Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
    #[must_use]
    pub struct Ctrl: u8 {
        const NAMETABLE1 = 0x01;
        const NAMETABLE2 = 0x02;
        const VRAM_INCREMENT = 0x04;
        const SPR_SELECT = 0x08;
        const BG_SELECT = 0x10;
        const SPR_HEIGHT = 0x20;
        const MASTER_SLAVE = 0x40;
        const NMI_ENABLE = 0x80;
    }
}

impl Ctrl {
    pub fn write(&mut self, val: u8) {
        *self = Self::from_bits_truncate(val);
    }

    #[inline]
    #[must_use]
    pub fn spr_select(&self) -> u16 {
        // $1000 or $0000
        u16::from(self.contains(Self::SPR_SELECT)) * 0x1000
    }

    #[inline]
    #[must_use]
    pub fn bg_select(&self) -> u16 {
        u16::from(self.contains(Self::BG_SELECT)) * 0x1000
    }

    #[inline]
    #[must_use]
    pub fn spr_height(&self) -> u16 {
        // 16 or 8
        u16::from(self.contains(Self::SPR_HEIGHT)) * 8 + 8
    }

    #[inline]
    #[must_use]
    pub fn vram_increment(&self) -> u16 {
        // 32 or 1
        u16::from(self.contains(Self::VRAM_INCREMENT)) * 31 + 1
    }

    #[inline]
    #[must_use]
    pub const fn nmi_enabled(&self) -> bool {
        self.contains(Self::NMI_ENABLE)
    }
}
