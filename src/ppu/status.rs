//! PPUSTATUS register implementation.
//!
//! <https://wiki.nesdev.org/w/index.php/PPU_registers#PPUSTATUS>

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    // $2002 PPUSTATUS
    //
    // VSO. ....
    // |||+-++++- Open bus (stale PPU data-bus contents)
    // ||+------- Sprite overflow
    // |+-------- Sprite 0 hit
    // +--------- VBlank started; cleared by reading $2002
    #[derive(Default, Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
    #[must_use]
    pub struct Status: u8 {
        const SPR_OVERFLOW = 0x20;
        const SPR_ZERO_HIT = 0x40;
        const VBLANK = 0x80;
    }
}
