//! Secondary OAM sprite slots.

use serde::{Deserialize, Serialize};

/// One of the up-to-eight sprites selected for a scanline.
///
/// `x` doubles as the downcounter that activates the sprite's shifters once
/// rendering reaches its screen column.
#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Sprite {
    pub y: u8,
    pub tile: u8,
    pub attr: u8,
    pub x: u8,
}

impl Sprite {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub const fn palette(&self) -> u8 {
        (self.attr & 0x03) + 4
    }

    #[inline]
    #[must_use]
    pub const fn behind_background(&self) -> bool {
        self.attr & 0x20 == 0x20
    }

    #[inline]
    #[must_use]
    pub const fn flip_horizontal(&self) -> bool {
        self.attr & 0x40 == 0x40
    }

    #[inline]
    #[must_use]
    pub const fn flip_vertical(&self) -> bool {
        self.attr & 0x80 == 0x80
    }
}
