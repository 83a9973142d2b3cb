//! APU length counter implementation.
//!
//! <https://www.nesdev.org/wiki/APU_Length_Counter>

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct LengthCounter {
    pub enabled: bool,
    pub halt: bool,
    pub counter: u8,
}

impl LengthCounter {
    const LENGTH_TABLE: [u8; 32] = [
        10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, 12, 16, 24, 18, 48, 20, 96,
        22, 192, 24, 72, 26, 16, 28, 32, 30,
    ];

    pub const fn new() -> Self {
        Self {
            enabled: false,
            halt: false,
            counter: 0,
        }
    }

    /// Load from the 5-bit index in a `$4003`-style write. Ignored while the
    /// channel is disabled.
    pub fn load(&mut self, val: u8) {
        if self.enabled {
            self.counter = Self::LENGTH_TABLE[usize::from(val >> 3)];
        }
    }

    /// Half-frame clock.
    pub fn clock(&mut self) {
        if !self.halt && self.counter > 0 {
            self.counter -= 1;
        }
    }

    /// `$4015` channel enable; disabling zeroes the counter.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.counter = 0;
        }
    }

    #[inline]
    #[must_use]
    pub const fn active(&self) -> bool {
        self.counter > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_uses_table() {
        let mut length = LengthCounter::new();
        length.set_enabled(true);
        length.load(0x00); // index 0
        assert_eq!(length.counter, 10);
        length.load(0x08); // index 1
        assert_eq!(length.counter, 254);
    }

    #[test]
    fn disabled_ignores_load_and_zeroes() {
        let mut length = LengthCounter::new();
        length.load(0x00);
        assert_eq!(length.counter, 0, "load ignored while disabled");

        length.set_enabled(true);
        length.load(0x00);
        length.set_enabled(false);
        assert_eq!(length.counter, 0, "disable zeroes the counter");
    }

    #[test]
    fn halt_freezes() {
        let mut length = LengthCounter::new();
        length.set_enabled(true);
        length.load(0x00);
        length.halt = true;
        length.clock();
        assert_eq!(length.counter, 10);
        length.halt = false;
        length.clock();
        assert_eq!(length.counter, 9);
    }
}
