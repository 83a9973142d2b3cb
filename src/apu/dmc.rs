//! APU delta modulation channel.
//!
//! Register-level only: `$4011` sets the 7-bit DAC level directly and that
//! level is what reaches the mixer. Sample playback, DMA, and the DMC IRQ
//! are not implemented.
//!
//! <https://www.nesdev.org/wiki/APU_DMC>

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Dmc {
    pub enabled: bool,
    pub irq_enabled: bool,
    pub looped: bool,
    pub rate: u8,
    pub output_level: u8,
    pub sample_addr: u16,
    pub sample_length: u16,
}

impl Dmc {
    pub fn new() -> Self {
        Self::default()
    }

    /// `$4010` write.
    pub fn write_timer(&mut self, val: u8) {
        self.irq_enabled = val & 0x80 != 0;
        self.looped = val & 0x40 != 0;
        self.rate = val & 0x0F;
    }

    /// `$4011` write: direct 7-bit DAC load.
    pub fn write_output(&mut self, val: u8) {
        self.output_level = val & 0x7F;
    }

    /// `$4012` write.
    pub fn write_addr(&mut self, val: u8) {
        self.sample_addr = 0xC000 | (u16::from(val) << 6);
    }

    /// `$4013` write.
    pub fn write_length(&mut self, val: u8) {
        self.sample_length = (u16::from(val) << 4) + 1;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Current DAC level in 0..=127.
    #[must_use]
    pub const fn output(&self) -> u8 {
        self.output_level
    }
}
