//! APU pulse channels.
//!
//! <https://www.nesdev.org/wiki/APU_Pulse>

use crate::apu::{envelope::Envelope, length_counter::LengthCounter, sweep::Sweep};
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum PulseChannel {
    One,
    Two,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Pulse {
    pub channel: PulseChannel,
    pub duty: u8,
    pub sequence_pos: u8,
    pub timer: u16,
    pub timer_period: u16,
    pub constant_volume: bool,
    pub volume: u8,
    pub envelope: Envelope,
    pub sweep: Sweep,
    pub length: LengthCounter,
}

impl Pulse {
    const DUTY_TABLE: [[u8; 8]; 4] = [
        [0, 1, 0, 0, 0, 0, 0, 0],
        [0, 1, 1, 0, 0, 0, 0, 0],
        [0, 1, 1, 1, 1, 0, 0, 0],
        [1, 0, 0, 1, 1, 1, 1, 1],
    ];

    pub const fn new(channel: PulseChannel) -> Self {
        Self {
            channel,
            duty: 0,
            sequence_pos: 0,
            timer: 0,
            timer_period: 0,
            constant_volume: false,
            volume: 0,
            envelope: Envelope::new(),
            sweep: Sweep::new(),
            length: LengthCounter::new(),
        }
    }

    /// `$4000`/`$4004` write.
    pub fn write_ctrl(&mut self, val: u8) {
        self.duty = (val >> 6) & 0x03;
        self.length.halt = val & 0x20 != 0;
        self.constant_volume = val & 0x10 != 0;
        self.volume = val & 0x0F;
    }

    /// `$4001`/`$4005` write.
    pub fn write_sweep(&mut self, val: u8) {
        self.sweep.write(val);
    }

    /// `$4002`/`$4006` write.
    pub fn write_timer_lo(&mut self, val: u8) {
        self.timer_period = (self.timer_period & 0x0700) | u16::from(val);
    }

    /// `$4003`/`$4007` write: also reloads length and restarts the sequence.
    pub fn write_timer_hi(&mut self, val: u8) {
        self.timer_period = (self.timer_period & 0x00FF) | (u16::from(val & 0x07) << 8);
        self.length.load(val);
        self.sequence_pos = 0;
        self.envelope.start = true;
    }

    /// Timer clock, every second CPU cycle.
    pub fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.timer_period;
            self.sequence_pos = (self.sequence_pos + 1) & 0x07;
        } else {
            self.timer -= 1;
        }
    }

    pub fn clock_quarter_frame(&mut self) {
        self.envelope.clock(self.volume, self.length.halt);
    }

    pub fn clock_half_frame(&mut self) {
        self.length.clock();
        let ones_complement = self.channel == PulseChannel::One;
        self.sweep.clock(&mut self.timer_period, ones_complement);
    }

    /// Current DAC input in 0..=15.
    #[must_use]
    pub fn output(&self) -> u8 {
        // Timer periods outside 8..=$7FF silence the channel
        if !self.length.active() || self.timer_period < 8 || self.timer_period > 0x07FF {
            return 0;
        }
        if Self::DUTY_TABLE[usize::from(self.duty)][usize::from(self.sequence_pos)] == 0 {
            return 0;
        }
        if self.constant_volume {
            self.volume
        } else {
            self.envelope.counter
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silenced_outside_timer_range() {
        let mut pulse = Pulse::new(PulseChannel::One);
        pulse.length.set_enabled(true);
        pulse.write_ctrl(0x1F); // constant volume 15, duty 0
        pulse.write_timer_lo(0x04); // period 4 < 8
        pulse.write_timer_hi(0x00);
        pulse.sequence_pos = 1; // duty 0 high step
        assert_eq!(pulse.output(), 0);

        pulse.write_timer_lo(0x10);
        assert_eq!(pulse.output(), 15);
    }

    #[test]
    fn timer_drives_sequencer() {
        let mut pulse = Pulse::new(PulseChannel::One);
        pulse.timer_period = 1;
        pulse.clock_timer(); // 0 -> reload, advance
        assert_eq!(pulse.sequence_pos, 1);
        pulse.clock_timer(); // 1 -> 0
        pulse.clock_timer();
        assert_eq!(pulse.sequence_pos, 2);
    }
}
