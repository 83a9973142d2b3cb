//! NES 2A03 APU (Audio Processing Unit) implementation.
//!
//! <https://www.nesdev.org/wiki/APU>

use crate::{
    apu::{
        dmc::Dmc,
        frame_counter::{FrameClock, FrameCounter},
        noise::Noise,
        pulse::{Pulse, PulseChannel},
        triangle::Triangle,
    },
    common::{Reset, ResetKind, CPU_CLOCK_RATE},
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::trace;

pub mod dmc;
pub mod envelope;
pub mod frame_counter;
pub mod length_counter;
pub mod noise;
pub mod pulse;
pub mod sweep;
pub mod triangle;

/// NES 2A03 APU.
///
/// Timers run per CPU cycle; the mixed output is averaged between emitted
/// samples and resampled to [`Apu::SAMPLE_RATE`] with an integer
/// accumulator, so sample count per frame never drifts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Apu {
    pub pulse1: Pulse,
    pub pulse2: Pulse,
    pub triangle: Triangle,
    pub noise: Noise,
    pub dmc: Dmc,
    pub frame_counter: FrameCounter,
    pub cycle: u64,
    sample_step: u32,
    sample_sum: f32,
    sample_count: u32,
    filter_state: f32,
    #[serde(skip)]
    samples: VecDeque<f32>,
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

impl Apu {
    /// Output sample rate in Hz.
    pub const SAMPLE_RATE: u32 = 44_100;
    /// Interleaved stereo pairs buffered before new samples are dropped.
    pub const MAX_BUFFERED_PAIRS: usize = 8192;

    /// First-order low-pass coefficient applied to emitted samples.
    const FILTER_ALPHA: f32 = 0.6;

    const PULSE_SCALE: f32 = 0.00752;
    const TRIANGLE_SCALE: f32 = 0.00851;
    const NOISE_SCALE: f32 = 0.00494;
    const DMC_SCALE: f32 = 0.00335;

    pub fn new() -> Self {
        Self {
            pulse1: Pulse::new(PulseChannel::One),
            pulse2: Pulse::new(PulseChannel::Two),
            triangle: Triangle::new(),
            noise: Noise::new(),
            dmc: Dmc::new(),
            frame_counter: FrameCounter::new(),
            cycle: 0,
            sample_step: 0,
            sample_sum: 0.0,
            sample_count: 0,
            filter_state: 0.0,
            samples: VecDeque::with_capacity(2 * Self::MAX_BUFFERED_PAIRS),
        }
    }

    /// Run the APU for `cycles` CPU cycles.
    pub fn clock(&mut self, cycles: u16) {
        for _ in 0..cycles {
            self.cycle = self.cycle.wrapping_add(1);

            // Triangle clocks at CPU rate; pulse and noise at half
            self.triangle.clock_timer();
            if self.cycle & 0x01 == 0x00 {
                self.pulse1.clock_timer();
                self.pulse2.clock_timer();
                self.noise.clock_timer();
            }

            match self.frame_counter.clock() {
                Some(FrameClock::Quarter) => self.clock_quarter_frame(),
                Some(FrameClock::Half) => {
                    self.clock_quarter_frame();
                    self.clock_half_frame();
                }
                None => (),
            }

            // Average every CPU-rate sample between outputs for cheap
            // anti-aliasing
            self.sample_sum += self.mix();
            self.sample_count += 1;

            self.sample_step += Self::SAMPLE_RATE;
            if self.sample_step >= CPU_CLOCK_RATE {
                self.sample_step -= CPU_CLOCK_RATE;
                let sample = self.sample_sum / self.sample_count as f32;
                self.sample_sum = 0.0;
                self.sample_count = 0;

                self.filter_state += Self::FILTER_ALPHA * (sample - self.filter_state);
                self.push_sample(self.filter_state);
            }
        }
    }

    fn clock_quarter_frame(&mut self) {
        self.pulse1.clock_quarter_frame();
        self.pulse2.clock_quarter_frame();
        self.triangle.clock_quarter_frame();
        self.noise.clock_quarter_frame();
    }

    fn clock_half_frame(&mut self) {
        self.pulse1.clock_half_frame();
        self.pulse2.clock_half_frame();
        self.triangle.clock_half_frame();
        self.noise.clock_half_frame();
    }

    /// Linear approximation of the 2A03 mixer.
    ///
    /// <https://www.nesdev.org/wiki/APU_Mixer>
    #[must_use]
    fn mix(&self) -> f32 {
        let pulse_out =
            Self::PULSE_SCALE * f32::from(self.pulse1.output() + self.pulse2.output());
        let tnd_out = Self::TRIANGLE_SCALE * f32::from(self.triangle.output())
            + Self::NOISE_SCALE * f32::from(self.noise.output())
            + Self::DMC_SCALE * f32::from(self.dmc.output());
        pulse_out + tnd_out
    }

    fn push_sample(&mut self, sample: f32) {
        if self.samples.len() >= 2 * Self::MAX_BUFFERED_PAIRS {
            // Host is not draining; drop rather than grow without bound
            return;
        }
        self.samples.push_back(sample);
        self.samples.push_back(sample);
    }

    /// Move up to `out.len()` interleaved stereo samples into `out`,
    /// returning how many were written.
    pub fn drain_samples(&mut self, out: &mut [f32]) -> usize {
        let len = out.len().min(self.samples.len());
        for slot in out.iter_mut().take(len) {
            *slot = self.samples.pop_front().unwrap_or(0.0);
        }
        len
    }

    /// Buffered interleaved sample count.
    #[must_use]
    pub fn sample_len(&self) -> usize {
        self.samples.len()
    }

    pub fn clear_samples(&mut self) {
        self.samples.clear();
    }

    /// Register write dispatch for `$4000-$4017`.
    pub fn write_register(&mut self, addr: u16, val: u8) {
        trace!("APU ${addr:04X} write: {val:02X} - CYC:{}", self.cycle);
        match addr {
            0x4000 => self.pulse1.write_ctrl(val),
            0x4001 => self.pulse1.write_sweep(val),
            0x4002 => self.pulse1.write_timer_lo(val),
            0x4003 => self.pulse1.write_timer_hi(val),
            0x4004 => self.pulse2.write_ctrl(val),
            0x4005 => self.pulse2.write_sweep(val),
            0x4006 => self.pulse2.write_timer_lo(val),
            0x4007 => self.pulse2.write_timer_hi(val),
            0x4008 => self.triangle.write_linear_counter(val),
            0x400A => self.triangle.write_timer_lo(val),
            0x400B => self.triangle.write_timer_hi(val),
            0x400C => self.noise.write_ctrl(val),
            0x400E => self.noise.write_timer(val),
            0x400F => self.noise.write_length(val),
            0x4010 => self.dmc.write_timer(val),
            0x4011 => self.dmc.write_output(val),
            0x4012 => self.dmc.write_addr(val),
            0x4013 => self.dmc.write_length(val),
            0x4015 => self.write_status(val),
            0x4017 => {
                if self.frame_counter.write(val) {
                    // 5-step mode clocks everything immediately
                    self.clock_quarter_frame();
                    self.clock_half_frame();
                }
            }
            _ => (),
        }
    }

    /// `$4015` read: length counter statuses plus the frame IRQ flag, which
    /// the read acknowledges.
    pub fn read_status(&mut self) -> u8 {
        let status = self.peek_status();
        self.frame_counter.frame_irq = false;
        status
    }

    /// Non-mutating version of `read_status`.
    #[must_use]
    pub fn peek_status(&self) -> u8 {
        let mut status = 0x00;
        if self.pulse1.length.active() {
            status |= 0x01;
        }
        if self.pulse2.length.active() {
            status |= 0x02;
        }
        if self.triangle.length.active() {
            status |= 0x04;
        }
        if self.noise.length.active() {
            status |= 0x08;
        }
        if self.frame_counter.frame_irq {
            status |= 0x40;
        }
        status
    }

    /// `$4015` write: channel enables; disabled channels zero their lengths.
    fn write_status(&mut self, val: u8) {
        self.pulse1.length.set_enabled(val & 0x01 != 0);
        self.pulse2.length.set_enabled(val & 0x02 != 0);
        self.triangle.length.set_enabled(val & 0x04 != 0);
        self.noise.length.set_enabled(val & 0x08 != 0);
        self.dmc.set_enabled(val & 0x10 != 0);
    }
}

impl Reset for Apu {
    fn reset(&mut self, _kind: ResetKind) {
        self.pulse1 = Pulse::new(PulseChannel::One);
        self.pulse2 = Pulse::new(PulseChannel::Two);
        self.triangle = Triangle::new();
        self.noise = Noise::new();
        self.dmc = Dmc::new();
        self.frame_counter = FrameCounter::new();
        self.cycle = 0;
        self.sample_step = 0;
        self.sample_sum = 0.0;
        self.sample_count = 0;
        self.filter_state = 0.0;
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// CPU cycles per NTSC frame, rounded down.
    const FRAME_CYCLES: u16 = 29780;

    #[test]
    fn sample_rate_conversion_no_drift() {
        let mut apu = Apu::new();
        let mut expected_acc: u64 = 0;
        for _ in 0..10 {
            apu.clock(FRAME_CYCLES);
            expected_acc += u64::from(FRAME_CYCLES) * u64::from(Apu::SAMPLE_RATE);
        }
        let expected = expected_acc / u64::from(CPU_CLOCK_RATE);
        assert_eq!(
            apu.sample_len(),
            2 * expected as usize,
            "stereo interleaved samples match the integer accumulator"
        );
    }

    #[test]
    fn samples_per_frame_is_about_735() {
        let mut apu = Apu::new();
        apu.clock(FRAME_CYCLES);
        let pairs = apu.sample_len() / 2;
        assert!((733..=736).contains(&pairs), "got {pairs} pairs");
    }

    #[test]
    fn buffer_drops_when_full() {
        let mut apu = Apu::new();
        // Several seconds worth of audio with nobody draining
        for _ in 0..600 {
            apu.clock(FRAME_CYCLES);
        }
        assert_eq!(apu.sample_len(), 2 * Apu::MAX_BUFFERED_PAIRS);
    }

    #[test]
    fn drain_removes_samples() {
        let mut apu = Apu::new();
        apu.clock(FRAME_CYCLES);
        let available = apu.sample_len();
        let mut out = vec![0.0; 64];
        assert_eq!(apu.drain_samples(&mut out), 64);
        assert_eq!(apu.sample_len(), available - 64);
    }

    #[test]
    fn status_reflects_length_counters() {
        let mut apu = Apu::new();
        apu.write_register(0x4015, 0x0F);
        apu.write_register(0x4003, 0x08); // load pulse 1 length
        assert_eq!(apu.peek_status() & 0x01, 0x01);

        apu.write_register(0x4015, 0x00); // disable zeroes lengths
        assert_eq!(apu.peek_status() & 0x01, 0x00);
    }

    #[test]
    fn frame_irq_cleared_by_status_read() {
        let mut apu = Apu::new();
        apu.clock(29828); // past the 4th sequencer step
        assert_eq!(apu.peek_status() & 0x40, 0x40);
        let _ = apu.read_status();
        assert_eq!(apu.peek_status() & 0x40, 0x00);
    }

    #[test]
    fn silence_mixes_to_zero() {
        let apu = Apu::new();
        assert_eq!(apu.mix(), 0.0);
    }
}
