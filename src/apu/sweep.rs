//! APU pulse sweep unit.
//!
//! <https://www.nesdev.org/wiki/APU_Sweep>

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Sweep {
    pub enabled: bool,
    pub period: u8,
    pub negate: bool,
    pub shift: u8,
    pub reload: bool,
    pub divider: u8,
}

impl Sweep {
    pub const fn new() -> Self {
        Self {
            enabled: false,
            period: 0,
            negate: false,
            shift: 0,
            reload: false,
            divider: 0,
        }
    }

    /// `$4001`/`$4005` write.
    pub fn write(&mut self, val: u8) {
        self.enabled = val & 0x80 != 0;
        self.period = (val >> 4) & 0x07;
        self.negate = val & 0x08 != 0;
        self.shift = val & 0x07;
        self.reload = true;
    }

    /// Half-frame clock, adjusting `timer_period` in place.
    ///
    /// Pulse 1 negates with one's complement (an extra -1), pulse 2 with
    /// two's complement.
    pub fn clock(&mut self, timer_period: &mut u16, ones_complement: bool) {
        if self.divider == 0 && self.enabled {
            let change = *timer_period >> self.shift;
            if self.negate {
                *timer_period = timer_period.wrapping_sub(change);
                if ones_complement {
                    *timer_period = timer_period.wrapping_sub(1);
                }
            } else {
                *timer_period = timer_period.wrapping_add(change);
            }
        }

        if self.divider == 0 || self.reload {
            self.divider = self.period;
            self.reload = false;
        } else {
            self.divider -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negate_modes_differ_by_one() {
        let mut sweep = Sweep::new();
        sweep.write(0x89); // enabled, negate, shift 1

        let mut period1 = 0x100;
        sweep.clock(&mut period1, true);
        assert_eq!(period1, 0x100 - 0x80 - 1, "pulse 1 one's complement");

        let mut sweep = Sweep::new();
        sweep.write(0x89);
        let mut period2 = 0x100;
        sweep.clock(&mut period2, false);
        assert_eq!(period2, 0x100 - 0x80, "pulse 2 two's complement");
    }
}
