//! APU envelope generator.
//!
//! <https://www.nesdev.org/wiki/APU_Envelope>

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Envelope {
    pub start: bool,
    pub divider: u8,
    pub counter: u8,
}

impl Envelope {
    pub const fn new() -> Self {
        Self {
            start: false,
            divider: 0,
            counter: 0,
        }
    }

    /// Quarter-frame clock. `period` is the channel's volume field; `looped`
    /// is the length-halt flag doing double duty.
    pub fn clock(&mut self, period: u8, looped: bool) {
        if self.start {
            self.start = false;
            self.counter = 15;
            self.divider = period;
        } else if self.divider == 0 {
            self.divider = period;
            if self.counter > 0 {
                self.counter -= 1;
            } else if looped {
                self.counter = 15;
            }
        } else {
            self.divider -= 1;
        }
    }
}
