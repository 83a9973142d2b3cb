//! Shared component traits and machine constants.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

/// NTSC CPU clock rate in Hz.
pub const CPU_CLOCK_RATE: u32 = 1_789_773;

/// Native NTSC frame rate.
pub const FRAME_RATE: f32 = 60.0988;

/// Kind of reset to perform on a component.
///
/// `Soft` corresponds to the console reset button, `Hard` to a full power
/// cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[must_use]
pub enum ResetKind {
    Soft,
    Hard,
}

#[enum_dispatch(Mapper)]
pub trait Reset {
    fn reset(&mut self, _kind: ResetKind) {}
}
