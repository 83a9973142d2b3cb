//! Controller input: host-side button bitmasks and joypad shift registers.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Host-side 32-bit button bitmask shared across emulated systems.
    ///
    /// Only a subset maps onto the NES controller; the rest (X/Y/L/R) exist
    /// so recorded input streams stay portable across cores.
    #[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[must_use]
    pub struct VirtualButtons: u32 {
        const A = 0x0001;
        const B = 0x0002;
        const X = 0x0004;
        const Y = 0x0008;
        const L = 0x0010;
        const R = 0x0020;
        const START = 0x0040;
        const SELECT = 0x0080;
        const UP = 0x0100;
        const DOWN = 0x0200;
        const LEFT = 0x0400;
        const RIGHT = 0x0800;
    }
}

impl VirtualButtons {
    /// Translate into NES-native button order:
    /// A, B, Select, Start, Up, Down, Left, Right (bit 0 to bit 7).
    #[must_use]
    pub const fn to_nes_bits(self) -> u8 {
        let mut bits = 0x00;
        if self.contains(Self::A) {
            bits |= 0x01;
        }
        if self.contains(Self::B) {
            bits |= 0x02;
        }
        if self.contains(Self::SELECT) {
            bits |= 0x04;
        }
        if self.contains(Self::START) {
            bits |= 0x08;
        }
        if self.contains(Self::UP) {
            bits |= 0x10;
        }
        if self.contains(Self::DOWN) {
            bits |= 0x20;
        }
        if self.contains(Self::LEFT) {
            bits |= 0x40;
        }
        if self.contains(Self::RIGHT) {
            bits |= 0x80;
        }
        bits
    }
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[must_use]
pub enum Player {
    #[default]
    One,
    Two,
}

/// A standard NES joypad: an 8-bit parallel-to-serial shift register.
///
/// While strobe is high the register continuously latches the current button
/// state; when strobe goes low the latch freezes and each `$4016`/`$4017`
/// read shifts out one bit, refilling the vacated high bit with 1.
#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Joypad {
    pub buttons: VirtualButtons,
    shift: u8,
}

impl Joypad {
    fn latch(&mut self) {
        self.shift = self.buttons.to_nes_bits();
    }

    fn read(&mut self, strobe: bool) -> u8 {
        if strobe {
            self.latch();
        }
        let bit = self.shift & 0x01;
        self.shift = (self.shift >> 1) | 0x80;
        bit
    }

    const fn peek(&self, strobe: bool) -> u8 {
        if strobe {
            self.buttons.to_nes_bits() & 0x01
        } else {
            self.shift & 0x01
        }
    }
}

/// Both controller ports plus the shared strobe line.
#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Input {
    joypads: [Joypad; 2],
    strobe: bool,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the host's button state for a player. Takes effect at the next
    /// strobe latch.
    pub fn set_buttons(&mut self, player: Player, buttons: VirtualButtons) {
        self.joypads[player as usize].buttons = buttons;
    }

    /// Read `$4016` (player one) or `$4017` (player two).
    ///
    /// Bit 6 reflects open bus from the `LDA $4016` opcode fetch.
    pub fn read(&mut self, player: Player) -> u8 {
        self.joypads[player as usize].read(self.strobe) | 0x40
    }

    /// Non-mutating version of `read`.
    #[must_use]
    pub const fn peek(&self, player: Player) -> u8 {
        self.joypads[player as usize].peek(self.strobe) | 0x40
    }

    /// Write `$4016`: bit 0 drives the strobe line on both controllers.
    pub fn write(&mut self, val: u8) {
        let strobe = val & 0x01 == 0x01;
        if strobe {
            self.joypads[0].latch();
            self.joypads[1].latch();
        }
        self.strobe = strobe;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_to_nes_bit_order() {
        assert_eq!(VirtualButtons::A.to_nes_bits(), 0x01);
        assert_eq!(VirtualButtons::B.to_nes_bits(), 0x02);
        assert_eq!(VirtualButtons::SELECT.to_nes_bits(), 0x04);
        assert_eq!(VirtualButtons::START.to_nes_bits(), 0x08);
        assert_eq!(VirtualButtons::UP.to_nes_bits(), 0x10);
        assert_eq!(VirtualButtons::DOWN.to_nes_bits(), 0x20);
        assert_eq!(VirtualButtons::LEFT.to_nes_bits(), 0x40);
        assert_eq!(VirtualButtons::RIGHT.to_nes_bits(), 0x80);
        // X/Y/L/R have no NES equivalent
        assert_eq!(
            (VirtualButtons::X | VirtualButtons::Y | VirtualButtons::L | VirtualButtons::R)
                .to_nes_bits(),
            0x00
        );
    }

    #[test]
    fn strobe_and_shift() {
        let mut input = Input::new();
        input.set_buttons(Player::One, VirtualButtons::A | VirtualButtons::START);

        input.write(0x01);
        input.write(0x00);

        let bits: Vec<u8> = (0..8).map(|_| input.read(Player::One) & 0x01).collect();
        assert_eq!(bits, [1, 0, 0, 1, 0, 0, 0, 0], "A and Start");

        // Drained register reads back 1s
        assert_eq!(input.read(Player::One) & 0x01, 0x01);
        assert_eq!(input.read(Player::One) & 0x40, 0x40, "open bus bit");
    }

    #[test]
    fn strobe_high_rereads_first_bit() {
        let mut input = Input::new();
        input.set_buttons(Player::One, VirtualButtons::A);
        input.write(0x01);
        for _ in 0..4 {
            assert_eq!(input.read(Player::One) & 0x01, 0x01, "strobe high re-latches A");
        }
    }
}
