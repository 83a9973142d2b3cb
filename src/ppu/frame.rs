//! Output framebuffer and the fixed master palette.

use serde::{Deserialize, Serialize};

/// 2C02 master palette in ABGR byte order, so the buffer uploads directly as
/// RGBA8888 on little-endian hosts.
#[rustfmt::skip]
pub const SYSTEM_PALETTE: [u32; 64] = [
    0xFF54_5454, 0xFF74_1E00, 0xFF90_1008, 0xFF88_0030,
    0xFF64_0044, 0xFF30_005C, 0xFF00_0454, 0xFF00_183C,
    0xFF00_2A20, 0xFF00_3A08, 0xFF00_4000, 0xFF00_3C00,
    0xFF3C_3200, 0xFF00_0000, 0xFF00_0000, 0xFF00_0000,
    0xFF98_9698, 0xFFC4_4C08, 0xFFEC_3230, 0xFFE4_1E5C,
    0xFFB0_1488, 0xFF64_14A0, 0xFF20_2298, 0xFF00_3C78,
    0xFF00_5A54, 0xFF00_7228, 0xFF00_7C08, 0xFF28_7600,
    0xFF78_6600, 0xFF00_0000, 0xFF00_0000, 0xFF00_0000,
    0xFFEC_EEEC, 0xFFEC_9A4C, 0xFFEC_7C78, 0xFFEC_62B0,
    0xFFEC_54E4, 0xFFB4_58EC, 0xFF64_6AEC, 0xFF20_88D4,
    0xFF00_AAA0, 0xFF00_C474, 0xFF20_D04C, 0xFF6C_CC38,
    0xFFCC_B438, 0xFF3C_3C3C, 0xFF00_0000, 0xFF00_0000,
    0xFFEC_EEEC, 0xFFEC_CCA8, 0xFFEC_BCBC, 0xFFEC_B2D4,
    0xFFEC_AEEC, 0xFFD4_AEEC, 0xFFB0_B4EC, 0xFF90_C4E4,
    0xFF78_D2CC, 0xFF78_DEB4, 0xFF90_E2A8, 0xFFB4_E298,
    0xFFE4_D6A0, 0xFFA0_A2A0, 0xFF00_0000, 0xFF00_0000,
];

/// The 256x240 RGBA output buffer plus the frame counter.
#[derive(Clone, Serialize, Deserialize)]
#[must_use]
pub struct Frame {
    pub number: u64,
    #[serde(skip, default = "Frame::default_buffer")]
    buffer: Vec<u32>,
}

impl Frame {
    pub const WIDTH: u32 = 256;
    pub const HEIGHT: u32 = 240;
    pub const SIZE: usize = (Self::WIDTH * Self::HEIGHT) as usize;

    pub fn new() -> Self {
        Self {
            number: 0,
            buffer: Self::default_buffer(),
        }
    }

    fn default_buffer() -> Vec<u32> {
        vec![0xFF00_0000; Self::SIZE]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, color_index: u8) {
        let idx = (y * Self::WIDTH + x) as usize;
        if let Some(pixel) = self.buffer.get_mut(idx) {
            *pixel = SYSTEM_PALETTE[usize::from(color_index & 0x3F)];
        }
    }

    #[must_use]
    pub fn buffer(&self) -> &[u32] {
        &self.buffer
    }

    pub fn increment(&mut self) {
        self.number = self.number.wrapping_add(1);
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0xFF00_0000);
        self.number = 0;
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame").field("number", &self.number).finish()
    }
}
