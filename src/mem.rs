//! Memory and bank-switching implementations.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::{Deref, DerefMut},
    str::FromStr,
};

/// ROM or RAM bytes with a `Debug` implementation that avoids dumping the
/// entire contents.
#[derive(Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct Memory(Vec<u8>);

impl Memory {
    /// Create a new, empty `Memory` instance.
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Create a new `Memory` instance of a given size, zeroed out.
    pub fn with_size(size: usize) -> Self {
        Self(vec![0; size])
    }

    /// Create a new RAM `Memory` instance of a given size, filled per
    /// [`RamState`].
    pub fn ram(state: RamState, size: usize) -> Self {
        let mut ram = Self::with_size(size);
        ram.fill_ram(state);
        ram
    }

    /// Fills `Memory` based on [`RamState`].
    pub fn fill_ram(&mut self, state: RamState) {
        match state {
            RamState::AllZeros => self.0.fill(0x00),
            RamState::AllOnes => self.0.fill(0xFF),
            RamState::Random => {
                let mut rng = rand::thread_rng();
                for val in &mut self.0 {
                    *val = rng.gen_range(0x00..=0xFF);
                }
            }
        }
    }

    pub fn resize(&mut self, size: usize) {
        self.0.resize(size, 0x00);
    }
}

impl From<Vec<u8>> for Memory {
    fn from(val: Vec<u8>) -> Self {
        Self(val)
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memory").field("len", &self.0.len()).finish()
    }
}

impl Deref for Memory {
    type Target = Vec<u8>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Memory {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// A trait for memory-mapped read/write operations.
///
/// `read` may have side effects (register latches, buffers); `peek` never
/// does.
pub trait Mem {
    fn read(&mut self, addr: u16) -> u8 {
        self.peek(addr)
    }

    fn peek(&self, addr: u16) -> u8;

    fn read_u16(&mut self, addr: u16) -> u16 {
        let lo = self.read(addr);
        let hi = self.read(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    fn peek_u16(&self, addr: u16) -> u16 {
        let lo = self.peek(addr);
        let hi = self.peek(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    fn write(&mut self, addr: u16, val: u8);
}

/// RAM contents on power-up.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum RamState {
    #[default]
    AllZeros,
    AllOnes,
    Random,
}

impl RamState {
    pub const fn as_slice() -> &'static [Self] {
        &[Self::AllZeros, Self::AllOnes, Self::Random]
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AllZeros => "all-zeros",
            Self::AllOnes => "all-ones",
            Self::Random => "random",
        }
    }
}

impl AsRef<str> for RamState {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for RamState {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all-zeros" => Ok(Self::AllZeros),
            "all-ones" => Ok(Self::AllOnes),
            "random" => Ok(Self::Random),
            _ => Err("invalid RamState value. valid options: `all-zeros`, `all-ones`, or `random`"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
#[must_use]
pub enum Error {
    #[error("bank `{field}` must be a non-zero power of two ({context})")]
    InvalidWindow { field: &'static str, context: String },
}

/// A set of switchable memory bank slots covering an address range.
///
/// Each slot covers `window` bytes of the address range and maps to a page of
/// the backing capacity. Pages out of range wrap modulo the available pages,
/// so mapper writes can never index out of bounds.
#[derive(Clone, Serialize, Deserialize)]
#[must_use]
pub struct Banks {
    start: usize,
    end: usize,
    size: usize,
    window: usize,
    shift: usize,
    banks: Vec<usize>,
    page_count: usize,
}

impl Banks {
    pub fn new(start: usize, end: usize, capacity: usize, window: usize) -> Result<Self, Error> {
        if end == 0 {
            return Err(Error::InvalidWindow {
                field: "end",
                context: format!("bank start: ${start:04X}"),
            });
        }
        if window == 0 || !window.is_power_of_two() {
            return Err(Error::InvalidWindow {
                field: "window",
                context: format!("bank range: ${start:04X}..=${end:04X}"),
            });
        }
        let mut size = end - start;
        if size > capacity {
            size = capacity.max(window) - 1;
        }
        let bank_count = (size + 1) / window;
        let page_count = (capacity / window).max(1);

        let mut banks = vec![0; bank_count.max(1)];
        for (i, bank) in banks.iter_mut().enumerate() {
            *bank = (i * window) % capacity.max(window);
        }

        Ok(Self {
            start,
            end,
            size,
            window,
            shift: window.trailing_zeros() as usize,
            banks,
            page_count,
        })
    }

    /// Point bank slot `slot` at page `page`; out-of-range pages wrap
    /// modulo the available banks.
    pub fn set(&mut self, slot: usize, page: usize) {
        let len = self.banks.len();
        self.banks[slot % len] = (page % self.page_count) << self.shift;
    }

    /// Point a contiguous range of slots at consecutive pages starting at
    /// `page`.
    pub fn set_range(&mut self, start: usize, end: usize, page: usize) {
        for (i, slot) in (start..=end).enumerate() {
            self.set(slot, page + i);
        }
    }

    /// Index of the last page.
    #[must_use]
    pub const fn last(&self) -> usize {
        self.page_count - 1
    }

    /// Slot index for a mapped address.
    #[must_use]
    pub const fn get(&self, addr: u16) -> usize {
        (addr as usize & self.size) >> self.shift
    }

    /// Translate a mapped address into an offset into the backing memory.
    #[must_use]
    pub fn translate(&self, addr: u16) -> usize {
        let slot = self.get(addr) % self.banks.len();
        self.banks[slot] | (addr as usize & (self.window - 1))
    }

    /// Page currently selected in slot `slot`.
    #[must_use]
    pub fn page(&self, slot: usize) -> usize {
        self.banks[slot] >> self.shift
    }
}

impl fmt::Debug for Banks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Banks")
            .field("start", &format_args!("${:04X}", self.start))
            .field("end", &format_args!("${:04X}", self.end))
            .field("window", &format_args!("${:04X}", self.window))
            .field("banks", &self.banks)
            .field("page_count", &self.page_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_bank() {
        let banks = Banks::new(0x8000, 0xFFFF, 128 * 1024, 0x4000).unwrap();
        assert_eq!(banks.get(0x8000), 0);
        assert_eq!(banks.get(0xBFFF), 0);
        assert_eq!(banks.get(0xC000), 1);
        assert_eq!(banks.get(0xFFFF), 1);
    }

    #[test]
    fn bank_translate() {
        let mut banks = Banks::new(0x8000, 0xFFFF, 128 * 1024, 0x2000).unwrap();

        assert_eq!(banks.last(), 15, "page count");

        assert_eq!(banks.translate(0x8000), 0x0000);
        banks.set(0, 1);
        assert_eq!(banks.translate(0x8000), 0x2000);
        banks.set(0, 2);
        assert_eq!(banks.translate(0x8000), 0x4000);
        banks.set(0, banks.last());
        assert_eq!(banks.translate(0x8000), 0x1E000);
    }

    #[test]
    fn bank_page_wrapping() {
        // 16K of PRG behind a 16K window: any page select lands on page 0
        let mut banks = Banks::new(0x8000, 0xFFFF, 16 * 1024, 0x4000).unwrap();
        banks.set(0, 7);
        assert_eq!(banks.translate(0x8123), 0x0123);
        // Mirror of the single bank at $C000
        assert_eq!(banks.translate(0xC123), 0x0123);
    }
}
