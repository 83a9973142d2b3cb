//! Memory mappers for cartridge boards.
//!
//! <https://wiki.nesdev.org/w/index.php/Mapper>

use crate::{
    common::{Reset, ResetKind},
    mem,
    ppu::Mirroring,
};
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

pub use m000_nrom::Nrom;
pub use m001_sxrom::Sxrom;
pub use m002_uxrom::Uxrom;
pub use m003_cnrom::Cnrom;
pub use m004_txrom::Txrom;
pub use m007_axrom::Axrom;
pub use m009_pxrom::Pxrom;
pub use m010_fxrom::Fxrom;
pub use m011_color_dreams::ColorDreams;
pub use m034_bnrom::Bnrom;
pub use m034_nina001::Nina001;
pub use m066_gxrom::Gxrom;
pub use m071_bf909x::Bf909x;
pub use m079_nina003_006::Nina003006;
pub use m206_dxrom::Dxrom;

pub mod m000_nrom;
pub mod m001_sxrom;
pub mod m002_uxrom;
pub mod m003_cnrom;
pub mod m004_txrom;
pub mod m007_axrom;
pub mod m009_pxrom;
pub mod m010_fxrom;
pub mod m011_color_dreams;
pub mod m034_bnrom;
pub mod m034_nina001;
pub mod m066_gxrom;
pub mod m071_bf909x;
pub mod m079_nina003_006;
pub mod m206_dxrom;

/// Dots per PPU frame; A12 filter arithmetic wraps at this boundary.
pub const FRAME_CYCLE_WRAP: u32 = 89342;

#[derive(thiserror::Error, Debug)]
#[must_use]
pub enum Error {
    #[error(transparent)]
    Bank(#[from] mem::Error),
}

/// A cartridge board, dispatched as a tagged enum.
///
/// There are few enough boards that an enum beats virtual dispatch, and the
/// dispatcher sits on the hot path of every PPU fetch.
#[enum_dispatch]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(clippy::large_enum_variant)]
#[must_use]
pub enum Mapper {
    None,
    Nrom,
    Sxrom,
    Uxrom,
    Cnrom,
    Txrom,
    Axrom,
    Pxrom,
    Fxrom,
    ColorDreams,
    Bnrom,
    Nina001,
    Gxrom,
    Bf909x,
    Nina003006,
    Dxrom,
}

impl Mapper {
    pub fn none() -> Self {
        None.into()
    }

    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None(_))
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::none()
    }
}

/// Where a mapped read resolves.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum MappedRead {
    /// Defer to default data bus behavior (open bus on the CPU side, mirrored
    /// nametable RAM on the PPU side).
    Bus,
    /// CHR ROM or RAM offset.
    Chr(usize),
    /// PRG ROM offset.
    PrgRom(usize),
    /// PRG RAM offset.
    PrgRam(usize),
    /// Data supplied directly by the mapper.
    Data(u8),
}

/// Where a mapped write resolves.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum MappedWrite {
    /// Swallow the write.
    None,
    /// Defer to default data bus behavior.
    Bus,
    /// CHR RAM offset.
    ChrRam(usize, u8),
    /// PRG RAM offset.
    PrgRam(usize, u8),
}

#[enum_dispatch(Mapper)]
pub trait MemMap {
    fn map_read(&mut self, addr: u16) -> MappedRead {
        self.map_peek(addr)
    }

    fn map_peek(&self, _addr: u16) -> MappedRead {
        MappedRead::Bus
    }

    fn map_write(&mut self, _addr: u16, _val: u8) -> MappedWrite {
        MappedWrite::Bus
    }
}

#[enum_dispatch(Mapper)]
pub trait Mapped {
    fn mirroring(&self) -> Mirroring {
        Mirroring::default()
    }

    fn set_mirroring(&mut self, _mirroring: Mirroring) {}

    /// Notification of PPU address-bus activity (background, sprite, and
    /// dummy fetches). `frame_cycle` is `scanline * 341 + cycle`.
    fn notify_address_bus(&mut self, _addr: u16, _frame_cycle: u32) {}

    /// Notification of a `v` register transition from a `$2006` write or a
    /// `$2007` access.
    fn notify_addr_change(&mut self, _old: u16, new: u16, frame_cycle: u32) {
        self.notify_address_bus(new, frame_cycle);
    }

    /// Called when the PPU wraps to dot (0, 0).
    fn notify_frame_start(&mut self) {}

    fn irq_pending(&mut self, _frame_cycle: u32) -> bool {
        false
    }

    fn irq_clear(&mut self) {}
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct None;

impl MemMap for None {}
impl Mapped for None {}
impl Reset for None {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mapper_is_none() {
        let mapper = Mapper::default();
        assert!(mapper.is_none());
    }

    #[test]
    fn none_defers_to_bus() {
        let mut mapper = Mapper::none();
        assert_eq!(mapper.map_read(0x8000), MappedRead::Bus);
        assert_eq!(mapper.map_write(0x8000, 0xFF), MappedWrite::Bus);
        assert!(!mapper.irq_pending(0));
    }
}
