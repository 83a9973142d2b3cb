//! `DxROM`/`Namco 108` (Mapper 206).
//!
//! <https://www.nesdev.org/wiki/INES_Mapper_206>
//! <https://www.nesdev.org/wiki/DxROM>

use crate::{
    cart::Cart,
    common::{Reset, ResetKind},
    mapper::{self, Mapped, MappedRead, MappedWrite, Mapper, MemMap, Txrom},
    ppu::Mirroring,
};
use serde::{Deserialize, Serialize};

/// `DxROM`/`Namco 108` (Mapper 206): the MMC3 predecessor.
///
/// Shares the MMC3 bank-select scheme but has no IRQ counter, no mirroring
/// control, and no PRG/CHR mode bits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Dxrom {
    pub inner: Txrom,
}

impl Dxrom {
    pub fn load(cart: &mut Cart) -> Result<Mapper, mapper::Error> {
        match Txrom::load(cart)? {
            Mapper::Txrom(inner) => Ok(Self { inner }.into()),
            _ => unreachable!("Txrom::load returns a Txrom"),
        }
    }
}

impl MemMap for Dxrom {
    fn map_read(&mut self, addr: u16) -> MappedRead {
        self.inner.map_read(addr)
    }

    fn map_peek(&self, addr: u16) -> MappedRead {
        self.inner.map_peek(addr)
    }

    fn map_write(&mut self, addr: u16, mut val: u8) -> MappedWrite {
        match addr {
            0x0000..=0x7FFF => self.inner.map_write(addr, val),
            // Only bank select/data exist; everything mirrors onto $8000/$8001
            0x8000..=0xFFFF => {
                let addr = 0x8000 | (addr & 0x0001);
                if addr == 0x8000 {
                    // No PRG/CHR mode bits on Namco 108
                    val &= 0x3F;
                }
                self.inner.map_write(addr, val)
            }
        }
    }
}

impl Mapped for Dxrom {
    fn mirroring(&self) -> Mirroring {
        self.inner.mirroring()
    }

    fn set_mirroring(&mut self, _mirroring: Mirroring) {
        // Hardwired on DxROM boards
    }
}

impl Reset for Dxrom {
    fn reset(&mut self, kind: ResetKind) {
        self.inner.reset(kind);
    }
}
