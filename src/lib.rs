#![doc = include_str!("../README.md")]

pub mod apu;
pub mod bus;
pub mod cart;
pub mod common;
pub mod control_deck;
pub mod cpu;
pub mod error;
pub mod input;
pub mod mapper;
pub mod mem;
pub mod ppu;

pub mod prelude {
    //! Re-exports of the common types used for basic NES emulation.

    pub use crate::{
        apu::Apu,
        cart::Cart,
        common::{Reset, ResetKind},
        control_deck::ControlDeck,
        cpu::Cpu,
        error::{Error, Result},
        input::{Player, VirtualButtons},
        mapper::{Mapped, MappedRead, MappedWrite, Mapper, MemMap},
        mem::RamState,
        ppu::{Mirroring, Ppu},
    };
}
