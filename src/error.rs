//! Error handling.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
#[must_use]
pub enum Error {
    #[error(transparent)]
    Cart(#[from] crate::cart::Error),
    #[error("no ROM loaded")]
    RomNotLoaded,
    #[error("invalid save state: {0}")]
    InvalidSaveState(String),
    #[error("save state ROM mismatch (expected CRC32 {expected:#010X}, found {found:#010X})")]
    SaveStateCrcMismatch { expected: u32, found: u32 },
}
