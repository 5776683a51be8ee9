//! Error types for the analysis passes.
//!
//! Every variant here is local to one read, class or method. Conditions that
//! make a whole pass inapplicable are reported as a [`crate::pass::SkipReason`]
//! instead.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("read of {len} bytes at {addr:#x} is out of bounds")]
    OutOfBounds { addr: u64, len: usize },

    #[error("address {addr:#x} is not inside {region}")]
    UnresolvedReference { addr: u64, region: String },

    #[error("record of {size} bytes at offset {offset:#x} overruns a {len} byte buffer")]
    TruncatedRecord { offset: usize, size: usize, len: usize },

    #[error("no function at {0:#x}")]
    MissingFunction(u64),

    #[error("unsupported scalar width {0}")]
    InvalidWidth(usize),

    #[error("no string terminator within {max} bytes of {addr:#x}")]
    StringNotTerminated { addr: u64, max: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
