use thiserror::Error;

/// The program break refused to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("program break at {brk:#x} cannot move by {increment} bytes")]
pub struct BrkError {
    /// The break when the request was made.
    pub brk: usize,
    /// The requested adjustment.
    pub increment: isize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuddyError {
    /// Zero bytes, or more than the whole heap, were requested.
    #[error("invalid request size of {0} bytes")]
    InvalidSize(usize),

    /// No free block is large enough.
    #[error("no free block can hold {0} bytes")]
    Exhausted(usize),

    #[error("no block starts at {0:#x}")]
    UnknownAddress(usize),

    #[error("block at {0:#x} is already free")]
    DoubleRelease(usize),

    /// A resize targeted a block that exists but is free.
    #[error("block at {0:#x} is not allocated")]
    NotAllocated(usize),

    #[error("growth primitive failed: {0}")]
    GrowthFailure(#[from] BrkError),

    /// Exponents must fit the descriptor and the address arithmetic.
    #[error("size exponent {0} is out of range")]
    InvalidExponent(u8),

    /// The heap would run past the end of the address space.
    #[error("no heap fits at {0:#x}")]
    InvalidStart(usize),

    #[error("no heap has been initialized at {0:#x}")]
    Uninitialized(usize),

    #[error("failed to write heap info")]
    Fmt(#[from] core::fmt::Error),
}
