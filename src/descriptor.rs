//! A `Descriptor` is one block's entry in the descriptor table:
//! whether the block is allocated and the exponent of its size.
//!
//! In the heap each descriptor occupies a single byte, the allocated
//! flag in the most significant bit and the exponent in the rest.

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Descriptor {
    pub allocated: bool,
    /// The block is `1 << size_exp` bytes long.
    pub size_exp: u8,
}

impl core::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Descriptor")
            .field("allocated", &self.allocated)
            .field("size", &format_args!("1 << {}", self.size_exp))
            .finish()
    }
}

impl Descriptor {
    pub const ALLOCATED_FLAG: u8 = 1 << 7;
    pub const SIZE_MASK: u8 = !Self::ALLOCATED_FLAG;

    /// Largest exponent representable in a descriptor.
    pub const MAX_SIZE_EXP: u8 = Self::SIZE_MASK;

    pub const fn free(size_exp: u8) -> Self {
        Self { allocated: false, size_exp }
    }

    pub const fn allocated(size_exp: u8) -> Self {
        Self { allocated: true, size_exp }
    }

    /// Block size in bytes.
    ///
    /// Exponents are validated against the heap at initialization,
    /// so the shift can't overflow for descriptors read from a heap.
    #[inline]
    pub const fn size(self) -> usize {
        1 << self.size_exp
    }

    #[inline]
    pub const fn from_byte(byte: u8) -> Self {
        Self {
            allocated: byte & Self::ALLOCATED_FLAG != 0,
            size_exp: byte & Self::SIZE_MASK,
        }
    }

    #[inline]
    pub const fn to_byte(self) -> u8 {
        debug_assert!(self.size_exp <= Self::MAX_SIZE_EXP);

        if self.allocated {
            self.size_exp | Self::ALLOCATED_FLAG
        } else {
            self.size_exp
        }
    }
}
