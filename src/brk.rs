use crate::BrkError;

/// The capability that moves the end of the heap.
///
/// This is the allocator's only source of memory: every split grows the
/// break, every merge shrinks it. Addresses handed out by
/// [`Buddy`](crate::Buddy) are indices into [`Brk::memory`].
pub trait Brk {
    /// Move the break by `increment` bytes, returning the previous break.
    ///
    /// An `increment` of zero queries the break without moving it.
    /// On failure the break must be left where it was.
    fn sbrk(&mut self, increment: isize) -> Result<usize, BrkError>;

    /// The address space below the break, i.e. `[0, break)`.
    fn memory(&self) -> &[u8];

    /// See [`Brk::memory`].
    fn memory_mut(&mut self) -> &mut [u8];
}

/// A simulated program break backed by a `Vec<u8>`.
///
/// Refuses to move above `limit` or below zero. Bytes that drop below
/// a shrinking break are discarded, and growth zero-fills.
#[derive(Debug, Clone, Default)]
pub struct VirtualBrk {
    memory: Vec<u8>,
    limit: usize,
}

impl VirtualBrk {
    pub const fn new(limit: usize) -> Self {
        Self { memory: Vec::new(), limit }
    }

    /// The current break.
    pub fn brk(&self) -> usize {
        self.memory.len()
    }
}

impl Brk for VirtualBrk {
    fn sbrk(&mut self, increment: isize) -> Result<usize, BrkError> {
        let brk = self.memory.len();

        match brk.checked_add_signed(increment) {
            Some(new_brk) if new_brk <= self.limit => {
                self.memory.resize(new_brk, 0);
                Ok(brk)
            }
            _ => Err(BrkError { brk, increment }),
        }
    }

    #[inline]
    fn memory(&self) -> &[u8] {
        &self.memory
    }

    #[inline]
    fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }
}
