use crate::{BuddyError, Descriptor};

/// Bytes occupied by the header at the start of the heap.
pub const HEADER_SIZE: usize = 2;

/// The heap's fixed parameters, stored in its first two bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    /// The data region is `1 << heap_exp` bytes long.
    pub heap_exp: u8,
    /// No block is split below `1 << min_exp` bytes.
    pub min_exp: u8,
}

impl Header {
    /// Largest heap exponent the address arithmetic supports.
    pub const MAX_HEAP_EXP: u8 = {
        let bits = usize::BITS as u8 - 2;
        if bits < Descriptor::MAX_SIZE_EXP { bits } else { Descriptor::MAX_SIZE_EXP }
    };

    /// Checks that the exponents fit both the descriptor and `usize`.
    pub fn new(heap_exp: u8, min_exp: u8) -> Result<Self, BuddyError> {
        if heap_exp > Self::MAX_HEAP_EXP {
            return Err(BuddyError::InvalidExponent(heap_exp));
        }
        if min_exp > Descriptor::MAX_SIZE_EXP {
            return Err(BuddyError::InvalidExponent(min_exp));
        }

        Ok(Self { heap_exp, min_exp })
    }

    /// Size of the data region in bytes.
    #[inline]
    pub const fn heap_size(&self) -> usize {
        1 << self.heap_exp
    }

    /// Reads the header of the heap starting at `start`.
    ///
    /// Fails if the header is out of range or describes a heap that
    /// doesn't fit below the break along with at least one descriptor.
    pub fn read(memory: &[u8], start: usize) -> Result<Self, BuddyError> {
        let bytes = start
            .checked_add(HEADER_SIZE)
            .and_then(|acme| memory.get(start..acme))
            .ok_or(BuddyError::Uninitialized(start))?;

        let header =
            Self::new(bytes[0], bytes[1]).map_err(|_| BuddyError::Uninitialized(start))?;

        match start.checked_add(HEADER_SIZE + header.heap_size() + 1) {
            Some(required) if required <= memory.len() => Ok(header),
            _ => Err(BuddyError::Uninitialized(start)),
        }
    }

    pub fn write(self, memory: &mut [u8], start: usize) {
        memory[start] = self.heap_exp;
        memory[start + 1] = self.min_exp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_read_write_test() {
        let mut memory = vec![0u8; 4 + HEADER_SIZE + 16 + 1];
        let header = Header::new(4, 2).unwrap();

        header.write(&mut memory, 4);
        assert_eq!(Header::read(&memory, 4), Ok(header));
        assert_eq!(header.heap_size(), 16);

        // the descriptor table would start past the end
        assert_eq!(Header::read(&memory[..memory.len() - 1], 4), Err(BuddyError::Uninitialized(4)));
        assert_eq!(Header::read(&memory, memory.len() - 1), Err(BuddyError::Uninitialized(memory.len() - 1)));
    }

    #[test]
    fn header_exponent_bounds_test() {
        assert!(Header::new(Header::MAX_HEAP_EXP, Descriptor::MAX_SIZE_EXP).is_ok());
        assert_eq!(
            Header::new(Header::MAX_HEAP_EXP + 1, 0),
            Err(BuddyError::InvalidExponent(Header::MAX_HEAP_EXP + 1))
        );
        assert_eq!(Header::new(8, 128), Err(BuddyError::InvalidExponent(128)));
    }
}
