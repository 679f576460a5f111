//! Code that doesn't have a great place elsewhere at the moment.
//!
//! Nothing in here should be exported.

use crate::*;

/// Smallest `e` such that `1 << e >= n`. `n` must be nonzero.
#[inline]
pub(crate) fn log2_ceiling(n: usize) -> u8 {
    debug_assert!(n != 0);

    // next_power_of_two overflows above the top bit, which no heap can hold
    n.next_power_of_two().trailing_zeros() as u8
}

/// Moves the bytes in `base..acme` by `offset` bytes.
///
/// Source and destination may overlap. The caller must have the break
/// positioned such that the destination is in range.
#[inline]
pub(crate) fn shift(memory: &mut [u8], base: usize, acme: usize, offset: isize) {
    debug_assert!(base <= acme, "!(base {:#x} <= acme {:#x})", base, acme);

    if offset == 0 || base == acme {
        return;
    }

    let dest = base.wrapping_add_signed(offset);
    memory.copy_within(base..acme, dest);
}

/// Converts a byte count into a break adjustment.
#[inline]
pub(crate) fn increment(bytes: usize) -> Result<isize, BuddyError> {
    isize::try_from(bytes).map_err(|_| BuddyError::InvalidSize(bytes))
}

#[cfg(not(debug_assertions))]
pub(crate) fn scan_for_errors<B: Brk>(_: &Buddy<B>) {}

#[cfg(debug_assertions)]
/// Debugging function for checking various assumptions.
pub(crate) fn scan_for_errors<B: Brk>(buddy: &Buddy<B>) {
    let memory = buddy.brk.memory();

    let Ok(header) = Header::read(memory, buddy.start()) else {
        return;
    };
    let layout = geometry::HeapLayout::new(buddy.start(), header);

    let mut acme = layout.data.base;
    let mut count = 0;

    for block in geometry::blocks(memory, layout) {
        let size_exp = block.desc.size_exp;

        assert!(size_exp <= header.heap_exp, "{:?} at {:#x} exceeds the heap", block.desc, block.addr);
        if header.min_exp <= header.heap_exp {
            assert!(size_exp >= header.min_exp, "{:?} at {:#x} is below the minimum", block.desc, block.addr);
        }
        assert!(block.addr == acme);
        assert!((block.addr - layout.data.base) % block.desc.size() == 0, "{:#x} is misaligned", block.addr);

        acme += block.desc.size();
        count += 1;
    }

    assert!(acme == layout.data.acme, "blocks tile {} instead of {}", Span::new(layout.data.base, acme), layout.data);
    assert!(layout.slot(count) <= memory.len());

    #[cfg(feature = "counters")]
    {
        let counters = buddy.get_counters();
        assert!(counters.block_count == count);
        assert!(counters.allocated_bytes + counters.available_bytes == header.heap_size());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log2_ceiling_test() {
        assert_eq!(log2_ceiling(1), 0);
        assert_eq!(log2_ceiling(2), 1);
        assert_eq!(log2_ceiling(3), 2);
        assert_eq!(log2_ceiling(4096), 12);
        assert_eq!(log2_ceiling(4097), 13);
        assert_eq!(log2_ceiling(1 << (usize::BITS - 1)), usize::BITS as u8 - 1);
    }

    #[test]
    fn shift_test() {
        let mut memory = vec![1, 2, 3, 4, 5, 0, 0];

        shift(&mut memory, 1, 5, 2);
        assert_eq!(memory, [1, 2, 3, 2, 3, 4, 5]);

        shift(&mut memory, 3, 7, -2);
        assert_eq!(memory, [1, 2, 3, 4, 5, 4, 5]);

        shift(&mut memory, 2, 2, -2);
        assert_eq!(memory, [1, 2, 3, 4, 5, 4, 5]);
    }

    #[test]
    fn increment_test() {
        assert_eq!(increment(12), Ok(12));
        assert_eq!(increment(usize::MAX), Err(BuddyError::InvalidSize(usize::MAX)));
    }
}
