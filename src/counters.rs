//! Track allocation counters for a [`Buddy`](crate::Buddy) heap.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Counters {
    /// Number of active allocations.
    pub allocation_count: usize,
    /// Total number of allocations.
    pub total_allocation_count: u64,

    /// Sum of active allocations' block sizes.
    pub allocated_bytes: usize,
    /// Sum of all allocations' block sizes.
    pub total_allocated_bytes: u64,

    /// Number of bytes in free blocks.
    pub available_bytes: usize,
    /// Number of free blocks.
    pub free_block_count: usize,
    /// Number of descriptors in the table.
    pub block_count: usize,

    /// Total number of block splits.
    pub total_split_count: u64,
    /// Total number of buddy merges.
    pub total_merge_count: u64,

    /// Size of the data region.
    pub heap_bytes: usize,
}

impl Counters {
    pub const fn new() -> Self {
        Self {
            allocation_count: 0,
            total_allocation_count: 0,
            allocated_bytes: 0,
            total_allocated_bytes: 0,
            available_bytes: 0,
            free_block_count: 0,
            block_count: 0,
            total_split_count: 0,
            total_merge_count: 0,
            heap_bytes: 0,
        }
    }

    /// Returns the number of bytes the heap occupies besides the data region.
    pub const fn metadata_bytes(&self) -> usize {
        crate::header::HEADER_SIZE + self.block_count
    }

    /// Returns the total number of allocated bytes freed.
    pub const fn total_freed_bytes(&self) -> u64 {
        self.total_allocated_bytes - self.allocated_bytes as u64
    }

    pub(crate) fn account_init(&mut self, heap_bytes: usize) {
        *self = Self::new();

        self.heap_bytes = heap_bytes;
        self.available_bytes = heap_bytes;
        self.free_block_count = 1;
        self.block_count = 1;
    }

    /// A free block was split `splits` times and its leftmost piece allocated.
    pub(crate) fn account_alloc(&mut self, block_size: usize, splits: usize) {
        self.block_count += splits;
        // the split block is consumed, one free buddy is made per split
        self.free_block_count = self.free_block_count - 1 + splits;
        self.total_split_count += splits as u64;

        self.available_bytes -= block_size;
        self.allocation_count += 1;
        self.allocated_bytes += block_size;

        self.total_allocation_count += 1;
        self.total_allocated_bytes += block_size as u64;
    }

    pub(crate) fn account_release(&mut self, block_size: usize) {
        self.allocation_count -= 1;
        self.allocated_bytes -= block_size;

        self.available_bytes += block_size;
        self.free_block_count += 1;
    }

    pub(crate) fn account_merge(&mut self) {
        self.block_count -= 1;
        self.free_block_count -= 1;
        self.total_merge_count += 1;
    }
}

impl core::fmt::Display for Counters {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            r#"Stat                 | Running Total       | Current
---------------------|---------------------|--------------------
Allocation Count     | {:>19} | {:>19}
Allocated Bytes      | {:>19} | {:>19}
Available Bytes      |                 N/A | {:>19}
Free Blocks          |                 N/A | {:>19}
Blocks               |                 N/A | {:>19}
Splits / Merges      | {:>9} / {:>7} |                 N/A
Heap Bytes           |                 N/A | {:>19}
Metadata Bytes       |                 N/A | {:>19}"#,
            self.total_allocation_count,
            self.allocation_count,
            self.total_allocated_bytes,
            self.allocated_bytes,
            self.available_bytes,
            self.free_block_count,
            self.block_count,
            self.total_split_count,
            self.total_merge_count,
            self.heap_bytes,
            self.metadata_bytes(),
        )
    }
}

impl<B: crate::Brk> crate::Buddy<B> {
    pub fn get_counters(&self) -> &Counters {
        &self.counters
    }
}
