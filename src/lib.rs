#![doc = include_str!("../README.md")]

#[cfg(feature = "counters")]
mod counters;

mod brk;
mod descriptor;
mod error;
mod geometry;
mod header;
mod info;
mod span;
mod utils;

pub use brk::{Brk, VirtualBrk};
#[cfg(feature = "counters")]
pub use counters::Counters;
pub use descriptor::Descriptor;
pub use error::{BrkError, BuddyError};
pub use header::{Header, HEADER_SIZE};
pub use info::BlockInfo;
pub use span::Span;

use geometry::HeapLayout;
use utils::*;

// Heap (from `start` up to the break):
//   HEADER: heap_exp (u8), min_exp (u8) | DATA: 1 << heap_exp bytes | TABLE: one byte per block
//
// The table lists the blocks in address order and is the only record of them.
// Splitting a block inserts descriptors after it, growing the break; merging
// buddies removes one, shrinking it. A resize additionally parks a backup of
// the data and the table above the table for the duration of the call.

/// A buddy allocator whose heap and bookkeeping live entirely below a program break.
///
/// Initialize with [`init`](Buddy::init) or [`with_heap`](Buddy::with_heap).
///
/// All state besides the heap's start address is kept in the [`Brk`]'s memory,
/// so a `Buddy` can be reconstructed from a `Brk` holding an initialized heap.
pub struct Buddy<B: Brk> {
    pub brk: B,

    start: usize,

    #[cfg(feature = "counters")]
    counters: counters::Counters,
}

impl<B: Brk + core::fmt::Debug> core::fmt::Debug for Buddy<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Buddy")
            .field("brk", &self.brk)
            .field("start", &format_args!("{:#x}", self.start))
            .field("header", &Header::read(self.brk.memory(), self.start).ok())
            .finish()
    }
}

impl<B: Brk> Buddy<B> {
    /// Create a `Buddy` for a heap at `start` without initializing it.
    ///
    /// This is all that's needed to adopt a heap already initialized in `brk`.
    pub const fn new(brk: B, start: usize) -> Self {
        Self {
            brk,
            start,
            #[cfg(feature = "counters")]
            counters: counters::Counters::new(),
        }
    }

    /// Contruct and initialize a `Buddy`. See [`init`](Buddy::init).
    pub fn with_heap(brk: B, start: usize, heap_exp: u8, min_exp: u8) -> Result<Self, BuddyError> {
        let mut buddy = Self::new(brk, start);
        buddy.init(heap_exp, min_exp)?;
        Ok(buddy)
    }

    /// Address of the heap's header.
    pub const fn start(&self) -> usize {
        self.start
    }

    pub fn header(&self) -> Result<Header, BuddyError> {
        Header::read(self.brk.memory(), self.start)
    }

    pub(crate) fn layout(&self) -> Result<HeapLayout, BuddyError> {
        self.header().map(|header| HeapLayout::new(self.start, header))
    }

    /// Initialize the heap with `1 << heap_exp` bytes of data, split no
    /// smaller than `1 << min_exp`.
    ///
    /// The break is reset to the heap's start before growing it to hold the
    /// header, data and a single free block's descriptor, so any previous
    /// heap and its allocations are discarded.
    ///
    /// If `min_exp > heap_exp` the heap is valid but nothing can be allocated.
    pub fn init(&mut self, heap_exp: u8, min_exp: u8) -> Result<(), BuddyError> {
        log::trace!("init({:#x}, {}, {})", self.start, heap_exp, min_exp);

        let header = Header::new(heap_exp, min_exp)?;
        let heap_bytes = HEADER_SIZE + header.heap_size() + 1;

        // the whole heap must be reachable by a break adjustment
        match self.start.checked_add(heap_bytes) {
            Some(acme) if isize::try_from(acme).is_ok() => {}
            _ => return Err(BuddyError::InvalidStart(self.start)),
        }

        let layout = HeapLayout::new(self.start, header);

        let brk = self.brk.sbrk(0)?;
        let reset = increment(self.start)? - increment(brk)?;
        self.brk.sbrk(reset)?;
        self.brk.sbrk(increment(heap_bytes)?)?;

        let memory = self.brk.memory_mut();
        header.write(memory, self.start);
        memory[layout.slot(0)] = Descriptor::free(heap_exp).to_byte();

        #[cfg(feature = "counters")]
        self.counters.account_init(header.heap_size());

        log::debug!("initialized heap over {} with minimum block exponent {}", layout.data, min_exp);

        scan_for_errors(self);
        Ok(())
    }

    /// Allocate a block of at least `size` bytes, returning its address.
    ///
    /// The smallest sufficient free block is chosen, the leftmost of those
    /// if there are several, and split in halves until no smaller block
    /// would do. Splitting grows the break by one byte per split.
    pub fn allocate(&mut self, size: usize) -> Result<usize, BuddyError> {
        log::trace!("allocate({})", size);

        let layout = self.layout()?;

        if size == 0 || size > layout.data.size() {
            return Err(BuddyError::InvalidSize(size));
        }

        let needed_exp = layout.min_exp.max(log2_ceiling(size));

        let Some(block) = geometry::find_best_fit(self.brk.memory(), layout, needed_exp) else {
            log::debug!("allocate({}) found no free block of size 1 << {}", size, needed_exp);
            return Err(BuddyError::Exhausted(size));
        };

        // make room for the descriptors of the split-off buddies
        let splits = (block.desc.size_exp - needed_exp) as usize;
        let brk = self.brk.sbrk(increment(splits)?)?;

        let slot = layout.slot(block.index);
        let memory = self.brk.memory_mut();
        shift(memory, slot + 1, brk, splits as isize);

        // keep the low half, placing the high half directly after,
        // such that the largest buddies end up furthest right
        let mut desc = block.desc;
        for i in (1..=splits).rev() {
            desc.size_exp -= 1;
            memory[slot + i] = Descriptor::free(desc.size_exp).to_byte();
        }

        desc.allocated = true;
        memory[slot] = desc.to_byte();

        #[cfg(feature = "counters")]
        self.counters.account_alloc(desc.size(), splits);

        if splits != 0 {
            log::debug!("split block at {:#x} {} times", block.addr, splits);
        }
        log::trace!("allocate({}) -> {:#x}", size, block.addr);

        scan_for_errors(self);
        Ok(block.addr)
    }

    /// Free the block at `addr`, merging it with free buddies as far as possible.
    ///
    /// `addr` must be exactly where a block starts.
    ///
    /// If the break fails to shrink during merging, the error is returned.
    /// The block is released regardless, but may be left unmerged.
    pub fn release(&mut self, addr: usize) -> Result<(), BuddyError> {
        log::trace!("release({:#x})", addr);

        let layout = self.layout()?;

        let Some(block) = geometry::locate(self.brk.memory(), layout, addr) else {
            log::debug!("release({:#x}) matches no block", addr);
            return Err(BuddyError::UnknownAddress(addr));
        };

        if !block.desc.allocated {
            log::debug!("release({:#x}) of a free block", addr);
            return Err(BuddyError::DoubleRelease(addr));
        }

        self.brk.memory_mut()[layout.slot(block.index)] = Descriptor::free(block.desc.size_exp).to_byte();

        #[cfg(feature = "counters")]
        self.counters.account_release(block.desc.size());

        let result = self.coalesce(layout, block.index, addr);

        scan_for_errors(self);
        result
    }

    /// Merges the free block at `index` with its buddy until the buddy
    /// is allocated, split or nonexistent.
    ///
    /// Each merge is undone if the break refuses to shrink.
    fn coalesce(&mut self, layout: HeapLayout, mut index: usize, mut addr: usize) -> Result<(), BuddyError> {
        let mut brk = self.brk.sbrk(0)?;

        loop {
            let memory = self.brk.memory_mut();
            let desc = Descriptor::from_byte(memory[layout.slot(index)]);
            debug_assert!(!desc.allocated);

            // the whole heap has no buddy
            if desc.size_exp >= layout.heap_exp {
                return Ok(());
            }

            // buddies are always neighbours in the table, the side is positional
            let (low, high) = if geometry::is_right_child(layout.data, desc.size_exp, addr) {
                match index.checked_sub(1) {
                    Some(low) => (low, index),
                    None => return Ok(()),
                }
            } else {
                (index, index + 1)
            };

            let buddy_index = if low == index { high } else { low };
            let buddy = match memory.get(layout.slot(buddy_index)) {
                Some(&byte) if layout.slot(buddy_index) < brk => Descriptor::from_byte(byte),
                _ => return Ok(()),
            };

            if buddy.allocated || buddy.size_exp != desc.size_exp {
                return Ok(());
            }

            // merge into the low descriptor and close the gap of the high one
            memory[layout.slot(low)] = Descriptor::free(desc.size_exp + 1).to_byte();
            shift(memory, layout.slot(high + 1), brk, -1);

            if let Err(err) = self.brk.sbrk(-1) {
                let memory = self.brk.memory_mut();
                shift(memory, layout.slot(high), brk - 1, 1);
                memory[layout.slot(low)] = desc.to_byte();
                memory[layout.slot(high)] = desc.to_byte();

                log::debug!("merging block at {:#x} failed: {}", addr, err);
                return Err(err.into());
            }

            brk -= 1;

            #[cfg(feature = "counters")]
            self.counters.account_merge();

            if low != index {
                addr -= desc.size();
            }
            index = low;

            log::debug!("merged buddies into block of size {} at {:#x}", desc.size() << 1, addr);
        }
    }

    /// Resize the block at `addr` to hold `size` bytes, preserving its contents
    /// up to the smaller of the old and new sizes.
    ///
    /// The block is released and allocated anew, so it may move. A backup of
    /// the heap is taken beforehand: on failure the heap is restored exactly,
    /// the block untouched at `addr`. Should the break refuse to drop the
    /// backup afterwards, its bytes are left above the heap.
    ///
    /// - `addr` of `None` allocates.
    /// - `size` of zero releases, returning `Ok(None)`.
    pub fn resize(&mut self, addr: Option<usize>, size: usize) -> Result<Option<usize>, BuddyError> {
        log::trace!("resize({:x?}, {})", addr, size);

        let Some(addr) = addr else {
            return if size == 0 { Ok(None) } else { self.allocate(size).map(Some) };
        };

        if size == 0 {
            self.release(addr)?;
            return Ok(None);
        }

        let layout = self.layout()?;
        let heap_size = layout.data.size();

        if size > heap_size {
            return Err(BuddyError::InvalidSize(size));
        }

        let memory = self.brk.memory();
        let block = geometry::locate(memory, layout, addr).ok_or(BuddyError::UnknownAddress(addr))?;

        if !block.desc.allocated {
            return Err(BuddyError::NotAllocated(addr));
        }

        // back up the data region followed by the table
        let table_len = geometry::table_len(memory, layout);
        let backup_size = heap_size + table_len;
        let brk = self.brk.sbrk(increment(backup_size)?)?;

        let memory = self.brk.memory_mut();
        memory.copy_within(layout.data.to_range(), brk);
        memory.copy_within(layout.slot(0)..layout.slot(table_len), brk + heap_size);

        #[cfg(feature = "counters")]
        let counters = self.counters;

        let result = self.release(addr).and_then(|()| self.allocate(size));

        // the backup sits at the top, wherever splits and merges moved it
        let top = self.brk.memory().len();
        let backup = Span::new(top - backup_size, top);
        let data_backup = Span::from_base_size(backup.base, heap_size);

        // the new block is only committed once the backup is dropped
        let result = result.and_then(|new_addr| {
            let copy_base = data_backup.base + (addr - layout.data.base);
            let copy_size = block.desc.size().min(size);

            self.brk.memory_mut().copy_within(copy_base..copy_base + copy_size, new_addr);
            self.brk.sbrk(-increment(backup_size)?)?;

            Ok(new_addr)
        });

        match result {
            Ok(new_addr) => {
                log::trace!("resize({:#x}, {}) -> {:#x}", addr, size, new_addr);

                scan_for_errors(self);
                Ok(Some(new_addr))
            }
            Err(err) => {
                let memory = self.brk.memory_mut();
                memory.copy_within(data_backup.to_range(), layout.data.base);
                memory.copy_within(data_backup.acme..backup.acme, layout.slot(0));

                #[cfg(feature = "counters")]
                {
                    self.counters = counters;
                }

                // bytes left above the restored table are never walked
                let stranded = backup.acme - brk;
                if let Err(shrink_err) = increment(stranded).and_then(|bytes| Ok(self.brk.sbrk(-bytes)?)) {
                    log::warn!("resize({:#x}, {}) left {} bytes above the heap: {}", addr, size, stranded, shrink_err);
                }

                log::debug!("resize({:#x}, {}) failed and was rolled back: {}", addr, size, err);

                scan_for_errors(self);
                Err(err)
            }
        }
    }

    /// Borrow the bytes of the allocated block at `addr`.
    pub fn block(&self, addr: usize) -> Result<&[u8], BuddyError> {
        let span = self.allocated_span(addr)?;
        Ok(&self.brk.memory()[span.to_range()])
    }

    /// Mutably borrow the bytes of the allocated block at `addr`.
    pub fn block_mut(&mut self, addr: usize) -> Result<&mut [u8], BuddyError> {
        let span = self.allocated_span(addr)?;
        Ok(&mut self.brk.memory_mut()[span.to_range()])
    }

    fn allocated_span(&self, addr: usize) -> Result<Span, BuddyError> {
        let layout = self.layout()?;

        match geometry::locate(self.brk.memory(), layout, addr) {
            Some(block) if block.desc.allocated => Ok(Span::from_base_size(addr, block.desc.size())),
            Some(_) => Err(BuddyError::NotAllocated(addr)),
            None => Err(BuddyError::UnknownAddress(addr)),
        }
    }
}
