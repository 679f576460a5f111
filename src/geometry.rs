//! Positional reasoning over the descriptor table.
//!
//! The heap is an implicit complete binary tree: the data region is the
//! root and every split produces two children of half the size. Nothing
//! about the tree is stored besides the leaves' descriptors, in address
//! order, so parents and buddies are derived from addresses alone.

use crate::{header::HEADER_SIZE, Descriptor, Header, Span};

/// Where the parts of an initialized heap live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HeapLayout {
    pub(crate) heap_exp: u8,
    pub(crate) min_exp: u8,
    /// The allocatable bytes.
    pub(crate) data: Span,
    /// Address of the first descriptor, directly above the data region.
    pub(crate) table_base: usize,
}

impl HeapLayout {
    pub(crate) fn new(start: usize, header: Header) -> Self {
        let data = Span::from_base_size(start + HEADER_SIZE, header.heap_size());

        Self {
            heap_exp: header.heap_exp,
            min_exp: header.min_exp,
            data,
            table_base: data.acme,
        }
    }

    /// Address of the `index`th descriptor.
    #[inline]
    pub(crate) fn slot(&self, index: usize) -> usize {
        self.table_base + index
    }
}

/// A block as found by walking the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Block {
    /// Position in the descriptor table.
    pub(crate) index: usize,
    pub(crate) addr: usize,
    pub(crate) desc: Descriptor,
}

/// Iterates over the blocks left to right, accumulating their addresses.
///
/// Stops once the blocks tile the data region, so anything kept above
/// the table (like a resize backup) is never mistaken for descriptors.
pub(crate) struct Blocks<'a> {
    memory: &'a [u8],
    layout: HeapLayout,
    index: usize,
    addr: usize,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = Block;

    fn next(&mut self) -> Option<Self::Item> {
        if self.addr >= self.layout.data.acme {
            return None;
        }

        let desc = Descriptor::from_byte(*self.memory.get(self.layout.slot(self.index))?);
        let block = Block { index: self.index, addr: self.addr, desc };

        let size = 1usize.checked_shl(desc.size_exp as u32).unwrap_or(usize::MAX);
        self.addr = self.addr.saturating_add(size);
        self.index += 1;

        Some(block)
    }
}

pub(crate) fn blocks(memory: &[u8], layout: HeapLayout) -> Blocks<'_> {
    Blocks { memory, layout, index: 0, addr: layout.data.base }
}

/// Number of descriptors in the table.
pub(crate) fn table_len(memory: &[u8], layout: HeapLayout) -> usize {
    blocks(memory, layout).count()
}

/// Finds the smallest free block of at least `1 << min_exp` bytes.
///
/// Of equally small blocks, the leftmost wins.
pub(crate) fn find_best_fit(memory: &[u8], layout: HeapLayout, min_exp: u8) -> Option<Block> {
    let mut best: Option<Block> = None;

    for block in blocks(memory, layout) {
        // strictly smaller only, so the first of any size is kept
        if !block.desc.allocated
            && block.desc.size_exp >= min_exp
            && best.map_or(true, |best| block.desc.size_exp < best.desc.size_exp)
        {
            best = Some(block);
        }
    }

    best
}

/// Resolves `addr` to the block starting exactly there.
pub(crate) fn locate(memory: &[u8], layout: HeapLayout, addr: usize) -> Option<Block> {
    blocks(memory, layout).take_while(|block| block.addr <= addr).find(|block| block.addr == addr)
}

/// Returns whether the block of `1 << size_exp` bytes at `addr` is the
/// upper half of its parent.
///
/// Bisects `data` towards `addr` until reaching the block's width; the
/// last half taken is the answer. The root is reported as a left child.
pub(crate) fn is_right_child(data: Span, size_exp: u8, addr: usize) -> bool {
    debug_assert!(data.contains(addr));

    let width = 1usize.checked_shl(size_exp as u32).unwrap_or(usize::MAX);
    let mut range = data;
    let mut is_right = false;

    while range.size() > width {
        let (low, high) = range.halves();

        is_right = high.contains(addr);
        range = if is_right { high } else { low };
    }

    is_right
}
