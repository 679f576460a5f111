use core::ops::Range;

/// A range of addresses in the virtual address space, `base..acme`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Span {
    pub base: usize,
    pub acme: usize,
}

impl PartialEq for Span {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        (self.is_empty() && other.is_empty())
        || (self.base == other.base && self.acme == other.acme)
    }
}
impl Eq for Span {}

impl Span {
    pub const fn new(base: usize, acme: usize) -> Self {
        Self { base, acme }
    }

    pub const fn from_base_size(base: usize, size: usize) -> Self {
        Self { base, acme: base + size }
    }

    pub const fn to_range(&self) -> Range<usize> {
        Range { start: self.base, end: self.acme }
    }

    pub const fn size(&self) -> usize {
        if self.acme > self.base {
            self.acme - self.base
        } else {
            0
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.base >= self.acme
    }

    /// Returns whether `self` contains `addr`.
    pub const fn contains(&self, addr: usize) -> bool {
        self.base <= addr && addr < self.acme
    }

    /// Splits the span down the middle into its low and high halves.
    ///
    /// For odd sizes the extra byte goes to the high half.
    #[inline]
    pub const fn halves(self) -> (Self, Self) {
        let mid = self.base + self.size() / 2;
        (Self { base: self.base, acme: mid }, Self { base: mid, acme: self.acme })
    }
}

impl core::fmt::Display for Span {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{:#x}..{:#x}", self.base, self.acme))
    }
}
