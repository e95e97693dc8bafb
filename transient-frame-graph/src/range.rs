/// Half-open byte interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IndexRange {
    pub start: u64,
    pub end: u64,
}

impl IndexRange {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end, "inverted range {start}..{end}");
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &IndexRange) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }
}

/// A range handed out by the virtual space allocator.
///
/// `true_start` is where the allocation begins for free-list bookkeeping and
/// `aligned_start` is the address the consumer places its resource at. The
/// bytes in between are alignment padding owned by the allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryRange {
    pub true_start: u64,
    pub aligned_start: u64,
    pub end: u64,
}

impl MemoryRange {
    pub fn new(true_start: u64, aligned_start: u64, end: u64) -> Self {
        debug_assert!(true_start <= aligned_start && aligned_start <= end);
        Self {
            true_start,
            aligned_start,
            end,
        }
    }

    pub fn as_index_range(&self) -> IndexRange {
        IndexRange::new(self.true_start, self.end)
    }

    /// The usable bytes, excluding alignment padding.
    pub fn usable(&self) -> IndexRange {
        IndexRange::new(self.aligned_start, self.end)
    }

    pub fn padding(&self) -> u64 {
        self.aligned_start - self.true_start
    }
}

/// Rounds `value` up to `alignment`, which must be a power of two.
#[inline]
pub(crate) fn align_up(value: u64, alignment: u64) -> u64 {
    let mask = alignment - 1;
    value + (value.wrapping_neg() & mask)
}
