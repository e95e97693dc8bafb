use crate::range::{IndexRange, MemoryRange};
use crate::{FrameGraphError, Result};

/// First-fit interval allocator over a growing virtual extent.
///
/// Freed ranges go to an unordered free list that is always consulted before
/// the extent grows. Adjacent free ranges are merged when a range is returned.
/// The number of live transient resources per frame is small, so both
/// operations scan the free list linearly.
#[derive(Debug, Default)]
pub struct VirtualSpaceAllocator {
    free_space: Vec<IndexRange>,
    current_extent: u64,
    highest_extent: u64,
}

impl VirtualSpaceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, minimum_size: u64, alignment: u64) -> Result<MemoryRange> {
        if minimum_size == 0 {
            return Err(FrameGraphError::ZeroSizedAllocation);
        }
        if !alignment.is_power_of_two() {
            return Err(FrameGraphError::InvalidAlignment { alignment });
        }

        let alignment_mask = alignment - 1;

        for index in 0..self.free_space.len() {
            let range = self.free_space[index];
            let aligned_start = range.start + (range.start.wrapping_neg() & alignment_mask);
            if aligned_start > range.end || range.end - aligned_start < minimum_size {
                continue;
            }

            let end = aligned_start + minimum_size;
            if end == range.end {
                self.free_space.swap_remove(index);
            } else {
                self.free_space[index].start = end;
            }

            return Ok(MemoryRange::new(range.start, aligned_start, end));
        }

        let previous_extent = self.current_extent;
        let aligned_extent = previous_extent + (previous_extent.wrapping_neg() & alignment_mask);

        self.current_extent = aligned_extent + minimum_size;
        self.highest_extent = self.highest_extent.max(self.current_extent);

        Ok(MemoryRange::new(previous_extent, aligned_extent, self.current_extent))
    }

    /// Returns `range`, which must come from [`allocate`](Self::allocate), to the free list.
    pub fn free(&mut self, range: MemoryRange) {
        let freed = range.as_index_range();

        let following = self.free_space.iter().position(|free| free.start == freed.end);
        let preceding = self.free_space.iter().position(|free| free.end == freed.start);

        match (preceding, following) {
            (Some(before), Some(after)) => {
                self.free_space[before].end = self.free_space[after].end;
                self.free_space.swap_remove(after);
            }
            (Some(before), None) => self.free_space[before].end = freed.end,
            (None, Some(after)) => self.free_space[after].start = freed.start,
            (None, None) => self.free_space.push(freed),
        }
    }

    /// Drops every free range and rewinds the extent to zero.
    pub fn reset(&mut self) {
        self.free_space.clear();
        self.current_extent = 0;
        self.highest_extent = 0;
    }

    pub fn current_extent(&self) -> u64 {
        self.current_extent
    }

    /// Largest extent reached since the last reset.
    pub fn highest_extent(&self) -> u64 {
        self.highest_extent
    }

    pub fn free_space(&self) -> &[IndexRange] {
        &self.free_space
    }
}
