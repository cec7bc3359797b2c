//! Small-block freelist index (§3.2): 64 size-class bins plus a 64-bit
//! occupancy mask so lookup is branch-light `count_trailing_zeros`.

use super::block::{Block, BlockState, ALIGN};
use crate::ring::{self, Link};
use std::ptr::NonNull;

pub const BIN_COUNT: usize = 64;

/// `bin = floor((size - 1) / 32)` clamped to 63 (§3.2, tested by §8.1.4).
pub fn bin_of(size: usize) -> usize {
    debug_assert!(size >= 1);
    ((size - 1) / ALIGN).min(BIN_COUNT - 1)
}

/// The smallest bin index that can satisfy a request of `size` bytes:
/// `ceil(size / 32) - 1`, i.e. the first bin whose range starts at or
/// above `size`.
pub fn min_bin_for_request(size: usize) -> usize {
    let ceil_units = (size + ALIGN - 1) / ALIGN;
    ceil_units.saturating_sub(1).min(BIN_COUNT - 1)
}

/// Each free block, while linked into a bin, reuses its header bytes as
/// an intrusive [`Link`] immediately following the block header. We get
/// away with overlaying the link onto block storage because a block is
/// never simultaneously `Used` (payload live) and a bin member.
pub struct SmallBins {
    bins: [NonNull<Link>; BIN_COUNT],
    occupancy: u64,
    pub stats: super::stats::BinStats,
}

impl SmallBins {
    pub fn new() -> Self {
        let bins = std::array::from_fn(|_| ring::new_sentinel());
        SmallBins {
            bins,
            occupancy: 0,
            stats: super::stats::BinStats::new(),
        }
    }

    fn link_ptr(block: &Block) -> NonNull<Link> {
        unsafe { NonNull::new_unchecked(block.payload().as_ptr().cast::<Link>()) }
    }

    pub fn is_empty(&self) -> bool {
        self.occupancy == 0
    }

    /// LIFO insertion: push to the bin's head (§3.2 — "most recently
    /// freed first", a cache-locality choice, not a fairness one).
    pub fn insert(&mut self, block: Block) {
        debug_assert_eq!(block.state(), BlockState::Free);
        debug_assert!(block.size() <= super::block::SMALL_BIN_CEILING);
        let idx = bin_of(block.size());
        let link = Self::link_ptr(&block);
        unsafe { link.init() };
        ring::push(self.bins[idx], link);
        self.occupancy |= 1 << idx;
        self.stats.record_insert(idx);
    }

    /// Finds the smallest non-empty bin with index `>= required_bin` and
    /// pops its head (LIFO), clearing the occupancy bit if the bin empties.
    pub fn take_fitting(&mut self, required_bin: usize) -> Option<Block> {
        if required_bin >= BIN_COUNT {
            return None;
        }
        let mask = self.occupancy & (!0u64 << required_bin);
        if mask == 0 {
            return None;
        }
        let idx = mask.trailing_zeros() as usize;
        let link = ring::pop(self.bins[idx]).expect("occupancy bit set but bin empty");
        if ring::is_empty(self.bins[idx]) {
            self.occupancy &= !(1 << idx);
        }
        self.stats.record_take(idx);
        let block = unsafe { Block::from_raw(NonNull::new_unchecked(
            (link.as_ptr() as *mut u8).sub(super::block::HEADER_SIZE),
        )) };
        Some(block)
    }

    /// Removes `block` from whichever bin it is currently linked into.
    /// Used by the defragment pass, which needs to pull a free neighbor
    /// out of its bin before merging it away.
    pub fn remove(&mut self, block: Block) {
        let idx = bin_of(block.size());
        let link = Self::link_ptr(&block);
        link.detach();
        if ring::is_empty(self.bins[idx]) {
            self.occupancy &= !(1 << idx);
        }
    }

    pub fn bin_count_is_set(&self, idx: usize) -> bool {
        self.occupancy & (1 << idx) != 0
    }
}

impl Default for SmallBins {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_of_matches_spec_formula() {
        assert_eq!(bin_of(1), 0);
        assert_eq!(bin_of(32), 0);
        assert_eq!(bin_of(33), 1);
        assert_eq!(bin_of(2048), 63);
        assert_eq!(bin_of(100_000), 63); // clamped
    }

    #[test]
    fn min_bin_for_request_rounds_up() {
        assert_eq!(min_bin_for_request(1), 0);
        assert_eq!(min_bin_for_request(32), 0);
        assert_eq!(min_bin_for_request(33), 1);
        assert_eq!(min_bin_for_request(64), 1);
    }
}
