//! Fixed-arena segregated-fit allocator (§3, §4.2).
//!
//! One arena, carved once at boot into a begin sentinel, a single wild
//! block, and an end sentinel. `try_malloc` first checks the small bins,
//! then the large-block tree, and finally carves off the wild block.
//! `free` always returns a block to whichever structure matches its size
//! without looking at neighbors; coalescing only happens when
//! [`Allocator::defragment`] is called explicitly (§3.4 — "coalesce on
//! defragment, not on free").

mod bins;
mod block;
mod stats;
mod tree;

pub use bins::bin_of;
pub use block::{BlockState, HEADER_SIZE, SMALL_BIN_CEILING};
pub use stats::{ClassCounters, TREE_CLASS, WILD_CLASS};

use bins::SmallBins;
use block::{align_up, required_block_size, Block, BlockHeader};
use std::ptr::NonNull;
use tree::Tree;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AllocError {
    #[error("requested arena size {0} is smaller than the minimum viable arena")]
    ArenaTooSmall(usize),
    #[error("allocation request of {0} bytes could not be satisfied")]
    OutOfMemory(usize),
}

/// The fixed memory region the allocator carves blocks out of. Owns the
/// backing storage for its lifetime; every [`Block`] handed out is a
/// typed view into this buffer, never a separate allocation.
pub struct Allocator {
    arena: Box<[u8]>,
    wild: Block,
    small: SmallBins,
    large: Tree,
}

/// Minimum arena size: begin sentinel + end sentinel + one minimally
/// sized wild block.
const MIN_ARENA: usize = block::ALIGN * 3;

impl Allocator {
    /// Carves a fresh arena of `size` bytes (rounded down to an alignment
    /// multiple) into begin/end sentinels around a single wild block.
    pub fn new(size: usize) -> Result<Self, AllocError> {
        if size < MIN_ARENA {
            return Err(AllocError::ArenaTooSmall(size));
        }
        let usable = (size / block::ALIGN) * block::ALIGN;
        let mut arena = vec![0u8; usable].into_boxed_slice();
        let base = NonNull::new(arena.as_mut_ptr()).unwrap();

        let begin_size = block::ALIGN as u32;
        let end_size = block::ALIGN as u32;
        let wild_size = (usable as u32) - begin_size - end_size;

        unsafe {
            let mut begin = Block::from_raw(base);
            *begin.header_mut() = BlockHeader::new(begin_size, BlockState::BeginSentinel, 0, BlockState::Invalid);

            let wild_ptr = NonNull::new_unchecked(base.as_ptr().add(begin_size as usize));
            let mut wild = Block::from_raw(wild_ptr);
            *wild.header_mut() = BlockHeader::new(wild_size, BlockState::Wild, begin_size, BlockState::BeginSentinel);

            let end_ptr = NonNull::new_unchecked(base.as_ptr().add(begin_size as usize + wild_size as usize));
            let mut end = Block::from_raw(end_ptr);
            *end.header_mut() = BlockHeader::new(end_size, BlockState::EndSentinel, wild_size, BlockState::Wild);

            Ok(Allocator {
                arena,
                wild,
                small: SmallBins::new(),
                large: Tree::new(),
            })
        }
    }

    /// Carves `requested` payload bytes out of the arena, preferring (in
    /// order) an exact-fit small bin entry, the large-block tree, then a
    /// slice off the front of the wild block.
    pub fn try_malloc(&mut self, requested: usize) -> Result<NonNull<u8>, AllocError> {
        let need = required_block_size(requested);

        if need <= SMALL_BIN_CEILING {
            let bin = bins::min_bin_for_request(need);
            if let Some(mut block) = self.small.take_fitting(bin) {
                if block.size() == need {
                    self.small.stats.record_exact_fit(bins::bin_of(need));
                } else {
                    self.split_and_requeue(&mut block, need);
                }
                block.set_state(BlockState::Used);
                return Ok(block.payload());
            }
        }

        if let Some(mut block) = self.large.find_gte(need) {
            self.large.detach(block);
            if block.size() != need {
                self.split_and_requeue(&mut block, need);
            }
            block.set_state(BlockState::Used);
            return Ok(block.payload());
        }

        if self.wild.size() >= need {
            let remaining = self.wild.size() - need;
            // §4.2 step 4: a remainder below the minimum block size means
            // there would be nothing left to carry forward as the wild
            // block, so the whole carve fails rather than consuming the
            // wild block entirely (§3.1: exactly one block is always
            // `Wild`; there must never be zero).
            if remaining >= block::ALIGN {
                let mut block = self.wild;
                block.set_size_and_mirror(need as u32, BlockState::Used);
                let mut new_wild = block.next();
                new_wild.set_size_and_mirror(remaining as u32, BlockState::Wild);
                self.wild = new_wild;
                return Ok(block.payload());
            }
        }

        self.small.stats.record_failure();
        Err(AllocError::OutOfMemory(requested))
    }

    /// Splits `block` (already removed from its freelist) into a
    /// `need`-sized piece and a remainder, reinserting the remainder into
    /// whichever structure fits its new size. No-op if the remainder
    /// would be smaller than the minimum block.
    fn split_and_requeue(&mut self, block: &mut Block, need: usize) {
        let remainder = block.size() - need;
        let class = if block.size() > SMALL_BIN_CEILING {
            TREE_CLASS
        } else {
            bins::bin_of(block.size())
        };
        if remainder < block::ALIGN {
            return;
        }
        block.set_size_and_mirror(need as u32, BlockState::Used);
        let mut rest = block.next();
        rest.set_size_and_mirror(remainder as u32, BlockState::Free);
        self.insert_free(rest);
        self.small.stats.record_split(class);
    }

    fn insert_free(&mut self, block: Block) {
        if block.size() <= SMALL_BIN_CEILING {
            self.small.insert(block);
        } else {
            self.large.insert(block);
        }
    }

    /// Returns a block to the allocator. Does not look at neighbors —
    /// coalescing only happens in [`Allocator::defragment`].
    ///
    /// # Safety
    /// `payload` must be a pointer previously returned by
    /// [`Allocator::try_malloc`] on this allocator, not yet freed.
    pub unsafe fn free(&mut self, payload: NonNull<u8>) {
        let mut block = Block::from_payload(payload);
        debug_assert_eq!(block.state(), BlockState::Used);
        block.set_state(BlockState::Free);
        let class = if block.size() <= SMALL_BIN_CEILING {
            bins::bin_of(block.size())
        } else {
            TREE_CLASS
        };
        self.insert_free(block);
        self.small.stats.record_free(class);
    }

    /// Walks the arena left to right, merging adjacent free blocks and
    /// folding the rightmost run back into the wild block. `time_budget`
    /// is accepted for forward compatibility with a cooperative,
    /// interruptible defragment pass but is not yet honored — the walk
    /// always runs to completion (open question, see DESIGN.md).
    pub fn defragment(&mut self, _time_budget: Option<u32>) -> usize {
        let mut total_merges = 0usize;
        let mut cur = self.first_non_sentinel();
        loop {
            if cur.state() == BlockState::EndSentinel {
                break;
            }
            if cur.state() != BlockState::Free && cur.state() != BlockState::Wild {
                cur = cur.next();
                continue;
            }
            let mut merged_size = cur.size();
            // The wild block is tracked only via `self.wild`, never linked
            // into a freelist, so only a `Free` starting block needs
            // detaching before the merge run begins.
            let scanning_class = if cur.state() == BlockState::Free {
                Some(self.remove_from_structure(cur))
            } else {
                None
            };
            let mut probe = cur.next();
            while probe.state() == BlockState::Free || probe.state() == BlockState::Wild {
                let is_wild = probe.state() == BlockState::Wild;
                if !is_wild {
                    self.remove_from_structure(probe);
                }
                merged_size += probe.size();
                total_merges += 1;
                if let Some(class) = scanning_class {
                    self.small.stats.record_merge(class);
                }
                if is_wild {
                    probe = probe.next();
                    break;
                }
                probe = probe.next();
            }
            if probe.state() == BlockState::EndSentinel {
                cur.set_size_and_mirror(merged_size as u32, BlockState::Wild);
                self.wild = cur;
            } else {
                cur.set_size_and_mirror(merged_size as u32, BlockState::Free);
                self.insert_free(cur);
            }
            cur = probe;
        }
        total_merges
    }

    /// Sum of `this_size` over every `Free` block plus the wild block's
    /// size (§3.1 `free_bytes` invariant).
    pub fn free_bytes(&self) -> usize {
        let mut total = self.wild.size();
        let mut cur = self.first_non_sentinel();
        loop {
            match cur.state() {
                BlockState::EndSentinel => break,
                BlockState::Free => total += cur.size(),
                _ => {}
            }
            cur = cur.next();
        }
        total
    }

    /// Number of blocks currently `Free` (does not count the wild
    /// block) — used by defragment-idempotence tests (§8.1.7, §8.2 S2).
    pub fn free_block_count(&self) -> usize {
        let mut count = 0;
        let mut cur = self.first_non_sentinel();
        loop {
            match cur.state() {
                BlockState::EndSentinel => break,
                BlockState::Free => count += 1,
                _ => {}
            }
            cur = cur.next();
        }
        count
    }

    fn remove_from_structure(&mut self, block: Block) -> usize {
        if block.size() <= SMALL_BIN_CEILING {
            self.small.remove(block);
            bins::bin_of(block.size())
        } else {
            self.large.detach(block);
            TREE_CLASS
        }
    }

    fn first_non_sentinel(&self) -> Block {
        let begin = unsafe { Block::from_raw(NonNull::new_unchecked(self.arena.as_ptr() as *mut u8)) };
        begin.next()
    }

    pub fn stats(&self) -> &stats::BinStats {
        &self.small.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malloc_then_free_round_trips() {
        let mut alloc = Allocator::new(64 * 1024).unwrap();
        let p = alloc.try_malloc(100).unwrap();
        unsafe { alloc.free(p) };
    }

    #[test]
    fn exhausts_wild_block_then_fails() {
        let mut alloc = Allocator::new(4096).unwrap();
        let mut ptrs = Vec::new();
        loop {
            match alloc.try_malloc(256) {
                Ok(p) => ptrs.push(p),
                Err(AllocError::OutOfMemory(_)) => break,
                Err(e) => panic!("unexpected error: {e:?}"),
            }
        }
        assert!(!ptrs.is_empty());
    }

    #[test]
    fn freed_small_block_is_reused_exactly() {
        let mut alloc = Allocator::new(64 * 1024).unwrap();
        let p1 = alloc.try_malloc(64).unwrap();
        unsafe { alloc.free(p1) };
        let p2 = alloc.try_malloc(64).unwrap();
        assert_eq!(p1, p2);
    }

    #[test]
    fn defragment_reclaims_wild_block_capacity() {
        let mut alloc = Allocator::new(4096).unwrap();
        let p1 = alloc.try_malloc(256).unwrap();
        let p2 = alloc.try_malloc(256).unwrap();
        let p3 = alloc.try_malloc(256).unwrap();
        unsafe {
            alloc.free(p1);
            alloc.free(p2);
            alloc.free(p3);
        }
        alloc.defragment(None);
        let big = alloc.try_malloc(3000);
        assert!(big.is_ok());
    }

    #[test]
    fn large_block_allocation_uses_tree() {
        let mut alloc = Allocator::new(1024 * 1024).unwrap();
        let p = alloc.try_malloc(8192).unwrap();
        unsafe { alloc.free(p) };
        let p2 = alloc.try_malloc(8192).unwrap();
        assert_eq!(p, p2);
    }
}
