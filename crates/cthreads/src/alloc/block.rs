//! Block header and arena layout (§3.1).
//!
//! The arena is a contiguous byte range. Its interior is partitioned into
//! blocks, each prefixed by a header carrying the block's own
//! `(size, state, kind)` and a mirror of its left neighbor's
//! `(size, state)` so that the arena can be walked in either direction
//! without a separate index.

use std::ptr::NonNull;

/// Every block size is a multiple of this, including the header.
pub const ALIGN: usize = 32;

/// Small-bin ceiling (§3.2): blocks at or below this size are tracked by
/// the 64-bin freelist; larger free blocks go into the AVL tree (§3.3).
pub const SMALL_BIN_CEILING: usize = 2048;

pub const HEADER_SIZE: usize = std::mem::size_of::<BlockHeader>();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockState {
    Invalid = 0,
    Used = 1,
    Free = 2,
    Wild = 3,
    BeginSentinel = 4,
    EndSentinel = 5,
}

/// The 16-byte-equivalent header prefixing every block: this block's own
/// `(size, state)` plus a mirror of the previous block's `(size, state)`,
/// so traversal works forward (by `this_size`) and backward (by
/// `prev_size`) without touching the neighbor.
#[derive(Debug)]
#[repr(C)]
pub struct BlockHeader {
    pub this_size: u32,
    pub this_state: BlockState,
    pub prev_size: u32,
    pub prev_state: BlockState,
}

impl BlockHeader {
    pub fn new(this_size: u32, this_state: BlockState, prev_size: u32, prev_state: BlockState) -> Self {
        debug_assert_eq!(this_size as usize % ALIGN, 0);
        BlockHeader {
            this_size,
            this_state,
            prev_size,
            prev_state,
        }
    }
}

/// A cursor over one block in the arena. Cheap to copy; the arena itself
/// owns the bytes, this is just a typed view.
#[derive(Debug, Clone, Copy)]
pub struct Block {
    pub ptr: NonNull<u8>,
}

impl Block {
    /// # Safety
    /// `ptr` must point at the start of a valid block header inside a
    /// live arena.
    pub unsafe fn from_raw(ptr: NonNull<u8>) -> Self {
        Block { ptr }
    }

    pub fn header(&self) -> &BlockHeader {
        unsafe { &*self.ptr.as_ptr().cast::<BlockHeader>() }
    }

    pub fn header_mut(&mut self) -> &mut BlockHeader {
        unsafe { &mut *self.ptr.as_ptr().cast::<BlockHeader>() }
    }

    pub fn size(&self) -> usize {
        self.header().this_size as usize
    }

    pub fn state(&self) -> BlockState {
        self.header().this_state
    }

    pub fn set_state(&mut self, state: BlockState) {
        self.header_mut().this_state = state;
    }

    /// The block's payload — the address returned to callers of `malloc`.
    pub fn payload(&self) -> NonNull<u8> {
        unsafe { NonNull::new_unchecked(self.ptr.as_ptr().add(HEADER_SIZE)) }
    }

    /// Recovers the owning block from a payload pointer handed back to `free`.
    ///
    /// # Safety
    /// `payload` must be a pointer previously returned by [`Block::payload`]
    /// on a block that is still live (not yet merged away by coalescing).
    pub unsafe fn from_payload(payload: NonNull<u8>) -> Self {
        Block {
            ptr: NonNull::new_unchecked(payload.as_ptr().sub(HEADER_SIZE)),
        }
    }

    /// The block immediately to the right, by walking `this_size` bytes.
    pub fn next(&self) -> Block {
        unsafe {
            Block {
                ptr: NonNull::new_unchecked(self.ptr.as_ptr().add(self.size())),
            }
        }
    }

    /// The block immediately to the left, by walking back `prev_size` bytes.
    /// Undefined if called on the begin sentinel.
    pub fn prev(&self) -> Block {
        let prev_size = self.header().prev_size as usize;
        unsafe {
            Block {
                ptr: NonNull::new_unchecked(self.ptr.as_ptr().sub(prev_size)),
            }
        }
    }

    /// Rewrites this block's `this_size`/`this_state` and mirrors them
    /// into the right neighbor's `prev_size`/`prev_state` fields, keeping
    /// the bidirectional-linkage invariant (§3.1) intact.
    pub fn set_size_and_mirror(&mut self, new_size: u32, new_state: BlockState) {
        self.header_mut().this_size = new_size;
        self.header_mut().this_state = new_state;
        let mut next = self.next();
        next.header_mut().prev_size = new_size;
        next.header_mut().prev_state = new_state;
    }
}

/// Rounds `n` up to the next multiple of `ALIGN`.
pub fn align_up(n: usize) -> usize {
    (n + ALIGN - 1) / ALIGN * ALIGN
}

/// The block size required to satisfy a payload request of `size` bytes:
/// header-inclusive, 32-byte aligned, minimum one alignment unit.
pub fn required_block_size(size: usize) -> usize {
    align_up(size + HEADER_SIZE).max(ALIGN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_correctly() {
        assert_eq!(align_up(1), 32);
        assert_eq!(align_up(32), 32);
        assert_eq!(align_up(33), 64);
    }

    #[test]
    fn required_block_size_includes_header() {
        assert_eq!(required_block_size(1), 32);
        assert_eq!(required_block_size(16), 32);
        assert_eq!(required_block_size(17), 64);
    }
}
