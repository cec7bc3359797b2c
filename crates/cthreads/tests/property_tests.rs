//! Property-based coverage of §8.1's quantified invariants that don't
//! need a running scheduler: bin indexing and free-byte conservation
//! over the allocator (Component B).

use cthreads::alloc::{Allocator, SMALL_BIN_CEILING};
use proptest::prelude::*;

/// §8.1.4: `bin(S) == floor((S-1)/32)` clamped to 63, and the smallest
/// satisfying bin is always returned.
#[test]
fn bin_formula_matches_spec_over_full_range() {
    for size in 1..=SMALL_BIN_CEILING {
        let expected = ((size - 1) / 32).min(63);
        assert_eq!(cthreads::alloc::bin_of(size), expected, "size {size}");
    }
}

proptest! {
    /// §8.1.2/3: allocate-then-free a single block always returns
    /// `free_bytes` to its pre-allocation value.
    #[test]
    fn prop_alloc_free_conserves_bytes(size in 1usize..4096) {
        let mut alloc = Allocator::new(64 * 1024).unwrap();
        let before = alloc.free_bytes();
        let p = alloc.try_malloc(size);
        if let Ok(p) = p {
            unsafe { alloc.free(p) };
        }
        prop_assert_eq!(alloc.free_bytes(), before);
    }

    /// §8.2 S1: walking every small-bin size class round-trips without
    /// ever shrinking `free_bytes` below its starting point.
    #[test]
    fn prop_walk_bins_round_trips(seed in 0u64..1000) {
        let mut alloc = Allocator::new(1024 * 1024).unwrap();
        let initial = alloc.free_bytes();
        let mut ptrs = Vec::new();
        for i in 0..63usize {
            let size = 16 + i * 32 + (seed as usize % 17);
            if let Ok(p) = alloc.try_malloc(size) {
                ptrs.push(p);
            }
        }
        for p in ptrs {
            unsafe { alloc.free(p) };
        }
        prop_assert_eq!(alloc.free_bytes(), initial);
    }
}

#[test]
fn s1_allocator_walk_bins() {
    let mut alloc = Allocator::new(1024 * 1024).unwrap();
    let initial = alloc.free_bytes();
    for i in 0..63usize {
        let size = 16 + i * 32;
        let p = alloc.try_malloc(size).expect("walk-bins allocation must succeed");
        unsafe { alloc.free(p) };
    }
    assert_eq!(alloc.free_bytes(), initial);
}

#[test]
fn s2_defragment_idempotence() {
    let mut alloc = Allocator::new(1024 * 1024).unwrap();
    let mut ptrs = Vec::new();
    for _ in 0..128 {
        ptrs.push(alloc.try_malloc(32).unwrap());
    }
    for p in ptrs.into_iter().rev() {
        unsafe { alloc.free(p) };
    }
    let n1 = alloc.free_block_count();
    let merges1 = alloc.defragment(None);
    let n2 = alloc.free_block_count();
    assert!(n2 <= n1);
    let merges2 = alloc.defragment(None);
    assert_eq!(merges2, 0, "second defragment must be a no-op");
    let n3 = alloc.free_block_count();
    assert_eq!(n3, n2);
    let _ = merges1;
}
