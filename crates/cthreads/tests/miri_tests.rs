//! Miri-compatible tests for detecting undefined behavior in the
//! allocator's pointer arithmetic (Component B).
//!
//! Run with: `cargo +nightly miri test --test miri_tests`
//!
//! These exercise every raw-pointer path `Allocator` takes: sentinel
//! carving, split-on-allocate, free-without-coalescing, and the
//! defragment merge walk, so Miri's stacked-borrows checker sees each
//! of them at least once.

use cthreads::alloc::Allocator;

#[test]
fn miri_allocator_basic_round_trip() {
    let mut alloc = Allocator::new(4096).unwrap();
    let p = alloc.try_malloc(64).unwrap();
    unsafe {
        std::ptr::write_bytes(p.as_ptr(), 0xAB, 64);
    }
    unsafe { alloc.free(p) };
}

#[test]
fn miri_allocator_many_small_allocations() {
    let mut alloc = Allocator::new(64 * 1024).unwrap();
    let mut ptrs = Vec::new();
    for i in 0..200usize {
        if let Ok(p) = alloc.try_malloc(16 + (i % 64)) {
            unsafe {
                std::ptr::write_bytes(p.as_ptr(), (i % 256) as u8, 16 + (i % 64));
            }
            ptrs.push(p);
        }
    }
    for p in ptrs {
        unsafe { alloc.free(p) };
    }
}

#[test]
fn miri_allocator_free_reverse_order_then_defragment() {
    let mut alloc = Allocator::new(8192).unwrap();
    let mut ptrs = Vec::new();
    for _ in 0..16 {
        ptrs.push(alloc.try_malloc(64).unwrap());
    }
    for p in ptrs.into_iter().rev() {
        unsafe { alloc.free(p) };
    }
    alloc.defragment(None);
    let big = alloc.try_malloc(2048).unwrap();
    unsafe {
        std::ptr::write_bytes(big.as_ptr(), 0x42, 2048);
    }
    unsafe { alloc.free(big) };
}

#[test]
fn miri_allocator_large_block_tree_path() {
    let mut alloc = Allocator::new(256 * 1024).unwrap();
    let a = alloc.try_malloc(4096).unwrap();
    let b = alloc.try_malloc(4096).unwrap();
    unsafe {
        alloc.free(a);
        alloc.free(b);
    }
    let c = alloc.try_malloc(4096).unwrap();
    unsafe {
        std::ptr::write_bytes(c.as_ptr(), 0x7, 4096);
        alloc.free(c);
    }
}
