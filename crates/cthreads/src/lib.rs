//! A single-threaded cooperative coroutine runtime: a fixed-arena
//! segregated-fit allocator, a cthread state machine driven by direct
//! handoff, and a pluggable I/O completion seam.
//!
//! This crate is the runtime triple's core (components A, B, C, D, F,
//! G, H); the io_uring adapter and opcode surface live in the sibling
//! `cthreads-io` crate, which depends on this one for the promise and
//! suspension machinery via [`ops::IoAwait`].

pub mod alloc;
pub mod boot;
pub mod config;
pub mod cthread;
pub mod error;
pub mod event;
pub mod invariants;
pub mod kernel;
pub mod ops;
pub mod ring;
pub mod scheduler;

pub use boot::{fini_kernel, init_kernel, run_main};
pub use config::KernelConfig;
pub use cthread::{CthreadHdl, CthreadState};
pub use error::KernelError;
pub use event::Event;
pub use scheduler::CompletionSource;

/// The caller-facing re-export surface (§6.1), grouped as the spec
/// groups it: lifecycle, events, allocator. I/O opcodes are not
/// re-exported here — they live in `cthreads-io`, which depends on this
/// crate rather than the other way around.
pub mod api {
    use crate::alloc::AllocError;
    use crate::cthread::CthreadHdl;
    use std::ptr::NonNull;

    // Lifecycle
    pub use crate::ops::{get_current_task, get_state, is_done, join, resume, spawn, suspend};

    pub fn is_valid(hdl: CthreadHdl) -> bool {
        hdl.state() != crate::cthread::CthreadState::Deleting
    }

    // Events
    pub fn init_event() -> crate::event::Event {
        crate::event::Event::new()
    }
    pub async fn wait(event: &crate::event::Event) {
        event.wait().await
    }
    pub fn signal(event: &crate::event::Event) -> u32 {
        event.signal()
    }
    pub fn signal_n(event: &crate::event::Event, n: u32) -> u32 {
        event.signal_n(n)
    }
    pub fn signal_all(event: &crate::event::Event) -> u32 {
        event.signal_all()
    }

    // Allocator
    pub fn try_alloc_mem(size: usize) -> Result<NonNull<u8>, AllocError> {
        unsafe { crate::kernel::kernel_mut().alloc.try_malloc(size) }
    }

    /// # Safety
    /// `ptr` must have come from a prior `try_alloc_mem` call on this
    /// kernel instance and not yet have been freed.
    pub unsafe fn free_mem(ptr: NonNull<u8>) {
        crate::kernel::kernel_mut().alloc.free(ptr)
    }

    pub fn defragment_mem(time_budget: Option<u32>) -> usize {
        unsafe { crate::kernel::kernel_mut().alloc.defragment(time_budget) }
    }
}
