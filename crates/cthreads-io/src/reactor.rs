//! The I/O adapter's kernel-ring half (§4.5, §6.2, Component E).
//!
//! The reactor wraps one `io_uring::IoUring` instance as a process-wide
//! singleton — the same "one global record, no mutex, single-threaded"
//! shape `cthreads::kernel` uses for the scheduler's own state, since
//! this runtime never has more than one ring in flight at a time. Opcode
//! wrappers in [`crate::ops`] reach the same singleton that the
//! scheduler drains through the [`cthreads::CompletionSource`] seam, so
//! a submission made by any cthread is visible to the next `submit()`
//! the scheduler issues at the top of its loop (§4.4 step 1).

use cthreads::CompletionSource;
use io_uring::{squeue, IoUring};
use std::io;

pub struct Reactor {
    ring: IoUring,
}

static mut REACTOR: Option<Reactor> = None;

/// # Safety
/// Must not be called concurrently with any other reactor accessor —
/// guarded only by the runtime's single-threaded invariant, exactly
/// like `cthreads::kernel::kernel_mut`.
unsafe fn reactor_mut() -> &'static mut Reactor {
    REACTOR.as_mut().expect("cthreads_io::init not called")
}

/// A thin [`CompletionSource`] that forwards to the reactor singleton.
/// This is the value `run_main` stores in the kernel; opcode wrappers
/// reach the same underlying ring directly through [`push`], bypassing
/// the trait object (the core crate doesn't know about `squeue::Entry`).
struct ReactorHandle;

impl CompletionSource for ReactorHandle {
    fn submit(&mut self) -> i32 {
        unsafe {
            match reactor_mut().ring.submit() {
                Ok(_) => 0,
                Err(e) => -e.raw_os_error().unwrap_or(libc::EIO),
            }
        }
    }

    fn drain_into(&mut self, on_cqe: &mut dyn FnMut(u64, i32)) {
        unsafe {
            let cq = reactor_mut().ring.completion();
            for cqe in cq {
                on_cqe(cqe.user_data(), cqe.result());
            }
        }
    }
}

/// Builds the ring with `ring_entries` submission slots and installs the
/// reactor singleton, returning the handle `run_main` attaches as its
/// [`CompletionSource`] (§6.3 `ring_entries`).
pub fn init(ring_entries: u32) -> io::Result<Box<dyn CompletionSource>> {
    let ring = IoUring::new(ring_entries)?;
    unsafe {
        debug_assert!(REACTOR.is_none(), "cthreads_io::init called twice without fini");
        REACTOR = Some(Reactor { ring });
    }
    Ok(Box::new(ReactorHandle))
}

/// Tears down the ring (§4.7 `fini_kernel`).
pub fn fini() {
    unsafe {
        REACTOR = None;
    }
}

/// Pushes `entry` onto the submission queue. If no slot is free, submits
/// inline to drain the queue and retries — the back-pressure policy of
/// §4.5 step 2 / §9 "Submission back-pressure": callers never suspend
/// to make room, they submit synchronously instead.
pub(crate) fn push(entry: squeue::Entry) {
    unsafe {
        let reactor = reactor_mut();
        loop {
            let pushed = reactor.ring.submission().push(&entry);
            match pushed {
                Ok(()) => return,
                Err(_queue_full) => {
                    let res = reactor.ring.submit();
                    assert!(res.is_ok(), "io_uring submit failed: fatal per error taxonomy (§7)");
                }
            }
        }
    }
}
