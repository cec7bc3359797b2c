//! Kernel singleton (§3.5): one process-wide record holding the
//! allocator, the global cthread registries, and the handles that tie
//! the boot/scheduler/main cthreads together.
//!
//! Expressed as a raw global behind `static mut`, guarded only by the
//! single-threaded invariant (§5: "no mutex, no atomic... required
//! outside the kernel I/O ring itself") — not a `RefCell`, matching
//! §9's "Global kernel state" design note: this is the one
//! process-wide-singleton form, not the context-passing alternative.

use crate::alloc::Allocator;
use crate::cthread::CthreadHdl;
use crate::ring::{self, Link};
use crate::scheduler::CompletionSource;
use std::ptr::NonNull;

/// Size of the boot cthread's stack-resident frame buffer. Carved
/// directly from the kernel singleton rather than the arena, so
/// booting doesn't require the allocator to be functional yet. Sized
/// generously against `size_of::<CthreadInner>()`; `init_kernel`
/// debug-asserts it is large enough rather than hand-tuning a literal
/// byte count the way the original's 64-byte C++ frame does (that
/// figure is specific to the original's header layout and does not
/// translate byte-for-byte — see DESIGN.md).
pub(crate) const BOOT_FRAME_SIZE: usize = 128;

#[derive(Debug, Default)]
pub struct KernelCounters {
    pub ready: u64,
    pub waiting: u64,
    pub io_waiting: u64,
    pub zombie: u64,
    pub running: u64,
    pub total: u64,
}

pub struct Kernel {
    pub alloc: Allocator,
    pub task_list: NonNull<Link>,
    pub ready_list: NonNull<Link>,
    pub zombie_list: NonNull<Link>,
    pub counters: KernelCounters,
    pub current: Option<CthreadHdl>,
    pub scheduler_cthread: Option<CthreadHdl>,
    pub main_cthread: Option<CthreadHdl>,
    pub boot_cthread: Option<CthreadHdl>,
    pub(crate) boot_frame: Box<[u8; BOOT_FRAME_SIZE]>,
    pub main_cthread_exit_code: i32,
    pub interrupted: bool,
    pub completion_source: Option<Box<dyn CompletionSource>>,
}

impl Kernel {
    pub(crate) fn new(alloc: Allocator) -> Self {
        Kernel {
            alloc,
            task_list: ring::new_sentinel(),
            ready_list: ring::new_sentinel(),
            zombie_list: ring::new_sentinel(),
            counters: KernelCounters::default(),
            current: None,
            scheduler_cthread: None,
            main_cthread: None,
            boot_cthread: None,
            boot_frame: Box::new([0u8; BOOT_FRAME_SIZE]),
            main_cthread_exit_code: 0,
            interrupted: false,
            completion_source: None,
        }
    }
}

static mut KERNEL: Option<Kernel> = None;

/// # Safety
/// Must not be called concurrently with any other kernel accessor — the
/// runtime is single-threaded by design (§5), so this only guards
/// against misuse, not real concurrency.
pub(crate) unsafe fn kernel_mut() -> &'static mut Kernel {
    KERNEL.as_mut().expect("kernel not initialized; call init_kernel first")
}

pub(crate) unsafe fn set_kernel(k: Kernel) {
    debug_assert!(KERNEL.is_none(), "init_kernel called twice without fini_kernel");
    KERNEL = Some(k);
}

pub(crate) unsafe fn take_kernel() -> Option<Kernel> {
    KERNEL.take()
}

pub(crate) unsafe fn is_initialized() -> bool {
    KERNEL.is_some()
}
