//! Boot / run-loop (§4.7, Component G).
//!
//! `run_main` constructs a **boot cthread** carved directly from a
//! fixed-size buffer inside the kernel singleton (so booting does not
//! itself require the arena to be functional), then drives it with a
//! plain native loop — the one place in this crate where a cthread is
//! stepped by something other than an awaitable's `poll`, because the
//! boot cthread has no caller of its own to unwind into.

use crate::alloc::Allocator;
use crate::config::KernelConfig;
use crate::cthread::{self, CthreadHdl, CthreadInner, CthreadState};
use crate::error::KernelError;
use crate::kernel::{self, Kernel, BOOT_FRAME_SIZE};
use crate::ops;
use crate::scheduler::{self, CompletionSource};
use std::future::Future;

/// Initializes the allocator over a freshly carved arena of
/// `config.memory_size` bytes and installs the kernel singleton. Does
/// not yet know about an I/O ring — that is attached by [`run_main`].
pub fn init_kernel(config: &KernelConfig) -> Result<(), KernelError> {
    if config.memory_size < crate::config::MIN_ARENA_SIZE {
        return Err(KernelError::ArenaTooSmall(config.memory_size));
    }
    let alloc = Allocator::new(config.memory_size)?;
    unsafe { kernel::set_kernel(Kernel::new(alloc)) };
    Ok(())
}

/// Tears down the I/O ring (by dropping the attached
/// [`CompletionSource`]) and releases the kernel singleton. Any cthread
/// frames still allocated at this point are leaked along with the
/// arena — `run_main` always runs the scheduler to exhaustion first, so
/// in practice nothing remains.
pub fn fini_kernel() {
    unsafe {
        kernel::take_kernel();
    }
}

async fn boot_body(scheduler_hdl: CthreadHdl) -> i32 {
    while !scheduler_hdl.is_done() {
        ops::resume(scheduler_hdl).await;
    }
    0
}

/// Places a cthread directly into the kernel's boot frame buffer,
/// bypassing the arena entirely, and performs the same `Initial ->
/// Ready` registration and counter bookkeeping [`ops::spawn`] does for
/// arena-backed cthreads.
fn place_boot_cthread(kernel: &mut Kernel, body: impl Future<Output = i32> + 'static) -> CthreadHdl {
    assert!(
        std::mem::size_of::<CthreadInner>() <= BOOT_FRAME_SIZE,
        "CthreadInner grew past the boot frame's fixed size"
    );
    let raw: *mut u8 = (kernel.boot_frame.as_mut() as *mut [u8; BOOT_FRAME_SIZE]).cast();
    let ptr = std::ptr::NonNull::new(raw).unwrap().cast();
    let hdl = unsafe { cthread::place_cthread(ptr, Box::pin(body), kernel.task_list, kernel.ready_list) };
    kernel.counters.ready += 1;
    kernel.counters.total += 1;
    hdl
}

/// Runs a complete program: initializes the kernel (if not already
/// done via a prior [`init_kernel`] call — tests call it directly to
/// exercise the allocator without a full `run_main`), spawns the main
/// and scheduler cthreads, boots, and returns the main cthread's exit
/// code (§4.7 step 4).
///
/// `completion_source` is the `cthreads-io` reactor (or `None`, for
/// programs with no I/O — S3/S4's join/event scenarios run this way).
pub fn run_main<F>(config: KernelConfig, completion_source: Option<Box<dyn CompletionSource>>, main_fn: F) -> i32
where
    F: Future<Output = i32> + 'static,
{
    if unsafe { !kernel::is_initialized() } {
        init_kernel(&config).expect("kernel initialization failed");
    }

    let exit_code = unsafe {
        let kernel = kernel::kernel_mut();
        kernel.completion_source = completion_source;

        let main_hdl = ops::spawn(main_fn).expect("failed to spawn main cthread");
        kernel.main_cthread = Some(main_hdl);

        let scheduler_hdl = ops::spawn(scheduler::scheduler_body()).expect("failed to spawn scheduler cthread");
        kernel.scheduler_cthread = Some(scheduler_hdl);

        let boot_hdl = place_boot_cthread(kernel, boot_body(scheduler_hdl));
        kernel.boot_cthread = Some(boot_hdl);

        while !boot_hdl.is_done() {
            debug_assert_eq!(boot_hdl.state(), CthreadState::Ready, "boot cthread always re-readies itself via resume()");
            scheduler::run_cthread_step(kernel, boot_hdl);
        }

        kernel.main_cthread_exit_code
    };

    fini_kernel();
    exit_code
}
