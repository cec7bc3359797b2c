//! Join/resume/suspend (§4.8, Component H): the direct-handoff
//! awaitables, plus the generic I/O-suspension primitive that
//! `cthreads-io`'s opcode wrappers build on.

use crate::cthread::{self, CthreadHdl, CthreadState};
use crate::kernel::{self, Kernel};
use crate::ring;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

fn current(kernel: &Kernel) -> CthreadHdl {
    kernel.current.expect("no current cthread: called outside a cthread context")
}

/// `suspend()`: current -> `Ready`, enqueued to the ready list's tail;
/// the scheduler picks the next ready cthread. No direct handoff.
pub async fn suspend() {
    Suspend { done: false }.await
}

struct Suspend {
    done: bool,
}

impl Future for Suspend {
    type Output = ();
    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.done {
            return Poll::Ready(());
        }
        self.done = true;
        unsafe {
            let kernel = kernel::kernel_mut();
            let hdl = current(kernel);
            crate::debug_assert_transition!(CthreadState::Running, CthreadState::Ready);
            hdl.promise_mut().state = CthreadState::Ready;
            kernel.counters.ready += 1;
            ring::enqueue(kernel.ready_list, hdl.wait_link_ptr());
        }
        Poll::Pending
    }
}

/// `resume(target)`: direct handoff. The current cthread goes `Ready`
/// (enqueued to the ready list) and `target` — which must currently be
/// `Ready` — is driven `Ready -> Running` and run synchronously via
/// [`crate::scheduler::run_cthread_step`] before this awaitable returns
/// control to its caller.
pub async fn resume(target: CthreadHdl) {
    Resume { target, done: false }.await
}

struct Resume {
    target: CthreadHdl,
    done: bool,
}

impl Future for Resume {
    type Output = ();
    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.done {
            return Poll::Ready(());
        }
        self.done = true;
        unsafe {
            let kernel = kernel::kernel_mut();
            let hdl = current(kernel);
            crate::debug_assert_transition!(CthreadState::Running, CthreadState::Ready);
            hdl.promise_mut().state = CthreadState::Ready;
            kernel.counters.ready += 1;
            ring::enqueue(kernel.ready_list, hdl.wait_link_ptr());

            debug_assert_eq!(self.target.state(), CthreadState::Ready, "resume target must be Ready");
            crate::scheduler::run_cthread_step(kernel, self.target);
        }
        Poll::Pending
    }
}

/// `join(target)`: if `target` has already finished, returns its result
/// immediately with no suspension (§4.3 "join on a done/zombie peer ->
/// stays RUNNING"). If `target` is `Ready`, performs a direct handoff
/// identical to [`resume`] and the current cthread parks on `target`'s
/// awaiter list as `Waiting` instead of the ready list. Otherwise the
/// current cthread joins the awaiter list and control returns to the
/// scheduler (no direct handoff).
pub async fn join(target: CthreadHdl) -> i32 {
    Join { target, done: false }.await
}

struct Join {
    target: CthreadHdl,
    done: bool,
}

impl Future for Join {
    type Output = i32;
    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<i32> {
        if self.done {
            return Poll::Ready(self.target.promise().result);
        }
        if self.target.is_done() {
            // No transition at all: the spec's "stays RUNNING" no-op.
            return Poll::Ready(self.target.promise().result);
        }
        self.done = true;
        unsafe {
            let kernel = kernel::kernel_mut();
            let hdl = current(kernel);
            crate::debug_assert_transition!(CthreadState::Running, CthreadState::Waiting);
            hdl.promise_mut().state = CthreadState::Waiting;
            kernel.counters.waiting += 1;
            ring::enqueue(self.target.awaiters_ptr(), hdl.wait_link_ptr());

            if self.target.state() == CthreadState::Ready {
                crate::scheduler::run_cthread_step(kernel, self.target);
            }
            // Else: a non-ready peer will drain us off its awaiter list
            // when it reaches Zombie; control just unwinds back to the
            // scheduler's own loop (§4.3 "scheduler -> RUNNING").
        }
        Poll::Pending
    }
}

/// Returns the currently running cthread's handle without suspending.
pub fn get_current_task() -> CthreadHdl {
    unsafe { current(kernel::kernel_mut()) }
}

pub fn is_done(hdl: CthreadHdl) -> bool {
    hdl.is_done()
}

pub fn get_state(hdl: CthreadHdl) -> CthreadState {
    hdl.state()
}

/// The generic I/O-suspension half of every `cthreads-io` opcode
/// wrapper (§4.5 step 4): once the opcode wrapper has prepared and
/// submitted an SQE stamped with the current promise's address as
/// `user_data`, it awaits this to transition `Running -> IoWaiting` and
/// hand control back to the scheduler. Resumes with `promise.result`
/// (the drained CQE's `res`) once the scheduler's completion pump
/// matches a CQE back to this cthread.
pub struct IoAwait {
    done: bool,
}

impl IoAwait {
    /// # Safety
    /// Must only be constructed after the caller has already submitted
    /// an SQE with `user_data` set to the current cthread's promise
    /// pointer and incremented `prepared_io`.
    pub unsafe fn new() -> Self {
        IoAwait { done: false }
    }
}

impl Future for IoAwait {
    type Output = i32;
    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<i32> {
        if self.done {
            let hdl = unsafe { current(kernel::kernel_mut()) };
            return Poll::Ready(hdl.promise().result);
        }
        self.done = true;
        unsafe {
            let kernel = kernel::kernel_mut();
            let hdl = current(kernel);
            crate::debug_assert_transition!(CthreadState::Running, CthreadState::IoWaiting);
            hdl.promise_mut().state = CthreadState::IoWaiting;
            kernel.counters.io_waiting += 1;
        }
        Poll::Pending
    }
}

/// Called by an I/O adapter crate (e.g. `cthreads-io`) after it has
/// acquired a submission slot but before handing the entry to the
/// kernel ring: zeros `result`, increments `prepared_io`, and returns
/// the current cthread's promise address to stamp as the SQE's
/// `user_data` (§4.5 step 3, §6.2).
pub fn prepare_io() -> u64 {
    unsafe {
        let kernel = kernel::kernel_mut();
        let hdl = current(kernel);
        hdl.promise_mut().result = 0;
        hdl.promise_mut().prepared_io += 1;
        hdl.0.as_ptr() as u64
    }
}

/// Spawns a new cthread from the kernel's arena, registers it, and
/// returns its handle. Thin wrapper over [`cthread::spawn`] that
/// reaches into the kernel singleton for the allocator and lists.
pub fn spawn(body: impl Future<Output = i32> + 'static) -> Result<CthreadHdl, crate::alloc::AllocError> {
    unsafe {
        let kernel = kernel::kernel_mut();
        let hdl = cthread::spawn(&mut kernel.alloc, kernel.task_list, kernel.ready_list, body)?;
        kernel.counters.ready += 1;
        kernel.counters.total += 1;
        Ok(hdl)
    }
}
