//! Scheduler (§4.4, Component D): ready-queue dispatch, zombie reaping,
//! and the I/O completion pump, embodied as a privileged cthread whose
//! body runs the loop below. `run_cthread_step` is the trampoline every
//! direct-handoff awaitable calls into — the native call stack plays
//! the role a symmetric-transfer coroutine would play with an explicit
//! tail call (§9 "Coroutine lowering").

use crate::cthread::{self, CthreadHdl, CthreadState};
use crate::kernel::Kernel;
use crate::ring;
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

/// The seam between the scheduler and whatever I/O ring backs it.
/// `cthreads` has no dependency on `io-uring`; `cthreads-io`'s reactor
/// implements this trait and is handed to [`crate::boot::run_main`].
pub trait CompletionSource {
    /// Flushes any buffered submissions. Returns a negative `-errno` on
    /// failure (§7: submit failure is fatal, callers should abort).
    fn submit(&mut self) -> i32;

    /// Drains every completion currently available, invoking `on_cqe`
    /// once per entry with `(user_data, res)` — `user_data` is the
    /// promise pointer stamped at submission time (§6.2).
    fn drain_into(&mut self, on_cqe: &mut dyn FnMut(u64, i32));

    /// Whether a submission/completion backend is actually attached.
    /// The core crate can run cthreads with no I/O at all (e.g. S3/S4).
    fn has_work(&self) -> bool {
        true
    }
}

fn noop_raw_waker() -> RawWaker {
    fn clone(_: *const ()) -> RawWaker {
        noop_raw_waker()
    }
    fn no_op(_: *const ()) {}
    static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
    RawWaker::new(std::ptr::null(), &VTABLE)
}

/// A waker that does nothing: this runtime never relies on
/// `Waker::wake` to drive re-polling — direct handoff and the
/// scheduler's own ready-list dispatch decide what runs next, not the
/// executor machinery `Future`/`Waker` were designed around.
pub(crate) fn noop_waker() -> Waker {
    unsafe { Waker::from_raw(noop_raw_waker()) }
}

/// Runs one poll step of `hdl`, which must currently be `Ready`.
/// Performs the `Ready -> Running` transition, polls the body once, and
/// then performs whichever of `Running -> Ready` (handled by the
/// awaitable itself, already done by the time `poll` returns `Pending`)
/// or `Running -> Zombie` (handled here, on `Poll::Ready`) applies.
///
/// This function recurses: an awaitable's `poll` may call this again on
/// a different handle before returning `Pending` to its own caller —
/// that recursive call *is* direct handoff (§4.4 "Direct Handoff").
pub(crate) fn run_cthread_step(kernel: &mut Kernel, hdl: CthreadHdl) {
    let previous = kernel.current;
    debug_assert_eq!(hdl.state(), CthreadState::Ready, "run_cthread_step requires a Ready cthread");
    crate::debug_assert_transition!(CthreadState::Ready, CthreadState::Running);
    kernel.counters.ready -= 1;
    kernel.counters.running += 1;
    hdl.promise_mut().state = CthreadState::Running;
    unsafe { hdl.wait_link_ptr() }.detach();
    kernel.current = Some(hdl);

    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    let outcome = cthread::poll_body(hdl, &mut cx);

    match outcome {
        Poll::Pending => {
            kernel.counters.running -= 1;
        }
        Poll::Ready(value) => {
            crate::debug_assert_transition!(CthreadState::Running, CthreadState::Zombie);
            kernel.counters.running -= 1;
            kernel.counters.zombie += 1;
            hdl.promise_mut().result = value;
            hdl.promise_mut().state = CthreadState::Zombie;
            if kernel.main_cthread == Some(hdl) {
                kernel.main_cthread_exit_code = value;
            }
            unsafe { ring::enqueue(kernel.zombie_list, hdl.wait_link_ptr()) };
            wake_all_awaiters(kernel, hdl);
        }
    }
    kernel.current = previous;
    crate::debug_assert_counters_balanced!(kernel.counters);
}

/// Drains `hdl`'s awaiter list to empty, transitioning every waiter
/// `Waiting -> Ready` and enqueuing it onto the ready list (§4.3
/// "awaiters → READY"; the original's `return_value` drains the whole
/// list in a loop, not a single dequeue — see SPEC_FULL's Supplemented
/// Features).
fn wake_all_awaiters(kernel: &mut Kernel, hdl: CthreadHdl) {
    loop {
        let awaiters = unsafe { hdl.awaiters_ptr() };
        let Some(link) = ring::dequeue(awaiters) else {
            break;
        };
        let awaiter = unsafe { cthread::from_wait_link(link) };
        crate::debug_assert_transition!(CthreadState::Waiting, CthreadState::Ready);
        kernel.counters.waiting -= 1;
        kernel.counters.ready += 1;
        awaiter.promise_mut().state = CthreadState::Ready;
        ring::enqueue(kernel.ready_list, link);
    }
}

/// Reaps every zombie currently on the zombie list: detaches it from
/// the task list, transitions `Zombie -> Deleting`, and destroys its
/// frame. Returns the number reaped.
fn reap_zombies(kernel: &mut Kernel) -> usize {
    let mut reaped = 0;
    loop {
        let Some(link) = ring::dequeue(kernel.zombie_list) else {
            break;
        };
        let hdl = unsafe { cthread::from_wait_link(link) };
        unsafe { hdl.task_link_ptr() }.detach();
        crate::debug_assert_transition!(CthreadState::Zombie, CthreadState::Deleting);
        kernel.counters.zombie -= 1;
        kernel.counters.total -= 1;
        hdl.promise_mut().state = CthreadState::Deleting;
        unsafe { cthread::destroy(hdl, &mut kernel.alloc) };
        reaped += 1;
    }
    reaped
}

/// Drains every completion currently available from the attached
/// [`CompletionSource`], routing each back to its owning cthread (§4.4
/// step 4, §6.2). Returns the number of cthreads woken.
fn drain_completions(kernel: &mut Kernel) -> usize {
    let woken = std::cell::Cell::new(0usize);
    let Some(cs) = kernel.completion_source.as_mut() else {
        return 0;
    };
    let kernel_ptr: *mut Kernel = kernel;
    cs.drain_into(&mut |user_data, res| {
        let hdl = unsafe {
            let raw = user_data as *mut crate::cthread::CthreadInner;
            CthreadHdl(std::ptr::NonNull::new_unchecked(raw))
        };
        debug_assert_eq!(hdl.state(), CthreadState::IoWaiting);
        let kernel = unsafe { &mut *kernel_ptr };
        crate::debug_assert_transition!(CthreadState::IoWaiting, CthreadState::Ready);
        hdl.promise_mut().result = res;
        hdl.promise_mut().prepared_io = hdl.promise().prepared_io.saturating_sub(1);
        kernel.counters.io_waiting -= 1;
        kernel.counters.ready += 1;
        hdl.promise_mut().state = CthreadState::Ready;
        ring::enqueue(kernel.ready_list, unsafe { hdl.wait_link_ptr() });
        woken.set(woken.get() + 1);
    });
    woken.get()
}

/// The scheduler cthread's body (§4.4). Loops: dispatch one ready
/// cthread via direct handoff, or — if none are ready — reap zombies,
/// or drain I/O completions; terminates when nothing is ready and
/// nothing is in flight.
pub(crate) async fn scheduler_body() -> i32 {
    loop {
        let submit_failed = unsafe {
            let kernel = crate::kernel::kernel_mut();
            match kernel.completion_source.as_mut() {
                Some(cs) => cs.submit() < 0,
                None => false,
            }
        };
        assert!(!submit_failed, "I/O ring submit failed: fatal per error taxonomy (§7)");

        let ready_count = unsafe { crate::kernel::kernel_mut().counters.ready };
        if ready_count > 0 {
            let picked = unsafe {
                let kernel = crate::kernel::kernel_mut();
                let link = ring::dequeue(kernel.ready_list).expect("ready counter says non-empty");
                cthread::from_wait_link(link)
            };
            crate::ops::resume(picked).await;
            continue;
        }

        let reaped = unsafe { reap_zombies(crate::kernel::kernel_mut()) };
        if reaped > 0 {
            continue;
        }

        let io_waiting = unsafe { crate::kernel::kernel_mut().counters.io_waiting };
        if io_waiting > 0 {
            // Busy-poll: a completion may not be queued yet even though
            // something is in flight, so keep spinning through submit
            // (step 1) rather than terminating (§4.4 step 5 only breaks
            // when both ready and iowaiting are zero).
            unsafe { drain_completions(crate::kernel::kernel_mut()) };
            continue;
        }

        break;
    }
    0
}
