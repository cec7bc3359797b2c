//! Cthread promise and frame (§3.4, Component C).
//!
//! A cthread is a boxed `async fn` body plus a [`Promise`] control block,
//! both packed into one arena-allocated [`CthreadInner`]. The promise's
//! three ring links are embedded by value (not heap-allocated
//! separately): `task_link` threads the global task-list registry,
//! `wait_link` is the node's membership in exactly one of {ready list,
//! zombie list, an event's wait list, another cthread's awaiter list},
//! and `awaiters` is the sentinel head of cthreads parked in `join` on
//! this one.

pub mod state;

pub use state::CthreadState;

use crate::alloc::{AllocError, Allocator};
use crate::ring::Link;
use std::future::Future;
use std::pin::Pin;
use std::ptr::NonNull;

/// The per-cthread control block (§3.4).
#[repr(C)]
pub struct Promise {
    pub state: CthreadState,
    /// Return value, and the last I/O operation's `cqe.res` while
    /// `IoWaiting`.
    pub result: i32,
    pub prepared_io: u32,
    pub task_link: Link,
    pub wait_link: Link,
    pub awaiters: Link,
}

impl Promise {
    fn new() -> Self {
        Promise {
            state: CthreadState::Initial,
            result: 0,
            prepared_io: 0,
            task_link: Link::new(),
            wait_link: Link::new(),
            awaiters: Link::new(),
        }
    }
}

/// A boxed cthread body plus its promise, sized identically regardless
/// of what the body future captures (`Box<dyn Future>` is a fat pointer)
/// — this is what lets every cthread, including the boot cthread, be
/// carved from a fixed-size slot.
pub struct CthreadInner {
    pub promise: Promise,
    body: Pin<Box<dyn Future<Output = i32>>>,
}

/// A handle to a live cthread frame. Cheap to copy; validity is the
/// caller's responsibility (the frame must not have been destroyed).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CthreadHdl(pub(crate) NonNull<CthreadInner>);

impl CthreadHdl {
    pub fn promise(self) -> &'static Promise {
        unsafe { &self.0.as_ref().promise }
    }

    pub(crate) fn promise_mut(mut self) -> &'static mut Promise {
        unsafe { &mut self.0.as_mut().promise }
    }

    pub fn state(self) -> CthreadState {
        self.promise().state
    }

    pub(crate) fn inner_mut(mut self) -> &'static mut CthreadInner {
        unsafe { self.0.as_mut() }
    }

    pub(crate) unsafe fn task_link_ptr(self) -> NonNull<Link> {
        NonNull::new_unchecked(std::ptr::addr_of_mut!((*self.0.as_ptr()).promise.task_link))
    }

    pub(crate) unsafe fn wait_link_ptr(self) -> NonNull<Link> {
        NonNull::new_unchecked(std::ptr::addr_of_mut!((*self.0.as_ptr()).promise.wait_link))
    }

    pub(crate) unsafe fn awaiters_ptr(self) -> NonNull<Link> {
        NonNull::new_unchecked(std::ptr::addr_of_mut!((*self.0.as_ptr()).promise.awaiters))
    }

    /// Whether this cthread has run to completion (`Zombie`) — join's
    /// no-op/immediate-return fast path and `is_done` both check this.
    pub fn is_done(self) -> bool {
        self.state() == CthreadState::Zombie
    }
}

/// Allocates a `CthreadInner` from `alloc` and transitions it `Initial`
/// -> `Ready`, registering it in `task_list`/`ready_list` in the same
/// step — the Rust stand-in for the original's "initial suspend always
/// happens before the body runs" guarantee, made explicit here since a
/// boxed `Future` has no hook that fires before its first `poll`.
pub fn spawn(
    alloc: &mut Allocator,
    task_list: NonNull<Link>,
    ready_list: NonNull<Link>,
    body: impl Future<Output = i32> + 'static,
) -> Result<CthreadHdl, AllocError> {
    let size = std::mem::size_of::<CthreadInner>();
    let ptr = alloc.try_malloc(size)?;
    unsafe { Ok(place_cthread(ptr.cast(), Box::pin(body), task_list, ready_list)) }
}

/// Writes a fresh `CthreadInner` at `ptr` (which must point at `size >=
/// size_of::<CthreadInner>()` live, writable bytes) and performs the
/// `Initial -> Ready` registration.
///
/// # Safety
/// `ptr` must be valid for writes of `size_of::<CthreadInner>()` bytes
/// and outlive the cthread's lifetime (never moved, never reused while
/// the cthread is alive).
pub(crate) unsafe fn place_cthread(
    ptr: NonNull<CthreadInner>,
    body: Pin<Box<dyn Future<Output = i32>>>,
    task_list: NonNull<Link>,
    ready_list: NonNull<Link>,
) -> CthreadHdl {
    ptr.as_ptr().write(CthreadInner {
        promise: Promise::new(),
        body,
    });
    let hdl = CthreadHdl(ptr);
    hdl.task_link_ptr().init();
    hdl.wait_link_ptr().init();
    hdl.awaiters_ptr().init();

    crate::debug_assert_transition!(CthreadState::Initial, CthreadState::Ready);
    hdl.promise_mut().state = CthreadState::Ready;
    crate::ring::enqueue(task_list, hdl.task_link_ptr());
    crate::ring::enqueue(ready_list, hdl.wait_link_ptr());
    hdl
}

/// Polls the cthread's body future once, in place. Returns `Some(value)`
/// on completion.
pub(crate) fn poll_body(hdl: CthreadHdl, cx: &mut std::task::Context<'_>) -> std::task::Poll<i32> {
    hdl.inner_mut().body.as_mut().poll(cx)
}

/// Recovers the owning handle from a pointer to its `wait_link` field —
/// used by the scheduler and event primitive, which only ever see a
/// `Link` popped off a ring, never the handle directly.
///
/// # Safety
/// `link` must be the `wait_link` field of a live `CthreadInner`.
pub(crate) unsafe fn from_wait_link(link: NonNull<Link>) -> CthreadHdl {
    let offset = std::mem::offset_of!(CthreadInner, promise) + std::mem::offset_of!(Promise, wait_link);
    CthreadHdl(NonNull::new_unchecked((link.as_ptr() as *mut u8).sub(offset).cast()))
}

/// Reclaims a zombie cthread's frame back to the allocator.
///
/// # Safety
/// `hdl` must be `Deleting` and detached from every ring it was a
/// member of (task list, zombie list).
pub(crate) unsafe fn destroy(hdl: CthreadHdl, alloc: &mut Allocator) {
    debug_assert_eq!(hdl.state(), CthreadState::Deleting);
    std::ptr::drop_in_place(hdl.0.as_ptr());
    alloc.free(hdl.0.cast());
}
