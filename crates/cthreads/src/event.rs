//! Event primitive (§4.6, Component F): edge-triggered, stateless
//! wait/signal. A missed signal (no waiter present) is simply lost —
//! there is no level or counting semaphore semantics here.

use crate::cthread::{self, CthreadState};
use crate::kernel;
use crate::ring::{self, Link};
use std::future::Future;
use std::pin::Pin;
use std::ptr::NonNull;
use std::task::{Context, Poll};

/// An event's wait list, embedded wherever the caller places it (it has
/// no heap allocation of its own beyond the sentinel link).
pub struct Event {
    wait_list: NonNull<Link>,
}

impl Event {
    /// `init(event)`: empty wait list.
    pub fn new() -> Self {
        Event {
            wait_list: ring::new_sentinel(),
        }
    }

    /// `wait(event)`: current cthread -> `Waiting`, appended to the
    /// event's wait list, control returns to the scheduler. No direct
    /// handoff — matches §4.6's ordinary (non-direct-handoff) suspension.
    pub async fn wait(&self) {
        Wait {
            wait_list: self.wait_list,
            done: false,
        }
        .await
    }

    /// `signal(event) -> 0|1`: wakes the oldest waiter (FIFO), if any.
    /// Synchronous — the signaller keeps running (§5: "signalling is
    /// synchronous").
    pub fn signal(&self) -> u32 {
        unsafe {
            let kernel = kernel::kernel_mut();
            match ring::dequeue(self.wait_list) {
                None => 0,
                Some(link) => {
                    let waiter = cthread::from_wait_link(link);
                    crate::debug_assert_transition!(CthreadState::Waiting, CthreadState::Ready);
                    kernel.counters.waiting -= 1;
                    kernel.counters.ready += 1;
                    waiter.promise_mut().state = CthreadState::Ready;
                    ring::enqueue(kernel.ready_list, link);
                    1
                }
            }
        }
    }

    /// `signal_n(event, n) -> count_woken`: repeated `signal` up to `n`
    /// times, stopping early if the wait list empties.
    pub fn signal_n(&self, n: u32) -> u32 {
        let mut woken = 0;
        while woken < n && self.signal() == 1 {
            woken += 1;
        }
        woken
    }

    /// `signal_all(event) -> count_woken`: repeats until the wait list
    /// is empty.
    pub fn signal_all(&self) -> u32 {
        let mut woken = 0;
        while self.signal() == 1 {
            woken += 1;
        }
        woken
    }

    pub fn is_empty(&self) -> bool {
        ring::is_empty(self.wait_list)
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

struct Wait {
    wait_list: NonNull<Link>,
    done: bool,
}

impl Future for Wait {
    type Output = ();
    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.done {
            return Poll::Ready(());
        }
        self.done = true;
        unsafe {
            let kernel = kernel::kernel_mut();
            let hdl = kernel.current.expect("wait(event) called outside a cthread context");
            crate::debug_assert_transition!(CthreadState::Running, CthreadState::Waiting);
            hdl.promise_mut().state = CthreadState::Waiting;
            kernel.counters.waiting += 1;
            ring::enqueue(self.wait_list, hdl.wait_link_ptr());
        }
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_event_has_empty_wait_list() {
        let e = Event::new();
        assert!(e.is_empty());
        assert_eq!(e.signal(), 0);
    }
}
