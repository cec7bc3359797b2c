//! One asynchronous operation per kernel opcode (§6.1, Component E).
//!
//! Every function here follows the same four steps (§4.5): acquire a
//! submission slot (via [`crate::reactor::push`], which inline-submits
//! on backpressure), stamp `user_data` with the current cthread's
//! promise address (via [`cthreads::ops::prepare_io`]), hand the SQE to
//! the ring, and suspend on [`cthreads::ops::IoAwait`] until the
//! matching CQE is drained. `submit` below is the shared last three
//! steps; each opcode wrapper only builds the `squeue::Entry`, exactly
//! as §1 describes them: "one-line adapter[s] over the prep function."
//!
//! Multishot variants (`read_multishot`, `multishot_accept`,
//! `recv_multishot`, `poll_multishot`, `recv_msg_multishot`) are prepared
//! the same way but share the open question of §4.5 / §9.1: the
//! completion pump wakes the owning cthread on the first CQE only.

pub mod buffer;
pub mod control;
pub mod file;
pub mod path;
pub mod poll;
pub mod socket;
pub mod xattr;

use io_uring::{squeue, types};

/// Submits `entry` (already built, not yet stamped) and suspends until
/// its completion is drained, returning `cqe.res`.
pub(crate) async fn submit(entry: squeue::Entry) -> i32 {
    let user_data = cthreads::ops::prepare_io();
    crate::reactor::push(entry.user_data(user_data));
    unsafe { cthreads::ops::IoAwait::new() }.await
}

/// Convenience constructor matching the raw fd newtype every opcode
/// builder in `io-uring` expects.
pub(crate) fn fd(raw: i32) -> types::Fd {
    types::Fd(raw)
}
