//! The io_uring submission/completion adapter (§4.5, §6, Component E).
//!
//! This crate depends on `cthreads` for the promise/suspension
//! machinery ([`cthreads::ops::IoAwait`], [`cthreads::ops::prepare_io`])
//! and on the `io-uring` crate for the kernel ring itself. `cthreads`
//! has no dependency back on this crate — the scheduler only sees the
//! [`cthreads::CompletionSource`] trait object this crate's [`init`]
//! hands to [`cthreads::run_main`].

pub mod ops;
mod reactor;

pub use reactor::{fini, init};

/// Opcode wrappers flattened to one path, matching §6.1's flat list
/// (the module split in [`ops`] mirrors the spec's table grouping, but
/// callers shouldn't need to remember which group an opcode lives in).
pub mod prelude {
    pub use crate::ops::buffer::*;
    pub use crate::ops::control::*;
    pub use crate::ops::file::*;
    pub use crate::ops::path::*;
    pub use crate::ops::poll::*;
    pub use crate::ops::socket::*;
    pub use crate::ops::xattr::*;
}
