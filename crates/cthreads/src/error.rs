//! Init-time and resource-exhaustion errors (§7).
//!
//! Everything that crosses a suspension boundary stays a bare `i32`
//! (the kernel's own `-errno` convention) — only failures that happen
//! before a cthread exists at all get a real `Error` type.

#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("arena size {0} is below the minimum of 4096 bytes")]
    ArenaTooSmall(usize),
    #[error("allocator initialization failed: {0}")]
    Alloc(#[from] crate::alloc::AllocError),
    #[error("I/O ring initialization failed: {0}")]
    RingInit(String),
}
