//! Kernel configuration (§6.3): one init record, no env vars, no files.

/// Minimum viable arena size (§4.2 Contract: "size ≥ 4096").
pub const MIN_ARENA_SIZE: usize = 4096;

#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Arena length in bytes; must be `>= MIN_ARENA_SIZE`.
    pub memory_size: usize,
    /// Requested I/O submission queue depth.
    pub ring_entries: u32,
}

impl KernelConfig {
    pub fn new(memory_size: usize, ring_entries: u32) -> Self {
        KernelConfig {
            memory_size,
            ring_entries,
        }
    }
}

impl Default for KernelConfig {
    /// A modest default arena and a ring deep enough for light
    /// concurrent I/O without tuning.
    fn default() -> Self {
        KernelConfig {
            memory_size: 1 << 20,
            ring_entries: 256,
        }
    }
}
