//! Per-bin allocator counters (§4.2 Statistics).
//!
//! Plain counters, not a tracing span: the teacher crate's `Metrics`
//! plays the same "ambient observability" role here that a logging
//! framework would in a hosted service — cheap, always-on, and read by
//! callers or tests rather than emitted anywhere.

use super::bins::BIN_COUNT;

/// Index used for the large-block tree's aggregate counters.
pub const TREE_CLASS: usize = BIN_COUNT;
/// Index used for the wild block's aggregate counters.
pub const WILD_CLASS: usize = BIN_COUNT + 1;
const CLASSES: usize = BIN_COUNT + 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct ClassCounters {
    pub allocations: u64,
    pub frees: u64,
    pub splits: u64,
    pub merges: u64,
    pub exact_fit_reuses: u64,
    pub pooled_insertions: u64,
    pub failures: u64,
}

#[derive(Debug)]
pub struct BinStats {
    per_class: Box<[ClassCounters; CLASSES]>,
    pub failed: u64,
}

impl BinStats {
    pub fn new() -> Self {
        BinStats {
            per_class: Box::new([ClassCounters::default(); CLASSES]),
            failed: 0,
        }
    }

    pub fn class(&self, idx: usize) -> &ClassCounters {
        &self.per_class[idx]
    }

    pub fn record_insert(&mut self, class: usize) {
        self.per_class[class].pooled_insertions += 1;
    }

    pub fn record_take(&mut self, class: usize) {
        self.per_class[class].allocations += 1;
    }

    pub fn record_exact_fit(&mut self, class: usize) {
        self.per_class[class].exact_fit_reuses += 1;
    }

    pub fn record_split(&mut self, class: usize) {
        self.per_class[class].splits += 1;
    }

    pub fn record_merge(&mut self, class: usize) {
        self.per_class[class].merges += 1;
    }

    pub fn record_free(&mut self, class: usize) {
        self.per_class[class].frees += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
        self.per_class[WILD_CLASS].failures += 1;
    }
}

impl Default for BinStats {
    fn default() -> Self {
        Self::new()
    }
}
