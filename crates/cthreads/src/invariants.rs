//! Debug-only invariant checks (§4.3: "bracketed by invariant checks in
//! debug builds"). Compiled out entirely in release builds; never used
//! to recover from a violation, only to abort loudly during development.

/// Asserts `from.can_transition_to(to)` before applying a cthread state
/// transition. A violation is a programmer error (§7) — abort, don't
/// propagate.
#[macro_export]
macro_rules! debug_assert_transition {
    ($from:expr, $to:expr) => {
        debug_assert!(
            $from.can_transition_to($to),
            "illegal cthread transition: {} -> {}",
            $from,
            $to
        );
    };
}

/// Asserts the kernel counter identity of §3.5: `total == running(0|1) +
/// ready + waiting + iowaiting + zombie`.
#[macro_export]
macro_rules! debug_assert_counters_balanced {
    ($counters:expr) => {
        debug_assert_eq!(
            $counters.total,
            $counters.running + $counters.ready + $counters.waiting + $counters.io_waiting + $counters.zombie,
            "kernel counter invariant violated: {:?}",
            $counters
        );
    };
}
