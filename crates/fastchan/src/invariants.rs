//! Debug assertion macros for the counter invariants.
//!
//! Active only in debug builds; release builds compile them away entirely,
//! keeping the fast path branch-free.
//!
//! Used by both queue flavors.

/// Assert that occupancy never exceeds capacity.
macro_rules! debug_assert_bounded {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "occupancy {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

/// Assert that a counter only ever advances (outside of `reset`).
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "{} decreased from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

/// Assert that the consumer never advances past the published position.
macro_rules! debug_assert_not_past {
    ($new_consumed:expr, $published:expr) => {
        debug_assert!(
            $new_consumed <= $published,
            "consumed {} advanced past published index {}",
            $new_consumed,
            $published
        )
    };
}

pub(crate) use debug_assert_bounded;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_not_past;
