//! Error types for queue operations.

use std::fmt;
use thiserror::Error;

/// Returned by `try_put` when the queue has no free slot.
///
/// Carries the rejected value back to the caller so a retry does not need a
/// clone. The blocking `put` never surfaces this; it keeps waiting instead.
#[derive(Error, Clone, Copy, PartialEq, Eq)]
#[error("queue is full")]
pub struct Full<T>(pub T);

impl<T> Full<T> {
    /// Consumes the error, returning the rejected value.
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

// Manual impl so `Full<T>` is debuggable without requiring `T: Debug`.
impl<T> fmt::Debug for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Full(..)")
    }
}
