/// Capacity bookkeeping shared by both queue flavors.
///
/// The slot count is always a power of two so positions wrap with a mask
/// instead of a modulo.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Config {
    capacity: usize,
}

impl Config {
    /// Upper bound on the slot count (1M slots) to prevent excessive memory usage.
    const MAX_CAPACITY: usize = 1 << 20;

    /// Creates a configuration with the smallest power-of-two capacity that
    /// holds at least `min_capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `min_capacity` is 0 or exceeds `MAX_CAPACITY`.
    pub(crate) fn with_min_capacity(min_capacity: usize) -> Self {
        assert!(min_capacity > 0, "queue capacity must be at least 1");
        assert!(
            min_capacity <= Self::MAX_CAPACITY,
            "queue capacity must not exceed {} slots",
            Self::MAX_CAPACITY
        );

        Self {
            capacity: min_capacity.next_power_of_two(),
        }
    }

    /// Returns the capacity of the ring.
    #[inline]
    pub(crate) const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the mask for index wrapping.
    #[inline]
    pub(crate) const fn mask(&self) -> u64 {
        (self.capacity - 1) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_to_power_of_two() {
        assert_eq!(Config::with_min_capacity(1).capacity(), 1);
        assert_eq!(Config::with_min_capacity(2).capacity(), 2);
        assert_eq!(Config::with_min_capacity(5).capacity(), 8);
        assert_eq!(Config::with_min_capacity(8).capacity(), 8);
        assert_eq!(Config::with_min_capacity(1000).capacity(), 1024);
    }

    #[test]
    fn mask_matches_capacity() {
        let config = Config::with_min_capacity(100);
        assert_eq!(config.capacity(), 128);
        assert_eq!(config.mask(), 127);
    }

    #[test]
    #[should_panic(expected = "at least 1")]
    fn zero_capacity_panics() {
        let _ = Config::with_min_capacity(0);
    }
}
