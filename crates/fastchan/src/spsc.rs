//! Single-producer single-consumer queue.
//!
//! [`channel`] splits a ring into a [`Producer`] and a [`Consumer`] handle.
//! Neither handle is `Clone`, so the one-thread-per-side discipline is
//! enforced by ownership rather than by convention.

use crate::config::Config;
use crate::error::Full;
use crate::invariants::{debug_assert_bounded, debug_assert_monotonic, debug_assert_not_past};
use crate::wait::{WaitStrategy, YieldWait};
use crossbeam_utils::CachePadded;
use std::cell::{Cell, UnsafeCell};
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// =============================================================================
// MEMORY ORDERING PROTOCOL
// =============================================================================
//
// Positions are unbounded u64 counters; the slot index is `position & mask`.
// With 64-bit counters wrap-around is unreachable in any realistic lifetime,
// which removes the ABA problem outright.
//
// Producer path:
//   1. Read the local `reserved` cursor (plain, producer-owned)
//   2. Full check against the cached `consumed`; refresh the cache with an
//      Acquire load only when the cached value says full
//   3. Write the value into `slots[reserved & mask]` (plain write, protected
//      by the protocol)
//   4. Store `reserved + 1` with Release (publishes the slot write)
//
// Consumer path mirrors it against `consumed` and the cached `reserved`.
//
// The consumer's Acquire load of `reserved` synchronizes with the producer's
// Release store, so the slot write happens-before the slot read. The
// producer's Acquire load of `consumed` synchronizes with the consumer's
// Release store, so the slot read happens-before any overwrite.
//
// The local cursors and cached counters live in the handles as `Cell`s: each
// has exactly one writer because the handles are `Send` but not `Sync` and
// not `Clone`.
// =============================================================================

/// State shared by the two handles.
struct Shared<T, P, G> {
    /// Next free position; written by the producer, read by the consumer.
    reserved: CachePadded<AtomicU64>,
    /// Next read position; written by the consumer, read by the producer.
    consumed: CachePadded<AtomicU64>,
    /// Wait state for a producer blocked on a full queue.
    put_wait: CachePadded<P>,
    /// Wait state for the consumer blocked on an empty queue.
    get_wait: CachePadded<G>,
    config: Config,
    /// Slot storage. `slots[i & mask]` is written by the producer inside its
    /// reservation window and read by the consumer once published.
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// SAFETY: the counters are atomics, the wait strategies are Sync, and every
// slot has a single writer followed by a single reader per lap, ordered by
// the Release/Acquire pairs described above.
unsafe impl<T: Send, P: Send + Sync, G: Send + Sync> Send for Shared<T, P, G> {}
unsafe impl<T: Send, P: Send + Sync, G: Send + Sync> Sync for Shared<T, P, G> {}

impl<T, P, G> Shared<T, P, G> {
    fn new(config: Config, put_wait: P, get_wait: G) -> Self {
        let mut slots = Vec::with_capacity(config.capacity());
        slots.resize_with(config.capacity(), || UnsafeCell::new(MaybeUninit::uninit()));

        Self {
            reserved: CachePadded::new(AtomicU64::new(0)),
            consumed: CachePadded::new(AtomicU64::new(0)),
            put_wait: CachePadded::new(put_wait),
            get_wait: CachePadded::new(get_wait),
            config,
            slots: slots.into_boxed_slice(),
        }
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.config.capacity()
    }

    /// Best-effort occupancy snapshot; stale under concurrent activity.
    #[inline]
    fn len(&self) -> usize {
        let reserved = self.reserved.load(Ordering::Acquire);
        let consumed = self.consumed.load(Ordering::Acquire);
        reserved.wrapping_sub(consumed) as usize
    }

    #[inline]
    fn is_empty(&self) -> bool {
        let reserved = self.reserved.load(Ordering::Acquire);
        let consumed = self.consumed.load(Ordering::Acquire);
        consumed >= reserved
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    /// Writes `value` into the slot for `position`.
    ///
    /// # Safety
    ///
    /// `position` must lie inside the producer's reservation window: the
    /// consumer has published consumption of `position - capacity`, and the
    /// slot is not read until `position` itself is published.
    #[inline]
    unsafe fn write_slot(&self, position: u64, value: T) {
        let idx = (position & self.config.mask()) as usize;
        (*self.slots[idx].get()).write(value);
    }

    /// Moves the value out of the slot for `position`.
    ///
    /// # Safety
    ///
    /// `position` must have been published by the producer and observed with
    /// an Acquire load, and must not have been read before.
    #[inline]
    unsafe fn read_slot(&self, position: u64) -> T {
        let idx = (position & self.config.mask()) as usize;
        (*self.slots[idx].get()).assume_init_read()
    }
}

impl<T, P, G> Drop for Shared<T, P, G> {
    fn drop(&mut self) {
        // Drop whatever is still sitting between the two counters.
        let consumed = self.consumed.load(Ordering::Relaxed);
        let reserved = self.reserved.load(Ordering::Relaxed);
        let mask = self.config.mask();

        let mut position = consumed;
        while position != reserved {
            let idx = (position & mask) as usize;
            // SAFETY: slots in [consumed, reserved) are initialized, and both
            // handles are gone once the shared state drops.
            unsafe { self.slots[idx].get_mut().assume_init_drop() };
            position = position.wrapping_add(1);
        }
    }
}

/// Creates a bounded SPSC queue with at least `min_capacity` slots (rounded
/// up to the next power of two), yielding on both sides when blocked.
///
/// # Panics
///
/// Panics if `min_capacity` is 0 or exceeds the maximum slot count.
pub fn channel<T>(min_capacity: usize) -> (Producer<T>, Consumer<T>) {
    channel_with(min_capacity, YieldWait, YieldWait)
}

/// Creates a bounded SPSC queue with explicit wait strategies.
///
/// `put_wait` is applied when the producer finds the queue full, `get_wait`
/// when the consumer finds it empty. The strategies are independent; mixing
/// them is normal (e.g. a spinning consumer fed by a sleeping producer).
///
/// # Panics
///
/// Panics if `min_capacity` is 0 or exceeds the maximum slot count.
pub fn channel_with<T, P, G>(
    min_capacity: usize,
    put_wait: P,
    get_wait: G,
) -> (Producer<T, P, G>, Consumer<T, P, G>)
where
    P: WaitStrategy,
    G: WaitStrategy,
{
    let shared = Arc::new(Shared::new(
        Config::with_min_capacity(min_capacity),
        put_wait,
        get_wait,
    ));

    (
        Producer {
            shared: Arc::clone(&shared),
            reserved: Cell::new(0),
            cached_consumed: Cell::new(0),
        },
        Consumer {
            shared,
            consumed: Cell::new(0),
            cached_reserved: Cell::new(0),
        },
    )
}

/// The write half of an SPSC queue. Owned by exactly one thread.
pub struct Producer<T, P = YieldWait, G = YieldWait> {
    shared: Arc<Shared<T, P, G>>,
    /// Producer-owned write cursor; mirrors the shared `reserved` counter.
    reserved: Cell<u64>,
    /// Cached view of the consumer's position, refreshed only when the cached
    /// value says the queue is full.
    cached_consumed: Cell<u64>,
}

impl<T, P, G> Producer<T, P, G>
where
    P: WaitStrategy,
    G: WaitStrategy,
{
    /// Checks for a free slot at `reserved`, refreshing the cached consumer
    /// position on demand.
    #[inline]
    fn has_space(&self, reserved: u64) -> bool {
        let capacity = self.shared.capacity() as u64;
        if reserved.wrapping_sub(self.cached_consumed.get()) < capacity {
            return true;
        }

        let consumed = self.shared.consumed.load(Ordering::Acquire);
        self.cached_consumed.set(consumed);
        reserved.wrapping_sub(consumed) < capacity
    }

    /// Attempts to enqueue without waiting.
    ///
    /// Returns the value back inside [`Full`] when the queue has no free
    /// slot; the queue is left untouched in that case.
    pub fn try_put(&self, value: T) -> Result<(), Full<T>> {
        let reserved = self.reserved.get();
        if !self.has_space(reserved) {
            return Err(Full(value));
        }

        // SAFETY: has_space observed (with Acquire) that the consumer is past
        // position `reserved - capacity`, so the slot is free and we are its
        // only writer until it is published.
        unsafe { self.shared.write_slot(reserved, value) };

        let next = reserved.wrapping_add(1);
        debug_assert_bounded!(
            next.wrapping_sub(self.cached_consumed.get()) as usize,
            self.shared.capacity()
        );
        debug_assert_monotonic!("reserved", reserved, next);

        self.shared.reserved.store(next, Ordering::Release);
        self.reserved.set(next);
        self.shared.get_wait.notify();
        Ok(())
    }

    /// Enqueues `value`, waiting with the put-side strategy while the queue
    /// is full. Returns once the value is visible to the consumer.
    pub fn put(&self, mut value: T) {
        loop {
            match self.try_put(value) {
                Ok(()) => return,
                Err(full) => {
                    value = full.into_inner();
                    let shared = &*self.shared;
                    let reserved = self.reserved.get();
                    let capacity = shared.capacity() as u64;
                    shared.put_wait.wait(|| {
                        reserved.wrapping_sub(shared.consumed.load(Ordering::Acquire)) < capacity
                    });
                }
            }
        }
    }

    /// Returns the queue capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Best-effort occupancy snapshot.
    #[inline]
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Best-effort emptiness snapshot.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shared.is_empty()
    }

    /// Best-effort fullness snapshot.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.shared.is_full()
    }
}

/// The read half of an SPSC queue. Owned by exactly one thread.
pub struct Consumer<T, P = YieldWait, G = YieldWait> {
    shared: Arc<Shared<T, P, G>>,
    /// Consumer-owned read cursor; mirrors the shared `consumed` counter.
    consumed: Cell<u64>,
    /// Cached view of the producer's position, refreshed only when the cached
    /// value says the queue is empty.
    cached_reserved: Cell<u64>,
}

impl<T, P, G> Consumer<T, P, G>
where
    P: WaitStrategy,
    G: WaitStrategy,
{
    /// Checks for a published value at `consumed`, refreshing the cached
    /// producer position on demand.
    #[inline]
    fn has_next(&self, consumed: u64) -> bool {
        if self.cached_reserved.get() != consumed {
            return true;
        }

        let reserved = self.shared.reserved.load(Ordering::Acquire);
        self.cached_reserved.set(reserved);
        reserved != consumed
    }

    /// Attempts to dequeue without waiting. Returns `None` when the queue is
    /// empty, leaving it untouched.
    pub fn try_get(&self) -> Option<T> {
        let consumed = self.consumed.get();
        if !self.has_next(consumed) {
            return None;
        }

        let next = consumed.wrapping_add(1);
        debug_assert_not_past!(next, self.cached_reserved.get());

        // SAFETY: has_next observed (with Acquire) a published position past
        // `consumed`, which synchronizes with the producer's Release store,
        // so the slot holds an initialized value nobody else will touch until
        // we publish consumption.
        let value = unsafe { self.shared.read_slot(consumed) };

        self.shared.consumed.store(next, Ordering::Release);
        self.consumed.set(next);
        self.shared.put_wait.notify();
        Some(value)
    }

    /// Dequeues the next value, waiting with the get-side strategy while the
    /// queue is empty.
    pub fn get(&self) -> T {
        loop {
            if let Some(value) = self.try_get() {
                return value;
            }
            let shared = &*self.shared;
            let consumed = self.consumed.get();
            shared
                .get_wait
                .wait(|| shared.reserved.load(Ordering::Acquire) != consumed);
        }
    }

    /// Returns the queue to the empty state, dropping any values still in it.
    ///
    /// Taking `&mut` on both handles of the queue is the borrow-checked form
    /// of the precondition that no `put` or `get` runs concurrently.
    ///
    /// # Panics
    ///
    /// Panics if `producer` belongs to a different queue.
    pub fn reset(&mut self, producer: &mut Producer<T, P, G>) {
        assert!(
            Arc::ptr_eq(&self.shared, &producer.shared),
            "reset requires the producer handle of the same queue"
        );

        while self.try_get().is_some() {}

        self.shared.reserved.store(0, Ordering::Release);
        self.shared.consumed.store(0, Ordering::Release);
        self.consumed.set(0);
        self.cached_reserved.set(0);
        producer.reserved.set(0);
        producer.cached_consumed.set(0);
    }

    /// Returns the queue capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Best-effort occupancy snapshot.
    #[inline]
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Best-effort emptiness snapshot.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shared.is_empty()
    }

    /// Best-effort fullness snapshot.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.shared.is_full()
    }
}
