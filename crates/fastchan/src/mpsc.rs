//! Multi-producer single-consumer queue.
//!
//! [`channel`] splits a ring into a cloneable [`Producer`] and a unique
//! [`Consumer`]. Producers claim positions in parallel with a CAS and then
//! publish them strictly in claim order, so the consumer always observes a
//! gap-free prefix.

use crate::config::Config;
use crate::error::Full;
use crate::invariants::{debug_assert_bounded, debug_assert_monotonic, debug_assert_not_past};
use crate::wait::{WaitStrategy, YieldWait};
use crossbeam_utils::CachePadded;
use std::cell::{Cell, UnsafeCell};
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

// =============================================================================
// COMMIT-ORDERING PROTOCOL
// =============================================================================
//
// Three counters drive the ring:
//
//   consumed <= committed <= reserved
//
// `reserved` is the contended next-free position. A producer claims exactly
// one position by CAS, bounded by the full check against `consumed`, so
// claims never run more than `capacity` ahead of the consumer.
//
// `committed` is the published position the consumer trusts. After writing
// its slot, a producer waits until `committed` reaches its own claim and only
// then stores `claim + 1` with Release. Claims may complete out of order, but
// publications form a single in-order stream: if position 99 is claimed and
// unwritten, the consumer waiting at 98 cannot skip ahead.
//
// Visibility chains through `committed`: each producer's Release store is
// preceded by an Acquire load that observed the previous producer's store, so
// the consumer's single Acquire load of `committed` establishes
// happens-before edges covering every slot write below it.
//
// The commit phase is obstruction-free, not wait-free: a producer parked at
// step "committed == claim" advances only after the producer holding
// `claim - 1` publishes.
// =============================================================================

/// State shared by all producer handles and the consumer.
struct Shared<T, P, G> {
    /// Contended next-free position; advanced by CAS from any producer.
    reserved: CachePadded<AtomicU64>,
    /// Published position: every slot strictly below it holds its final value.
    committed: CachePadded<AtomicU64>,
    /// Next read position; written by the consumer.
    consumed: CachePadded<AtomicU64>,
    /// Wait state for producers blocked on a full queue or on commit order.
    put_wait: CachePadded<P>,
    /// Wait state for the consumer blocked on an empty queue.
    get_wait: CachePadded<G>,
    /// Live producer handles; guards `reset`.
    producers: AtomicUsize,
    config: Config,
    /// Slot storage. `slots[i & mask]` is written by the producer that
    /// claimed `i` and read by the consumer once `committed` passes `i`.
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// SAFETY: the counters are atomics, the wait strategies are Sync, and each
// slot is written by exactly one producer inside its claim window, then read
// by the consumer under the `committed` Release/Acquire pair.
unsafe impl<T: Send, P: Send + Sync, G: Send + Sync> Send for Shared<T, P, G> {}
unsafe impl<T: Send, P: Send + Sync, G: Send + Sync> Sync for Shared<T, P, G> {}

impl<T, P, G> Shared<T, P, G> {
    fn new(config: Config, put_wait: P, get_wait: G) -> Self {
        let mut slots = Vec::with_capacity(config.capacity());
        slots.resize_with(config.capacity(), || UnsafeCell::new(MaybeUninit::uninit()));

        Self {
            reserved: CachePadded::new(AtomicU64::new(0)),
            committed: CachePadded::new(AtomicU64::new(0)),
            consumed: CachePadded::new(AtomicU64::new(0)),
            put_wait: CachePadded::new(put_wait),
            get_wait: CachePadded::new(get_wait),
            producers: AtomicUsize::new(1),
            config,
            slots: slots.into_boxed_slice(),
        }
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.config.capacity()
    }

    /// Best-effort occupancy snapshot over the published range.
    #[inline]
    fn len(&self) -> usize {
        let committed = self.committed.load(Ordering::Acquire);
        let consumed = self.consumed.load(Ordering::Acquire);
        committed.wrapping_sub(consumed) as usize
    }

    #[inline]
    fn is_empty(&self) -> bool {
        let committed = self.committed.load(Ordering::Acquire);
        let consumed = self.consumed.load(Ordering::Acquire);
        consumed >= committed
    }

    /// Reports whether every writer slot is claimed, committed or not.
    #[inline]
    fn is_full(&self) -> bool {
        let reserved = self.reserved.load(Ordering::Acquire);
        let consumed = self.consumed.load(Ordering::Acquire);
        reserved.wrapping_sub(consumed) as usize >= self.capacity()
    }

    /// Writes `value` into the slot for `position`.
    ///
    /// # Safety
    ///
    /// The caller must have claimed `position` via the CAS on `reserved`
    /// after a full check that observed `consumed > position - capacity`.
    #[inline]
    unsafe fn write_slot(&self, position: u64, value: T) {
        let idx = (position & self.config.mask()) as usize;
        (*self.slots[idx].get()).write(value);
    }

    /// Moves the value out of the slot for `position`.
    ///
    /// # Safety
    ///
    /// `position` must be below a `committed` value observed with Acquire
    /// and must not have been read before.
    #[inline]
    unsafe fn read_slot(&self, position: u64) -> T {
        let idx = (position & self.config.mask()) as usize;
        (*self.slots[idx].get()).assume_init_read()
    }
}

impl<T, P, G> Drop for Shared<T, P, G> {
    fn drop(&mut self) {
        // Drop the published-but-unconsumed range. A claim abandoned before
        // publication (a producer that panicked mid-put) stays untouched.
        let consumed = self.consumed.load(Ordering::Relaxed);
        let committed = self.committed.load(Ordering::Relaxed);
        let mask = self.config.mask();

        let mut position = consumed;
        while position != committed {
            let idx = (position & mask) as usize;
            // SAFETY: slots in [consumed, committed) are initialized, and all
            // handles are gone once the shared state drops.
            unsafe { self.slots[idx].get_mut().assume_init_drop() };
            position = position.wrapping_add(1);
        }
    }
}

/// Creates a bounded MPSC queue with at least `min_capacity` slots (rounded
/// up to the next power of two), yielding on both sides when blocked.
///
/// # Panics
///
/// Panics if `min_capacity` is 0 or exceeds the maximum slot count.
pub fn channel<T>(min_capacity: usize) -> (Producer<T>, Consumer<T>) {
    channel_with(min_capacity, YieldWait, YieldWait)
}

/// Creates a bounded MPSC queue with explicit wait strategies.
///
/// `put_wait` is applied when a producer finds the queue full and while it
/// waits its turn to publish; `get_wait` when the consumer finds the queue
/// empty.
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
        },
        Consumer {
            shared,
            consumed: Cell::new(0),
        },
    )
}

/// A write handle for an MPSC queue. Clone one per producer thread.
pub struct Producer<T, P = YieldWait, G = YieldWait> {
    shared: Arc<Shared<T, P, G>>,
}

impl<T, P, G> Clone for Producer<T, P, G> {
    fn clone(&self) -> Self {
        self.shared.producers.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, P, G> Drop for Producer<T, P, G> {
    fn drop(&mut self) {
        self.shared.producers.fetch_sub(1, Ordering::Release);
    }
}

impl<T, P, G> Producer<T, P, G>
where
    P: WaitStrategy,
    G: WaitStrategy,
{
    /// Attempts to enqueue without waiting on a full queue.
    ///
    /// Returns the value back inside [`Full`] when every writer slot is
    /// taken; the queue is left untouched in that case. Once a position is
    /// claimed the value is always published, which may briefly wait for
    /// producers holding earlier claims.
    pub fn try_put(&self, value: T) -> Result<(), Full<T>> {
        let shared = &*self.shared;
        let capacity = shared.capacity() as u64;

        let mut reserved = shared.reserved.load(Ordering::Acquire);
        loop {
            let consumed = shared.consumed.load(Ordering::Acquire);
            if reserved.wrapping_sub(consumed) >= capacity {
                return Err(Full(value));
            }

            match shared.reserved.compare_exchange_weak(
                reserved,
                reserved.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => reserved = observed,
            }
        }

        self.publish(reserved, value);
        Ok(())
    }

    /// Enqueues `value`, waiting with the put-side strategy while the queue
    /// is full. Returns once the value is visible to the consumer.
    pub fn put(&self, mut value: T) {
        let shared = &*self.shared;
        let capacity = shared.capacity() as u64;

        loop {
            match self.try_put(value) {
                Ok(()) => return,
                Err(full) => {
                    value = full.into_inner();
                    shared.put_wait.wait(|| {
                        let reserved = shared.reserved.load(Ordering::Acquire);
                        let consumed = shared.consumed.load(Ordering::Acquire);
                        reserved.wrapping_sub(consumed) < capacity
                    });
                }
            }
        }
    }

    /// Writes the claimed slot and publishes it in claim order.
    fn publish(&self, claim: u64, value: T) {
        let shared = &*self.shared;

        // SAFETY: the CAS in try_put claimed `claim` exclusively, and the
        // full check observed the consumer past `claim - capacity`.
        unsafe { shared.write_slot(claim, value) };

        // Publish strictly in claim order: wait until every earlier claim
        // has landed. The Acquire load chains the previous producer's slot
        // writes into our Release store below.
        while shared.committed.load(Ordering::Acquire) != claim {
            shared
                .put_wait
                .wait(|| shared.committed.load(Ordering::Acquire) == claim);
        }

        let next = claim.wrapping_add(1);
        debug_assert_monotonic!("committed", claim, next);
        debug_assert_bounded!(
            next.wrapping_sub(shared.consumed.load(Ordering::Relaxed)) as usize,
            shared.capacity()
        );

        shared.committed.store(next, Ordering::Release);

        // Wake the consumer, and any producer parked on full-queue space or
        // on its own commit turn.
        shared.get_wait.notify();
        shared.put_wait.notify();
    }

    /// Returns the queue capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Best-effort snapshot of the published occupancy.
    #[inline]
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Best-effort emptiness snapshot.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shared.is_empty()
    }

    /// Best-effort fullness snapshot: whether every writer slot is claimed,
    /// committed or not.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.shared.is_full()
    }
}

/// The unique read half of an MPSC queue. Owned by exactly one thread.
pub struct Consumer<T, P = YieldWait, G = YieldWait> {
    shared: Arc<Shared<T, P, G>>,
    /// Consumer-owned read cursor; mirrors the shared `consumed` counter.
    consumed: Cell<u64>,
}

impl<T, P, G> Consumer<T, P, G>
where
    P: WaitStrategy,
    G: WaitStrategy,
{
    /// Attempts to dequeue without waiting. Returns `None` when no published
    /// value is available, leaving the queue untouched.
    pub fn try_get(&self) -> Option<T> {
        let shared = &*self.shared;
        let consumed = self.consumed.get();

        // Availability is governed by `committed`, never `reserved`: a
        // claimed-but-unwritten slot must not be visible here.
        let committed = shared.committed.load(Ordering::Acquire);
        if committed == consumed {
            return None;
        }

        let next = consumed.wrapping_add(1);
        debug_assert_not_past!(next, committed);

        // SAFETY: consumed < committed observed with Acquire, which chains
        // back through every producer's Release store, so the slot holds its
        // final value and nobody touches it until we publish consumption.
        let value = unsafe { shared.read_slot(consumed) };

        shared.consumed.store(next, Ordering::Release);
        self.consumed.set(next);
        shared.put_wait.notify();
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
                .wait(|| shared.committed.load(Ordering::Acquire) != consumed);
        }
    }

    /// Returns the queue to the empty state, dropping any published values
    /// still in it. A claim abandoned by a producer that panicked mid-put is
    /// discarded without being dropped.
    ///
    /// Taking `&mut` on both handles while requiring `producer` to be the
    /// last live clone is the borrow-checked form of the precondition that
    /// no `put` or `get` runs concurrently.
    ///
    /// # Panics
    ///
    /// Panics if `producer` belongs to a different queue or if other
    /// producer clones are still alive.
    pub fn reset(&mut self, producer: &mut Producer<T, P, G>) {
        assert!(
            Arc::ptr_eq(&self.shared, &producer.shared),
            "reset requires a producer handle of the same queue"
        );
        assert!(
            self.shared.producers.load(Ordering::Acquire) == 1,
            "reset requires every other producer handle to have been dropped"
        );

        while self.try_get().is_some() {}

        let shared = &*self.shared;
        shared.reserved.store(0, Ordering::Release);
        shared.committed.store(0, Ordering::Release);
        shared.consumed.store(0, Ordering::Release);
        self.consumed.set(0);
    }

    /// Returns the queue capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Best-effort snapshot of the published occupancy.
    #[inline]
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Best-effort emptiness snapshot.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shared.is_empty()
    }

    /// Best-effort fullness snapshot: whether every writer slot is claimed,
    /// committed or not.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.shared.is_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wait::SpinWait;

    #[test]
    fn put_get_round_trip() {
        let (tx, rx) = channel::<u64>(8);

        tx.put(1);
        tx.put(2);
        tx.put(3);
        assert_eq!(rx.len(), 3);
        assert_eq!(rx.get(), 1);
        assert_eq!(rx.get(), 2);
        assert_eq!(rx.get(), 3);
        assert!(rx.is_empty());
    }

    #[test]
    fn try_put_full_hands_value_back() {
        let (tx, rx) = channel_with::<u64, _, _>(4, SpinWait, SpinWait);

        for i in 0..4 {
            tx.try_put(i).unwrap();
        }
        assert!(tx.is_full());

        let rejected = tx.try_put(99).unwrap_err();
        assert_eq!(rejected.into_inner(), 99);
        assert_eq!(tx.len(), 4);

        assert_eq!(rx.try_get(), Some(0));
        tx.try_put(99).unwrap();
    }

    #[test]
    fn cloned_producers_share_the_ring() {
        let (tx_a, rx) = channel::<u64>(8);
        let tx_b = tx_a.clone();

        tx_a.put(10);
        tx_b.put(20);
        assert_eq!(rx.get(), 10);
        assert_eq!(rx.get(), 20);
    }

    #[test]
    fn wraps_around_many_laps() {
        let (tx, rx) = channel::<u64>(4);

        for lap in 0..10 {
            for i in 0..4 {
                tx.put(lap * 10 + i);
            }
            for i in 0..4 {
                assert_eq!(rx.get(), lap * 10 + i);
            }
        }
    }

    #[test]
    fn reset_clears_the_queue() {
        let (mut tx, mut rx) = channel::<u64>(8);

        for i in 0..8 {
            tx.put(i);
        }
        assert!(rx.is_full());

        rx.reset(&mut tx);
        assert!(rx.is_empty());
        assert!(!rx.is_full());
        assert_eq!(rx.len(), 0);

        tx.put(5);
        assert_eq!(rx.get(), 5);
    }

    #[test]
    #[should_panic(expected = "other producer handle")]
    fn reset_rejects_live_producer_clones() {
        let (mut tx, mut rx) = channel::<u64>(4);
        let _extra = tx.clone();
        rx.reset(&mut tx);
    }

    #[test]
    fn reset_allows_after_clones_dropped() {
        let (mut tx, mut rx) = channel::<u64>(4);
        let extra = tx.clone();
        drop(extra);
        tx.put(1);
        rx.reset(&mut tx);
        assert!(rx.is_empty());
    }

    #[test]
    fn drop_releases_unconsumed_values() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static DROP_COUNT: AtomicUsize = AtomicUsize::new(0);

        struct DropTracker;

        impl Drop for DropTracker {
            fn drop(&mut self) {
                DROP_COUNT.fetch_add(1, Ordering::SeqCst);
            }
        }

        DROP_COUNT.store(0, Ordering::SeqCst);

        {
            let (tx, rx) = channel::<DropTracker>(8);
            for _ in 0..6 {
                tx.put(DropTracker);
            }
            drop(rx.get());
            drop(rx.get());
            assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 2);
        }

        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 6);
    }
}
