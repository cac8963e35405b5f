//! Integration tests for the SPSC queue across wait strategies.

use fastchan::spsc;
use fastchan::{BlockWait, PauseWait, SpinWait, YieldWait};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn single_threaded_fill_reset_drain() {
    let (mut tx, mut rx) = spsc::channel::<u64>(8);

    assert_eq!(rx.len(), 0);
    assert!(rx.is_empty());

    for i in 0..8 {
        tx.put(i);
        assert_eq!(tx.len() as u64, i + 1);
        assert!(!tx.is_empty());
        if i < 7 {
            assert!(!tx.is_full());
        } else {
            assert!(tx.is_full());
        }
    }

    rx.reset(&mut tx);
    assert_eq!(rx.len(), 0);
    assert!(rx.is_empty());
    assert!(!rx.is_full());

    for i in 0..8 {
        tx.put(i);
    }
    for i in 0..8 {
        assert_eq!(rx.get(), i);
    }
    assert!(rx.is_empty());
}

#[test]
fn blocking_pair_preserves_order() {
    let (tx, rx) = spsc::channel::<u64>(8);

    const TOTAL: u64 = 1600;

    let producer = thread::spawn(move || {
        for i in 0..TOTAL {
            tx.put(i);
        }
    });

    for i in 0..TOTAL {
        assert_eq!(rx.get(), i);
    }

    producer.join().unwrap();
    assert!(rx.is_empty());
}

#[test]
fn blocking_pair_with_pause_strategy() {
    let (tx, rx) = spsc::channel_with::<u64, _, _>(8, PauseWait, PauseWait);

    const TOTAL: u64 = 1600;

    let producer = thread::spawn(move || {
        for i in 0..TOTAL {
            tx.put(i);
        }
    });

    for i in 0..TOTAL {
        assert_eq!(rx.get(), i);
    }

    producer.join().unwrap();
}

#[test]
fn non_blocking_pair_with_retry_loops() {
    let (tx, rx) = spsc::channel_with::<u64, _, _>(8, SpinWait, SpinWait);

    const TOTAL: u64 = 1600;

    let producer = thread::spawn(move || {
        for i in 0..TOTAL {
            let mut value = i;
            loop {
                match tx.try_put(value) {
                    Ok(()) => break,
                    Err(full) => {
                        value = full.into_inner();
                        thread::yield_now();
                    }
                }
            }
        }
    });

    for i in 0..TOTAL {
        let value = loop {
            if let Some(value) = rx.try_get() {
                break value;
            }
            thread::yield_now();
        };
        assert_eq!(value, i);
    }

    producer.join().unwrap();
}

#[test]
fn try_operations_report_would_block_without_side_effects() {
    let (tx, rx) = spsc::channel::<u64>(16);

    for i in 0..16 {
        tx.try_put(i).unwrap();
    }
    assert!(tx.is_full());
    assert_eq!(tx.len(), 16);

    // 17th put must fail, hand the value back, and change nothing.
    let rejected = tx.try_put(16).unwrap_err();
    assert_eq!(rejected.into_inner(), 16);
    assert!(tx.is_full());
    assert_eq!(tx.len(), 16);

    for i in 0..16 {
        assert_eq!(rx.try_get(), Some(i));
    }

    // 17th get must report empty and change nothing.
    assert_eq!(rx.try_get(), None);
    assert!(rx.is_empty());
    assert_eq!(rx.len(), 0);
}

#[test]
fn block_wait_consumer_wakes_promptly() {
    let (tx, rx) = spsc::channel_with::<u64, _, _>(8, BlockWait::new(), BlockWait::new());

    // Consumer first, so it parks on the empty queue.
    let consumer = thread::spawn(move || rx.get());

    thread::sleep(Duration::from_millis(20));

    let start = Instant::now();
    tx.put(7);
    let value = consumer.join().unwrap();

    assert_eq!(value, 7);
    assert!(
        start.elapsed() < Duration::from_millis(100),
        "parked consumer took {:?} to wake",
        start.elapsed()
    );
}

#[test]
fn block_wait_producer_wakes_when_space_frees() {
    let (tx, rx) = spsc::channel_with::<u64, _, _>(4, BlockWait::new(), BlockWait::new());

    for i in 0..4 {
        tx.put(i);
    }

    // Producer parks on the full queue.
    let producer = thread::spawn(move || {
        tx.put(99);
    });

    thread::sleep(Duration::from_millis(20));

    let start = Instant::now();
    assert_eq!(rx.get(), 0);
    producer.join().unwrap();

    assert!(
        start.elapsed() < Duration::from_millis(100),
        "parked producer took {:?} to wake",
        start.elapsed()
    );

    for expected in [1, 2, 3, 99] {
        assert_eq!(rx.get(), expected);
    }
}

#[test]
fn mixed_strategies_cross_directions() {
    let (tx, rx) = spsc::channel_with::<u64, _, _>(4, YieldWait, BlockWait::new());

    const TOTAL: u64 = 400;

    let producer = thread::spawn(move || {
        for i in 0..TOTAL {
            tx.put(i);
        }
    });

    for i in 0..TOTAL {
        assert_eq!(rx.get(), i);
    }

    producer.join().unwrap();
}

#[test]
fn conservation_after_quiesce() {
    let (tx, rx) = spsc::channel::<u64>(32);

    const TOTAL: u64 = 5000;

    let producer = thread::spawn(move || {
        for i in 0..TOTAL {
            tx.put(i);
        }
    });

    // Consume most of the stream, then stop.
    const CONSUMED: u64 = TOTAL - 10;
    for _ in 0..CONSUMED {
        let _ = rx.get();
    }

    producer.join().unwrap();

    // Producer quiesced: everything not consumed is still queued.
    assert_eq!(rx.len() as u64, TOTAL - CONSUMED);
}
