//! Bounded lock-free queues that hand values from producer threads to a
//! single consumer thread at the lowest achievable latency per operation.
//!
//! Two flavors are provided, each splitting into a producer and a consumer
//! handle over a power-of-two ring of slots:
//!
//! - [`spsc`]: one producer, one consumer; no atomic read-modify-write at
//!   all on the fast path thanks to cached counter views
//! - [`mpsc`]: any number of producers claiming positions by CAS and
//!   publishing them strictly in claim order; still exactly one consumer
//!
//! # Waiting
//!
//! What a blocked side does is a [`WaitStrategy`] chosen per direction at
//! construction and monomorphized into the queue: busy-spin ([`SpinWait`]),
//! spin with the CPU's pause hint ([`PauseWait`]), yield to the scheduler
//! ([`YieldWait`]), or sleep on a condition variable ([`BlockWait`]). The
//! `try_put` / `try_get` siblings never wait and report would-block with
//! [`Full`] / `None` instead.
//!
//! # Example
//!
//! ```
//! use fastchan::spsc;
//!
//! let (producer, consumer) = spsc::channel::<u64>(1024);
//!
//! let worker = std::thread::spawn(move || {
//!     for i in 0..100 {
//!         producer.put(i);
//!     }
//! });
//!
//! for i in 0..100 {
//!     assert_eq!(consumer.get(), i);
//! }
//! worker.join().unwrap();
//! ```
//!
//! Multiple producers share one ring by cloning the handle:
//!
//! ```
//! use fastchan::mpsc;
//!
//! let (producer, consumer) = mpsc::channel::<u64>(1024);
//!
//! let workers: Vec<_> = (0..3)
//!     .map(|_| {
//!         let producer = producer.clone();
//!         std::thread::spawn(move || {
//!             for i in 1..=100 {
//!                 producer.put(i);
//!             }
//!         })
//!     })
//!     .collect();
//!
//! let sum: u64 = (0..300).map(|_| consumer.get()).sum();
//! assert_eq!(sum, 3 * 5050);
//!
//! for worker in workers {
//!     worker.join().unwrap();
//! }
//! ```

mod config;
mod error;
mod invariants;
pub mod mpsc;
pub mod spsc;
mod wait;

pub use error::Full;
pub use wait::{BlockWait, PauseWait, SpinWait, WaitStrategy, YieldWait};
