//! Yagma: a lock-free work-stealing deque of the Chase-Lev family.
//!
//! One privileged owner thread pushes and pops at the bottom of the
//! deque; any number of other threads steal from the top. The owner's
//! fast path is wait-free, stealing is lock-free, and the backing
//! buffer grows and shrinks on demand, with displaced buffers reclaimed
//! through epoch-based garbage collection.
//!
//! # Key Features
//!
//! - **Wait-free owner operations**: `push` and `pop` complete in a
//!   bounded number of steps when uncontended; `pop` performs a single
//!   CAS only when racing stealers for the last element.
//! - **Growable circular buffer**: no fixed capacity and no per-element
//!   allocation; buffers double when full and halve when mostly empty.
//! - **Contention surfaced, not hidden**: `steal` reports a lost race
//!   as [`Steal::Retry`] instead of spinning, so a scheduler can choose
//!   a different victim.
//!
//! # Example
//!
//! ```rust
//! use std::thread;
//! use yagma::{Deque, Steal};
//!
//! let deque = Deque::new();
//! let stealer = deque.stealer();
//!
//! deque.push(1);
//! deque.push(2);
//! deque.push(3);
//!
//! // The owner pops in LIFO order.
//! assert_eq!(deque.pop(), Some(3));
//!
//! // Stealers take the oldest work from the other end.
//! thread::spawn(move || {
//!     assert_eq!(stealer.steal(), Steal::Data(1));
//! })
//! .join()
//! .unwrap();
//! ```

#![warn(missing_docs)]

mod buffer;
mod deque;

pub use deque::{Deque, Steal, Stealer};
