#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! Bounded FIFO channels with a multi-way select primitive.
//!
//! A channel is a typed, fixed-capacity queue between concurrently
//! scheduled workers, with blocking, non-blocking and future-based
//! operations on both ends. Values leave in the exact order their sends
//! were accepted, including across senders parked on a full buffer.
//! Closing is explicit, irreversible and drain-friendly: parked receivers
//! are cancelled, while buffered values and in-flight sends remain
//! receivable.
//!
//! [`Select`] waits on several channels at once through the
//! [`Selectable`] notification contract and proceeds on the first ready
//! case, breaking ties by case order.
//!
//! ```
//! use std::thread;
//!
//! let (tx, rx) = weir::bounded(2).unwrap();
//! let worker = thread::spawn(move || {
//!   let mut sum = 0;
//!   while let Ok(n) = rx.recv() {
//!     sum += n;
//!   }
//!   sum
//! });
//!
//! for n in 1..=4 {
//!   tx.send(n).unwrap();
//! }
//! tx.close();
//! assert_eq!(worker.join().unwrap(), 10);
//! ```

pub mod channel;
pub mod error;
pub mod select;
pub mod telemetry;

mod ring;
mod signal;
mod waitlist;

pub use channel::{bounded, Receiver, RecvFuture, SendFuture, Sender};
pub use error::{CapacityError, RecvError, SendError, TryRecvError, TrySendError};
pub use select::{Select, Selectable, WaitFuture, Waiter};
