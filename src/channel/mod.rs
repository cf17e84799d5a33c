// src/channel/mod.rs

//! Bounded FIFO channel: constructor and the `Sender`/`Receiver` handles.
//!
//! A channel is created with [`bounded`] and used through clonable
//! handles; any number of workers may call any operation concurrently.
//! Every value is delivered to exactly one receiver, in the order the
//! sends were accepted. Closing is explicit and irreversible: after
//! [`Sender::close`] new sends fail, parked receivers are cancelled, and
//! everything already accepted — buffered values and the values of parked
//! senders — can still be drained.

mod async_impl;
mod core;

pub use async_impl::{RecvFuture, SendFuture};

use std::sync::Arc;

use crate::error::{CapacityError, RecvError, SendError, TryRecvError, TrySendError};
use crate::select::{Selectable, Waiter};

use self::core::Shared;

/// Creates a bounded channel with the given capacity.
///
/// Fails with [`CapacityError`] when `capacity` is zero; a bounded
/// channel needs at least one buffer slot.
///
/// # Examples
///
/// ```
/// let (tx, rx) = weir::bounded::<u32>(2).unwrap();
/// tx.send(1).unwrap();
/// tx.send(2).unwrap();
/// assert_eq!(rx.recv().unwrap(), 1);
/// assert_eq!(rx.recv().unwrap(), 2);
/// ```
pub fn bounded<T: Send>(capacity: usize) -> Result<(Sender<T>, Receiver<T>), CapacityError> {
  if capacity == 0 {
    return Err(CapacityError);
  }
  let shared = Arc::new(Shared::new(capacity));
  let sender = Sender {
    shared: Arc::clone(&shared),
  };
  let receiver = Receiver { shared };
  Ok((sender, receiver))
}

/// The sending half of a channel.
pub struct Sender<T: Send> {
  shared: Arc<Shared<T>>,
}

impl<T: Send> Sender<T> {
  /// Sends a value, blocking while the buffer is full.
  ///
  /// Fails immediately with [`SendError::Closed`] on a closed channel.
  /// When the send parks, it completes once a receiver frees a slot and
  /// moves this value into the buffer; a close that happens in between
  /// does not cancel it.
  pub fn send(&self, value: T) -> Result<(), SendError> {
    self.shared.send(value)
  }

  /// Attempts to send without blocking, handing the value back in the
  /// error when the buffer is full or the channel is closed.
  pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
    self.shared.try_send(value)
  }

  /// Sends asynchronously. The returned future behaves like [`send`]
  /// without blocking the caller; dropping it while parked withdraws the
  /// value.
  ///
  /// [`send`]: Sender::send
  pub fn send_async(&self, value: T) -> SendFuture<'_, T> {
    SendFuture::new(&self.shared, value)
  }

  /// Closes the channel. Idempotent.
  ///
  /// Parked receivers are cancelled with [`RecvError::Closed`]; the
  /// buffer and parked senders are left for receivers to drain; parked
  /// selectors are notified so their follow-up try-receive observes the
  /// closure.
  pub fn close(&self) {
    self.shared.close();
  }

  /// Whether the channel has been closed.
  pub fn is_closed(&self) -> bool {
    self.shared.is_closed()
  }

  /// The configured buffer capacity.
  pub fn capacity(&self) -> usize {
    self.shared.capacity
  }

  /// Number of values currently buffered.
  pub fn len(&self) -> usize {
    self.shared.len()
  }

  /// Whether the buffer is currently empty.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl<T: Send> Clone for Sender<T> {
  fn clone(&self) -> Self {
    Sender {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<T: Send> std::fmt::Debug for Sender<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Sender")
      .field("capacity", &self.shared.capacity)
      .finish_non_exhaustive()
  }
}

/// The receiving half of a channel.
pub struct Receiver<T: Send> {
  shared: Arc<Shared<T>>,
}

impl<T: Send> Receiver<T> {
  /// Receives a value, blocking while the channel is empty and open.
  ///
  /// Fails with [`RecvError::Closed`] once the channel is closed and
  /// fully drained — drained including the values of senders that were
  /// parked at close time.
  pub fn recv(&self) -> Result<T, RecvError> {
    self.shared.recv()
  }

  /// Attempts to receive without blocking.
  ///
  /// Never waits for a sender beyond what is already buffered:
  /// [`TryRecvError::Empty`] on an open empty channel,
  /// [`TryRecvError::Closed`] on a closed drained one.
  pub fn try_recv(&self) -> Result<T, TryRecvError> {
    self.shared.try_recv()
  }

  /// Receives asynchronously. The returned future behaves like [`recv`]
  /// without blocking the caller.
  ///
  /// Dropping the future while parked deregisters it. In the narrow race
  /// where a value was already assigned to the dropped future, the value
  /// is put back into circulation; only when the buffer refilled to
  /// capacity inside that window is it lost.
  ///
  /// [`recv`]: Receiver::recv
  pub fn recv_async(&self) -> RecvFuture<'_, T> {
    RecvFuture::new(&self.shared)
  }

  /// Whether the channel has been closed. Buffered values may remain.
  pub fn is_closed(&self) -> bool {
    self.shared.is_closed()
  }

  /// The configured buffer capacity.
  pub fn capacity(&self) -> usize {
    self.shared.capacity
  }

  /// Number of values currently buffered.
  pub fn len(&self) -> usize {
    self.shared.len()
  }

  /// Whether the buffer is currently empty.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl<T: Send> Clone for Receiver<T> {
  fn clone(&self) -> Self {
    Receiver {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<T: Send> std::fmt::Debug for Receiver<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Receiver")
      .field("capacity", &self.shared.capacity)
      .finish_non_exhaustive()
  }
}

/// Receivers are selectable: a multiplexer can register a one-shot
/// ready-notification waiter.
impl<T: Send> Selectable for Receiver<T> {
  fn add_waiter(&self, waiter: &Arc<Waiter>) {
    self.shared.add_select_waiter(waiter);
  }

  fn remove_waiter(&self, waiter: &Arc<Waiter>) {
    self.shared.remove_select_waiter(waiter);
  }
}
