// src/select/mod.rs

//! Multi-way wait over several channels.
//!
//! The multiplexer never reserves values. Each round it evaluates every
//! case optimistically with a try-receive; when none is ready it
//! registers one shared [`Waiter`] with every case and parks. A fired
//! waiter only means "come look": the follow-up try-receive may find the
//! channel drained again, and the loop re-parks.
//!
//! ```
//! use weir::{bounded, Select};
//!
//! let (tx_a, rx_a) = bounded::<u32>(1).unwrap();
//! let (tx_b, rx_b) = bounded::<u32>(1).unwrap();
//! tx_b.send(7).unwrap();
//!
//! let winner = Select::new()
//!   .recv(&rx_a, |value| ("a", value))
//!   .recv(&rx_b, |value| ("b", value))
//!   .wait();
//! assert_eq!(winner, ("b", Ok(7)));
//! # drop(tx_a);
//! ```

mod waiter;

pub use waiter::Waiter;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::channel::Receiver;
use crate::error::{RecvError, TryRecvError};

/// The capability a multiplexer needs from a channel: registering and
/// deregistering a one-shot ready-notification waiter.
///
/// Registration must fire the waiter immediately when the object is
/// already observable-ready, so a wait that starts after readiness cannot
/// be missed. Removal is by waiter identity.
pub trait Selectable {
  /// Enqueues `waiter`, firing it at once if already ready.
  fn add_waiter(&self, waiter: &Arc<Waiter>);
  /// Removes `waiter` if still enqueued.
  fn remove_waiter(&self, waiter: &Arc<Waiter>);
}

struct Case<'a, R> {
  selectable: &'a (dyn Selectable + Sync),
  /// Runs the case's try-receive and, on a ready outcome, its callback.
  attempt: Box<dyn FnMut() -> Option<R> + Send + 'a>,
}

/// A multi-way receive over several channels.
///
/// Cases are evaluated in the order they were added; ties break toward
/// the earliest case. A closed-and-drained channel counts as ready and
/// dispatches its callback with `Err(RecvError::Closed)`.
pub struct Select<'a, R> {
  cases: Vec<Case<'a, R>>,
}

impl<'a, R> Select<'a, R> {
  /// Creates a multiplexer with no cases.
  pub fn new() -> Self {
    Select { cases: Vec::new() }
  }

  /// Adds a receive case. `on_ready` runs outside every channel lock,
  /// with the received value or `Err(RecvError::Closed)`.
  pub fn recv<T, F>(mut self, receiver: &'a Receiver<T>, mut on_ready: F) -> Self
  where
    T: Send,
    F: FnMut(Result<T, RecvError>) -> R + Send + 'a,
  {
    let attempt = Box::new(move || match receiver.try_recv() {
      Ok(value) => Some(on_ready(Ok(value))),
      Err(TryRecvError::Closed) => Some(on_ready(Err(RecvError::Closed))),
      Err(TryRecvError::Empty) => None,
    });
    self.cases.push(Case {
      selectable: receiver,
      attempt,
    });
    self
  }

  /// Number of cases added so far.
  pub fn len(&self) -> usize {
    self.cases.len()
  }

  /// Whether no cases have been added.
  pub fn is_empty(&self) -> bool {
    self.cases.is_empty()
  }

  /// One optimistic pass over the cases, in order. Never parks.
  pub fn try_select(&mut self) -> Option<R> {
    self.poll_cases()
  }

  /// Waits until a case is ready and returns its callback's result.
  ///
  /// # Panics
  ///
  /// Panics when no cases were added; such a wait could never complete.
  pub fn wait(&mut self) -> R {
    assert!(!self.cases.is_empty(), "select over zero cases can never complete");
    loop {
      if let Some(result) = self.poll_cases() {
        return result;
      }
      let waiter = Arc::new(Waiter::new());
      for case in &self.cases {
        case.selectable.add_waiter(&waiter);
      }
      // A case turning ready between the pass above and registration has
      // fired the waiter during add_waiter, so this wait cannot hang.
      waiter.wait();
      for case in &self.cases {
        case.selectable.remove_waiter(&waiter);
      }
    }
  }

  /// Waits asynchronously. Same semantics as [`wait`], suspending the
  /// task instead of blocking the thread.
  ///
  /// # Panics
  ///
  /// Panics when no cases were added.
  ///
  /// [`wait`]: Select::wait
  pub fn wait_async<'s>(&'s mut self) -> WaitFuture<'s, 'a, R> {
    assert!(!self.cases.is_empty(), "select over zero cases can never complete");
    WaitFuture {
      select: self,
      registered: None,
    }
  }

  fn poll_cases(&mut self) -> Option<R> {
    for case in &mut self.cases {
      if let Some(result) = (case.attempt)() {
        return Some(result);
      }
    }
    None
  }
}

impl<'a, R> Default for Select<'a, R> {
  fn default() -> Self {
    Self::new()
  }
}

impl<'a, R> std::fmt::Debug for Select<'a, R> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Select").field("cases", &self.cases.len()).finish()
  }
}

/// Future returned by [`Select::wait_async`].
///
/// Dropping it deregisters the shared waiter from every case.
#[must_use = "futures do nothing unless you .await or poll them"]
pub struct WaitFuture<'s, 'a, R> {
  select: &'s mut Select<'a, R>,
  registered: Option<Arc<Waiter>>,
}

impl<'s, 'a, R> Unpin for WaitFuture<'s, 'a, R> {}

impl<'s, 'a, R> Future for WaitFuture<'s, 'a, R> {
  type Output = R;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    loop {
      // Leftover registration from the previous round (a notification or
      // a spurious poll): deregister before looking again.
      if let Some(waiter) = this.registered.take() {
        for case in &this.select.cases {
          case.selectable.remove_waiter(&waiter);
        }
      }
      if let Some(result) = this.select.poll_cases() {
        return Poll::Ready(result);
      }
      let waiter = Arc::new(Waiter::new());
      for case in &this.select.cases {
        case.selectable.add_waiter(&waiter);
      }
      let poll = waiter.poll_wait(cx);
      this.registered = Some(waiter);
      if poll.is_pending() {
        return Poll::Pending;
      }
    }
  }
}

impl<'s, 'a, R> Drop for WaitFuture<'s, 'a, R> {
  fn drop(&mut self) {
    if let Some(waiter) = self.registered.take() {
      for case in &self.select.cases {
        case.selectable.remove_waiter(&waiter);
      }
    }
  }
}

impl<'s, 'a, R> std::fmt::Debug for WaitFuture<'s, 'a, R> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("WaitFuture")
      .field("cases", &self.select.cases.len())
      .field("registered", &self.registered.is_some())
      .finish()
  }
}
