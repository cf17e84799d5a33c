// src/channel/async_impl.rs

//! Future-based send and receive.
//!
//! The first poll runs the same non-blocking ladder as the synchronous
//! operations and, when it must wait, commits a parked record under the
//! channel lock before suspending on the record's signal. A parked future
//! never re-runs the ladder: its record holds its FIFO position, so later
//! polls only re-arm the signal's waker.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use super::core::Shared;
use crate::error::{RecvError, SendError, TryRecvError, TrySendError};
use crate::signal::Signal;

// --- SendFuture ---

enum SendState<T> {
  /// Not yet attempted; the value travels with the future.
  Initial(T),
  /// Committed to the senders queue; the value lives in the record.
  Parked(Arc<Signal<()>>),
  Done,
}

/// A future that completes when the value has been accepted by the
/// channel, or fails with [`SendError::Closed`].
///
/// Dropping the future while parked withdraws the value from the
/// channel.
#[must_use = "futures do nothing unless you .await or poll them"]
pub struct SendFuture<'a, T: Send> {
  shared: &'a Shared<T>,
  state: SendState<T>,
}

impl<'a, T: Send> SendFuture<'a, T> {
  pub(super) fn new(shared: &'a Shared<T>, value: T) -> Self {
    SendFuture {
      shared,
      state: SendState::Initial(value),
    }
  }
}

// The futures hold no self-references; the value they carry is moved, not
// pinned, so they stay freely movable for any payload type.
impl<'a, T: Send> Unpin for SendFuture<'a, T> {}
impl<'a, T: Send> Unpin for RecvFuture<'a, T> {}

impl<'a, T: Send> Future for SendFuture<'a, T> {
  type Output = Result<(), SendError>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    // Take the whole state; every path below either finishes the future
    // or parks it again.
    match std::mem::replace(&mut this.state, SendState::Done) {
      SendState::Initial(value) => {
        let mut state = this.shared.state.lock();
        match this.shared.try_send_locked(&mut state, value) {
          Ok(()) => Poll::Ready(Ok(())),
          Err(TrySendError::Closed(_)) => Poll::Ready(Err(SendError::Closed)),
          Err(TrySendError::Full(value)) => {
            let signal = this.shared.park_sender(&mut state, value);
            drop(state);
            // The record may already have been completed between the
            // unlock and this check; the signal resolves that race.
            match signal.poll_wait(cx) {
              Poll::Ready(()) => Poll::Ready(Ok(())),
              Poll::Pending => {
                this.state = SendState::Parked(signal);
                Poll::Pending
              }
            }
          }
        }
      }
      SendState::Parked(signal) => match signal.poll_wait(cx) {
        Poll::Ready(()) => Poll::Ready(Ok(())),
        Poll::Pending => {
          this.state = SendState::Parked(signal);
          Poll::Pending
        }
      },
      // A completed future that gets polled again stays completed.
      SendState::Done => Poll::Ready(Ok(())),
    }
  }
}

impl<'a, T: Send> Drop for SendFuture<'a, T> {
  fn drop(&mut self) {
    if let SendState::Parked(signal) = &self.state {
      // Withdraws the record and its value. If the record is gone the
      // send already completed.
      self.shared.cancel_sender(signal);
    }
  }
}

impl<'a, T: Send> std::fmt::Debug for SendFuture<'a, T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = match &self.state {
      SendState::Initial(_) => "initial",
      SendState::Parked(_) => "parked",
      SendState::Done => "done",
    };
    f.debug_struct("SendFuture").field("state", &state).finish_non_exhaustive()
  }
}

// --- RecvFuture ---

enum RecvState<T> {
  Initial,
  Parked(Arc<Signal<Result<T, RecvError>>>),
  Done,
}

/// A future that completes with the next value, or fails with
/// [`RecvError::Closed`] once the channel is closed and drained.
#[must_use = "futures do nothing unless you .await or poll them"]
pub struct RecvFuture<'a, T: Send> {
  shared: &'a Shared<T>,
  state: RecvState<T>,
}

impl<'a, T: Send> RecvFuture<'a, T> {
  pub(super) fn new(shared: &'a Shared<T>) -> Self {
    RecvFuture {
      shared,
      state: RecvState::Initial,
    }
  }
}

impl<'a, T: Send> Future for RecvFuture<'a, T> {
  type Output = Result<T, RecvError>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    match std::mem::replace(&mut this.state, RecvState::Done) {
      RecvState::Initial => {
        let mut state = this.shared.state.lock();
        match this.shared.try_recv_locked(&mut state) {
          Ok(value) => Poll::Ready(Ok(value)),
          Err(TryRecvError::Closed) => Poll::Ready(Err(RecvError::Closed)),
          Err(TryRecvError::Empty) => {
            let signal = this.shared.park_receiver(&mut state);
            drop(state);
            match signal.poll_wait(cx) {
              Poll::Ready(outcome) => Poll::Ready(outcome),
              Poll::Pending => {
                this.state = RecvState::Parked(signal);
                Poll::Pending
              }
            }
          }
        }
      }
      RecvState::Parked(signal) => match signal.poll_wait(cx) {
        Poll::Ready(outcome) => Poll::Ready(outcome),
        Poll::Pending => {
          this.state = RecvState::Parked(signal);
          Poll::Pending
        }
      },
      RecvState::Done => Poll::Ready(Err(RecvError::Closed)),
    }
  }
}

impl<'a, T: Send> Drop for RecvFuture<'a, T> {
  fn drop(&mut self) {
    if let RecvState::Parked(signal) = &self.state {
      // Deregisters the record; a value the race already assigned to it
      // is put back into circulation by the core.
      self.shared.cancel_receiver(signal);
    }
  }
}

impl<'a, T: Send> std::fmt::Debug for RecvFuture<'a, T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = match &self.state {
      RecvState::Initial => "initial",
      RecvState::Parked(_) => "parked",
      RecvState::Done => "done",
    };
    f.debug_struct("RecvFuture").field("state", &state).finish_non_exhaustive()
  }
}
