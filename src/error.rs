// src/error.rs

//! Error types for channel construction and operations.
//!
//! Closure is the only operational failure: try-operations additionally
//! report "not ready" cases, and those hand the rejected value back to
//! the caller instead of dropping it.

use core::fmt;

/// Error returned by the channel constructor when the requested capacity
/// is zero. A bounded channel needs at least one slot.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct CapacityError;

impl std::error::Error for CapacityError {}
impl fmt::Display for CapacityError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "channel capacity must be at least 1")
  }
}

/// Error returned by blocking and async `send` operations.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SendError {
  /// The channel was closed before the value could be accepted.
  Closed,
}

impl std::error::Error for SendError {}
impl fmt::Display for SendError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SendError::Closed => write!(f, "sending on a closed channel"),
    }
  }
}

/// Error returned by `try_send` when the value could not be accepted
/// immediately. The value being sent is returned in both variants.
#[derive(PartialEq, Eq, Clone)]
pub enum TrySendError<T> {
  /// The buffer is at capacity and no receiver is parked.
  Full(T),
  /// The channel is closed.
  Closed(T),
}

impl<T> TrySendError<T> {
  /// Consumes the error, returning the value that failed to send.
  #[inline]
  pub fn into_inner(self) -> T {
    match self {
      TrySendError::Full(value) | TrySendError::Closed(value) => value,
    }
  }
}

// Manual Debug so the error stays printable without a T: Debug bound.
impl<T> fmt::Debug for TrySendError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TrySendError::Full(_) => write!(f, "TrySendError::Full(..)"),
      TrySendError::Closed(_) => write!(f, "TrySendError::Closed(..)"),
    }
  }
}

impl<T> fmt::Display for TrySendError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TrySendError::Full(_) => write!(f, "channel full"),
      TrySendError::Closed(_) => write!(f, "sending on a closed channel"),
    }
  }
}

impl<T> std::error::Error for TrySendError<T> {}

/// Error returned by blocking and async `recv` operations.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RecvError {
  /// The channel is closed and fully drained.
  Closed,
}

impl std::error::Error for RecvError {}
impl fmt::Display for RecvError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RecvError::Closed => write!(f, "receiving on a closed and drained channel"),
    }
  }
}

/// Error returned by `try_recv` when no value was immediately available.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TryRecvError {
  /// The channel is open but the buffer is currently empty.
  Empty,
  /// The channel is closed and fully drained.
  Closed,
}

impl std::error::Error for TryRecvError {}
impl fmt::Display for TryRecvError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TryRecvError::Empty => write!(f, "channel empty"),
      TryRecvError::Closed => write!(f, "receiving on a closed and drained channel"),
    }
  }
}
