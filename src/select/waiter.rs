// src/select/waiter.rs

//! The one-shot ready notification registered with selectables.

use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::thread::{self, Thread};

use futures_util::task::AtomicWaker;
use parking_lot::Mutex;

/// Yield rounds before a blocking wait commits to a park syscall. A
/// notification racing the registration pass lands within a few scheduler
/// hand-offs (each `add_waiter` is one lock hand-off away from a sender);
/// anything later needs the park path regardless.
const YIELD_ROUNDS: usize = 8;

/// A set-once "come look" notification shared between a multiplexer and
/// the selectables it registered with.
///
/// A fired waiter promises nothing beyond "a value may be ready": the
/// multiplexer must follow up with a try-receive and cope with finding
/// nothing. Identity (for deregistration) is the `Arc` pointer the waiter
/// is shared through.
pub struct Waiter {
  notified: AtomicBool,
  waker: AtomicWaker,
  /// Thread handle of a blocking waiter, present only while it parks.
  parked: Mutex<Option<Thread>>,
}

impl Waiter {
  /// Creates an unfired waiter.
  pub fn new() -> Self {
    Waiter {
      notified: AtomicBool::new(false),
      waker: AtomicWaker::new(),
      parked: Mutex::new(None),
    }
  }

  /// Fires the notification.
  ///
  /// Returns `true` only for the call that actually fired it; later calls
  /// are no-ops. A channel popping waiters off its FIFO uses the return
  /// value to skip entries another channel already claimed.
  pub fn notify(&self) -> bool {
    if self.notified.swap(true, Ordering::AcqRel) {
      return false;
    }
    self.waker.wake();
    if let Some(thread) = self.parked.lock().take() {
      thread.unpark();
    }
    true
  }

  /// Whether the notification has fired.
  pub fn is_notified(&self) -> bool {
    self.notified.load(Ordering::Acquire)
  }

  /// Blocks the calling thread until the notification fires.
  ///
  /// By the time a selector waits here it has already swept every case
  /// and registered with each one, so a busy channel fires the waiter
  /// within a few lock hand-offs and an idle one not for a while. A short
  /// yield window catches the first kind without a syscall; the park
  /// covers the second.
  pub(crate) fn wait(&self) {
    *self.parked.lock() = Some(thread::current());
    for _ in 0..YIELD_ROUNDS {
      if self.notified.load(Ordering::Acquire) {
        self.parked.lock().take();
        return;
      }
      thread::yield_now();
    }
    while !self.notified.load(Ordering::Acquire) {
      // park() can return spuriously; the flag is the source of truth.
      thread::park();
    }
    self.parked.lock().take();
  }

  /// Polls for the notification, re-registering the task's waker while
  /// pending. The recheck after registration closes the race with a
  /// concurrent `notify`.
  pub(crate) fn poll_wait(&self, cx: &mut Context<'_>) -> Poll<()> {
    if self.notified.load(Ordering::Acquire) {
      return Poll::Ready(());
    }
    self.waker.register(cx.waker());
    if self.notified.load(Ordering::Acquire) {
      Poll::Ready(())
    } else {
      Poll::Pending
    }
  }
}

impl Default for Waiter {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Debug for Waiter {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Waiter")
      .field("notified", &self.is_notified())
      .finish_non_exhaustive()
  }
}
