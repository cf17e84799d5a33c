// src/signal.rs

//! One-shot completion signals for parked senders and receivers.
//!
//! A `Signal` is the rendezvous point between the thread (or task) that
//! parked and the thread that wakes it: the waker stores the outcome and
//! fires exactly once; the parked side either blocks on the condvar or
//! suspends on a stored waker. The channel mutex is never held while
//! waiting here — only while the signal is being fired.

use std::task::{Context, Poll, Waker};

use parking_lot::{Condvar, Mutex};

enum SignalState<V> {
  /// Not fired yet; holds the waker of a suspended future, if any.
  Pending(Option<Waker>),
  /// Fired; the outcome is waiting for the parked side.
  Ready(V),
  /// The outcome has been consumed. Terminal.
  Taken,
}

pub(crate) struct Signal<V> {
  state: Mutex<SignalState<V>>,
  cond: Condvar,
}

impl<V> Signal<V> {
  pub(crate) fn new() -> Self {
    Signal {
      state: Mutex::new(SignalState::Pending(None)),
      cond: Condvar::new(),
    }
  }

  /// Fires the signal with `value`.
  ///
  /// The first call wins and returns `true`; every later call is a no-op
  /// returning `false` and drops `value`.
  pub(crate) fn complete(&self, value: V) -> bool {
    let mut state = self.state.lock();
    match &*state {
      SignalState::Ready(_) | SignalState::Taken => return false,
      SignalState::Pending(_) => {}
    }
    let previous = std::mem::replace(&mut *state, SignalState::Ready(value));
    drop(state);
    self.cond.notify_one();
    if let SignalState::Pending(Some(waker)) = previous {
      waker.wake();
    }
    true
  }

  /// Blocks the calling thread until the signal fires, then returns the
  /// outcome. Each outcome is consumed exactly once; a second consumer is
  /// a bug in the parking protocol.
  pub(crate) fn wait(&self) -> V {
    let mut state = self.state.lock();
    loop {
      match std::mem::replace(&mut *state, SignalState::Taken) {
        SignalState::Ready(value) => return value,
        SignalState::Taken => {
          debug_assert!(false, "signal outcome consumed twice");
          self.cond.wait(&mut state);
        }
        pending => {
          *state = pending;
          self.cond.wait(&mut state);
        }
      }
    }
  }

  /// Polls for completion, parking the task's waker while pending.
  ///
  /// Re-registering on every poll keeps the stored waker current when the
  /// future migrates between executor threads.
  pub(crate) fn poll_wait(&self, cx: &mut Context<'_>) -> Poll<V> {
    let mut state = self.state.lock();
    match std::mem::replace(&mut *state, SignalState::Taken) {
      SignalState::Ready(value) => Poll::Ready(value),
      SignalState::Taken => {
        debug_assert!(false, "signal outcome consumed twice");
        Poll::Pending
      }
      SignalState::Pending(_) => {
        *state = SignalState::Pending(Some(cx.waker().clone()));
        Poll::Pending
      }
    }
  }

  /// Takes the outcome if the signal already fired and the outcome was
  /// never observed. Used by the abandoned-receive recovery path.
  pub(crate) fn try_take(&self) -> Option<V> {
    let mut state = self.state.lock();
    match std::mem::replace(&mut *state, SignalState::Taken) {
      SignalState::Ready(value) => Some(value),
      SignalState::Taken => None,
      pending => {
        *state = pending;
        None
      }
    }
  }
}

impl<V> std::fmt::Debug for Signal<V> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = match &*self.state.lock() {
      SignalState::Pending(_) => "pending",
      SignalState::Ready(_) => "ready",
      SignalState::Taken => "consumed",
    };
    f.debug_struct("Signal").field("state", &state).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicBool, Ordering};
  use std::sync::Arc;
  use std::task::{RawWaker, RawWakerVTable};
  use std::thread;
  use std::time::Duration;

  #[test]
  fn complete_before_wait() {
    let signal = Signal::new();
    assert!(signal.complete(7));
    assert_eq!(signal.wait(), 7);
  }

  #[test]
  fn wait_blocks_until_completed() {
    let signal = Arc::new(Signal::new());
    let waiter = Arc::clone(&signal);
    let handle = thread::spawn(move || waiter.wait());

    thread::sleep(Duration::from_millis(50));
    assert!(signal.complete(99));
    assert_eq!(handle.join().unwrap(), 99);
  }

  #[test]
  fn second_complete_is_a_noop() {
    let signal = Signal::new();
    assert!(signal.complete(1));
    assert!(!signal.complete(2));
    assert_eq!(signal.wait(), 1);
  }

  #[test]
  fn try_take_only_after_fire() {
    let signal = Signal::new();
    assert_eq!(signal.try_take(), None);
    signal.complete(5);
    assert_eq!(signal.try_take(), Some(5));
    assert_eq!(signal.try_take(), None);
  }

  fn flag_waker(flag: Arc<AtomicBool>) -> Waker {
    unsafe fn clone(data: *const ()) -> RawWaker {
      let orig = Arc::from_raw(data as *const AtomicBool);
      let cloned = Arc::clone(&orig);
      let _ = Arc::into_raw(orig);
      RawWaker::new(Arc::into_raw(cloned) as *const (), &VTABLE)
    }
    unsafe fn wake(data: *const ()) {
      let arc = Arc::from_raw(data as *const AtomicBool);
      arc.store(true, Ordering::SeqCst);
    }
    unsafe fn wake_by_ref(data: *const ()) {
      let arc = Arc::from_raw(data as *const AtomicBool);
      arc.store(true, Ordering::SeqCst);
      let _ = Arc::into_raw(arc);
    }
    unsafe fn drop_raw(data: *const ()) {
      let _ = Arc::from_raw(data as *const AtomicBool);
    }
    static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, wake, wake_by_ref, drop_raw);

    let raw = RawWaker::new(Arc::into_raw(flag) as *const (), &VTABLE);
    unsafe { Waker::from_raw(raw) }
  }

  #[test]
  fn poll_registers_waker_and_wakes_on_complete() {
    let signal = Signal::new();
    let woken = Arc::new(AtomicBool::new(false));
    let waker = flag_waker(Arc::clone(&woken));
    let mut cx = Context::from_waker(&waker);

    assert!(signal.poll_wait(&mut cx).is_pending());
    assert!(!woken.load(Ordering::SeqCst));

    signal.complete(11);
    assert!(woken.load(Ordering::SeqCst));
    assert_eq!(signal.poll_wait(&mut cx), Poll::Ready(11));
  }
}
