// src/channel/core.rs

//! The shared, mutex-guarded state of a channel and all operation logic.
//!
//! ### Design
//!
//! 1. **Single mutex**: one `parking_lot::Mutex` guards the buffer, the
//!    three wait queues and the closed flag. It is held only while this
//!    state is inspected or mutated; blocking happens afterwards, on the
//!    parked record's one-shot signal.
//! 2. **Park under the same lock as the failed fast path**: an operation
//!    that cannot complete enqueues its record before the guard drops, so
//!    a wakeup can never slip between "saw full/empty" and "parked".
//! 3. **Direct handoff**: a send that meets a parked receiver completes
//!    the receiver's signal with the value and never touches the buffer.
//!    A receive that frees a slot moves the oldest parked sender's value
//!    into the buffer before returning, which keeps values flowing out in
//!    the exact order their sends were accepted.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{RecvError, SendError, TryRecvError, TrySendError};
use crate::ring::RingBuffer;
use crate::select::Waiter;
use crate::signal::Signal;
use crate::telemetry;
use crate::waitlist::WaitQueue;

const LOC_CORE: &str = "channel::core";
const CTR_SENDS_PARKED: &str = "SendsParked";
const CTR_RECVS_PARKED: &str = "RecvsParked";
const CTR_HANDOFFS: &str = "DirectHandoffs";
const CTR_BACKFILLS: &str = "SenderBackfills";
const CTR_SELECT_NOTIFIES: &str = "SelectNotifies";
const CTR_STALE_SELECT_WAITERS: &str = "StaleSelectWaiters";

/// A sender parked because the buffer was full. The value stays with the
/// record; the receiver that frees a slot moves it into the buffer and
/// fires the signal.
#[derive(Debug)]
pub(crate) struct WaitingSender<T> {
  pub(crate) value: T,
  pub(crate) signal: Arc<Signal<()>>,
}

/// A receiver parked because the buffer was empty. The signal carries the
/// outcome: a value handed off by a sender, or cancellation at close.
#[derive(Debug)]
pub(crate) struct WaitingReceiver<T> {
  pub(crate) signal: Arc<Signal<Result<T, RecvError>>>,
}

#[derive(Debug)]
pub(crate) struct State<T> {
  pub(crate) buffer: RingBuffer<T>,
  pub(crate) senders: WaitQueue<WaitingSender<T>>,
  pub(crate) receivers: WaitQueue<WaitingReceiver<T>>,
  pub(crate) selects: WaitQueue<Arc<Waiter>>,
  pub(crate) closed: bool,
}

/// The shared owner of a channel's state, wrapped in an `Arc` by the
/// public handles.
#[derive(Debug)]
pub(crate) struct Shared<T> {
  pub(crate) state: Mutex<State<T>>,
  pub(crate) capacity: usize,
}

impl<T: Send> Shared<T> {
  pub(crate) fn new(capacity: usize) -> Self {
    debug_assert!(capacity > 0, "shared state requires a validated capacity");
    Shared {
      state: Mutex::new(State {
        buffer: RingBuffer::with_capacity(capacity),
        senders: WaitQueue::new(),
        receivers: WaitQueue::new(),
        selects: WaitQueue::new(),
        closed: false,
      }),
      capacity,
    }
  }

  /// The non-blocking send ladder, run under the lock:
  /// 1. fail if closed;
  /// 2. empty buffer: hand off to a parked receiver, else buffer the
  ///    value and let one parked selector come look;
  /// 3. append if there is space;
  /// 4. report Full.
  pub(crate) fn try_send_locked(&self, state: &mut State<T>, value: T) -> Result<(), TrySendError<T>> {
    if state.closed {
      return Err(TrySendError::Closed(value));
    }

    if state.buffer.is_empty() {
      if let Some(receiver) = state.receivers.pop_front() {
        // Rendezvous: the buffer stays untouched on this path, so the
        // selects queue has nothing to observe and is not consulted.
        telemetry::increment_counter(LOC_CORE, CTR_HANDOFFS);
        receiver.signal.complete(Ok(value));
        return Ok(());
      }
      state.buffer.push_back(value);
      self.notify_one_select(state);
      return Ok(());
    }

    // Buffer non-empty: no receiver can be parked, only space matters.
    if state.buffer.is_full() {
      return Err(TrySendError::Full(value));
    }
    state.buffer.push_back(value);
    Ok(())
  }

  /// The non-blocking receive ladder, run under the lock:
  /// 1. take the oldest buffered value, backfilling from the oldest
  ///    parked sender to keep global send order;
  /// 2. empty and closed: report Closed;
  /// 3. empty and open: report Empty.
  pub(crate) fn try_recv_locked(&self, state: &mut State<T>) -> Result<T, TryRecvError> {
    if let Some(value) = state.buffer.pop_front() {
      if let Some(sender) = state.senders.pop_front() {
        // The parked sender arrived after everything buffered, so the
        // tail is its place.
        telemetry::increment_counter(LOC_CORE, CTR_BACKFILLS);
        state.buffer.push_back(sender.value);
        sender.signal.complete(());
      }
      return Ok(value);
    }
    if state.closed {
      Err(TryRecvError::Closed)
    } else {
      Err(TryRecvError::Empty)
    }
  }

  pub(crate) fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
    let mut state = self.state.lock();
    self.try_send_locked(&mut state, value)
  }

  pub(crate) fn try_recv(&self) -> Result<T, TryRecvError> {
    let mut state = self.state.lock();
    self.try_recv_locked(&mut state)
  }

  /// Blocking send. Parks on a fresh signal when the buffer is full; by
  /// the time the signal fires, a receiver has moved the value into the
  /// buffer.
  pub(crate) fn send(&self, value: T) -> Result<(), SendError> {
    let signal = {
      let mut state = self.state.lock();
      match self.try_send_locked(&mut state, value) {
        Ok(()) => return Ok(()),
        Err(TrySendError::Closed(_)) => return Err(SendError::Closed),
        Err(TrySendError::Full(value)) => self.park_sender(&mut state, value),
      }
    };
    signal.wait();
    Ok(())
  }

  /// Blocking receive. Parks on a fresh signal when the buffer is empty
  /// and the channel is open; the signal resolves to a handed-off value
  /// or to cancellation at close.
  pub(crate) fn recv(&self) -> Result<T, RecvError> {
    let signal = {
      let mut state = self.state.lock();
      match self.try_recv_locked(&mut state) {
        Ok(value) => return Ok(value),
        Err(TryRecvError::Closed) => return Err(RecvError::Closed),
        Err(TryRecvError::Empty) => self.park_receiver(&mut state),
      }
    };
    signal.wait()
  }

  /// Commits a parked sender record; the caller blocks or suspends on
  /// the returned signal. Must run under the same guard that rejected
  /// `value` as Full.
  pub(crate) fn park_sender(&self, state: &mut State<T>, value: T) -> Arc<Signal<()>> {
    telemetry::increment_counter(LOC_CORE, CTR_SENDS_PARKED);
    let signal = Arc::new(Signal::new());
    state.senders.push_back(WaitingSender {
      value,
      signal: Arc::clone(&signal),
    });
    signal
  }

  /// Commits a parked receiver record; the caller blocks or suspends on
  /// the returned signal.
  pub(crate) fn park_receiver(&self, state: &mut State<T>) -> Arc<Signal<Result<T, RecvError>>> {
    telemetry::increment_counter(LOC_CORE, CTR_RECVS_PARKED);
    let signal = Arc::new(Signal::new());
    state.receivers.push_back(WaitingReceiver {
      signal: Arc::clone(&signal),
    });
    signal
  }

  /// Closes the channel. Idempotent.
  ///
  /// Every parked receiver is cancelled with `RecvError::Closed`. Parked
  /// senders and the buffer are left untouched so the channel can still
  /// be drained. Parked select waiters are notified, never cancelled:
  /// their follow-up try-receive observes the closure itself.
  pub(crate) fn close(&self) {
    let (receivers, selects) = {
      let mut state = self.state.lock();
      if state.closed {
        return;
      }
      state.closed = true;
      (state.receivers.drain(), state.selects.drain())
    };
    for receiver in receivers {
      receiver.signal.complete(Err(RecvError::Closed));
    }
    for waiter in selects {
      waiter.notify();
    }
  }

  pub(crate) fn is_closed(&self) -> bool {
    self.state.lock().closed
  }

  pub(crate) fn len(&self) -> usize {
    self.state.lock().buffer.len()
  }

  /// Registers a select waiter; fires it immediately when the channel is
  /// already observable-ready (buffered value, or closed).
  pub(crate) fn add_select_waiter(&self, waiter: &Arc<Waiter>) {
    let mut state = self.state.lock();
    state.selects.push_back(Arc::clone(waiter));
    if !state.buffer.is_empty() || state.closed {
      waiter.notify();
    }
  }

  /// Deregisters a select waiter by identity. A waiter already consumed
  /// by a notification is simply gone; that is fine.
  pub(crate) fn remove_select_waiter(&self, waiter: &Arc<Waiter>) {
    let mut state = self.state.lock();
    state.selects.remove_where(|entry| Arc::ptr_eq(entry, waiter));
  }

  /// Deregisters an abandoned async sender. If the record is gone the
  /// send already completed and there is nothing to undo.
  pub(crate) fn cancel_sender(&self, signal: &Arc<Signal<()>>) {
    let mut state = self.state.lock();
    state.senders.remove_where(|entry| Arc::ptr_eq(&entry.signal, signal));
  }

  /// Deregisters an abandoned async receiver, recovering a value that was
  /// assigned to it but never observed.
  pub(crate) fn cancel_receiver(&self, signal: &Arc<Signal<Result<T, RecvError>>>) {
    {
      let mut state = self.state.lock();
      if state
        .receivers
        .remove_where(|entry| Arc::ptr_eq(&entry.signal, signal))
        .is_some()
      {
        return;
      }
    }
    // Lost the race: a sender (or close) completed the record first. An
    // unobserved value must not vanish with the abandoned future.
    if let Some(Ok(value)) = signal.try_take() {
      self.redeliver(value);
    }
  }

  /// Puts a recovered value back into circulation. It predates everything
  /// currently buffered, so it goes to a parked receiver or the buffer
  /// front. With the buffer refilled to capacity inside the race window
  /// there is nowhere left; the value is dropped.
  fn redeliver(&self, value: T) {
    let mut state = self.state.lock();
    if let Some(receiver) = state.receivers.pop_front() {
      receiver.signal.complete(Ok(value));
      return;
    }
    if !state.buffer.is_full() {
      let was_empty = state.buffer.is_empty();
      state.buffer.push_front(value);
      if was_empty {
        self.notify_one_select(&mut state);
      }
    }
  }

  /// Fires the oldest live select waiter, discarding entries another
  /// channel already claimed. Called on the empty-to-non-empty buffer
  /// transition.
  fn notify_one_select(&self, state: &mut State<T>) {
    while let Some(waiter) = state.selects.pop_front() {
      if waiter.notify() {
        telemetry::increment_counter(LOC_CORE, CTR_SELECT_NOTIFIES);
        break;
      }
      telemetry::increment_counter(LOC_CORE, CTR_STALE_SELECT_WAITERS);
    }
  }
}
