// Blocking-API suites: ordering, capacity, close semantics, contention.

mod common;
use common::*;

use weir::{bounded, CapacityError, RecvError, SendError, TryRecvError, TrySendError};

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Barrier};
use std::thread;

// --- Helper for the contended suites ---
fn run_sync_stress(num_producers: usize, num_consumers: usize, items_per_producer: usize, capacity: usize) {
  let (tx, rx) = bounded(capacity).unwrap();
  let total_expected = num_producers * items_per_producer;
  let received_set = Arc::new(std::sync::Mutex::new(HashSet::new()));
  let received_count = Arc::new(AtomicUsize::new(0));

  let mut consumers = Vec::new();
  for _ in 0..num_consumers {
    let rx = rx.clone();
    let received_set = Arc::clone(&received_set);
    let received_count = Arc::clone(&received_count);
    consumers.push(thread::spawn(move || {
      while let Ok(item) = rx.recv() {
        assert!(
          received_set.lock().unwrap().insert(item),
          "duplicate item received"
        );
        received_count.fetch_add(1, AtomicOrdering::Relaxed);
      }
    }));
  }

  let mut producers = Vec::new();
  for p_id in 0..num_producers {
    let tx = tx.clone();
    producers.push(thread::spawn(move || {
      for i in 0..items_per_producer {
        tx.send(p_id * items_per_producer + i).unwrap();
      }
    }));
  }

  for handle in producers {
    handle.join().expect("producer thread panicked");
  }
  // Every value is in (buffer, or already received); closing now must not
  // lose any of them.
  tx.close();
  for handle in consumers {
    handle.join().expect("consumer thread panicked");
  }

  assert_eq!(received_count.load(AtomicOrdering::Relaxed), total_expected);
  assert_eq!(received_set.lock().unwrap().len(), total_expected);
}

// --- Constructor ---

#[test]
fn zero_capacity_fails() {
  assert_eq!(bounded::<u64>(0).unwrap_err(), CapacityError);
}

// --- Buffer fill and drain (spec scenario: capacity 2) ---

#[test]
fn fill_drain_interleaved() {
  let (tx, rx) = bounded(2).unwrap();
  tx.send(1).unwrap();
  tx.send(2).unwrap();
  assert!(matches!(tx.try_send(3), Err(TrySendError::Full(3))));
  assert_eq!(rx.recv().unwrap(), 1);
  assert!(tx.try_send(3).is_ok());
  assert_eq!(rx.recv().unwrap(), 2);
  assert_eq!(rx.recv().unwrap(), 3);
}

// --- Rendezvous ---

#[test]
fn parked_receiver_gets_direct_handoff() {
  let (tx, rx) = bounded(1).unwrap();
  let probe = tx.clone();

  let receiver = thread::spawn(move || rx.recv().unwrap());
  thread::sleep(SETTLE);

  tx.send(42).unwrap();
  assert_eq!(receiver.join().unwrap(), 42);
  assert!(probe.is_empty());
}

// --- FIFO through parked senders ---

#[test]
fn order_survives_parked_senders() {
  let (tx, rx) = bounded(2).unwrap();
  tx.send(1).unwrap();
  tx.send(2).unwrap();

  // Two senders park on the full buffer, one after the other.
  let tx3 = tx.clone();
  let first_parked = thread::spawn(move || tx3.send(3).unwrap());
  thread::sleep(SETTLE);
  let tx4 = tx.clone();
  let second_parked = thread::spawn(move || tx4.send(4).unwrap());
  thread::sleep(SETTLE);

  // Each receive backfills one parked sender; global order holds.
  assert_eq!(rx.recv().unwrap(), 1);
  assert_eq!(rx.recv().unwrap(), 2);
  assert_eq!(rx.recv().unwrap(), 3);
  assert_eq!(rx.recv().unwrap(), 4);
  first_parked.join().unwrap();
  second_parked.join().unwrap();
}

#[test]
fn single_producer_order_is_preserved() {
  let (tx, rx) = bounded(4).unwrap();
  let producer = thread::spawn(move || {
    for i in 0..ITEMS_HIGH {
      tx.send(i).unwrap();
    }
  });
  for i in 0..ITEMS_HIGH {
    assert_eq!(rx.recv().unwrap(), i);
  }
  producer.join().unwrap();
}

// --- Capacity is never exceeded ---

#[test]
fn observed_len_never_exceeds_capacity() {
  let capacity = 3;
  let (tx, rx) = bounded(capacity).unwrap();
  let probe = rx.clone();
  let stop = Arc::new(AtomicUsize::new(0));

  let prober = {
    let stop = Arc::clone(&stop);
    thread::spawn(move || {
      while stop.load(AtomicOrdering::Relaxed) == 0 {
        assert!(probe.len() <= capacity, "buffer exceeded its capacity");
      }
    })
  };

  let producer = thread::spawn(move || {
    for i in 0..ITEMS_HIGH {
      tx.send(i).unwrap();
    }
  });
  let consumer = thread::spawn(move || {
    for _ in 0..ITEMS_HIGH {
      rx.recv().unwrap();
    }
  });

  producer.join().unwrap();
  consumer.join().unwrap();
  stop.store(1, AtomicOrdering::Relaxed);
  prober.join().unwrap();
}

// --- Wakeup of a parked receiver (no lost wakeups) ---

#[test]
fn parked_receiver_wakes_on_send() {
  let (tx, rx) = bounded(1).unwrap();
  let barrier = Arc::new(Barrier::new(2));
  let barrier2 = Arc::clone(&barrier);

  let receiver = thread::spawn(move || {
    barrier2.wait();
    rx.recv().unwrap()
  });

  barrier.wait();
  thread::sleep(SETTLE);
  tx.send(5).unwrap();
  // join() hanging here would be the lost wakeup.
  assert_eq!(receiver.join().unwrap(), 5);
}

// --- Close semantics ---

#[test]
fn close_cancels_parked_receivers() {
  let (tx, rx) = bounded::<u32>(1).unwrap();
  let rx2 = rx.clone();

  let first = thread::spawn(move || rx.recv());
  let second = thread::spawn(move || rx2.recv());
  thread::sleep(SETTLE);

  tx.close();
  assert_eq!(first.join().unwrap(), Err(RecvError::Closed));
  assert_eq!(second.join().unwrap(), Err(RecvError::Closed));
}

#[test]
fn close_preserves_buffered_values_in_order() {
  let (tx, rx) = bounded(3).unwrap();
  tx.send(1).unwrap();
  tx.send(2).unwrap();
  tx.close();

  assert_eq!(rx.recv().unwrap(), 1);
  assert_eq!(rx.recv().unwrap(), 2);
  assert_eq!(rx.recv(), Err(RecvError::Closed));
}

#[test]
fn close_keeps_parked_senders_drainable() {
  let (tx, rx) = bounded(1).unwrap();
  tx.send(1).unwrap();

  let tx2 = tx.clone();
  let parked = thread::spawn(move || tx2.send(2));
  thread::sleep(SETTLE);

  tx.close();
  assert_eq!(tx.send(3), Err(SendError::Closed));

  // The in-flight send is still honored after close, in send order.
  assert_eq!(rx.recv().unwrap(), 1);
  assert_eq!(rx.recv().unwrap(), 2);
  assert_eq!(parked.join().unwrap(), Ok(()));
  assert_eq!(rx.recv(), Err(RecvError::Closed));
}

#[test]
fn close_twice_equals_close_once() {
  let (tx, rx) = bounded(2).unwrap();
  tx.send(1).unwrap();
  tx.close();
  tx.close();
  assert!(tx.is_closed());
  assert_eq!(rx.recv().unwrap(), 1);
  assert_eq!(rx.recv(), Err(RecvError::Closed));
}

#[test]
fn no_send_succeeds_after_close() {
  let (tx, rx) = bounded(2).unwrap();
  tx.close();
  assert!(tx.is_closed());
  assert_eq!(tx.send(1), Err(SendError::Closed));
  assert!(matches!(tx.try_send(2), Err(TrySendError::Closed(2))));
  assert_eq!(rx.try_recv(), Err(TryRecvError::Closed));
}

#[test]
fn try_recv_reports_empty_while_open() {
  let (tx, rx) = bounded::<u8>(1).unwrap();
  assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
  drop(tx);
  // Dropping handles never closes the channel; closure is explicit.
  assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
  assert!(!rx.is_closed());
}

// --- Conservation at quiescence ---

#[test]
fn every_accepted_value_is_accounted_for() {
  let (tx, rx) = bounded(4).unwrap();
  let sent = Arc::new(AtomicUsize::new(0));
  let received = Arc::new(AtomicUsize::new(0));

  let mut producers = Vec::new();
  for p_id in 0..3 {
    let tx = tx.clone();
    let sent = Arc::clone(&sent);
    producers.push(thread::spawn(move || {
      for i in 0..ITEMS_MEDIUM {
        tx.send(p_id * ITEMS_MEDIUM + i).unwrap();
        sent.fetch_add(1, AtomicOrdering::Relaxed);
      }
    }));
  }

  let consumer = {
    let rx = rx.clone();
    let received = Arc::clone(&received);
    thread::spawn(move || {
      while rx.recv().is_ok() {
        received.fetch_add(1, AtomicOrdering::Relaxed);
      }
    })
  };

  for handle in producers {
    handle.join().unwrap();
  }
  tx.close();
  consumer.join().unwrap();

  // Quiescent: nothing buffered, nothing parked.
  assert_eq!(sent.load(AtomicOrdering::Relaxed), 3 * ITEMS_MEDIUM);
  assert_eq!(received.load(AtomicOrdering::Relaxed), 3 * ITEMS_MEDIUM);
  assert_eq!(rx.len(), 0);
}

// --- Contended suites ---

#[test]
fn stress_1p_1c() {
  run_sync_stress(1, 1, ITEMS_HIGH, 16);
}

#[test]
fn stress_mp_1c() {
  run_sync_stress(4, 1, ITEMS_MEDIUM, 16);
}

#[test]
fn stress_1p_mc() {
  run_sync_stress(1, 4, ITEMS_HIGH, 16);
}

#[test]
fn stress_mp_mc_small_buffer() {
  run_sync_stress(4, 4, ITEMS_MEDIUM, 2);
}

#[test]
fn stress_mixed_blocking_and_try_ops() {
  use rand::Rng;

  let (tx, rx) = bounded(4).unwrap();
  let total = 2 * ITEMS_MEDIUM;
  let received = Arc::new(AtomicUsize::new(0));

  let mut producers = Vec::new();
  for p_id in 0..2 {
    let tx = tx.clone();
    producers.push(thread::spawn(move || {
      let mut rng = rand::thread_rng();
      for i in 0..ITEMS_MEDIUM {
        let mut item = p_id * ITEMS_MEDIUM + i;
        // Alternate randomly between the blocking and spinning paths.
        if rng.gen_bool(0.5) {
          tx.send(item).unwrap();
        } else {
          loop {
            match tx.try_send(item) {
              Ok(()) => break,
              Err(TrySendError::Full(rejected)) => {
                item = rejected;
                thread::yield_now();
              }
              Err(TrySendError::Closed(_)) => panic!("channel closed mid-stress"),
            }
          }
        }
      }
    }));
  }

  let mut consumers = Vec::new();
  for _ in 0..2 {
    let rx = rx.clone();
    let received = Arc::clone(&received);
    consumers.push(thread::spawn(move || {
      let mut rng = rand::thread_rng();
      loop {
        let got = if rng.gen_bool(0.5) {
          rx.recv().is_ok()
        } else {
          match rx.try_recv() {
            Ok(_) => true,
            Err(TryRecvError::Empty) => {
              thread::yield_now();
              continue;
            }
            Err(TryRecvError::Closed) => false,
          }
        };
        if !got {
          return;
        }
        received.fetch_add(1, AtomicOrdering::Relaxed);
      }
    }));
  }

  for handle in producers {
    handle.join().unwrap();
  }
  tx.close();
  for handle in consumers {
    handle.join().unwrap();
  }
  assert_eq!(received.load(AtomicOrdering::Relaxed), total);
}
