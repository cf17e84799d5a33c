// src/telemetry.rs

//! Feature-gated diagnostics counters.
//!
//! With the `telemetry` feature enabled the core counts parks, handoffs
//! and notifications per location; without it every call compiles to a
//! no-op. Meant for debugging wakeup behavior in stress runs, not for
//! production metrics.

/// Live collector, compiled in with the `telemetry` feature.
#[cfg(feature = "telemetry")]
pub mod enabled {
  use std::collections::HashMap;
  use std::sync::Mutex;

  type CounterKey = (&'static str, &'static str); // (location, counter)

  lazy_static::lazy_static! {
    static ref COUNTERS: Mutex<HashMap<CounterKey, u64>> = Mutex::new(HashMap::new());
  }

  /// Bumps `counter` at `location` by one.
  pub fn increment_counter_fn(location: &'static str, counter: &'static str) {
    if let Ok(mut counters) = COUNTERS.lock() {
      *counters.entry((location, counter)).or_insert(0) += 1;
    }
  }

  /// Returns a sorted snapshot of all counters.
  pub fn snapshot_fn() -> Vec<(&'static str, &'static str, u64)> {
    let mut rows: Vec<_> = match COUNTERS.lock() {
      Ok(counters) => counters.iter().map(|(&(loc, ctr), &n)| (loc, ctr, n)).collect(),
      Err(_) => Vec::new(),
    };
    rows.sort();
    rows
  }

  /// Prints every counter to stdout.
  pub fn print_report_fn() {
    println!("--- weir telemetry report ---");
    for (location, counter, count) in snapshot_fn() {
      println!("  {:<20} {:<24} {}", location, counter, count);
    }
    println!("--- end of report ---");
  }

  /// Clears all counters.
  pub fn reset_fn() {
    if let Ok(mut counters) = COUNTERS.lock() {
      counters.clear();
    }
  }
}

/// No-op shims, compiled in without the `telemetry` feature.
#[cfg(not(feature = "telemetry"))]
pub mod disabled {
  /// No-op.
  #[inline(always)]
  pub fn increment_counter_fn(_location: &'static str, _counter: &'static str) {}
  /// Always empty.
  #[inline(always)]
  pub fn snapshot_fn() -> Vec<(&'static str, &'static str, u64)> {
    Vec::new()
  }
  /// No-op.
  #[inline(always)]
  pub fn print_report_fn() {}
  /// No-op.
  #[inline(always)]
  pub fn reset_fn() {}
}

#[cfg(feature = "telemetry")]
pub use enabled::{
  increment_counter_fn as increment_counter, print_report_fn as print_report,
  reset_fn as reset, snapshot_fn as snapshot,
};

#[cfg(not(feature = "telemetry"))]
pub use disabled::{
  increment_counter_fn as increment_counter, print_report_fn as print_report,
  reset_fn as reset, snapshot_fn as snapshot,
};

#[cfg(all(test, feature = "telemetry"))]
mod tests {
  use super::*;

  #[test]
  fn counters_accumulate() {
    reset();
    increment_counter("here", "Things");
    increment_counter("here", "Things");
    increment_counter("there", "Other");
    let rows = snapshot();
    assert!(rows.contains(&("here", "Things", 2)));
    assert!(rows.contains(&("there", "Other", 1)));
  }
}
