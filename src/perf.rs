//! Performance instrumentation for the hot paths of a prompt
//!
//! This module provides timing utilities for measuring:
//! - Filter recompute time over the candidate set
//! - Command dispatch latency
//! - Redraw time of the surface
//!
//! Slow operations are always logged as warnings. With the `perf` feature
//! every measurement is logged at debug level.

use std::time::Instant;

use crate::logging;

#[cfg(test)]
thread_local! {
    static GUARDS_STARTED: std::cell::RefCell<Vec<&'static str>> =
        const { std::cell::RefCell::new(Vec::new()) };
}

/// How many guards for `operation` this thread has started.
#[cfg(test)]
pub(crate) fn started(operation: &str) -> usize {
    GUARDS_STARTED.with(|ops| ops.borrow().iter().filter(|op| **op == operation).count())
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Threshold for a "slow" filter recompute (microseconds)
const SLOW_FILTER_THRESHOLD_US: u128 = 8_000; // 8ms

/// Threshold for "slow" command dispatch (microseconds)
const SLOW_DISPATCH_THRESHOLD_US: u128 = 16_666; // ~16ms (60fps frame budget)

/// Threshold for a "slow" redraw (microseconds)
const SLOW_RENDER_THRESHOLD_US: u128 = 16_666;

// =============================================================================
// TIMING GUARD (RAII pattern for timing)
// =============================================================================

/// RAII guard for timing operations - logs when dropped
pub struct TimingGuard {
    operation: &'static str,
    start: Instant,
    threshold_us: u128,
}

impl TimingGuard {
    /// Create a new timing guard
    pub fn new(operation: &'static str, threshold_us: u128) -> Self {
        #[cfg(test)]
        GUARDS_STARTED.with(|ops| ops.borrow_mut().push(operation));
        Self {
            operation,
            start: Instant::now(),
            threshold_us,
        }
    }

    /// Create a timing guard for a filter recompute
    pub fn filter() -> Self {
        Self::new("filter", SLOW_FILTER_THRESHOLD_US)
    }

    /// Create a timing guard for a dispatched command
    pub fn dispatch() -> Self {
        Self::new("dispatch", SLOW_DISPATCH_THRESHOLD_US)
    }

    /// Create a timing guard for a surface redraw
    pub fn render() -> Self {
        Self::new("render", SLOW_RENDER_THRESHOLD_US)
    }

    pub fn elapsed_us(&self) -> u128 {
        self.start.elapsed().as_micros()
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let duration_us = self.elapsed_us();
        if duration_us > self.threshold_us || cfg!(feature = "perf") {
            logging::log_perf(self.operation, duration_us, self.threshold_us);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_timing_guard_measures_elapsed() {
        let guard = TimingGuard::filter();
        thread::sleep(Duration::from_micros(200));
        assert!(guard.elapsed_us() >= 200);
    }

    #[test]
    fn test_started_counts_per_operation() {
        let renders = started("render");
        drop(TimingGuard::render());
        drop(TimingGuard::filter());
        assert_eq!(started("render"), renders + 1);
    }

    #[test]
    fn test_timing_guard_drop_over_threshold() {
        // Just ensure the slow path doesn't panic
        {
            let _guard = TimingGuard::new("test_slow", 0);
            thread::sleep(Duration::from_micros(100));
        }
    }
}
