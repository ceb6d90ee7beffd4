//! Cancellable delayed recompute for query edits.
//!
//! The event loop owns a [`Debouncer`] and asks it how long it may sleep.
//! Scheduling replaces any pending payload and pushes the deadline out, so at
//! most one recompute is ever pending. A debouncer without a delay fires
//! immediately, which keeps the loop code identical for both configurations.

use std::time::{Duration, Instant};

pub struct Debouncer<T> {
    delay: Option<Duration>,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Option<Duration>) -> Self {
        Debouncer {
            delay,
            pending: None,
        }
    }

    /// Queue `payload`, replacing whatever was pending.
    ///
    /// Returns the payload right back when there is no delay to wait for.
    pub fn schedule(&mut self, payload: T, now: Instant) -> Option<T> {
        match self.delay {
            Some(delay) => {
                self.pending = Some((now + delay, payload));
                None
            }
            None => {
                self.pending = None;
                Some(payload)
            }
        }
    }

    /// Take the payload if its deadline has passed.
    pub fn fire_if_due(&mut self, now: Instant) -> Option<T> {
        let due = matches!(&self.pending, Some((deadline, _)) if *deadline <= now);
        if due {
            self.flush()
        } else {
            None
        }
    }

    /// Take the payload regardless of its deadline.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(_, payload)| payload)
    }

    /// Drop the pending payload without running it.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(deadline, _)| *deadline)
    }

    /// How long the loop may block before the pending payload is due.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}
