//! Cancelable one-shot deadlines.
//!
//! The engine never spawns timer threads. Each timer is a [`Deadline`] owned
//! by the component that needs it and is checked from the host's frame loop
//! via `tick(now)`. Re-arming replaces the previous deadline, so a timer can
//! never fire stale.

use std::time::Duration;

/// A one-shot deadline that can be armed, re-armed and cancelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Duration>,
}

impl Deadline {
    pub const fn new() -> Self {
        Self { at: None }
    }

    /// Arms the deadline `delay` after `now`, replacing any previous one.
    pub fn arm(&mut self, now: Duration, delay: Duration) {
        self.at = Some(now + delay);
    }

    pub fn cancel(&mut self) {
        self.at = None;
    }

    pub fn is_armed(&self) -> bool {
        self.at.is_some()
    }

    /// Time left until the deadline, or `None` when disarmed.
    pub fn remaining(&self, now: Duration) -> Option<Duration> {
        self.at.map(|at| at.saturating_sub(now))
    }

    /// Returns true exactly once, the first time it is polled at or after the
    /// deadline. The deadline is disarmed when it fires.
    pub fn fire(&mut self, now: Duration) -> bool {
        match self.at {
            Some(at) if now >= at => {
                self.at = None;
                true
            }
            _ => false,
        }
    }
}

/// A value shown for a fixed time and then dismissed.
///
/// Used for on-screen feedback such as the double-tap seek badge or the
/// volume/brightness bar.
#[derive(Debug, Clone)]
pub struct Transient<T> {
    value: Option<T>,
    deadline: Deadline,
    ttl: Duration,
}

impl<T> Transient<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            value: None,
            deadline: Deadline::new(),
            ttl,
        }
    }

    /// Shows `value`, restarting the dismiss timer.
    pub fn show(&mut self, value: T, now: Duration) {
        self.value = Some(value);
        self.deadline.arm(now, self.ttl);
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Dismisses the value if its time is up. Returns true when it was dismissed.
    pub fn tick(&mut self, now: Duration) -> bool {
        if self.deadline.fire(now) {
            self.value = None;
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.value = None;
        self.deadline.cancel();
    }

    pub fn remaining(&self, now: Duration) -> Option<Duration> {
        self.deadline.remaining(now)
    }
}

/// Returns the earliest of several optional wake-up delays.
pub fn earliest(delays: impl IntoIterator<Item = Option<Duration>>) -> Option<Duration> {
    delays.into_iter().flatten().min()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_deadline_fires_once() {
        let mut d = Deadline::new();
        d.arm(ms(0), ms(300));
        assert!(!d.fire(ms(299)));
        assert!(d.fire(ms(300)));
        assert!(!d.fire(ms(301)));
        assert!(!d.is_armed());
    }

    #[test]
    fn test_rearm_replaces_previous_deadline() {
        let mut d = Deadline::new();
        d.arm(ms(0), ms(300));
        d.arm(ms(200), ms(300));
        assert!(!d.fire(ms(400)));
        assert!(d.fire(ms(500)));
    }

    #[test]
    fn test_cancelled_deadline_never_fires() {
        let mut d = Deadline::new();
        d.arm(ms(0), ms(10));
        d.cancel();
        assert!(!d.fire(ms(1000)));
        assert_eq!(d.remaining(ms(0)), None);
    }

    #[test]
    fn test_transient_dismisses_after_ttl() {
        let mut t = Transient::new(ms(600));
        t.show(5, ms(100));
        assert_eq!(t.get(), Some(&5));
        assert!(!t.tick(ms(699)));
        assert!(t.tick(ms(700)));
        assert_eq!(t.get(), None);
    }

    #[test]
    fn test_earliest() {
        assert_eq!(earliest([None, Some(ms(5)), Some(ms(2))]), Some(ms(2)));
        assert_eq!(earliest([None, None]), None);
    }
}
