//! Simulation clock and deferred-task queue.
//!
//! All deferred work in the core (validation passes, delayed corrections)
//! is posted to a [`TaskQueue`] keyed by the millisecond reading of a
//! [`SimClock`]. Nothing runs on wall-clock timers: the owner advances the
//! clock and drains whatever has come due, so every retry and delay is
//! reproducible in tests.

use std::collections::BTreeMap;

/// Monotonic simulation time in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct SimClock {
    now_ms: u64,
}

impl SimClock {
    /// A clock reading zero.
    pub const fn new() -> Self {
        Self { now_ms: 0 }
    }

    /// Current reading.
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Advance by `dt` seconds and return the new reading.
    ///
    /// Negative and non-finite steps are ignored; sub-millisecond steps
    /// are rounded to the nearest millisecond.
    pub fn advance_secs(&mut self, dt: f32) -> u64 {
        if dt.is_finite() && dt > 0.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let step = (f64::from(dt) * 1000.0).round() as u64;
            self.now_ms = self.now_ms.saturating_add(step);
        }
        self.now_ms
    }

    /// Advance by `ms` milliseconds and return the new reading.
    pub const fn advance_ms(&mut self, ms: u64) -> u64 {
        self.now_ms = self.now_ms.saturating_add(ms);
        self.now_ms
    }
}

/// Tasks ordered by due time, ties broken by insertion order.
#[derive(Debug, Clone)]
pub struct TaskQueue<T> {
    tasks: BTreeMap<(u64, u64), T>,
    next_seq: u64,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskQueue<T> {
    /// An empty queue.
    pub const fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Post `task` to run at `due_ms`.
    pub fn schedule(&mut self, due_ms: u64, task: T) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.tasks.insert((due_ms, seq), task);
    }

    /// Remove and return every task due at or before `now_ms`, earliest
    /// first.
    pub fn drain_due(&mut self, now_ms: u64) -> Vec<T> {
        let later = now_ms
            .checked_add(1)
            .map_or_else(BTreeMap::new, |bound| self.tasks.split_off(&(bound, 0)));
        let due = std::mem::replace(&mut self.tasks, later);
        due.into_values().collect()
    }

    /// Whether any task matches `pred`.
    pub fn any(&self, mut pred: impl FnMut(&T) -> bool) -> bool {
        self.tasks.values().any(|t| pred(t))
    }

    /// Drop tasks for which `keep` is false.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.tasks.retain(|_, t| keep(t));
    }

    /// Due time of the earliest task.
    pub fn next_due(&self) -> Option<u64> {
        self.tasks.keys().next().map(|(due, _)| *due)
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Drop every pending task.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_advances_in_milliseconds() {
        let mut clock = SimClock::new();
        assert_eq!(clock.advance_secs(0.016), 16);
        assert_eq!(clock.advance_secs(-1.0), 16);
        assert_eq!(clock.advance_secs(f32::NAN), 16);
        assert_eq!(clock.advance_ms(984), 1000);
        assert_eq!(clock.now_ms(), 1000);
    }

    #[test]
    fn drains_only_due_tasks_in_order() {
        let mut queue = TaskQueue::new();
        queue.schedule(300, "c");
        queue.schedule(100, "a");
        queue.schedule(100, "b");
        queue.schedule(500, "d");

        assert!(queue.drain_due(50).is_empty());
        assert_eq!(queue.drain_due(300), vec!["a", "b", "c"]);
        assert_eq!(queue.next_due(), Some(500));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn drain_at_max_time_takes_everything() {
        let mut queue = TaskQueue::new();
        queue.schedule(u64::MAX, 1);
        queue.schedule(3, 2);
        assert_eq!(queue.drain_due(u64::MAX), vec![2, 1]);
        assert!(queue.is_empty());
    }

    #[test]
    fn retain_and_clear() {
        let mut queue = TaskQueue::new();
        for i in 0..5 {
            queue.schedule(i, i);
        }
        queue.retain(|t| t % 2 == 0);
        assert_eq!(queue.len(), 3);
        assert!(queue.any(|t| *t == 4));
        queue.clear();
        assert!(queue.is_empty());
    }
}
