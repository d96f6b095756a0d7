//! Round-robin dispatcher for low-frequency subsystems.
//!
//! Each frame the scheduler looks at exactly one registered system (the
//! one under its cursor) and runs it if that system's minimum interval has
//! elapsed since its last run. The cursor then moves on whether or not the
//! system ran, so per-frame cost is bounded by one system regardless of
//! how many are registered or due.

use tracing::trace;

/// A subsystem driven by the [`ThrottledScheduler`].
///
/// `C` is the context handed to every run (usually the simulation world).
/// Closures of the form `FnMut(&mut C, f32)` implement this directly.
pub trait ThrottledSystem<C> {
    /// Run once. `dt` is the seconds elapsed since this system last ran
    /// (or since registration, for the first run).
    fn run(&mut self, ctx: &mut C, dt: f32);
}

impl<C, F> ThrottledSystem<C> for F
where
    F: FnMut(&mut C, f32),
{
    fn run(&mut self, ctx: &mut C, dt: f32) {
        self(ctx, dt);
    }
}

struct Entry<C> {
    name: String,
    interval_ms: u64,
    last_run_ms: u64,
    system: Box<dyn ThrottledSystem<C>>,
}

/// What a single [`ThrottledScheduler::tick`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No systems are registered.
    Idle,
    /// The visited system was not due yet.
    Skipped {
        /// Name of the visited system.
        name: String,
    },
    /// The visited system ran.
    Ran {
        /// Name of the system.
        name: String,
    },
}

/// Round-robin scheduler over [`ThrottledSystem`]s.
pub struct ThrottledScheduler<C> {
    entries: Vec<Entry<C>>,
    cursor: usize,
}

impl<C> std::fmt::Debug for ThrottledScheduler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.entries.iter().map(|e| e.name.as_str()).collect();
        f.debug_struct("ThrottledScheduler")
            .field("systems", &names)
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl<C> Default for ThrottledScheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ThrottledScheduler<C> {
    /// An empty scheduler.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
        }
    }

    /// Register `system` under `name`, to run at most once every
    /// `interval_ms`. `now_ms` is the registration time.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        interval_ms: u64,
        now_ms: u64,
        system: impl ThrottledSystem<C> + 'static,
    ) {
        self.entries.push(Entry {
            name: name.into(),
            interval_ms,
            last_run_ms: now_ms,
            system: Box::new(system),
        });
    }

    /// Remove the system registered as `name`. Returns whether one existed.
    pub fn unregister(&mut self, name: &str) -> bool {
        let Some(index) = self.entries.iter().position(|e| e.name == name) else {
            return false;
        };
        self.entries.remove(index);
        if self.cursor > index {
            self.cursor = self.cursor.saturating_sub(1);
        }
        if self.cursor >= self.entries.len() {
            self.cursor = 0;
        }
        true
    }

    /// Visit the system under the cursor, run it if due, advance the
    /// cursor.
    pub fn tick(&mut self, ctx: &mut C, now_ms: u64) -> TickOutcome {
        let len = self.entries.len();
        let Some(entry) = self.entries.get_mut(self.cursor) else {
            self.cursor = 0;
            return TickOutcome::Idle;
        };
        self.cursor = self.cursor.saturating_add(1).checked_rem(len).unwrap_or(0);

        let since = now_ms.saturating_sub(entry.last_run_ms);
        if since < entry.interval_ms {
            return TickOutcome::Skipped {
                name: entry.name.clone(),
            };
        }

        #[allow(clippy::cast_precision_loss)]
        let dt = since as f32 / 1000.0;
        trace!(system = %entry.name, dt, "Throttled system run");
        entry.system.run(ctx, dt);
        entry.last_run_ms = now_ms;
        TickOutcome::Ran {
            name: entry.name.clone(),
        }
    }

    /// Index of the next system to be visited.
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of registered systems.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no systems are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names in visiting order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Drop every system.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log(Vec<(&'static str, f32)>);

    fn make_scheduler(intervals: &[(&'static str, u64)]) -> ThrottledScheduler<Log> {
        let mut scheduler = ThrottledScheduler::new();
        for &(name, interval) in intervals {
            scheduler.register(name, interval, 0, move |log: &mut Log, dt: f32| {
                log.0.push((name, dt));
            });
        }
        scheduler
    }

    #[test]
    fn empty_scheduler_is_idle() {
        let mut scheduler: ThrottledScheduler<Log> = ThrottledScheduler::new();
        assert_eq!(scheduler.tick(&mut Log::default(), 0), TickOutcome::Idle);
    }

    #[test]
    fn due_systems_each_run_once_per_round() {
        let mut scheduler = make_scheduler(&[("a", 10), ("b", 10), ("c", 10)]);
        let mut log = Log::default();
        for _ in 0..3 {
            scheduler.tick(&mut log, 100);
        }
        let names: Vec<&str> = log.0.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(scheduler.cursor(), 0);
    }

    #[test]
    fn cursor_advances_past_systems_not_yet_due() {
        let mut scheduler = make_scheduler(&[("slow", 1000), ("fast", 10)]);
        let mut log = Log::default();
        assert_eq!(
            scheduler.tick(&mut log, 50),
            TickOutcome::Skipped {
                name: "slow".to_owned()
            }
        );
        assert_eq!(
            scheduler.tick(&mut log, 50),
            TickOutcome::Ran {
                name: "fast".to_owned()
            }
        );
        assert_eq!(scheduler.cursor(), 0);
    }

    #[test]
    fn dt_is_time_since_last_run() {
        let mut scheduler = make_scheduler(&[("only", 100)]);
        let mut log = Log::default();
        scheduler.tick(&mut log, 250);
        scheduler.tick(&mut log, 300);
        scheduler.tick(&mut log, 400);
        assert_eq!(log.0.len(), 2);
        assert!(log.0.first().is_some_and(|(_, dt)| (dt - 0.25).abs() < 1e-6));
        assert!(log.0.get(1).is_some_and(|(_, dt)| (dt - 0.15).abs() < 1e-6));
    }

    #[test]
    fn unregister_keeps_cursor_in_bounds() {
        let mut scheduler = make_scheduler(&[("a", 0), ("b", 0), ("c", 0)]);
        let mut log = Log::default();
        scheduler.tick(&mut log, 0);
        scheduler.tick(&mut log, 0);
        assert_eq!(scheduler.cursor(), 2);
        assert!(scheduler.unregister("c"));
        assert_eq!(scheduler.cursor(), 0);
        assert!(!scheduler.unregister("c"));
        assert_eq!(scheduler.names(), vec!["a", "b"]);
    }
}
