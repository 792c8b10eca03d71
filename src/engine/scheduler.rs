use std::fmt;

/// Handle returned by [`Scheduler::schedule`], used to cancel a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer {}", self.0)
    }
}

struct Timer<T> {
    id: TimerId,
    deadline: f64,
    task: T,
}

/// Deferred tasks keyed by deadline on the audio clock.
///
/// The scheduler never looks at a clock itself. The owner passes the current
/// time to [`drain_due`](Scheduler::drain_due), so time only moves when the
/// backend clock does and tests control it completely.
pub struct Scheduler<T> {
    next_id: u64,
    pending: Vec<Timer<T>>,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            pending: Vec::new(),
        }
    }

    /// Register `task` to run once the clock reaches `deadline`.
    pub fn schedule(&mut self, deadline: f64, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;

        // Keep sorted by (deadline, id); equal deadlines fire in schedule order.
        let idx = self.pending.partition_point(|t| t.deadline <= deadline);
        self.pending.insert(idx, Timer { id, deadline, task });
        id
    }

    /// Cancel a pending timer, returning its task if it had not fired yet.
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let idx = self.pending.iter().position(|t| t.id == id)?;
        Some(self.pending.remove(idx).task)
    }

    /// Remove and return every task whose deadline is at or before `now`,
    /// earliest first.
    pub fn drain_due(&mut self, now: f64) -> Vec<(TimerId, T)> {
        let due = self.pending.partition_point(|t| t.deadline <= now);
        self.pending
            .drain(..due)
            .map(|t| (t.id, t.task))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_deadline_order() {
        let mut s = Scheduler::new();
        s.schedule(2.0, "late");
        s.schedule(1.0, "early");
        s.schedule(1.0, "early-second");

        assert!(s.drain_due(0.5).is_empty());
        let fired: Vec<_> = s.drain_due(1.5).into_iter().map(|(_, t)| t).collect();
        assert_eq!(fired, vec!["early", "early-second"]);
        assert_eq!(s.len(), 1);
        assert_eq!(s.drain_due(2.0).len(), 1);
    }

    #[test]
    fn deadline_is_inclusive() {
        let mut s = Scheduler::new();
        s.schedule(1.0, ());
        assert_eq!(s.drain_due(1.0).len(), 1);
        assert!(s.is_empty());
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut s = Scheduler::new();
        let a = s.schedule(1.0, 'a');
        let b = s.schedule(1.0, 'b');

        assert_eq!(s.cancel(a), Some('a'));
        assert_eq!(s.cancel(a), None);
        assert_eq!(s.len(), 1);

        let fired = s.drain_due(10.0);
        assert_eq!(fired, vec![(b, 'b')]);
    }
}
