use std::collections::HashMap;

/// Timer slots. At most one task per kind is pending at any time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum TaskKind {
    Decay,
    Clock,
    Animation,
    ReflexGo,
    QuizAdvance,
}

#[derive(Clone, Copy, Debug)]
struct Pending {
    due_ms: u64,
    every_ms: Option<u64>,
    generation: u64,
}

/// Cancel-on-supersede timers driven by an external millisecond clock.
///
/// Scheduling a kind that is already pending replaces the old task, so a
/// stale callback can never fire after a newer one was requested.
#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    pending: HashMap<TaskKind, Pending>,
    generation: u64,
}

impl Scheduler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn once(&mut self, kind: TaskKind, now_ms: u64, delay_ms: u64) -> u64 {
        self.insert(kind, now_ms.saturating_add(delay_ms), None)
    }

    pub(crate) fn every(&mut self, kind: TaskKind, now_ms: u64, period_ms: u64) -> u64 {
        let period = period_ms.max(1);
        self.insert(kind, now_ms.saturating_add(period), Some(period))
    }

    fn insert(&mut self, kind: TaskKind, due_ms: u64, every_ms: Option<u64>) -> u64 {
        self.generation += 1;
        let previous = self.pending.insert(
            kind,
            Pending {
                due_ms,
                every_ms,
                generation: self.generation,
            },
        );
        if previous.is_some() {
            log::trace!("superseded pending {kind:?} task");
        }
        self.generation
    }

    pub(crate) fn cancel(&mut self, kind: TaskKind) -> bool {
        self.pending.remove(&kind).is_some()
    }

    #[cfg(test)]
    pub(crate) fn is_pending(&self, kind: TaskKind) -> bool {
        self.pending.contains_key(&kind)
    }

    #[cfg(test)]
    pub(crate) fn generation(&self, kind: TaskKind) -> Option<u64> {
        self.pending.get(&kind).map(|p| p.generation)
    }

    /// Fires everything due at `now_ms`, earliest first; ties go in the order
    /// they were scheduled. A repeating task that fell several periods behind
    /// fires once per missed period.
    pub(crate) fn poll(&mut self, now_ms: u64) -> Vec<TaskKind> {
        let mut fired: Vec<(u64, u64, TaskKind)> = Vec::new();

        for (kind, task) in self.pending.iter_mut() {
            match task.every_ms {
                Some(period) => {
                    while task.due_ms <= now_ms {
                        fired.push((task.due_ms, task.generation, *kind));
                        task.due_ms = task.due_ms.saturating_add(period);
                    }
                }
                None => {
                    if task.due_ms <= now_ms {
                        fired.push((task.due_ms, task.generation, *kind));
                    }
                }
            }
        }

        self.pending
            .retain(|_, task| task.every_ms.is_some() || task.due_ms > now_ms);

        fired.sort_by_key(|(due, generation, _)| (*due, *generation));
        fired.into_iter().map(|(_, _, kind)| kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn once_fires_exactly_once() {
        let mut s = Scheduler::new();
        s.once(TaskKind::Animation, 0, 2000);
        assert!(s.poll(1999).is_empty());
        assert_eq!(s.poll(2000), vec![TaskKind::Animation]);
        assert!(s.poll(10_000).is_empty());
        assert!(!s.is_pending(TaskKind::Animation));
    }

    #[test]
    fn rescheduling_supersedes_the_pending_task() {
        let mut s = Scheduler::new();
        let first = s.once(TaskKind::Animation, 0, 2000);
        let second = s.once(TaskKind::Animation, 1500, 2000);
        assert_ne!(first, second);
        assert_eq!(s.generation(TaskKind::Animation), Some(second));
        // The first deadline passes silently.
        assert!(s.poll(2500).is_empty());
        assert_eq!(s.poll(3500), vec![TaskKind::Animation]);
    }

    #[test]
    fn cancel_drops_pending_task() {
        let mut s = Scheduler::new();
        s.once(TaskKind::ReflexGo, 0, 100);
        assert!(s.cancel(TaskKind::ReflexGo));
        assert!(!s.cancel(TaskKind::ReflexGo));
        assert!(s.poll(1000).is_empty());
    }

    #[test]
    fn repeating_task_catches_up_and_stays_armed() {
        let mut s = Scheduler::new();
        s.every(TaskKind::Decay, 0, 12_000);
        assert_eq!(s.poll(36_500), vec![TaskKind::Decay; 3]);
        assert!(s.is_pending(TaskKind::Decay));
        assert_eq!(s.poll(48_000), vec![TaskKind::Decay]);
    }

    #[test]
    fn fired_tasks_come_out_in_due_order() {
        let mut s = Scheduler::new();
        s.once(TaskKind::QuizAdvance, 0, 1800);
        s.once(TaskKind::Animation, 0, 500);
        s.every(TaskKind::Clock, 0, 1000);
        assert_eq!(
            s.poll(2000),
            vec![
                TaskKind::Animation,
                TaskKind::Clock,
                TaskKind::QuizAdvance,
                TaskKind::Clock
            ]
        );
    }
}
