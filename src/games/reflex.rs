use rand::Rng;

use super::Outcome;
use crate::model::StatDelta;

pub(crate) const MIN_DELAY_MS: u64 = 1500;
pub(crate) const MAX_DELAY_MS: u64 = 4000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ReflexPhase {
    Idle,
    Waiting,
    Ready { shown_at_ms: u64 },
    Success { reaction_ms: u64 },
    TooEarly,
}

#[derive(Clone, Debug)]
pub(crate) struct ReflexGame {
    pub(crate) phase: ReflexPhase,
    pub(crate) best_ms: Option<u64>,
    pub(crate) rounds: u32,
}

impl Default for ReflexGame {
    fn default() -> Self {
        Self {
            phase: ReflexPhase::Idle,
            best_ms: None,
            rounds: 0,
        }
    }
}

impl ReflexGame {
    /// Whether a click would start a new round rather than answer one.
    pub(crate) fn is_between_rounds(&self) -> bool {
        matches!(
            self.phase,
            ReflexPhase::Idle | ReflexPhase::Success { .. } | ReflexPhase::TooEarly
        )
    }

    /// Enters the waiting phase and returns the delay before the signal.
    pub(crate) fn start(&mut self, rng: &mut impl Rng) -> u64 {
        self.phase = ReflexPhase::Waiting;
        self.rounds += 1;
        rng.gen_range(MIN_DELAY_MS..=MAX_DELAY_MS)
    }

    /// Timer callback. Ignored unless we are still waiting.
    pub(crate) fn signal(&mut self, now_ms: u64) -> bool {
        if let ReflexPhase::Waiting = self.phase {
            self.phase = ReflexPhase::Ready { shown_at_ms: now_ms };
            true
        } else {
            false
        }
    }

    pub(crate) fn click(&mut self, now_ms: u64) -> Option<Outcome> {
        match self.phase {
            ReflexPhase::Waiting => {
                self.phase = ReflexPhase::TooEarly;
                Some(Outcome::new(
                    StatDelta {
                        happiness: -3.0,
                        ..StatDelta::default()
                    },
                    "Jumped the gun in the reflex game.",
                ))
            }
            ReflexPhase::Ready { shown_at_ms } => {
                let reaction_ms = now_ms.saturating_sub(shown_at_ms);
                self.phase = ReflexPhase::Success { reaction_ms };
                let best = self.best_ms.map_or(reaction_ms, |b| b.min(reaction_ms));
                self.best_ms = Some(best);
                Some(Outcome::new(
                    StatDelta {
                        happiness: 8.0,
                        energy: -2.0,
                        ..StatDelta::default()
                    },
                    format!("Reflex test: {reaction_ms} ms."),
                ))
            }
            ReflexPhase::Idle | ReflexPhase::Success { .. } | ReflexPhase::TooEarly => None,
        }
    }
}
