use crate::games::{Hand, Outcome, ReflexPhase, QUIZ_ADVANCE_MS};
use crate::model::{Animation, GameKind, GameState, MoodPreset, Scene, StatDelta};
use crate::schedule::{Scheduler, TaskKind};
use rand::Rng;

pub(crate) const DECAY_PERIOD_MS: u64 = 12_000;
pub(crate) const CLOCK_PERIOD_MS: u64 = 60_000;
pub(crate) const ANIMATION_MS: u64 = 2_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PlayerAction {
    Feed,
    Play,
    Rest,
    SelectMood(MoodPreset),
}

struct WarningRule {
    low: f32,
    recover: f32,
    message: &'static str,
}

const HUNGER_WARNING: WarningRule = WarningRule {
    low: 25.0,
    recover: 40.0,
    message: "The tamagochi growls with hunger.",
};
const ENERGY_WARNING: WarningRule = WarningRule {
    low: 25.0,
    recover: 40.0,
    message: "The tamagochi is running low, time to rest.",
};
const HAPPINESS_WARNING: WarningRule = WarningRule {
    low: 30.0,
    recover: 45.0,
    message: "The tamagochi misses playing.",
};

/// Returns true when the warning should fire now.
fn latch(value: f32, latched: &mut bool, rule: &WarningRule) -> bool {
    if value <= rule.low && !*latched {
        *latched = true;
        true
    } else {
        if value > rule.recover && *latched {
            *latched = false;
        }
        false
    }
}

pub(crate) fn decay_delta(mood: MoodPreset) -> StatDelta {
    let mut d = StatDelta {
        hunger: -3.0,
        energy: -2.0,
        happiness: -2.0,
    };
    match mood {
        MoodPreset::Cheerful => {
            d.hunger -= 1.0;
            d.happiness += 0.5;
        }
        MoodPreset::Calm => d.energy += 0.7,
        MoodPreset::Nostalgic => d.happiness += 0.8,
        MoodPreset::Creative => {}
    }
    d
}

pub(crate) fn action_delta(action: PlayerAction, mood: MoodPreset) -> Option<StatDelta> {
    match action {
        PlayerAction::Feed => Some(StatDelta {
            hunger: if mood == MoodPreset::Cheerful { 20.0 } else { 18.0 },
            happiness: if mood == MoodPreset::Nostalgic { 8.0 } else { 6.0 },
            energy: 4.0,
        }),
        PlayerAction::Play => Some(StatDelta {
            happiness: if mood == MoodPreset::Cheerful { 14.0 } else { 12.0 },
            energy: if mood == MoodPreset::Creative { -3.0 } else { -6.0 },
            hunger: -4.0,
        }),
        PlayerAction::Rest => Some(StatDelta {
            energy: if mood == MoodPreset::Calm { 22.0 } else { 16.0 },
            hunger: -3.0,
            happiness: 4.0,
        }),
        PlayerAction::SelectMood(_) => None,
    }
}

impl GameState {
    pub(crate) fn add_activity(&mut self, message: impl Into<String>) {
        let now = self.now;
        self.log.push(message, now);
    }

    /// Clamped update followed by the warning check.
    pub(crate) fn change_stats(&mut self, delta: StatDelta) {
        self.stats.apply(delta);
        for message in self.check_warnings() {
            self.add_activity(message);
        }
    }

    fn check_warnings(&mut self) -> Vec<&'static str> {
        let mut fired = Vec::new();
        if latch(self.stats.hunger, &mut self.warnings.hunger, &HUNGER_WARNING) {
            fired.push(HUNGER_WARNING.message);
        }
        if latch(self.stats.energy, &mut self.warnings.energy, &ENERGY_WARNING) {
            fired.push(ENERGY_WARNING.message);
        }
        if latch(
            self.stats.happiness,
            &mut self.warnings.happiness,
            &HAPPINESS_WARNING,
        ) {
            fired.push(HAPPINESS_WARNING.message);
        }
        fired
    }

    pub(crate) fn apply(&mut self, action: PlayerAction, timers: &mut Scheduler, now_ms: u64) {
        if let Some(delta) = action_delta(action, self.mood) {
            self.change_stats(delta);
        }
        match action {
            PlayerAction::Feed => {
                self.care.meals += 1;
                self.add_activity("A tasty pixel lunch for the tamagochi.");
                self.animate(Animation::Eating, timers, now_ms);
            }
            PlayerAction::Play => {
                self.care.plays += 1;
                self.add_activity("You invited the tamagochi to play.");
                self.animate(Animation::Playing, timers, now_ms);
            }
            PlayerAction::Rest => {
                self.care.rests += 1;
                self.add_activity("You tucked it in for a little rest.");
                self.animate(Animation::Resting, timers, now_ms);
            }
            PlayerAction::SelectMood(mood) => {
                if mood != self.mood {
                    self.mood = mood;
                    self.add_activity(format!("Mood mode: {}.", mood.label()));
                    // A new preset starts a full decay period.
                    timers.every(TaskKind::Decay, now_ms, DECAY_PERIOD_MS);
                }
            }
        }
    }

    fn animate(&mut self, animation: Animation, timers: &mut Scheduler, now_ms: u64) {
        self.animation = animation;
        timers.once(TaskKind::Animation, now_ms, ANIMATION_MS);
    }

    pub(crate) fn tick_decay(&mut self) {
        self.change_stats(decay_delta(self.mood));
    }

    pub(crate) fn apply_outcome(&mut self, outcome: Outcome) {
        self.change_stats(outcome.delta);
        self.add_activity(outcome.message);
    }

    pub(crate) fn status_line(&self) -> String {
        let label = self.mood.label();
        let avg = self.stats.average();
        if avg >= 75.0 {
            format!("{label} mode: the little pixel creature is sparkling with joy!")
        } else if avg >= 55.0 {
            format!("{label}: balanced and curiously watching around.")
        } else if avg >= 35.0 {
            format!("{label}: a bit grumpy, some care would help.")
        } else {
            format!("{label}: alert! The tamagochi urgently needs attention.")
        }
    }

    /// Dispatches a fired timer. Clock ticks are handled by the caller since
    /// they touch the registry.
    pub(crate) fn on_timer(&mut self, kind: TaskKind, now_ms: u64, rng: &mut impl Rng) {
        match kind {
            TaskKind::Decay => self.tick_decay(),
            TaskKind::Animation => self.animation = Animation::Idle,
            TaskKind::ReflexGo => {
                self.reflex.signal(now_ms);
            }
            TaskKind::QuizAdvance => self.quiz.advance(rng),
            TaskKind::Clock => {}
        }
    }

    pub(crate) fn open_game(&mut self, kind: GameKind, timers: &mut Scheduler) {
        self.close_game(timers);
        self.scene = Scene::Game(kind);
    }

    /// Tears down per-game timers; a half-finished reflex round is dropped.
    pub(crate) fn close_game(&mut self, timers: &mut Scheduler) {
        timers.cancel(TaskKind::ReflexGo);
        if matches!(
            self.reflex.phase,
            ReflexPhase::Waiting | ReflexPhase::Ready { .. }
        ) {
            self.reflex.phase = ReflexPhase::Idle;
        }
        if matches!(self.scene, Scene::Game(_)) {
            self.scene = Scene::Main;
        }
    }

    pub(crate) fn reflex_press(&mut self, timers: &mut Scheduler, now_ms: u64, rng: &mut impl Rng) {
        if self.reflex.is_between_rounds() {
            let delay = self.reflex.start(rng);
            timers.once(TaskKind::ReflexGo, now_ms, delay);
            return;
        }
        if let Some(outcome) = self.reflex.click(now_ms) {
            timers.cancel(TaskKind::ReflexGo);
            self.apply_outcome(outcome);
        }
    }

    pub(crate) fn quiz_pick(&mut self, choice: usize, timers: &mut Scheduler, now_ms: u64) {
        if let Some(outcome) = self.quiz.guess(choice) {
            if self.quiz.locked {
                timers.once(TaskKind::QuizAdvance, now_ms, QUIZ_ADVANCE_MS);
            }
            self.apply_outcome(outcome);
        }
    }

    /// Digs a cell, or starts a new round if the last one is over.
    pub(crate) fn treasure_dig(&mut self, cell: usize, rng: &mut impl Rng) {
        if self.treasure.target_if_over().is_some() {
            self.treasure.reset(rng);
            return;
        }
        let fresh_cell = !self.treasure.revealed.get(cell).copied().unwrap_or(true);
        match self.treasure.guess(cell) {
            Some(outcome) => self.apply_outcome(outcome),
            None if fresh_cell => {
                let hint = if self.treasure.is_warm(cell) {
                    "Nothing here, but it feels warm!"
                } else {
                    "Nothing here, cold as ice."
                };
                self.notice = Some(hint.to_string());
            }
            None => {}
        }
    }

    pub(crate) fn rps_throw(&mut self, hand: Hand, rng: &mut impl Rng) {
        let outcome = self.rps.play(hand, rng);
        self.apply_outcome(outcome);
    }
}
