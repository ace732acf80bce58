use rand::Rng;

use super::Outcome;
use crate::model::StatDelta;

pub(crate) const GRID_SIZE: usize = 4;
pub(crate) const ATTEMPTS: u8 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TreasureState {
    Searching,
    Found,
    Lost,
}

#[derive(Clone, Debug)]
pub(crate) struct TreasureGame {
    target: usize,
    pub(crate) revealed: [bool; GRID_SIZE * GRID_SIZE],
    pub(crate) attempts_left: u8,
    pub(crate) state: TreasureState,
    pub(crate) streak: u32,
    pub(crate) best_streak: u32,
}

impl TreasureGame {
    pub(crate) fn new(rng: &mut impl Rng) -> Self {
        Self {
            target: rng.gen_range(0..GRID_SIZE * GRID_SIZE),
            revealed: [false; GRID_SIZE * GRID_SIZE],
            attempts_left: ATTEMPTS,
            state: TreasureState::Searching,
            streak: 0,
            best_streak: 0,
        }
    }

    /// New hidden cell; streaks carry over.
    pub(crate) fn reset(&mut self, rng: &mut impl Rng) {
        self.target = rng.gen_range(0..GRID_SIZE * GRID_SIZE);
        self.revealed = [false; GRID_SIZE * GRID_SIZE];
        self.attempts_left = ATTEMPTS;
        self.state = TreasureState::Searching;
    }

    /// Cell holding the treasure, only once the round is over.
    pub(crate) fn target_if_over(&self) -> Option<usize> {
        (self.state != TreasureState::Searching).then_some(self.target)
    }

    pub(crate) fn guess(&mut self, cell: usize) -> Option<Outcome> {
        if self.state != TreasureState::Searching
            || cell >= self.revealed.len()
            || self.revealed[cell]
        {
            return None;
        }
        self.revealed[cell] = true;
        self.attempts_left = self.attempts_left.saturating_sub(1);

        if cell == self.target {
            self.state = TreasureState::Found;
            self.streak += 1;
            self.best_streak = self.best_streak.max(self.streak);
            return Some(Outcome::new(
                StatDelta {
                    happiness: 10.0,
                    hunger: -2.0,
                    ..StatDelta::default()
                },
                format!("Dug up the treasure! Streak {}.", self.streak),
            ));
        }

        if self.attempts_left == 0 {
            self.state = TreasureState::Lost;
            self.streak = 0;
            return Some(Outcome::new(
                StatDelta {
                    happiness: -4.0,
                    ..StatDelta::default()
                },
                "The treasure stayed hidden this time.",
            ));
        }

        None
    }

    /// Chebyshev distance hint for the last miss: adjacent cells are "warm".
    pub(crate) fn is_warm(&self, cell: usize) -> bool {
        let (r0, c0) = (cell / GRID_SIZE, cell % GRID_SIZE);
        let (r1, c1) = (self.target / GRID_SIZE, self.target % GRID_SIZE);
        r0.abs_diff(r1).max(c0.abs_diff(c1)) == 1
    }
}
