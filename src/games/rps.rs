use rand::seq::SliceRandom;
use rand::Rng;

use super::Outcome;
use crate::model::StatDelta;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Hand {
    Rock,
    Paper,
    Scissors,
}

impl Hand {
    pub(crate) const ALL: [Hand; 3] = [Hand::Rock, Hand::Paper, Hand::Scissors];

    pub(crate) fn beats(self, other: Hand) -> bool {
        matches!(
            (self, other),
            (Hand::Rock, Hand::Scissors) | (Hand::Scissors, Hand::Paper) | (Hand::Paper, Hand::Rock)
        )
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Hand::Rock => "rock",
            Hand::Paper => "paper",
            Hand::Scissors => "scissors",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RoundResult {
    Win,
    Draw,
    Loss,
}

pub(crate) fn judge(player: Hand, opponent: Hand) -> RoundResult {
    if player == opponent {
        RoundResult::Draw
    } else if player.beats(opponent) {
        RoundResult::Win
    } else {
        RoundResult::Loss
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Round {
    pub(crate) player: Hand,
    pub(crate) opponent: Hand,
    pub(crate) result: RoundResult,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct RpsGame {
    pub(crate) last: Option<Round>,
    pub(crate) wins: u32,
    pub(crate) draws: u32,
    pub(crate) losses: u32,
}

impl RpsGame {
    pub(crate) fn play(&mut self, player: Hand, rng: &mut impl Rng) -> Outcome {
        let opponent = *Hand::ALL.choose(rng).unwrap_or(&Hand::Rock);
        self.resolve(player, opponent)
    }

    fn resolve(&mut self, player: Hand, opponent: Hand) -> Outcome {
        let result = judge(player, opponent);
        self.last = Some(Round {
            player,
            opponent,
            result,
        });
        let (happiness, verdict) = match result {
            RoundResult::Win => {
                self.wins += 1;
                (7.0, "won")
            }
            RoundResult::Draw => {
                self.draws += 1;
                (2.0, "drew")
            }
            RoundResult::Loss => {
                self.losses += 1;
                (-3.0, "lost")
            }
        };
        Outcome::new(
            StatDelta {
                happiness,
                energy: -1.0,
                ..StatDelta::default()
            },
            format!(
                "Rock-paper-scissors: {} vs {}, you {verdict}.",
                player.label(),
                opponent.label()
            ),
        )
    }
}
