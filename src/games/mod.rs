//! Mini-games. Each one is a small state machine that knows nothing about
//! the pet; a finished move hands back an [`Outcome`] for the stat engine.

mod quiz;
mod reflex;
mod rps;
mod treasure;

pub(crate) use quiz::{QuizGame, ADVANCE_DELAY_MS as QUIZ_ADVANCE_MS};
pub(crate) use reflex::{ReflexGame, ReflexPhase};
pub(crate) use rps::{Hand, RoundResult, RpsGame};
pub(crate) use treasure::{TreasureGame, TreasureState, GRID_SIZE};

use crate::model::StatDelta;

/// What a finished move does to the pet.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Outcome {
    pub(crate) delta: StatDelta,
    pub(crate) message: String,
}

impl Outcome {
    pub(crate) fn new(delta: StatDelta, message: impl Into<String>) -> Self {
        Self {
            delta,
            message: message.into(),
        }
    }
}
