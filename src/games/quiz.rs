use rand::seq::SliceRandom;
use rand::Rng;

use super::Outcome;
use crate::model::StatDelta;

pub(crate) const ADVANCE_DELAY_MS: u64 = 1800;

struct Question {
    prompt: &'static str,
    answer: &'static str,
    decoys: [&'static str; 3],
}

const QUESTIONS: &[Question] = &[
    Question {
        prompt: "What cheers up a tamagochi after a rainy day?",
        answer: "A game of pixel ball",
        decoys: ["A cold bath", "Silence", "Tax forms"],
    },
    Question {
        prompt: "When the energy bar blinks red, you should...",
        answer: "Tuck it in for a nap",
        decoys: ["Play tag", "Feed it coffee", "Turn up the music"],
    },
    Question {
        prompt: "Which snack does a hungry tamagochi love most?",
        answer: "Warm pixel dumplings",
        decoys: ["Loose screws", "Dust bunnies", "Static noise"],
    },
    Question {
        prompt: "How does a calm tamagochi like to spend the evening?",
        answer: "Stargazing with lo-fi beats",
        decoys: ["Running laps", "Arguing online", "Juggling knives"],
    },
    Question {
        prompt: "What brings back a nostalgic mood?",
        answer: "An old cassette mixtape",
        decoys: ["A brand new phone", "A spreadsheet", "A traffic jam"],
    },
];

#[derive(Clone, Debug)]
pub(crate) struct QuizGame {
    question: usize,
    pub(crate) options: Vec<&'static str>,
    correct: usize,
    pub(crate) wrong: Vec<usize>,
    pub(crate) locked: bool,
    pub(crate) solved: u32,
}

impl QuizGame {
    pub(crate) fn new(rng: &mut impl Rng) -> Self {
        let mut game = Self {
            question: rng.gen_range(0..QUESTIONS.len()),
            options: Vec::new(),
            correct: 0,
            wrong: Vec::new(),
            locked: false,
            solved: 0,
        };
        game.deal(rng);
        game
    }

    fn deal(&mut self, rng: &mut impl Rng) {
        let q = &QUESTIONS[self.question];
        let mut options: Vec<&'static str> = q.decoys.to_vec();
        options.push(q.answer);
        options.shuffle(rng);
        self.correct = options.iter().position(|o| *o == q.answer).unwrap_or(0);
        self.options = options;
        self.wrong.clear();
        self.locked = false;
    }

    pub(crate) fn prompt(&self) -> &'static str {
        QUESTIONS[self.question].prompt
    }

    pub(crate) fn guess(&mut self, choice: usize) -> Option<Outcome> {
        if self.locked || choice >= self.options.len() || self.wrong.contains(&choice) {
            return None;
        }
        if choice == self.correct {
            self.locked = true;
            self.solved += 1;
            return Some(Outcome::new(
                StatDelta {
                    happiness: 6.0,
                    energy: 2.0,
                    ..StatDelta::default()
                },
                "Nailed the mood quiz!",
            ));
        }
        self.wrong.push(choice);
        Some(Outcome::new(
            StatDelta {
                happiness: -2.0,
                ..StatDelta::default()
            },
            "Wrong quiz answer, the tamagochi tilts its head.",
        ))
    }

    /// Moves to a different question and unlocks.
    pub(crate) fn advance(&mut self, rng: &mut impl Rng) {
        if QUESTIONS.len() > 1 {
            let step = rng.gen_range(1..QUESTIONS.len());
            self.question = (self.question + step) % QUESTIONS.len();
        }
        self.deal(rng);
    }

    #[cfg(test)]
    fn correct_index(&self) -> usize {
        self.correct
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn exactly_one_option_is_correct() {
        let mut rng = StdRng::seed_from_u64(3);
        let game = QuizGame::new(&mut rng);
        assert_eq!(game.options.len(), 4);
        let answer = QUESTIONS[game.question].answer;
        assert_eq!(game.options.iter().filter(|o| **o == answer).count(), 1);
        assert_eq!(game.options[game.correct_index()], answer);
    }

    #[test]
    fn correct_guess_locks_until_advance() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut game = QuizGame::new(&mut rng);
        let right = game.correct_index();

        let outcome = game.guess(right).unwrap();
        assert!(outcome.delta.happiness > 0.0);
        assert!(game.locked);
        assert_eq!(game.guess((right + 1) % 4), None);
        assert_eq!(game.guess(right), None);

        let before = game.prompt();
        game.advance(&mut rng);
        assert!(!game.locked);
        assert_ne!(game.prompt(), before);
        assert!(game.guess(game.correct_index()).is_some());
        assert_eq!(game.solved, 2);
    }

    #[test]
    fn wrong_guess_only_counts_once() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut game = QuizGame::new(&mut rng);
        let wrong = (game.correct_index() + 1) % 4;
        assert!(game.guess(wrong).is_some());
        assert_eq!(game.guess(wrong), None);
        assert_eq!(game.guess(17), None);
        assert!(!game.locked);
    }
}
