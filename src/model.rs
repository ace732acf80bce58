use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::games::{QuizGame, ReflexGame, RpsGame, TreasureGame};

pub(crate) const SESSION_VERSION: u32 = 1;
pub(crate) const MAX_LOG_ITEMS: usize = 7;
pub(crate) const STAT_MIN: f32 = 0.0;
pub(crate) const STAT_MAX: f32 = 100.0;

/// One pet in the shared registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PetRecord {
    pub(crate) name: String,
    #[serde(with = "iso_millis")]
    pub(crate) created_at: DateTime<Utc>,
}

/// `2024-01-12T08:30:00.000Z`, the shape browsers produce with `toISOString`.
pub(crate) mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub(crate) fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Scene {
    Main,
    Help,
    Rename,
    Registry,
    Game(GameKind),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum GameKind {
    Reflex,
    Quiz,
    Treasure,
    Rps,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum MoodPreset {
    Cheerful,
    Creative,
    Calm,
    Nostalgic,
}

impl MoodPreset {
    pub(crate) const ALL: [MoodPreset; 4] = [
        MoodPreset::Cheerful,
        MoodPreset::Creative,
        MoodPreset::Calm,
        MoodPreset::Nostalgic,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            MoodPreset::Cheerful => "Cheerful",
            MoodPreset::Creative => "Creative",
            MoodPreset::Calm => "Calm",
            MoodPreset::Nostalgic => "Nostalgic",
        }
    }

    pub(crate) fn description(self) -> &'static str {
        match self {
            MoodPreset::Cheerful => "Neon park, lots of laughter and bouncing pixel balls.",
            MoodPreset::Creative => "Drawing board, glittering sprites and endless fantasy.",
            MoodPreset::Calm => "Starry sky, quiet lo-fi and slow breathing.",
            MoodPreset::Nostalgic => "8-bit memories, cassette decks and good old games.",
        }
    }

    pub(crate) fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

/// A change to apply to the gauges. Missing fields are zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct StatDelta {
    pub(crate) hunger: f32,
    pub(crate) energy: f32,
    pub(crate) happiness: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PetStats {
    pub(crate) hunger: f32,
    pub(crate) energy: f32,
    pub(crate) happiness: f32,
}

impl Default for PetStats {
    fn default() -> Self {
        Self {
            hunger: 68.0,
            energy: 72.0,
            happiness: 70.0,
        }
    }
}

impl PetStats {
    pub(crate) fn apply(&mut self, d: StatDelta) {
        self.hunger = (self.hunger + d.hunger).clamp(STAT_MIN, STAT_MAX);
        self.energy = (self.energy + d.energy).clamp(STAT_MIN, STAT_MAX);
        self.happiness = (self.happiness + d.happiness).clamp(STAT_MIN, STAT_MAX);
    }

    pub(crate) fn average(&self) -> f32 {
        (self.hunger + self.energy + self.happiness) / 3.0
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct CareCounters {
    pub(crate) meals: u32,
    pub(crate) plays: u32,
    pub(crate) rests: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ActivityEntry {
    pub(crate) message: String,
    pub(crate) at: DateTime<Utc>,
}

/// Most recent first, capped at `MAX_LOG_ITEMS`.
#[derive(Clone, Debug)]
pub(crate) struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
}

impl ActivityLog {
    pub(crate) fn hatched(now: DateTime<Utc>) -> Self {
        let mut log = Self {
            entries: VecDeque::with_capacity(MAX_LOG_ITEMS),
        };
        log.push("The tamagochi watched the neon sky.", now);
        log.push("You stroked its pixel fur.", now);
        log.push("The egg cracked and a curious tamagochi popped out!", now);
        log
    }

    pub(crate) fn push(&mut self, message: impl Into<String>, at: DateTime<Utc>) {
        self.entries.push_front(ActivityEntry {
            message: message.into(),
            at,
        });
        self.entries.truncate(MAX_LOG_ITEMS);
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn latest(&self) -> Option<&ActivityEntry> {
        self.entries.front()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Animation {
    Idle,
    Eating,
    Playing,
    Resting,
}

/// One-shot latch per gauge: armed until the low threshold is hit, then
/// silent until the gauge climbs above the recovery threshold.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct WarningLatches {
    pub(crate) hunger: bool,
    pub(crate) energy: bool,
    pub(crate) happiness: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct GameState {
    pub(crate) name: Option<String>,
    pub(crate) stats: PetStats,
    pub(crate) mood: MoodPreset,
    pub(crate) care: CareCounters,
    pub(crate) log: ActivityLog,
    pub(crate) warnings: WarningLatches,
    pub(crate) animation: Animation,
    pub(crate) scene: Scene,
    pub(crate) registry: Vec<PetRecord>,
    pub(crate) registry_error: Option<String>,
    pub(crate) notice: Option<String>,
    pub(crate) name_edit: String,
    pub(crate) now: DateTime<Utc>,
    pub(crate) reflex: ReflexGame,
    pub(crate) quiz: QuizGame,
    pub(crate) treasure: TreasureGame,
    pub(crate) rps: RpsGame,
}

impl GameState {
    pub(crate) fn new(mood: MoodPreset, now: DateTime<Utc>, rng: &mut impl rand::Rng) -> Self {
        Self {
            name: None,
            stats: PetStats::default(),
            mood,
            care: CareCounters::default(),
            log: ActivityLog::hatched(now),
            warnings: WarningLatches::default(),
            animation: Animation::Idle,
            scene: Scene::Main,
            registry: Vec::new(),
            registry_error: None,
            notice: None,
            name_edit: String::new(),
            now,
            reflex: ReflexGame::default(),
            quiz: QuizGame::new(rng),
            treasure: TreasureGame::new(rng),
            rps: RpsGame::default(),
        }
    }
}

/// Terminal-side carrier for the session binding.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionFile {
    pub(crate) version: u32,
    pub(crate) name: Option<String>,
    pub(crate) saved_at: DateTime<Utc>,
}
