use crate::games::{Hand, GRID_SIZE};
use crate::model::{GameKind, Scene};
use crate::sim::PlayerAction;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::time::Duration;

#[derive(Clone, Debug)]
pub(crate) struct InputEvent {
    pub(crate) key: KeyCode,
    pub(crate) mods: KeyModifiers,
}

impl InputEvent {
    #[cfg(test)]
    pub(crate) fn key(key: KeyCode) -> Self {
        Self {
            key,
            mods: KeyModifiers::NONE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Quit,
    Back,
    ToggleHelp,
    Care(PlayerAction),
    NextMood,
    OpenGame(GameKind),
    OpenRegistry,
    OpenRename,
    ClearName,
    RenameChar(char),
    RenameBackspace,
    RenameCommit,
    ReflexPress,
    QuizPick(usize),
    TreasureDig(usize),
    RpsThrow(Hand),
}

/// Treasure grid rows, left to right.
pub(crate) const TREASURE_KEYS: [[char; GRID_SIZE]; GRID_SIZE] = [
    ['1', '2', '3', '4'],
    ['q', 'w', 'e', 'r'],
    ['a', 's', 'd', 'f'],
    ['z', 'x', 'c', 'v'],
];

pub(crate) fn collect_input_nonblocking(
    max_frame_time: Duration,
) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();

    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        if let Event::Key(k) = event::read()? {
            if k.kind == KeyEventKind::Press {
                out.push(InputEvent {
                    key: k.code,
                    mods: k.modifiers,
                });
                if out.len() >= 32 {
                    break;
                }
            }
        }
    }
    Ok(out)
}

fn treasure_cell(ch: char) -> Option<usize> {
    let ch = ch.to_ascii_lowercase();
    TREASURE_KEYS.iter().enumerate().find_map(|(row, keys)| {
        keys.iter()
            .position(|&k| k == ch)
            .map(|col| row * GRID_SIZE + col)
    })
}

fn game_for_digit(ch: char) -> Option<GameKind> {
    match ch {
        '1' => Some(GameKind::Reflex),
        '2' => Some(GameKind::Quiz),
        '3' => Some(GameKind::Treasure),
        '4' => Some(GameKind::Rps),
        _ => None,
    }
}

pub(crate) fn map_event_to_command(scene: &Scene, ev: InputEvent) -> Option<Command> {
    if matches!(ev.key, KeyCode::Char('c') | KeyCode::Char('C'))
        && ev.mods.contains(KeyModifiers::CONTROL)
    {
        return Some(Command::Quit);
    }

    if matches!(scene, Scene::Rename) {
        return match ev.key {
            KeyCode::Enter => Some(Command::RenameCommit),
            KeyCode::Esc => Some(Command::Back),
            KeyCode::Backspace => Some(Command::RenameBackspace),
            KeyCode::Char(ch) if !ch.is_control() => Some(Command::RenameChar(ch)),
            _ => None,
        };
    }

    if ev.key == KeyCode::Esc {
        return Some(Command::Back);
    }

    let KeyCode::Char(ch) = ev.key else {
        return match (scene, ev.key) {
            (Scene::Game(GameKind::Reflex), KeyCode::Enter) => Some(Command::ReflexPress),
            _ => None,
        };
    };

    match scene {
        Scene::Main => match ch.to_ascii_lowercase() {
            'f' => Some(Command::Care(PlayerAction::Feed)),
            'p' => Some(Command::Care(PlayerAction::Play)),
            'r' => Some(Command::Care(PlayerAction::Rest)),
            'm' => Some(Command::NextMood),
            'n' => Some(Command::OpenRename),
            'x' => Some(Command::ClearName),
            'l' => Some(Command::OpenRegistry),
            'h' => Some(Command::ToggleHelp),
            'q' => Some(Command::Quit),
            d => game_for_digit(d).map(Command::OpenGame),
        },
        Scene::Help => match ch.to_ascii_lowercase() {
            'h' => Some(Command::ToggleHelp),
            'q' => Some(Command::Quit),
            _ => None,
        },
        Scene::Registry => match ch.to_ascii_lowercase() {
            'l' => Some(Command::Back),
            'q' => Some(Command::Quit),
            _ => None,
        },
        Scene::Game(GameKind::Reflex) => (ch == ' ').then_some(Command::ReflexPress),
        Scene::Game(GameKind::Quiz) => ch
            .to_digit(10)
            .filter(|d| (1..=4).contains(d))
            .map(|d| Command::QuizPick(d as usize - 1)),
        Scene::Game(GameKind::Treasure) => treasure_cell(ch).map(Command::TreasureDig),
        Scene::Game(GameKind::Rps) => match ch.to_ascii_lowercase() {
            'r' => Some(Command::RpsThrow(Hand::Rock)),
            'p' => Some(Command::RpsThrow(Hand::Paper)),
            's' => Some(Command::RpsThrow(Hand::Scissors)),
            _ => None,
        },
        Scene::Rename => None,
    }
}
