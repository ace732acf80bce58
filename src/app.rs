use crate::config::{Paths, Settings};
use crate::input::{collect_input_nonblocking, map_event_to_command, Command};
use crate::model::{GameState, Scene};
use crate::registry::PetStore;
use crate::render::{
    draw_center_box, draw_dashboard, draw_pet_ascii, game_panel, help_text, pet_bounce,
    registry_text, rename_text, Terminal,
};
use crate::schedule::{Scheduler, TaskKind};
use crate::session::{
    load_session_file, save_session_file, Session, SessionService, MAX_NAME_LENGTH,
};
use crate::sim::{PlayerAction, CLOCK_PERIOD_MS, DECAY_PERIOD_MS};
use chrono::Utc;
use rand::{rngs::StdRng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, Instant};

const REGISTRY_READ_ERROR: &str = "Could not read the tamagochi companions.";

/// Everything the terminal front end owns except the terminal itself.
pub(crate) struct Controller {
    pub(crate) state: GameState,
    pub(crate) timers: Scheduler,
    sessions: SessionService,
    session: Session,
    session_path: std::path::PathBuf,
    rng: StdRng,
    pub(crate) should_quit: bool,
}

impl Controller {
    pub(crate) fn new(settings: &Settings, paths: &Paths, store: Arc<dyn PetStore>) -> Self {
        let mut rng = StdRng::seed_from_u64(settings.seed);
        let mut state = GameState::new(settings.mood, Utc::now(), &mut rng);
        let session = load_session_file(&paths.session_path);
        state.name = session.name.clone();

        let mut timers = Scheduler::new();
        timers.every(TaskKind::Decay, 0, DECAY_PERIOD_MS);
        timers.every(TaskKind::Clock, 0, CLOCK_PERIOD_MS);

        let mut ctl = Self {
            state,
            timers,
            sessions: SessionService::new(store, settings.forget_on_clear),
            session,
            session_path: paths.session_path.clone(),
            rng,
            should_quit: false,
        };
        ctl.refresh_registry();
        ctl
    }

    pub(crate) fn refresh_registry(&mut self) {
        match self.sessions.store().list() {
            Ok(records) => {
                self.state.registry = records;
                self.state.registry_error = None;
            }
            Err(e) => {
                log::warn!("registry read failed: {e}");
                self.state.registry_error = Some(REGISTRY_READ_ERROR.to_string());
            }
        }
    }

    /// Runs every timer due at `now_ms`.
    pub(crate) fn advance(&mut self, now_ms: u64) {
        self.state.now = Utc::now();
        for kind in self.timers.poll(now_ms) {
            if kind == TaskKind::Clock {
                self.refresh_registry();
            } else {
                self.state.on_timer(kind, now_ms, &mut self.rng);
            }
        }
    }

    pub(crate) fn handle(&mut self, cmd: Command, now_ms: u64) {
        self.state.now = Utc::now();
        if !matches!(cmd, Command::RenameChar(_) | Command::RenameBackspace) {
            self.state.notice = None;
        }
        match cmd {
            Command::Quit => self.should_quit = true,
            Command::Back => match self.state.scene {
                Scene::Game(_) => self.state.close_game(&mut self.timers),
                _ => {
                    self.state.name_edit.clear();
                    self.state.scene = Scene::Main;
                }
            },
            Command::ToggleHelp => {
                self.state.scene = if self.state.scene == Scene::Help {
                    Scene::Main
                } else {
                    Scene::Help
                };
            }
            Command::Care(action) => self.state.apply(action, &mut self.timers, now_ms),
            Command::NextMood => {
                let next = self.state.mood.next();
                self.state
                    .apply(PlayerAction::SelectMood(next), &mut self.timers, now_ms);
            }
            Command::OpenGame(kind) => self.state.open_game(kind, &mut self.timers),
            Command::OpenRegistry => {
                self.refresh_registry();
                self.state.scene = Scene::Registry;
            }
            Command::OpenRename => {
                self.state.name_edit = self.state.name.clone().unwrap_or_default();
                self.state.scene = Scene::Rename;
            }
            Command::RenameChar(ch) => {
                if self.state.name_edit.chars().count() < MAX_NAME_LENGTH {
                    self.state.name_edit.push(ch);
                }
            }
            Command::RenameBackspace => {
                self.state.name_edit.pop();
            }
            Command::RenameCommit => self.commit_name(),
            Command::ClearName => self.clear_name(),
            Command::ReflexPress => {
                self.state
                    .reflex_press(&mut self.timers, now_ms, &mut self.rng)
            }
            Command::QuizPick(choice) => self.state.quiz_pick(choice, &mut self.timers, now_ms),
            Command::TreasureDig(cell) => self.state.treasure_dig(cell, &mut self.rng),
            Command::RpsThrow(hand) => self.state.rps_throw(hand, &mut self.rng),
        }
    }

    fn commit_name(&mut self) {
        let raw = std::mem::take(&mut self.state.name_edit);
        match self.sessions.set(&mut self.session, &raw) {
            Ok(records) => {
                self.state.registry = records;
                self.state.registry_error = None;
                self.state.name = self.session.name.clone();
                self.state.scene = Scene::Main;
                if let Some(name) = &self.session.name {
                    self.state.add_activity(format!("Say hi to {name}!"));
                }
                self.persist_session();
            }
            Err(e) => {
                self.state.notice = Some(e.to_string());
                self.state.name_edit = raw;
            }
        }
    }

    fn clear_name(&mut self) {
        match self.sessions.clear(&mut self.session) {
            Ok(Some(_)) => {
                self.state.name = None;
                self.state.notice = Some("Name forgotten.".to_string());
                self.state.add_activity("You removed the tamagochi's name.");
                self.persist_session();
                self.refresh_registry();
            }
            Ok(None) => {}
            Err(e) => {
                log::warn!("clearing the session failed: {e}");
                self.state.name = None;
                self.state.notice = Some("Could not delete the tamagochi name.".to_string());
                self.persist_session();
            }
        }
    }

    fn persist_session(&mut self) {
        if let Err(e) = save_session_file(&self.session_path, &self.session) {
            log::warn!("could not write {}: {e:#}", self.session_path.display());
            self.state.notice = Some("The name could not be saved on this machine.".to_string());
        }
    }
}

pub(crate) struct App {
    ctl: Controller,
    term: Terminal,
    fps_cap: u32,
    started: Instant,
}

impl App {
    fn init(settings: &Settings, paths: &Paths, store: Arc<dyn PetStore>) -> anyhow::Result<Self> {
        let ctl = Controller::new(settings, paths, store);
        let term = Terminal::begin()?;
        Ok(Self {
            ctl,
            term,
            fps_cap: settings.fps_cap,
            started: Instant::now(),
        })
    }

    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let fps = self.fps_cap.clamp(10, 240);
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);

        while !self.ctl.should_quit {
            self.term.resize_if_needed()?;

            for ev in collect_input_nonblocking(frame_dt)? {
                if let Some(cmd) = map_event_to_command(&self.ctl.state.scene, ev) {
                    let now = self.now_ms();
                    self.ctl.handle(cmd, now);
                    if self.ctl.should_quit {
                        break;
                    }
                }
            }

            let now = self.now_ms();
            self.ctl.advance(now);
            self.render_frame(now)?;

            spin_sleep(frame_dt, Instant::now());
        }
        Ok(())
    }

    fn render_frame(&mut self, now_ms: u64) -> anyhow::Result<()> {
        let st = &self.ctl.state;
        let buf = &mut self.term.cur;
        buf.clear();

        draw_dashboard(buf, st);

        // Pet sits right of the gauges, above the activity log.
        let cx = (self.term.cols as i32 * 3 / 4).max(52);
        let cy = 5 + pet_bounce(st.animation, now_ms);
        draw_pet_ascii(buf, st, cx, cy);

        match &st.scene {
            Scene::Main => {}
            Scene::Help => draw_center_box(buf, "How to care for your tamagochi", &help_text()),
            Scene::Rename => draw_center_box(buf, "Name your tamagochi", &rename_text(st)),
            Scene::Registry => draw_center_box(buf, "Tamagochi companions", &registry_text(st)),
            Scene::Game(kind) => {
                let (title, body) = game_panel(st, *kind);
                draw_center_box(buf, title, &body);
            }
        }

        self.term.present()?;
        Ok(())
    }
}

pub(crate) fn run(
    settings: &Settings,
    paths: &Paths,
    store: Arc<dyn PetStore>,
) -> anyhow::Result<()> {
    log::info!("starting terminal session with the {} registry", store.backend());
    let mut app = App::init(settings, paths, store)?;
    let result = app.run();
    app.term.end()?;
    result
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        if end - t > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
