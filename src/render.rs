use crate::games::{ReflexPhase, RoundResult, TreasureState, GRID_SIZE};
use crate::input::TREASURE_KEYS;
use crate::model::{Animation, GameKind, GameState, Scene};
use crate::profile::{
    birth_date, display_name, elapsed_text, handle, initials, my_record, others,
};
use crate::session::MAX_NAME_LENGTH;
use crossterm::{
    cursor, execute, queue,
    style::{
        Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
    },
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

const BG: Color = Color::Black;
const FG: Color = Color::White;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
    pub(crate) bold: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: FG,
            bg: BG,
            bold: false,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
    pub(crate) fn clear(&mut self) {
        self.cells.fill(Cell::default());
    }

    #[cfg(test)]
    pub(crate) fn row_text(&self, y: u16) -> String {
        (0..self.w).map(|x| self.cells[self.idx(x, y)].ch).collect()
    }
}

pub(crate) struct Terminal {
    out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        queue!(self.out, Clear(ClearType::All))?;
        Ok(true)
    }

    /// Writes the cells that changed since the last frame.
    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;
        let mut last_bold = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_bold != Some(c.bold) {
                    let attr = if c.bold {
                        Attribute::Bold
                    } else {
                        Attribute::NormalIntensity
                    };
                    queue!(self.out, SetAttribute(attr))?;
                    last_bold = Some(c.bold);
                }
                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, SetAttribute(Attribute::Reset), ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

/* -----------------------------
   Text primitives
------------------------------ */

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color) {
    draw_styled(buf, x, y, s, fg, false);
}

fn draw_styled(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bold: bool) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(xx, y, Cell { ch, fg, bg: BG, bold });
    }
}

pub(crate) fn bar(value: f32, width: usize) -> String {
    let v = (value / 100.0).clamp(0.0, 1.0);
    let fill = (v * width as f32 + 0.5) as usize;
    let mut s = String::with_capacity(width + 2);
    s.push('[');
    for i in 0..width {
        s.push(if i < fill { '█' } else { '·' });
    }
    s.push(']');
    s
}

fn gauge_color(value: f32) -> Color {
    if value <= 25.0 {
        Color::Red
    } else if value <= 45.0 {
        Color::Yellow
    } else {
        Color::Green
    }
}

/// Framed box centred on the buffer; body lines past the frame are dropped.
pub(crate) fn draw_center_box(buf: &mut CellBuffer, title: &str, body: &str) {
    let bw = 64.min(buf.w.saturating_sub(4));
    let bh = 20.min(buf.h.saturating_sub(4));
    if bw < 4 || bh < 4 {
        return;
    }
    let x0 = (buf.w - bw) / 2;
    let y0 = (buf.h - bh) / 2;
    let (x1, y1) = (x0 + bw - 1, y0 + bh - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let ch = match (x == x0, x == x1, y == y0, y == y1) {
                (true, _, true, _) => '┌',
                (_, true, true, _) => '┐',
                (true, _, _, true) => '└',
                (_, true, _, true) => '┘',
                (_, _, true, _) | (_, _, _, true) => '─',
                (true, _, _, _) | (_, true, _, _) => '│',
                _ => ' ',
            };
            buf.set(x, y, Cell { ch, ..Cell::default() });
        }
    }

    draw_styled(buf, x0 + 2, y0 + 1, title, Color::Cyan, true);
    for (i, line) in body.lines().enumerate() {
        let yy = y0 + 3 + i as u16;
        if yy >= y1 {
            break;
        }
        let clipped: String = line.chars().take(bw.saturating_sub(4) as usize).collect();
        draw_text(buf, x0 + 2, yy, &clipped, FG);
    }
}

/* -----------------------------
   Dashboard
------------------------------ */

pub(crate) fn draw_dashboard(buf: &mut CellBuffer, st: &GameState) {
    let name = display_name(st.name.as_deref());
    let title = match &st.name {
        Some(n) => format!(
            "Pixelgotchi  |  {name} [{}] @{}  |  Mood: {}",
            initials(n),
            handle(n),
            st.mood.label()
        ),
        None => format!("Pixelgotchi  |  {name} (press n)  |  Mood: {}", st.mood.label()),
    };
    draw_styled(buf, 1, 0, &title, FG, true);

    let gauges = [
        ("Hunger   ", st.stats.hunger),
        ("Energy   ", st.stats.energy),
        ("Happiness", st.stats.happiness),
    ];
    for (i, (label, value)) in gauges.iter().enumerate() {
        let y = 2 + i as u16;
        draw_text(buf, 1, y, label, FG);
        draw_text(buf, 11, y, &bar(*value, 16), gauge_color(*value));
        draw_text(buf, 30, y, &format!("{:>3.0}%", value.round()), FG);
    }

    let care = format!(
        "Meals {}  |  Plays {}  |  Rests {}",
        st.care.meals, st.care.plays, st.care.rests
    );
    draw_text(buf, 1, 6, &care, FG);
    draw_text(buf, 1, 7, &st.status_line(), Color::Cyan);
    draw_text(buf, 1, 8, st.mood.description(), Color::DarkGrey);

    draw_styled(buf, 1, 10, "Activity", FG, true);
    for (i, entry) in st.log.iter().enumerate() {
        let line = format!(
            "{}  {}",
            entry.at.with_timezone(&chrono::Local).format("%H:%M:%S"),
            entry.message
        );
        let fg = if i == 0 { FG } else { Color::Grey };
        draw_text(buf, 1, 11 + i as u16, &line, fg);
    }

    if let Some(notice) = &st.notice {
        draw_styled(buf, 1, buf.h.saturating_sub(2), notice, Color::Yellow, true);
    }
    draw_text(buf, 1, buf.h.saturating_sub(1), footer(&st.scene), Color::DarkGrey);
}

pub(crate) fn footer(scene: &Scene) -> &'static str {
    match scene {
        Scene::Main => {
            "f feed | p play | r rest | m mood | 1-4 games | n name | x forget | l list | h help | q quit"
        }
        Scene::Help => "h/esc close | q quit",
        Scene::Rename => "type a name | enter save | esc cancel",
        Scene::Registry => "l/esc close | q quit",
        Scene::Game(GameKind::Reflex) => "space/enter press | esc leave",
        Scene::Game(GameKind::Quiz) => "1-4 answer | esc leave",
        Scene::Game(GameKind::Treasure) => "grid keys dig | esc leave",
        Scene::Game(GameKind::Rps) => "r rock | p paper | s scissors | esc leave",
    }
}

/* -----------------------------
   Pet sprite
------------------------------ */

pub(crate) fn pet_sprite(animation: Animation, average: f32) -> ([&'static str; 5], &'static str) {
    let eyes = match animation {
        Animation::Playing => "  / ^   ^ \\  ",
        Animation::Resting => "  / -   - \\  ",
        _ => "  / o   o \\  ",
    };
    let mouth = match animation {
        Animation::Eating => " |   (O)   | ",
        Animation::Resting => " |    .    | ",
        _ if average < 35.0 => " |   /~\\   | ",
        _ => " |  \\___/  | ",
    };
    let caption = match animation {
        Animation::Idle => "",
        Animation::Eating => "nom nom",
        Animation::Playing => "* wheee *",
        Animation::Resting => "z Z z",
    };
    (
        [
            "   .-----.   ",
            eyes,
            " |    ^    | ",
            mouth,
            "  \\_______/  ",
        ],
        caption,
    )
}

/// Small hop while playing.
pub(crate) fn pet_bounce(animation: Animation, now_ms: u64) -> i32 {
    if animation == Animation::Playing && (now_ms / 250) % 2 == 0 {
        -1
    } else {
        0
    }
}

pub(crate) fn draw_pet_ascii(buf: &mut CellBuffer, st: &GameState, cx: i32, cy: i32) {
    let (lines, caption) = pet_sprite(st.animation, st.stats.average());
    let fg = gauge_color(st.stats.average());
    let w = lines[0].chars().count() as i32;
    let x0 = cx - w / 2;
    let y0 = cy - lines.len() as i32 / 2;

    let rows = lines.iter().copied().chain(std::iter::once("")).chain(std::iter::once(caption));
    for (yy, line) in rows.enumerate() {
        let y = y0 + yy as i32;
        if y < 0 || y >= buf.h as i32 {
            continue;
        }
        let lx = if yy > lines.len() {
            cx - line.chars().count() as i32 / 2
        } else {
            x0
        };
        for (i, ch) in line.chars().enumerate() {
            let x = lx + i as i32;
            if x >= 0 && x < buf.w as i32 {
                buf.set(x as u16, y as u16, Cell { ch, fg, bg: BG, bold: false });
            }
        }
    }
}

/* -----------------------------
   Overlays
------------------------------ */

pub(crate) fn help_text() -> String {
    [
        "Keep the three gauges up; they drain a little every 12 seconds.",
        "",
        "f Feed: +hunger, a bit of energy and joy.",
        "p Play: +happiness, costs energy and hunger.",
        "r Rest: +energy, a little hungrier.",
        "m Mood: cycle cheerful, creative, calm, nostalgic.",
        "1-4 Games: reflex, quiz, treasure hunt, rock-paper-scissors.",
        "",
        "n Name your tamagochi to join the shared list (l).",
        "x Forget the name on this machine.",
        "",
        "Esc or h closes this help.",
    ]
    .join("\n")
}

pub(crate) fn rename_text(st: &GameState) -> String {
    let mut preview = st.name_edit.clone();
    if preview.chars().count() < MAX_NAME_LENGTH {
        preview.push('_');
    }
    let mut body = format!("Type a name (max {MAX_NAME_LENGTH} characters).\n\nName: {preview}");
    if let Some(notice) = &st.notice {
        body.push_str("\n\n");
        body.push_str(notice);
    }
    body
}

pub(crate) fn registry_text(st: &GameState) -> String {
    if let Some(err) = &st.registry_error {
        return err.clone();
    }
    let mut lines = Vec::new();
    match my_record(&st.registry, st.name.as_deref()) {
        Some(me) => {
            lines.push(format!("You: {} (@{})", me.name, handle(&me.name)));
            lines.push(format!(
                "Hatched {} ({})",
                birth_date(me.created_at),
                elapsed_text(me.created_at, st.now)
            ));
        }
        None => lines.push("Name your tamagochi with n to join the list.".to_string()),
    }
    lines.push(String::new());
    lines.push("Other companions".to_string());
    let mut any = false;
    for rec in others(&st.registry, st.name.as_deref()) {
        any = true;
        lines.push(format!(
            "{:<3}{:<26}{}",
            initials(&rec.name),
            rec.name,
            elapsed_text(rec.created_at, st.now)
        ));
    }
    if !any {
        lines.push("Nobody else yet.".to_string());
    }
    lines.join("\n")
}

pub(crate) fn game_panel(st: &GameState, kind: GameKind) -> (&'static str, String) {
    match kind {
        GameKind::Reflex => ("Reflex", reflex_text(st)),
        GameKind::Quiz => ("Mood quiz", quiz_text(st)),
        GameKind::Treasure => ("Treasure hunt", treasure_text(st)),
        GameKind::Rps => ("Rock paper scissors", rps_text(st)),
    }
}

fn reflex_text(st: &GameState) -> String {
    let g = &st.reflex;
    let phase = match g.phase {
        ReflexPhase::Idle => "Press space to start, then again as soon as GO! shows.".to_string(),
        ReflexPhase::Waiting => "Wait for it...".to_string(),
        ReflexPhase::Ready { .. } => ">>>  GO!  <<<".to_string(),
        ReflexPhase::Success { reaction_ms } => {
            format!("{reaction_ms} ms! Space for another round.")
        }
        ReflexPhase::TooEarly => "Too early! Space to try again.".to_string(),
    };
    let best = g
        .best_ms
        .map_or_else(|| "-".to_string(), |ms| format!("{ms} ms"));
    format!("{phase}\n\nBest: {best}  |  Rounds: {}", g.rounds)
}

fn quiz_text(st: &GameState) -> String {
    let q = &st.quiz;
    let mut lines = vec![q.prompt().to_string(), String::new()];
    for (i, option) in q.options.iter().enumerate() {
        let mark = if q.wrong.contains(&i) { "  x" } else { "" };
        lines.push(format!("{}) {option}{mark}", i + 1));
    }
    lines.push(String::new());
    if q.locked {
        lines.push("Correct! Next question coming up...".to_string());
    }
    lines.push(format!("Solved: {}", q.solved));
    lines.join("\n")
}

fn treasure_text(st: &GameState) -> String {
    let g = &st.treasure;
    let target = g.target_if_over();
    let mut lines = vec![format!(
        "Attempts left: {}  |  Streak: {} (best {})",
        g.attempts_left, g.streak, g.best_streak
    )];
    lines.push(String::new());
    for (row, keys) in TREASURE_KEYS.iter().enumerate() {
        let cells: Vec<String> = keys
            .iter()
            .enumerate()
            .map(|(col, key)| {
                let cell = row * GRID_SIZE + col;
                if target == Some(cell) {
                    "[$]".to_string()
                } else if g.revealed[cell] {
                    "[ ]".to_string()
                } else {
                    format!("[{key}]")
                }
            })
            .collect();
        lines.push(format!("  {}", cells.join(" ")));
    }
    lines.push(String::new());
    lines.push(
        match g.state {
            TreasureState::Searching => {
                st.notice.as_deref().unwrap_or("Dig by pressing a cell key.")
            }
            TreasureState::Found => "Treasure found! Any cell key starts a new round.",
            TreasureState::Lost => "Out of attempts. The $ marks the spot; any cell key retries.",
        }
        .to_string(),
    );
    lines.join("\n")
}

fn rps_text(st: &GameState) -> String {
    let g = &st.rps;
    let last = match g.last {
        Some(round) => {
            let verdict = match round.result {
                RoundResult::Win => "you win",
                RoundResult::Draw => "draw",
                RoundResult::Loss => "the tamagochi wins",
            };
            format!(
                "You: {}  |  Tamagochi: {}  ->  {verdict}",
                round.player.label(),
                round.opponent.label()
            )
        }
        None => "Pick a hand: r, p or s.".to_string(),
    };
    format!(
        "{last}\n\nWins {}  |  Draws {}  |  Losses {}",
        g.wins, g.draws, g.losses
    )
}
