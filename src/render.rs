use crate::game::PetSimulator;
use crate::model::{Pet, Scene, Stage, StatLevel, NAME_MAX};
use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
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
    fn row(&self, y: u16) -> String {
        (0..self.w).map(|x| self.cells[self.idx(x, y)].ch).collect()
    }
}

/// Raw-mode alternate screen. Restored by `end`, or on drop if `end`
/// never ran.
pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
    active: bool,
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
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
            active: true,
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        write_restore(&mut self.out)?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<()> {
        let (c, r) = terminal::size()?;
        if c != self.cur.w || r != self.cur.h {
            self.prev = CellBuffer::new(c, r);
            self.cur = CellBuffer::new(c, r);
            queue!(self.out, Clear(ClearType::All))?;
        }
        Ok(())
    }

    /// Write only the cells that changed since the last frame.
    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.cur.h {
            for x in 0..self.cur.w {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

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

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = self.end();
    }
}

fn write_restore(out: &mut impl Write) -> io::Result<()> {
    queue!(
        out,
        BeginSynchronizedUpdate,
        ResetColor,
        Clear(ClearType::All),
        cursor::Show,
        EnableLineWrap,
        EndSynchronizedUpdate,
        LeaveAlternateScreen
    )?;
    out.flush()
}

/* -----------------------------
   Drawing primitives
------------------------------ */

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(
            xx,
            y,
            Cell {
                ch,
                fg,
                bg: Color::Black,
            },
        );
    }
}

fn bar(value: f32, width: usize) -> String {
    let v = (value / 100.0).clamp(0.0, 1.0);
    let fill = (v * width as f32 + 0.5) as usize;
    let mut s = String::with_capacity(width + 2);
    s.push('[');
    for i in 0..width {
        s.push(if i < fill { '█' } else { ' ' });
    }
    s.push(']');
    s
}

fn draw_box(buf: &mut CellBuffer, title: &str, body: &str, color: bool) {
    let fg = Color::White;
    let bw = 48.min(buf.w.saturating_sub(2));
    let bh = 14.min(buf.h.saturating_sub(2));
    if bw < 4 || bh < 4 {
        return;
    }
    let x0 = (buf.w - bw) / 2;
    let y0 = (buf.h - bh) / 2;

    for y in y0..y0 + bh {
        for x in x0..x0 + bw {
            let top = y == y0;
            let bottom = y == y0 + bh - 1;
            let left = x == x0;
            let right = x == x0 + bw - 1;
            let ch = match (top, bottom, left, right) {
                (true, _, true, _) => '┌',
                (true, _, _, true) => '┐',
                (_, true, true, _) => '└',
                (_, true, _, true) => '┘',
                (true, _, _, _) | (_, true, _, _) => '─',
                (_, _, true, _) | (_, _, _, true) => '│',
                _ => ' ',
            };
            buf.set(x, y, Cell { ch, fg, bg: Color::Black });
        }
    }

    let title_fg = if color { Color::Magenta } else { fg };
    draw_text(buf, x0 + 2, y0 + 1, title, title_fg);
    for (i, line) in body.lines().enumerate() {
        let yy = y0 + 3 + i as u16;
        if yy >= y0 + bh - 1 {
            break;
        }
        draw_text(buf, x0 + 2, yy, line, fg);
    }
}

fn level_color(level: StatLevel, color: bool) -> Color {
    if !color {
        return Color::White;
    }
    match level {
        StatLevel::Good => Color::Green,
        StatLevel::Fair => Color::Yellow,
        StatLevel::Low => Color::Red,
    }
}

/* -----------------------------
   Pet sprite
------------------------------ */

fn sprite(pet: &Pet) -> &'static [&'static str] {
    if !pet.alive {
        return &[
            "   _____   ",
            "  /     \\  ",
            " | X   X | ",
            " |   ^   | ",
            "  \\ === /  ",
            "   |||||   ",
            "   R.I.P   ",
        ];
    }
    match pet.stage {
        Stage::Egg => &[
            "    ___    ",
            "   /   \\   ",
            "  / . . \\  ",
            " |  .  . | ",
            " | .   . | ",
            "  \\_____/  ",
        ],
        Stage::Baby => &[
            "   /\\_/\\   ",
            "  ( o o )  ",
            "   > ^ <   ",
            "   (___)   ",
        ],
        Stage::Child => &[
            "  /\\___/\\  ",
            " (  o o  ) ",
            " (   ^   ) ",
            "  \\ \\_/ /~ ",
            "   |   |   ",
            "   ^^ ^^   ",
        ],
        Stage::Adult => &[
            "   /\\    /\\      ",
            "  /  \\__/  \\     ",
            " (  O    O  )  __",
            "  \\   /\\   /__/  ",
            "  /   ==   \\     ",
            " /  |    |  \\    ",
            "/__/|____|\\__\\   ",
        ],
    }
}

fn draw_pet(buf: &mut CellBuffer, pet: &Pet, cx: i32, cy: i32, color: bool) {
    let art = sprite(pet);
    let fg = match (color, pet.alive) {
        (false, _) => Color::White,
        (true, false) => Color::DarkGrey,
        (true, true) => Color::Red,
    };
    let h = art.len() as i32;
    let w = art.iter().map(|l| l.chars().count()).max().unwrap_or(0) as i32;
    let x0 = cx - w / 2;
    let y0 = cy - h / 2;

    for (yy, line) in art.iter().enumerate() {
        let y = y0 + yy as i32;
        if y < 0 || y >= buf.h as i32 {
            continue;
        }
        for (xx, ch) in line.chars().enumerate() {
            let x = x0 + xx as i32;
            if ch != ' ' && x >= 0 && x < buf.w as i32 {
                buf.set(x as u16, y as u16, Cell { ch, fg, bg: Color::Black });
            }
        }
    }
}

/* -----------------------------
   Screens
------------------------------ */

/// Paint the whole frame for the current scene into `buf`.
pub(crate) fn draw_frame(buf: &mut CellBuffer, sim: &PetSimulator, color: bool, frame: u64) {
    buf.clear();
    match sim.scene() {
        Scene::NameEntry => draw_name_entry(buf, sim, color, frame),
        Scene::Main => draw_main(buf, sim, color),
        Scene::Help => {
            draw_main(buf, sim, color);
            draw_box(
                buf,
                "How to play",
                "Keep your pet fed, happy and rested.\n\
                 Stats drain every few seconds; when all\n\
                 three hit zero your pet passes away.\n\n\
                 F Feed   +hunger +happiness\n\
                 P Play   +happiness -energy\n\
                 S Sleep  +energy -hunger\n\
                 C Clean  +happiness\n\n\
                 Esc or H to close.",
                color,
            );
        }
    }
}

fn draw_name_entry(buf: &mut CellBuffer, sim: &PetSimulator, color: bool, frame: u64) {
    let mut name = sim.name_edit().to_string();
    if name.chars().count() < NAME_MAX && (frame / 15) % 2 == 0 {
        name.push('_');
    }
    let hint = if sim.name_edit().trim().is_empty() {
        "Type a name to begin."
    } else {
        "Enter to start."
    };
    let body = format!(
        "Virtual Pet Game\n\n        ?\n\nName your new pet! (max {NAME_MAX})\n\nName: {name}\n\n{hint}   Esc quit"
    );
    draw_box(buf, "Tamagotchi", &body, color);
}

fn draw_main(buf: &mut CellBuffer, sim: &PetSimulator, color: bool) {
    let pet = sim.pet();
    let fg = Color::White;

    let face = if pet.alive { pet.mood().face() } else { "(RIP)" };
    let title = format!("{}  {}", pet.name, face);
    draw_text(buf, 1, 0, &title, if color { Color::Magenta } else { fg });
    let sub = format!("Day: {} | Stage: {}", pet.age, pet.stage);
    draw_text(buf, 1, 1, &sub, fg);

    let stats = [
        ("Hunger   ", pet.hunger),
        ("Happiness", pet.happiness),
        ("Energy   ", pet.energy),
    ];
    for (i, (name, val)) in stats.iter().enumerate() {
        let line = format!("{name} {} {:>3.0}%", bar(*val, 14), val.round());
        draw_text(
            buf,
            1,
            3 + i as u16,
            &line,
            level_color(StatLevel::of(*val), color),
        );
    }

    let mut y = 7;
    if pet.needs_attention() {
        let warn_fg = if color { Color::Red } else { fg };
        draw_text(buf, 1, y, "Warning: your pet needs attention!", warn_fg);
        y += 1;
    }
    if let Some(msg) = sim.message() {
        let msg_fg = if color { Color::Yellow } else { fg };
        draw_text(buf, 1, y, &msg.to_string(), msg_fg);
    }

    let panel_w = 34i32;
    let cols = buf.w as i32;
    let cx = if cols > panel_w + 20 {
        panel_w + (cols - panel_w) / 2
    } else {
        cols / 2
    };
    let cy = if cols > panel_w + 20 {
        buf.h as i32 / 2
    } else {
        (buf.h as i32 + 10) / 2
    };
    draw_pet(buf, pet, cx, cy, color);

    let keys = if pet.alive {
        "Keys: f feed | p play | s sleep | c clean | h help | q quit"
    } else {
        "Your pet has passed on. n new game | q quit"
    };
    draw_text(buf, 1, buf.h.saturating_sub(1), keys, fg);
}
