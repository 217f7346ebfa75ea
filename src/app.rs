use crate::config::{load_settings, save_settings_atomic, Paths, Settings};
use crate::game::PetSimulator;
use crate::input::{collect_input_nonblocking, map_event_to_action};
use crate::model::Rules;
use crate::render::{draw_frame, Terminal};
use crate::storage::{FileStore, KeyValueStore, MemoryStore};
use crate::Cli;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest wall-clock gap one frame may feed the clocks. A suspended
/// process resumes where it left off instead of replaying the stall.
const MAX_FRAME_GAP: Duration = Duration::from_millis(250);

fn frame_gap(last: Instant, now: Instant) -> Duration {
    let gap = now.saturating_duration_since(last);
    if gap > MAX_FRAME_GAP {
        debug!(gap_ms = gap.as_millis() as u64, "frame stalled, dropping time");
    }
    gap.min(MAX_FRAME_GAP)
}

pub(crate) struct App {
    /// As read from disk; CLI overrides are not written back.
    file_settings: Settings,
    settings: Settings,
    sim: PetSimulator,
    paths: Paths,
    term: Terminal,
    should_quit: bool,
    frame: u64,
}

impl App {
    fn init(cli: &Cli, paths: Paths) -> anyhow::Result<Self> {
        let file_settings = load_settings(&paths.settings_path);
        let mut settings = file_settings.clone();
        if let Some(speed) = cli.speed {
            settings.speed = speed;
        }
        if let Some(fps) = cli.fps {
            settings.fps_cap = fps;
        }
        if cli.mono {
            settings.enable_color = false;
        }

        let store: Box<dyn KeyValueStore> = if cli.ephemeral {
            info!("ephemeral session, nothing will be saved");
            Box::new(MemoryStore::default())
        } else {
            info!(dir = %paths.data_dir.display(), "using file store");
            Box::new(FileStore::new(&paths.data_dir))
        };
        let sim = PetSimulator::load(store, Rules::scaled(settings.speed));

        let term = Terminal::begin()?;

        Ok(Self {
            file_settings,
            settings,
            sim,
            paths,
            term,
            should_quit: false,
            frame: 0,
        })
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let fps = self.settings.fps_cap.clamp(10, 240);
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);
        let mut last_frame = Instant::now();

        while !self.should_quit {
            self.term.resize_if_needed()?;

            for ev in collect_input_nonblocking(frame_dt)? {
                let alive = self.sim.pet().alive;
                if let Some(action) = map_event_to_action(self.sim.scene(), alive, &ev) {
                    if !self.sim.apply(action) {
                        self.should_quit = true;
                        break;
                    }
                }
            }

            let now = Instant::now();
            self.sim.advance(frame_gap(last_frame, now));
            last_frame = now;

            draw_frame(
                &mut self.term.cur,
                &self.sim,
                self.settings.enable_color,
                self.frame,
            );
            self.term.present()?;
            self.frame = self.frame.wrapping_add(1);

            spin_sleep(frame_dt, Instant::now());
        }

        self.sim.teardown();
        self.term.end()?;
        if let Err(e) = save_settings_atomic(&self.paths.settings_path, &self.file_settings) {
            warn!(error = %e, "could not save settings");
        }
        info!("bye");
        Ok(())
    }
}

pub(crate) fn run(cli: &Cli, paths: Paths) -> anyhow::Result<()> {
    let mut app = App::init(cli, paths)?;
    app.run()
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
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
