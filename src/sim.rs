use crate::model::{Pet, Stage, STAT_MAX};
use std::fmt;

const HUNGER_DECAY: f32 = 2.0;
const HAPPINESS_DECAY: f32 = 1.5;
const ENERGY_DECAY: f32 = 1.0;

/// Energy below this and the pet refuses to play.
const PLAY_MIN_ENERGY: f32 = 15.0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PlayerAction {
    Feed,
    Play,
    Sleep,
    Clean,
    NameChar(char),
    NameBackspace,
    Start,
    NewGame,
    HelpToggle,
    Back,
    Quit,
}

/// Transient message shown to the player.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Notice {
    Welcome(String),
    Loaded,
    Eating(String),
    Playing(String),
    TooTired(String),
    Sleeping(String),
    Fresh(String),
    Evolved(String, Stage),
    PassedAway,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Welcome(name) => write!(f, "Welcome {name}!"),
            Notice::Loaded => f.write_str("Game loaded!"),
            Notice::Eating(name) => write!(f, "{name} is eating! Yum!"),
            Notice::Playing(name) => write!(f, "{name} is having fun!"),
            Notice::TooTired(name) => write!(f, "{name} is too tired to play!"),
            Notice::Sleeping(name) => write!(f, "{name} is sleeping... Zzz"),
            Notice::Fresh(name) => write!(f, "{name} feels fresh and clean!"),
            Notice::Evolved(name, stage) => write!(f, "{name} evolved to {stage} stage!"),
            Notice::PassedAway => f.write_str("Your pet has passed away..."),
        }
    }
}

/// Result of one transition on a [`Pet`].
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Outcome {
    /// The record changed; persist it.
    Changed(Option<Notice>),
    /// Refused with an advisory message; nothing changed.
    Rejected(Notice),
    /// Nothing happened (dead pet).
    Ignored,
}

impl Outcome {
    pub(crate) fn changed(&self) -> bool {
        matches!(self, Outcome::Changed(_))
    }

    pub(crate) fn into_notice(self) -> Option<Notice> {
        match self {
            Outcome::Changed(n) => n,
            Outcome::Rejected(n) => Some(n),
            Outcome::Ignored => None,
        }
    }
}

fn add(v: f32, d: f32) -> f32 {
    (v + d).clamp(0.0, STAT_MAX)
}

impl Pet {
    pub(crate) fn feed(&mut self) -> Outcome {
        if !self.alive {
            return Outcome::Ignored;
        }
        self.hunger = add(self.hunger, 20.0);
        self.happiness = add(self.happiness, 5.0);
        Outcome::Changed(Some(Notice::Eating(self.name.clone())))
    }

    pub(crate) fn play(&mut self) -> Outcome {
        if !self.alive {
            return Outcome::Ignored;
        }
        if self.energy < PLAY_MIN_ENERGY {
            return Outcome::Rejected(Notice::TooTired(self.name.clone()));
        }
        self.happiness = add(self.happiness, 25.0);
        self.energy = add(self.energy, -15.0);
        Outcome::Changed(Some(Notice::Playing(self.name.clone())))
    }

    pub(crate) fn sleep(&mut self) -> Outcome {
        if !self.alive {
            return Outcome::Ignored;
        }
        self.energy = add(self.energy, 40.0);
        self.hunger = add(self.hunger, -5.0);
        Outcome::Changed(Some(Notice::Sleeping(self.name.clone())))
    }

    pub(crate) fn clean(&mut self) -> Outcome {
        if !self.alive {
            return Outcome::Ignored;
        }
        self.happiness = add(self.happiness, 15.0);
        Outcome::Changed(Some(Notice::Fresh(self.name.clone())))
    }

    /// One stat-clock tick.
    ///
    /// The pet stays alive while any stat is still above zero after decay.
    /// When all three hit zero together it dies and keeps the values it had
    /// before this tick.
    pub(crate) fn decay(&mut self) -> Outcome {
        if !self.alive {
            return Outcome::Ignored;
        }
        let hunger = add(self.hunger, -HUNGER_DECAY);
        let happiness = add(self.happiness, -HAPPINESS_DECAY);
        let energy = add(self.energy, -ENERGY_DECAY);

        let alive = hunger > 0.0 || happiness > 0.0 || energy > 0.0;
        if !alive {
            self.alive = false;
            return Outcome::Changed(Some(Notice::PassedAway));
        }

        self.hunger = hunger;
        self.happiness = happiness;
        self.energy = energy;
        Outcome::Changed(None)
    }

    /// One age-clock tick: age +1, then at most one stage step.
    pub(crate) fn grow(&mut self) -> Outcome {
        if !self.alive {
            return Outcome::Ignored;
        }
        self.age += 1;
        match self.stage.next_at(self.age) {
            Some(next) => {
                self.stage = next;
                Outcome::Changed(Some(Notice::Evolved(self.name.clone(), next)))
            }
            None => Outcome::Changed(None),
        }
    }
}
