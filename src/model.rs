use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Key the save blob lives under in the key-value store.
pub(crate) const SAVE_KEY: &str = "tamagotchi-save";

pub(crate) const STAT_MAX: f32 = 100.0;
pub(crate) const NAME_MAX: usize = 12;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Stage {
    Egg,
    Baby,
    Child,
    Adult,
}

impl Stage {
    /// The stage reached from `self` at `age`, if the threshold is met.
    /// Only one step is ever taken.
    pub(crate) fn next_at(self, age: u64) -> Option<Stage> {
        match self {
            Stage::Egg if age >= 10 => Some(Stage::Baby),
            Stage::Baby if age >= 35 => Some(Stage::Child),
            Stage::Child if age >= 60 => Some(Stage::Adult),
            _ => None,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Stage::Egg => "egg",
            Stage::Baby => "baby",
            Stage::Child => "child",
            Stage::Adult => "adult",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mood {
    Happy,
    Okay,
    Worried,
    Critical,
}

impl Mood {
    pub(crate) fn face(self) -> &'static str {
        match self {
            Mood::Happy => "(^_^)",
            Mood::Okay => "(-_-)",
            Mood::Worried => "(;_;)",
            Mood::Critical => "(x_x)",
        }
    }
}

/// Colour band for a stat bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StatLevel {
    Good,
    Fair,
    Low,
}

impl StatLevel {
    pub(crate) fn of(value: f32) -> Self {
        if value > 60.0 {
            StatLevel::Good
        } else if value > 30.0 {
            StatLevel::Fair
        } else {
            StatLevel::Low
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct Pet {
    pub(crate) name: String,
    pub(crate) hunger: f32,
    pub(crate) happiness: f32,
    pub(crate) energy: f32,
    pub(crate) age: u64,
    pub(crate) stage: Stage,
    pub(crate) alive: bool,
}

impl Default for Pet {
    fn default() -> Self {
        Self {
            name: String::new(),
            hunger: 80.0,
            happiness: 80.0,
            energy: 80.0,
            age: 0,
            stage: Stage::Egg,
            alive: true,
        }
    }
}

impl Pet {
    pub(crate) fn mood(&self) -> Mood {
        let avg = (self.hunger + self.happiness + self.energy) / 3.0;
        if avg > 70.0 {
            Mood::Happy
        } else if avg > 40.0 {
            Mood::Okay
        } else if avg > 20.0 {
            Mood::Worried
        } else {
            Mood::Critical
        }
    }

    pub(crate) fn needs_attention(&self) -> bool {
        self.alive && (self.hunger < 30.0 || self.happiness < 30.0 || self.energy < 30.0)
    }

    /// Pull stats loaded from outside back into range. NaN becomes 0.
    pub(crate) fn sanitized(mut self) -> Self {
        let fix = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(0.0, STAT_MAX) };
        self.hunger = fix(self.hunger);
        self.happiness = fix(self.happiness);
        self.energy = fix(self.energy);
        self
    }
}

/// Everything persisted under [`SAVE_KEY`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SaveBlob {
    pub(crate) pet: Pet,
    pub(crate) game_started: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Scene {
    NameEntry,
    Main,
    Help,
}

#[derive(Clone, Debug)]
pub(crate) struct Rules {
    pub(crate) stat_tick: Duration, // 3s at speed 1
    pub(crate) age_tick: Duration,  // 1s at speed 1
    pub(crate) message_ttl: Duration,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            stat_tick: Duration::from_millis(3000),
            age_tick: Duration::from_millis(1000),
            message_ttl: Duration::from_millis(2500),
        }
    }
}

impl Rules {
    /// Shorten (speed > 1) or stretch every period. Non-positive speeds fall back to 1.
    pub(crate) fn scaled(speed: f32) -> Self {
        let speed = if speed.is_finite() && speed > 0.0 {
            speed
        } else {
            1.0
        };
        let base = Rules::default();
        let scale = |d: Duration| {
            let nanos = (d.as_nanos() as f64 / speed as f64).round() as u64;
            Duration::from_nanos(nanos).max(Duration::from_millis(1))
        };
        Self {
            stat_tick: scale(base.stat_tick),
            age_tick: scale(base.age_tick),
            message_ttl: scale(base.message_ttl),
        }
    }
}
