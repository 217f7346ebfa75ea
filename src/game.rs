use crate::clock::Clock;
use crate::model::{Pet, Rules, SaveBlob, Scene, NAME_MAX};
use crate::sim::{Notice, Outcome, PlayerAction};
use crate::storage::{clear_save, load_save, write_save, KeyValueStore};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum NameError {
    #[error("name is empty")]
    Empty,
    #[error("name is longer than {} characters", NAME_MAX)]
    TooLong,
}

pub(crate) fn validate_name(raw: &str) -> Result<String, NameError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.chars().count() > NAME_MAX {
        return Err(NameError::TooLong);
    }
    Ok(name.to_string())
}

struct Banner {
    notice: Notice,
    left: Duration,
}

/// Owns the pet, its two clocks and the store it is saved to.
pub(crate) struct PetSimulator {
    pet: Pet,
    game_started: bool,
    scene: Scene,
    name_edit: String,
    banner: Option<Banner>,
    stat_clock: Clock,
    age_clock: Clock,
    rules: Rules,
    store: Box<dyn KeyValueStore>,
}

impl PetSimulator {
    /// Build a simulator, hydrating from `store` when a save exists.
    pub(crate) fn load(store: Box<dyn KeyValueStore>, rules: Rules) -> Self {
        let mut sim = Self {
            pet: Pet::default(),
            game_started: false,
            scene: Scene::NameEntry,
            name_edit: String::new(),
            banner: None,
            stat_clock: Clock::new(rules.stat_tick),
            age_clock: Clock::new(rules.age_tick),
            rules,
            store,
        };

        if let Some(blob) = load_save(sim.store.as_ref()) {
            info!(
                name = %blob.pet.name,
                age = blob.pet.age,
                stage = %blob.pet.stage,
                alive = blob.pet.alive,
                "save loaded"
            );
            sim.name_edit = blob.pet.name.clone();
            sim.pet = blob.pet;
            sim.game_started = blob.game_started;
            if sim.game_started {
                sim.scene = Scene::Main;
            }
            sim.set_notice(Notice::Loaded);
            sim.sync_clocks();
        }
        sim
    }

    pub(crate) fn pet(&self) -> &Pet {
        &self.pet
    }

    pub(crate) fn game_started(&self) -> bool {
        self.game_started
    }

    pub(crate) fn scene(&self) -> Scene {
        self.scene
    }

    pub(crate) fn name_edit(&self) -> &str {
        &self.name_edit
    }

    pub(crate) fn message(&self) -> Option<&Notice> {
        self.banner.as_ref().map(|b| &b.notice)
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn clocks_armed(&self) -> (bool, bool) {
        (self.stat_clock.is_armed(), self.age_clock.is_armed())
    }

    pub(crate) fn start(&mut self) -> Result<(), NameError> {
        if self.game_started {
            return Ok(());
        }
        let name = validate_name(&self.name_edit)?;
        info!(%name, "new pet");
        self.pet.name = name.clone();
        self.name_edit = name.clone();
        self.game_started = true;
        self.scene = Scene::Main;
        self.set_notice(Notice::Welcome(name));
        self.sync_clocks();
        self.save();
        Ok(())
    }

    /// Apply one player action. Returns `false` when the player asked to quit.
    pub(crate) fn apply(&mut self, action: PlayerAction) -> bool {
        match action {
            PlayerAction::Feed => self.care(Pet::feed),
            PlayerAction::Play => self.care(Pet::play),
            PlayerAction::Sleep => self.care(Pet::sleep),
            PlayerAction::Clean => self.care(Pet::clean),
            PlayerAction::NameChar(ch) => {
                if !self.game_started && self.name_edit.chars().count() < NAME_MAX {
                    self.name_edit.push(ch);
                }
            }
            PlayerAction::NameBackspace => {
                if !self.game_started {
                    self.name_edit.pop();
                }
            }
            PlayerAction::Start => {
                if let Err(e) = self.start() {
                    debug!(error = %e, "start refused");
                }
            }
            PlayerAction::NewGame => {
                if self.game_started && !self.pet.alive {
                    self.reset();
                }
            }
            PlayerAction::HelpToggle => {
                self.scene = match self.scene {
                    Scene::Main => Scene::Help,
                    Scene::Help => Scene::Main,
                    Scene::NameEntry => Scene::NameEntry,
                };
            }
            PlayerAction::Back => {
                if self.scene == Scene::Help {
                    self.scene = Scene::Main;
                }
            }
            PlayerAction::Quit => return false,
        }
        true
    }

    fn care(&mut self, handler: fn(&mut Pet) -> Outcome) {
        if !self.game_started {
            return;
        }
        let outcome = handler(&mut self.pet);
        if self.absorb(outcome) {
            self.save();
        }
    }

    /// Surface the outcome's notice; report whether the record changed.
    fn absorb(&mut self, outcome: Outcome) -> bool {
        let changed = outcome.changed();
        if let Some(notice) = outcome.into_notice() {
            self.set_notice(notice);
        }
        changed
    }

    /// Feed elapsed time to both clocks and run every tick that came due,
    /// in the order they came due. The save is written once at the end if
    /// any tick changed the pet.
    pub(crate) fn advance(&mut self, dt: Duration) {
        if let Some(b) = &mut self.banner {
            b.left = b.left.saturating_sub(dt);
            if b.left.is_zero() {
                self.banner = None;
            }
        }

        // step from tick to tick so the two clocks interleave in time order
        let mut remaining = dt;
        let mut dirty = false;
        while !remaining.is_zero() {
            let step = remaining
                .min(self.stat_clock.until_next())
                .min(self.age_clock.until_next());
            self.stat_clock.feed(step);
            self.age_clock.feed(step);
            remaining -= step;

            if self.stat_clock.pop_tick() {
                let outcome = self.pet.decay();
                if !self.pet.alive {
                    info!(name = %self.pet.name, age = self.pet.age, "pet died");
                    self.stat_clock.disarm();
                }
                dirty |= self.absorb(outcome);
            }
            if self.age_clock.pop_tick() {
                let outcome = self.pet.grow();
                if let Outcome::Changed(Some(Notice::Evolved(_, stage))) = &outcome {
                    info!(name = %self.pet.name, age = self.pet.age, %stage, "evolved");
                }
                dirty |= self.absorb(outcome);
            }
        }
        if dirty {
            self.save();
        }
    }

    /// Delete the save and go back to name entry with a fresh egg.
    pub(crate) fn reset(&mut self) {
        info!("reset");
        clear_save(self.store.as_mut());
        self.pet = Pet::default();
        self.game_started = false;
        self.scene = Scene::NameEntry;
        self.name_edit.clear();
        self.banner = None;
        self.teardown();
    }

    /// Cancel both clocks and anything they had pending.
    pub(crate) fn teardown(&mut self) {
        debug!(
            stat = self.stat_clock.is_armed(),
            age = self.age_clock.is_armed(),
            "disarming clocks"
        );
        self.stat_clock.disarm();
        self.age_clock.disarm();
    }

    fn sync_clocks(&mut self) {
        if !self.game_started {
            self.teardown();
            return;
        }
        // the age clock stays armed after death and just no-ops
        self.age_clock.arm();
        if self.pet.alive {
            self.stat_clock.arm();
        } else {
            self.stat_clock.disarm();
        }
    }

    fn set_notice(&mut self, notice: Notice) {
        self.banner = Some(Banner {
            notice,
            left: self.rules.message_ttl,
        });
    }

    fn save(&mut self) {
        if !self.game_started {
            return;
        }
        let blob = SaveBlob {
            pet: self.pet.clone(),
            game_started: self.game_started,
        };
        write_save(self.store.as_mut(), &blob);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Stage, SAVE_KEY};
    use crate::storage::{MemoryStore, StoreError};
    use std::cell::Cell;
    use std::rc::Rc;

    /// Memory store that counts writes.
    struct CountingStore {
        inner: MemoryStore,
        sets: Rc<Cell<usize>>,
    }

    impl KeyValueStore for CountingStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            self.sets.set(self.sets.get() + 1);
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
    }

    fn counted(name: &str) -> (PetSimulator, Rc<Cell<usize>>) {
        let sets = Rc::new(Cell::new(0));
        let store = CountingStore {
            inner: MemoryStore::default(),
            sets: Rc::clone(&sets),
        };
        let mut sim = PetSimulator::load(Box::new(store), Rules::default());
        for ch in name.chars() {
            sim.apply(PlayerAction::NameChar(ch));
        }
        sim.apply(PlayerAction::Start);
        (sim, sets)
    }

    fn fresh() -> PetSimulator {
        PetSimulator::load(Box::new(MemoryStore::default()), Rules::default())
    }

    fn started(name: &str) -> PetSimulator {
        let mut sim = fresh();
        for ch in name.chars() {
            sim.apply(PlayerAction::NameChar(ch));
        }
        sim.apply(PlayerAction::Start);
        sim
    }

    fn saved(sim: &PetSimulator) -> Option<SaveBlob> {
        load_save(sim.store())
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn name_validation() {
        assert_eq!(validate_name("   "), Err(NameError::Empty));
        assert_eq!(validate_name(" Ember "), Ok("Ember".to_string()));
        assert_eq!(validate_name("abcdefghijklm"), Err(NameError::TooLong));
        assert_eq!(validate_name("ドラゴンドラゴンドラゴン"), Ok("ドラゴンドラゴンドラゴン".to_string()));
    }

    #[test]
    fn fresh_store_waits_for_a_name() {
        let mut sim = fresh();
        assert!(!sim.game_started());
        assert_eq!(sim.scene(), Scene::NameEntry);
        assert_eq!(sim.clocks_armed(), (false, false));
        sim.apply(PlayerAction::Start);
        assert!(!sim.game_started());
        sim.advance(secs(30));
        assert_eq!(sim.pet(), &Pet::default());
        assert!(saved(&sim).is_none());
    }

    #[test]
    fn name_editor_caps_length() {
        let mut sim = fresh();
        for _ in 0..20 {
            sim.apply(PlayerAction::NameChar('a'));
        }
        assert_eq!(sim.name_edit().chars().count(), NAME_MAX);
        sim.apply(PlayerAction::NameBackspace);
        assert_eq!(sim.name_edit().chars().count(), NAME_MAX - 1);
    }

    #[test]
    fn start_names_pet_and_saves() {
        let sim = started("  Ember ");
        assert!(sim.game_started());
        assert_eq!(sim.pet().name, "Ember");
        assert_eq!(sim.scene(), Scene::Main);
        assert_eq!(sim.clocks_armed(), (true, true));
        assert_eq!(sim.message().unwrap().to_string(), "Welcome Ember!");
        let blob = saved(&sim).unwrap();
        assert!(blob.game_started);
        assert_eq!(blob.pet.name, "Ember");
    }

    #[test]
    fn second_start_is_ignored() {
        let mut sim = started("Ember");
        sim.advance(Duration::from_millis(2_400));
        for ch in "Ash".chars() {
            sim.apply(PlayerAction::NameChar(ch));
        }
        sim.apply(PlayerAction::Start);
        assert_eq!(sim.pet().name, "Ember");
        assert_eq!(sim.name_edit(), "Ember");

        // the old welcome runs out on schedule instead of restarting
        sim.advance(Duration::from_millis(100));
        assert!(sim.message().is_none());

        // clock phase carried over: the first stat tick still lands at 3s
        sim.advance(Duration::from_millis(499));
        assert_eq!(sim.pet().hunger, 80.0);
        sim.advance(Duration::from_millis(1));
        assert_eq!(sim.pet().hunger, 78.0);
        assert_eq!(sim.pet().age, 3);
    }

    #[test]
    fn ticks_in_one_advance_share_one_write() {
        let (mut sim, sets) = counted("Ember");
        assert_eq!(sets.get(), 1);
        sets.set(0);
        sim.advance(secs(5));
        assert_eq!(sim.pet().age, 5);
        assert_eq!(sim.pet().hunger, 78.0);
        assert_eq!(sets.get(), 1);
        sim.advance(Duration::from_millis(10));
        assert_eq!(sets.get(), 1);
    }

    #[test]
    fn dead_age_ticks_write_nothing() {
        let (mut sim, sets) = counted("Ember");
        sim.pet.hunger = 0.0;
        sim.pet.happiness = 0.0;
        sim.pet.energy = 1.0;
        sim.advance(secs(3));
        assert!(!sim.pet().alive);
        sets.set(0);
        sim.advance(secs(120));
        assert_eq!(sets.get(), 0);
        sim.apply(PlayerAction::Feed);
        assert_eq!(sets.get(), 0);
    }

    #[test]
    fn clocks_drive_decay_and_age() {
        let mut sim = started("Ember");
        sim.advance(Duration::from_millis(2_999));
        assert_eq!(sim.pet().hunger, 80.0);
        assert_eq!(sim.pet().age, 2);
        sim.advance(Duration::from_millis(1));
        assert_eq!(sim.pet().hunger, 78.0);
        assert_eq!(sim.pet().happiness, 78.5);
        assert_eq!(sim.pet().energy, 79.0);
        assert_eq!(sim.pet().age, 3);
        assert_eq!(saved(&sim).unwrap().pet, *sim.pet());
    }

    #[test]
    fn egg_hatches_after_ten_ticks() {
        let mut sim = started("Ember");
        sim.advance(secs(9));
        assert_eq!(sim.pet().stage, Stage::Egg);
        sim.advance(secs(1));
        assert_eq!(sim.pet().stage, Stage::Baby);
        assert_eq!(
            sim.message().unwrap().to_string(),
            "Ember evolved to baby stage!"
        );
    }

    #[test]
    fn actions_save_and_notify() {
        let mut sim = started("Ember");
        sim.apply(PlayerAction::Feed);
        assert_eq!(sim.pet().hunger, 100.0);
        assert_eq!(sim.pet().happiness, 85.0);
        assert_eq!(saved(&sim).unwrap().pet.hunger, 100.0);
        assert_eq!(sim.message().unwrap().to_string(), "Ember is eating! Yum!");
    }

    #[test]
    fn too_tired_changes_nothing() {
        let mut sim = started("Ember");
        sim.pet.energy = 10.0;
        let before = sim.pet().clone();
        sim.apply(PlayerAction::Play);
        assert_eq!(sim.pet(), &before);
        assert_eq!(
            sim.message(),
            Some(&Notice::TooTired("Ember".to_string()))
        );
    }

    #[test]
    fn messages_expire() {
        let mut sim = started("Ember");
        assert!(sim.message().is_some());
        sim.advance(Duration::from_millis(2_400));
        assert!(sim.message().is_some());
        sim.advance(Duration::from_millis(100));
        assert!(sim.message().is_none());
    }

    #[test]
    fn death_stops_stat_clock_but_not_age_clock() {
        let mut sim = started("Ember");
        sim.pet.hunger = 0.0;
        sim.pet.happiness = 0.0;
        sim.pet.energy = 1.0;
        sim.advance(secs(3));
        assert!(!sim.pet().alive);
        assert_eq!(sim.clocks_armed(), (false, true));
        assert_eq!(sim.message(), Some(&Notice::PassedAway));
        let age = sim.pet().age;
        let frozen = sim.pet().clone();

        sim.advance(secs(120));
        assert_eq!(sim.pet().age, age);
        assert_eq!(sim.pet(), &frozen);
        assert!(!saved(&sim).unwrap().pet.alive);

        sim.apply(PlayerAction::Feed);
        assert_eq!(sim.pet(), &frozen);
    }

    #[test]
    fn new_game_only_after_death() {
        let mut sim = started("Ember");
        sim.apply(PlayerAction::NewGame);
        assert!(sim.game_started());

        sim.pet.alive = false;
        sim.apply(PlayerAction::NewGame);
        assert!(!sim.game_started());
        assert_eq!(sim.pet(), &Pet::default());
        assert_eq!(sim.scene(), Scene::NameEntry);
        assert!(sim.name_edit().is_empty());
        assert!(sim.message().is_none());
        assert_eq!(sim.clocks_armed(), (false, false));
        assert_eq!(sim.store().get(SAVE_KEY).unwrap(), None);
    }

    #[test]
    fn reset_drops_pending_ticks() {
        let mut sim = started("Ember");
        sim.advance(Duration::from_millis(2_500));
        sim.reset();
        for ch in "Ash".chars() {
            sim.apply(PlayerAction::NameChar(ch));
        }
        sim.apply(PlayerAction::Start);
        sim.advance(Duration::from_millis(600));
        assert_eq!(sim.pet().hunger, 80.0);
        assert_eq!(sim.pet().age, 0);
    }

    #[test]
    fn resumes_from_saved_blob() {
        let mut store = MemoryStore::default();
        let blob = SaveBlob {
            pet: Pet {
                name: "Ember".to_string(),
                hunger: 40.0,
                happiness: 30.0,
                energy: 20.0,
                age: 34,
                stage: Stage::Baby,
                alive: true,
            },
            game_started: true,
        };
        write_save(&mut store, &blob);

        let mut sim = PetSimulator::load(Box::new(store), Rules::default());
        assert_eq!(sim.pet(), &blob.pet);
        assert!(sim.game_started());
        assert_eq!(sim.scene(), Scene::Main);
        assert_eq!(sim.message(), Some(&Notice::Loaded));
        assert_eq!(sim.clocks_armed(), (true, true));

        sim.advance(secs(1));
        assert_eq!(sim.pet().stage, Stage::Child);
    }

    #[test]
    fn resumed_dead_pet_keeps_only_age_clock() {
        let mut store = MemoryStore::default();
        let blob = SaveBlob {
            pet: Pet {
                name: "Ember".to_string(),
                alive: false,
                ..Pet::default()
            },
            game_started: true,
        };
        write_save(&mut store, &blob);
        let sim = PetSimulator::load(Box::new(store), Rules::default());
        assert_eq!(sim.clocks_armed(), (false, true));
    }

    #[test]
    fn help_toggles_only_in_game() {
        let mut sim = fresh();
        sim.apply(PlayerAction::HelpToggle);
        assert_eq!(sim.scene(), Scene::NameEntry);
        let mut sim = started("Ember");
        sim.apply(PlayerAction::HelpToggle);
        assert_eq!(sim.scene(), Scene::Help);
        sim.apply(PlayerAction::Back);
        assert_eq!(sim.scene(), Scene::Main);
        assert!(!sim.apply(PlayerAction::Quit));
    }
}
