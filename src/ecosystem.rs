//! Ecosystem orchestrator - owns every collection and runs the turn loop.

use crate::arena::{EntityId, Identified};
use crate::behavior::{apply_decisions, decide_all};
use crate::checkpoint::{Checkpoint, EcosystemSnapshot, PersistenceError, RestoredState};
use crate::config::Config;
use crate::ecology::{
    resolve_interactions, DayPhase, IdAllocator, PopulationCounts, PopulationManager, Populations, Season,
    TimeClock,
};
use crate::geometry::{Bounds, Vec2};
use crate::motion::MotionIntegrator;
use crate::organism::{Animal, DeathCause, Plant, Species};
use crate::saves::SaveMeta;
use crate::stats::{EcosystemEvent, Statistics, StatsHistory};
use log::{debug, info};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

/// The simulated aquarium
pub struct Ecosystem {
    // Population
    pub populations: Populations,

    /// Events of the most recent turn; cleared at the start of each turn
    pub events: Vec<EcosystemEvent>,

    // Configuration
    pub config: Config,

    // Statistics
    pub stats_history: StatsHistory,

    // State
    clock: TimeClock,
    turn_count: u64,
    paused: bool,

    ids: IdAllocator,
    motion: MotionIntegrator,

    // Random number generator (seeded for reproducibility)
    rng: ChaCha8Rng,
    seed: u64,
}

impl Ecosystem {
    /// Create an ecosystem populated with the configured initial counts
    pub fn new(config: Config) -> Self {
        let seed = rand::thread_rng().gen();
        Self::new_with_seed(config, seed)
    }

    /// Create an ecosystem with a specific seed for reproducibility
    pub fn new_with_seed(config: Config, seed: u64) -> Self {
        let mut ecosystem = Self::empty(config, seed);
        ecosystem.initialize_default();
        ecosystem
    }

    /// An ecosystem with no entities at all
    pub fn empty(config: Config, seed: u64) -> Self {
        Self {
            populations: Populations::new(),
            events: Vec::new(),
            stats_history: StatsHistory::new(config.logging.stats_interval),
            clock: TimeClock::new(config.clock.clone()),
            turn_count: 0,
            paused: false,
            ids: IdAllocator::new(),
            motion: MotionIntegrator::new(&config),
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            config,
        }
    }

    /// Clear everything and spawn the requested counts at random positions.
    /// Counts outside the configured limits are clamped.
    pub fn initialize(&mut self, requested: PopulationCounts) -> PopulationCounts {
        let counts = self.config.population.clamp(requested);

        self.populations.clear();
        self.events.clear();
        self.stats_history.snapshots.clear();
        self.clock = TimeClock::new(self.config.clock.clone());
        self.turn_count = 0;
        self.ids = IdAllocator::new();

        let manager = PopulationManager::new(&self.config);
        for species in Species::ALL {
            manager.populate(
                &mut self.populations,
                species,
                counts.get(species),
                &mut self.ids,
                &mut self.rng,
            );
        }

        info!(
            "Initialized ecosystem: {} plants, {} fish, {} trout, {} sharks (seed {})",
            counts.plants, counts.fish, counts.trout, counts.sharks, self.seed
        );
        counts
    }

    pub fn initialize_default(&mut self) -> PopulationCounts {
        self.initialize(self.config.population.initial)
    }

    /// One discrete AI turn. Does nothing while paused.
    pub fn simulate_turn(&mut self) {
        if self.paused {
            return;
        }
        self.events.clear();

        // Phase 1: Time
        self.clock.advance(1.0);
        let modifiers = self.config.seasons.modifiers(self.clock.season());

        // Phase 2: Season modifiers, metabolism and aging
        for animal in self.populations.all_animals_mut() {
            animal.apply_season_modifiers(&modifiers);
            animal.metabolize();
        }

        // Phase 3: Decide against start-of-turn state, then apply in order
        let decisions = decide_all(&self.populations, &self.config, &mut self.rng);
        apply_decisions(&mut self.populations, decisions, &self.config);

        // Phase 4: Feeding
        let outcome = resolve_interactions(&mut self.populations, &self.config, &mut self.events);

        // Phase 5: Reproduction
        let manager = PopulationManager::new(&self.config);
        let births = manager.reproduce(
            &mut self.populations,
            &modifiers,
            &outcome.eaten,
            &mut self.ids,
            &mut self.rng,
            &mut self.events,
        );

        // Phase 6: Remove eaten and dead entities in one batch
        let mut doomed: HashSet<EntityId> = outcome.eaten;
        for animal in self.populations.all_animals().filter(|a| doomed.contains(&a.id())) {
            self.events.push(EcosystemEvent::death(
                animal.id(),
                animal.species,
                animal.position,
                DeathCause::Predation,
            ));
        }
        for (id, species, position, cause) in manager.collect_dead(&self.populations) {
            if doomed.insert(id) {
                self.events.push(EcosystemEvent::death(id, species, position, cause));
            }
        }
        self.populations.remove(&doomed);

        // Phase 7: Plants regrow
        manager.grow_plants(&mut self.populations, &modifiers, &mut self.ids, &mut self.rng);

        // Phase 8: Floors and ceilings
        manager.balance(&mut self.populations, &mut self.ids, &mut self.rng, &mut self.events);
        self.populations.clear_stale_targets();

        self.turn_count += 1;
        let stats = self.get_statistics();
        self.stats_history.maybe_record(&stats);

        debug!(
            "Turn {}: {} meals, {} births, {} removed | {}",
            self.turn_count,
            outcome.meals,
            births,
            doomed.len(),
            stats.summary()
        );
    }

    /// Run `turns` AI turns
    pub fn run(&mut self, turns: u64) {
        for _ in 0..turns {
            self.simulate_turn();
        }
    }

    /// Run turns with a callback after each one
    pub fn run_with_callback<F>(&mut self, turns: u64, mut callback: F)
    where
        F: FnMut(&Ecosystem, u64),
    {
        for i in 0..turns {
            self.simulate_turn();
            callback(self, i);
        }
    }

    /// One motion frame of `dt` seconds. Returns the number of arrivals.
    pub fn advance_motion(&mut self, dt: f32) -> usize {
        if self.paused {
            return 0;
        }
        self.motion
            .advance(&mut self.populations, &self.config, dt, &mut self.rng)
    }

    /// Enforce population limits outside the turn loop
    pub fn balance_populations(&mut self) {
        let manager = PopulationManager::new(&self.config);
        manager.balance(&mut self.populations, &mut self.ids, &mut self.rng, &mut self.events);
        self.populations.clear_stale_targets();
    }

    /// Place a new entity of `species` at `position` (clamped to the area)
    pub fn spawn(&mut self, species: Species, position: Vec2) -> EntityId {
        let bounds = Bounds::new(self.config.world.width, self.config.world.height);
        let (width, height) = self.config.size_of(species);
        let position = bounds.clamp(position, Vec2::new(width, height));
        let id = self.ids.allocate();

        match (self.config.profile(species), self.populations.animals_mut(species)) {
            (Some(profile), Some(arena)) => {
                arena.insert(Animal::new(id, species, position, profile, &mut self.rng));
            }
            _ => self.populations.plants.insert(Plant::new(id, position, &self.config.plants)),
        }
        id
    }

    pub fn get_statistics(&self) -> Statistics {
        let mean = |species: Species| -> f32 {
            match self.populations.animals(species) {
                Some(arena) if !arena.is_empty() => {
                    arena.iter().map(|a| a.energy).sum::<f32>() / arena.len() as f32
                }
                _ => 0.0,
            }
        };

        let mut stats = Statistics {
            turn: self.turn_count,
            counts: self.populations.counts(),
            day: self.clock.day(),
            season: self.clock.season(),
            phase: self.clock.phase(),
            day_progress: self.clock.day_progress(),
            season_progress: self.clock.season_progress(),
            is_night: self.clock.is_night(),
            light_factor: self.clock.light_factor(),
            mean_energy: [mean(Species::Fish), mean(Species::Trout), mean(Species::Shark)],
            births: 0,
            deaths: 0,
            meals: 0,
        };
        stats.count_events(&self.events);
        stats
    }

    pub fn clock(&self) -> &TimeClock {
        &self.clock
    }

    pub fn day(&self) -> u64 {
        self.clock.day()
    }

    pub fn season(&self) -> Season {
        self.clock.season()
    }

    pub fn phase(&self) -> DayPhase {
        self.clock.phase()
    }

    pub fn turn_count(&self) -> u64 {
        self.turn_count
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    /// Get seed for reproducibility
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn counts(&self) -> PopulationCounts {
        self.populations.counts()
    }

    pub fn animal(&self, id: EntityId) -> Option<&Animal> {
        self.populations.animal(id)
    }

    pub fn animal_mut(&mut self, id: EntityId) -> Option<&mut Animal> {
        self.populations.animal_mut(id)
    }

    pub fn plant(&self, id: EntityId) -> Option<&Plant> {
        self.populations.plants.get(id)
    }

    pub fn plant_mut(&mut self, id: EntityId) -> Option<&mut Plant> {
        self.populations.plants.get_mut(id)
    }

    /// Serializable view of the current state
    pub fn to_snapshot(&self) -> EcosystemSnapshot {
        EcosystemSnapshot::capture(
            &self.populations,
            &self.clock,
            self.turn_count,
            self.paused,
            &self.ids,
        )
    }

    /// Rebuild an ecosystem from a snapshot. The generator is reseeded
    /// from `seed` since snapshots do not carry its state.
    pub fn from_snapshot(config: Config, snapshot: &EcosystemSnapshot, seed: u64) -> Result<Self, PersistenceError> {
        let mut ecosystem = Self::empty(config, seed);
        let restored = snapshot.restore(&ecosystem.config, &mut ecosystem.rng)?;
        ecosystem.install(restored);
        info!(
            "Loaded ecosystem at turn {} ({} entities)",
            ecosystem.turn_count,
            ecosystem.counts().total()
        );
        Ok(ecosystem)
    }

    fn install(&mut self, restored: RestoredState) {
        self.populations = restored.populations;
        self.clock = restored.clock;
        self.turn_count = restored.turn_count;
        self.paused = restored.paused;
        self.ids = restored.ids;
        self.events.clear();
    }

    /// Metadata for a save slot describing the current state
    pub fn save_meta(&self) -> SaveMeta {
        SaveMeta::new(self.turn_count, self.counts(), self.get_statistics().summary())
    }

    /// Create checkpoint of current state
    pub fn create_checkpoint(&self) -> Checkpoint {
        Checkpoint::new(
            self.config.clone(),
            self.to_snapshot(),
            self.seed,
            self.rng.clone(),
            self.stats_history.clone(),
        )
    }

    /// Restore ecosystem from checkpoint, continuing the saved random stream
    pub fn from_checkpoint(checkpoint: Checkpoint) -> Result<Self, PersistenceError> {
        let Checkpoint {
            config,
            snapshot,
            seed,
            rng,
            history,
            ..
        } = checkpoint;

        let mut ecosystem = Self::empty(config, seed);
        // Snapshot defaults may draw random numbers; keep the saved stream intact
        let mut scratch = ChaCha8Rng::seed_from_u64(seed);
        let restored = snapshot.restore(&ecosystem.config, &mut scratch)?;
        ecosystem.install(restored);
        ecosystem.rng = rng;
        ecosystem.stats_history = history;
        info!(
            "Restored checkpoint at turn {} (day {})",
            ecosystem.turn_count,
            ecosystem.day()
        );
        Ok(ecosystem)
    }
}
