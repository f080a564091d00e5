//! Persistence: entity records, ecosystem snapshots and binary checkpoints.
//!
//! A snapshot stores only what cannot be derived: each entity's species,
//! position, target, vitals, state tag and id, plus the clock's `turn`.
//! Relations between animals are stored as ids and re-resolved on load.

use crate::arena::{EntityId, Identified};
use crate::config::Config;
use crate::ecology::{IdAllocator, Populations, TimeClock};
use crate::geometry::{Bounds, Vec2};
use crate::organism::{Animal, AnimalState, Plant, Species, UnknownSpecies};
use crate::stats::StatsHistory;
use log::{info, warn};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while saving or loading simulation state
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    #[error("version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error(transparent)]
    UnknownSpecies(#[from] UnknownSpecies),
    #[error("save slot not found: {0}")]
    SlotNotFound(String),
    #[error("invalid save id: {0:?}")]
    InvalidSaveId(String),
}

fn default_direction() -> i8 {
    1
}

/// Flat, format-agnostic record of one entity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    #[serde(default)]
    pub id: Option<EntityId>,
    pub species: String,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub vx: f32,
    #[serde(default)]
    pub vy: f32,
    #[serde(default)]
    pub target_x: Option<f32>,
    #[serde(default)]
    pub target_y: Option<f32>,
    #[serde(default)]
    pub energy: Option<f32>,
    #[serde(default)]
    pub age: f32,
    #[serde(default)]
    pub state: String,
    #[serde(default = "default_direction")]
    pub direction: i8,
    #[serde(default)]
    pub target_entity: Option<EntityId>,
    #[serde(default)]
    pub base_speed: Option<f32>,
    /// Plants only
    #[serde(default)]
    pub growth: Option<f32>,
}

impl EntityRecord {
    pub fn from_plant(plant: &Plant) -> Self {
        Self {
            id: Some(plant.id()),
            species: Species::Plant.tag().to_string(),
            x: plant.position.x,
            y: plant.position.y,
            vx: 0.0,
            vy: 0.0,
            target_x: None,
            target_y: None,
            energy: None,
            age: 0.0,
            state: String::new(),
            direction: 1,
            target_entity: None,
            base_speed: None,
            growth: Some(plant.growth),
        }
    }

    pub fn from_animal(animal: &Animal) -> Self {
        Self {
            id: Some(animal.id()),
            species: animal.species.tag().to_string(),
            x: animal.position.x,
            y: animal.position.y,
            vx: animal.velocity.x,
            vy: animal.velocity.y,
            target_x: Some(animal.target.x),
            target_y: Some(animal.target.y),
            energy: Some(animal.energy),
            age: animal.age,
            state: animal.state.tag().to_string(),
            direction: animal.direction,
            target_entity: animal.target_entity,
            base_speed: Some(animal.base_speed),
            growth: None,
        }
    }
}

/// Serializable state of a whole ecosystem
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EcosystemSnapshot {
    #[serde(default)]
    pub version: u32,
    /// Clock turn; every derived clock field is rebuilt from it
    #[serde(default)]
    pub turn: f64,
    #[serde(default)]
    pub turn_count: u64,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub next_id: EntityId,
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
}

/// Everything an ecosystem needs back from a snapshot
#[derive(Debug)]
pub struct RestoredState {
    pub populations: Populations,
    pub clock: TimeClock,
    pub turn_count: u64,
    pub paused: bool,
    pub ids: IdAllocator,
}

impl EcosystemSnapshot {
    pub const VERSION: u32 = 1;

    pub fn capture(
        populations: &Populations,
        clock: &TimeClock,
        turn_count: u64,
        paused: bool,
        ids: &IdAllocator,
    ) -> Self {
        let entities = populations
            .plants
            .iter()
            .map(EntityRecord::from_plant)
            .chain(populations.all_animals().map(EntityRecord::from_animal))
            .collect();

        Self {
            version: Self::VERSION,
            turn: clock.turn(),
            turn_count,
            paused,
            next_id: ids.peek(),
            entities,
        }
    }

    /// Rebuild populations and clock.
    ///
    /// Missing fields fall back to species defaults and out-of-range values
    /// are clamped. Target ids that no longer resolve become `None`. An
    /// unknown species tag fails the whole load.
    pub fn restore<R: Rng + ?Sized>(&self, config: &Config, rng: &mut R) -> Result<RestoredState, PersistenceError> {
        let bounds = Bounds::new(config.world.width, config.world.height);

        let max_id = self.entities.iter().filter_map(|r| r.id).max().unwrap_or(0);
        let mut ids = IdAllocator::starting_at(self.next_id.max(max_id + 1));
        let mut seen = HashSet::new();
        let mut populations = Populations::new();

        for record in &self.entities {
            let species: Species = record.species.parse()?;
            let id = match record.id {
                Some(id) if seen.insert(id) => id,
                Some(id) => {
                    warn!("Duplicate entity id {} in snapshot, assigning a new one", id);
                    ids.allocate()
                }
                None => ids.allocate(),
            };

            let (width, height) = config.size_of(species);
            let position = bounds.clamp(Vec2::new(record.x, record.y), Vec2::new(width, height));

            match config.profile(species) {
                None => {
                    let mut plant = Plant::new(id, position, &config.plants);
                    if let Some(growth) = record.growth {
                        plant.growth = if growth.is_finite() { growth.clamp(0.0, 100.0) } else { 100.0 };
                    }
                    populations.plants.insert(plant);
                }
                Some(profile) => {
                    let mut animal = Animal::new(id, species, position, profile, rng);
                    if let Some(speed) = record.base_speed.filter(|s| s.is_finite() && *s >= 0.0) {
                        animal.base_speed = speed;
                        animal.speed = speed;
                    }
                    if let Some(energy) = record.energy {
                        animal.set_energy(energy);
                    }
                    animal.age = if record.age.is_finite() { record.age.max(0.0) } else { 0.0 };
                    let target = Vec2::new(
                        record.target_x.unwrap_or(position.x),
                        record.target_y.unwrap_or(position.y),
                    );
                    animal.target = bounds.clamp(target, animal.size);
                    let velocity = Vec2::new(record.vx, record.vy);
                    if velocity.is_finite() {
                        animal.velocity = velocity;
                    }
                    animal.state = AnimalState::from_tag(&record.state);
                    animal.direction = if record.direction < 0 { -1 } else { 1 };
                    animal.target_entity = record.target_entity;

                    if let Some(arena) = populations.animals_mut(species) {
                        arena.insert(animal);
                    }
                }
            }
        }

        // Second pass: relations are only valid once every entity exists
        let mut dangling = 0usize;
        let unresolved: Vec<EntityId> = populations
            .all_animals()
            .filter(|a| a.target_entity.is_some_and(|t| !populations.contains(t)))
            .map(Identified::id)
            .collect();
        for id in unresolved {
            if let Some(animal) = populations.animal_mut(id) {
                animal.target_entity = None;
                dangling += 1;
            }
        }
        if dangling > 0 {
            warn!("Dropped {} unresolved target references on load", dangling);
        }

        Ok(RestoredState {
            populations,
            clock: TimeClock::from_turn(config.clock.clone(), self.turn),
            turn_count: self.turn_count,
            paused: self.paused,
            ids,
        })
    }
}

/// Complete simulation state for checkpointing
#[derive(Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Version for compatibility checking
    pub version: u32,
    pub config: Config,
    pub snapshot: EcosystemSnapshot,
    /// Seed the run started from
    pub seed: u64,
    /// Generator state at the time of the checkpoint
    pub rng: ChaCha8Rng,
    pub history: StatsHistory,
}

impl Checkpoint {
    /// Current checkpoint version
    pub const VERSION: u32 = 1;
    const MAGIC: &'static [u8; 4] = b"AQUA";

    pub fn new(config: Config, snapshot: EcosystemSnapshot, seed: u64, rng: ChaCha8Rng, history: StatsHistory) -> Self {
        Self {
            version: Self::VERSION,
            config,
            snapshot,
            seed,
            rng,
            history,
        }
    }

    /// Simulated day at the time of the checkpoint
    pub fn day(&self) -> u64 {
        TimeClock::from_turn(self.config.clock.clone(), self.snapshot.turn).day()
    }

    /// Save checkpoint to binary file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistenceError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(Self::MAGIC)?;
        let encoded = bincode::serialize(self)?;
        writer.write_all(&encoded)?;
        writer.flush()?;

        Ok(())
    }

    /// Load checkpoint from binary file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != Self::MAGIC {
            return Err(PersistenceError::InvalidFormat("invalid magic bytes".to_string()));
        }

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        let checkpoint: Checkpoint = bincode::deserialize(&buffer)?;

        if checkpoint.version != Self::VERSION {
            return Err(PersistenceError::VersionMismatch {
                expected: Self::VERSION,
                found: checkpoint.version,
            });
        }

        Ok(checkpoint)
    }

    /// Get approximate size in bytes
    pub fn size_bytes(&self) -> usize {
        bincode::serialized_size(self).unwrap_or(0) as usize
    }
}

/// Writes a checkpoint every few simulated days and keeps the newest ones
pub struct CheckpointManager {
    pub base_dir: PathBuf,
    /// Days between checkpoints
    pub interval_days: u64,
    pub max_checkpoints: usize,
    last_day: u64,
}

impl CheckpointManager {
    pub fn new<P: Into<PathBuf>>(base_dir: P, interval_days: u64, max_checkpoints: usize) -> Result<Self, PersistenceError> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;

        Ok(Self {
            base_dir,
            interval_days: interval_days.max(1),
            max_checkpoints: max_checkpoints.max(1),
            last_day: 0,
        })
    }

    /// True on the first turn of every `interval_days`-th day
    pub fn should_save(&self, day: u64) -> bool {
        day > 1 && (day - 1) % self.interval_days == 0 && day != self.last_day
    }

    pub fn checkpoint_path(&self, day: u64) -> PathBuf {
        self.base_dir.join(format!("checkpoint_day{:06}.bin", day))
    }

    /// Save checkpoint and prune old ones
    pub fn save(&mut self, checkpoint: &Checkpoint) -> Result<PathBuf, PersistenceError> {
        let day = checkpoint.day();
        let path = self.checkpoint_path(day);
        checkpoint.save(&path)?;
        self.last_day = day;
        info!("Checkpoint saved: {}", path.display());

        self.cleanup()?;
        Ok(path)
    }

    fn checkpoint_files(&self) -> Result<Vec<PathBuf>, PersistenceError> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.base_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("checkpoint_day"))
            .map(|entry| entry.path())
            .collect();
        // Zero-padded day numbers sort chronologically by name
        files.sort();
        Ok(files)
    }

    fn cleanup(&self) -> Result<(), PersistenceError> {
        let files = self.checkpoint_files()?;
        if files.len() > self.max_checkpoints {
            let to_remove = files.len() - self.max_checkpoints;
            for path in files.into_iter().take(to_remove) {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    /// Find latest checkpoint in directory
    pub fn find_latest(&self) -> Option<PathBuf> {
        self.checkpoint_files().ok()?.pop()
    }
}
