//! Configuration system for the aquarium simulation.
//!
//! Supports YAML configuration files with sensible defaults. A `Config` is
//! built once and handed to the [`Ecosystem`](crate::Ecosystem); nothing in
//! the simulation reads ambient global state.

use crate::ecology::{ClockConfig, PopulationConfig, SeasonsConfig};
use crate::organism::Species;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub world: WorldConfig,
    pub clock: ClockConfig,
    #[serde(default)]
    pub seasons: SeasonsConfig,
    pub population: PopulationConfig,
    pub plants: PlantConfig,
    pub fish: FishConfig,
    pub trout: TroutConfig,
    pub shark: SharkConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Playfield and scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Width of the swimmable area
    pub width: f32,
    /// Height of the swimmable area
    pub height: f32,
    /// Real-time length of one AI turn in milliseconds
    pub turn_duration_ms: u64,
    /// Frames per second used by headless drivers
    pub fps: u32,
    /// Frame delta times above this are clamped (seconds)
    pub max_frame_dt: f32,
}

/// Attributes shared by every animal species
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimalProfile {
    pub width: f32,
    pub height: f32,
    /// Energy at spawn
    pub initial_energy: f32,
    pub max_energy: f32,
    /// Turns before natural death
    pub lifespan: f32,
    /// Base speed range in units per 1/60 s
    pub speed_min: f32,
    pub speed_max: f32,
    /// Energy drained per turn before season modifiers
    pub consumption: f32,
    pub reproduction: ReproductionConfig,
}

/// Reproduction rules for one species
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReproductionConfig {
    /// Parent energy must exceed this fraction of max energy
    pub energy_fraction: f32,
    /// Parent age must exceed this many turns
    pub min_age: f32,
    /// Per-turn probability once eligible
    pub chance: f32,
    /// Energy deducted from the parent
    pub cost: f32,
    /// Starting energy of the offspring
    pub offspring_energy: f32,
}

/// Energy gained by a predator from a kill: `min(cap, prey.energy * fraction)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedingConfig {
    pub cap: f32,
    pub fraction: f32,
}

impl FeedingConfig {
    #[inline]
    pub fn gain(&self, prey_energy: f32) -> f32 {
        (prey_energy.max(0.0) * self.fraction).min(self.cap)
    }
}

/// Static food sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantConfig {
    pub width: f32,
    pub height: f32,
    /// Energy yielded by a fully grown plant
    pub energy_value: f32,
    /// Growth points gained per turn (before season modifier)
    pub growth_per_turn: f32,
    /// Per-turn probability of a new seedling appearing
    pub spawn_chance: f32,
}

/// Herbivore behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FishConfig {
    pub profile: AnimalProfile,
    pub flee_radius: f32,
    pub flee_distance: f32,
    /// Looks for plants below this fraction of max energy
    pub hunger_fraction: f32,
    pub eat_radius: f32,
    pub school_radius: f32,
    pub school_min_neighbors: usize,
    pub separation_distance: f32,
    /// Fraction of the way towards the flock centroid
    pub cohesion: f32,
    pub separation_weight: f32,
    pub wander_chance: f32,
    pub wander_x: f32,
    pub wander_y: f32,
}

/// Mid-tier predator behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TroutConfig {
    pub profile: AnimalProfile,
    pub feeding: FeedingConfig,
    pub escape_radius: f32,
    pub flee_distance: f32,
    pub escape_speed_multiplier: f32,
    pub hunger_fraction: f32,
    pub hunt_radius: f32,
    pub pack_radius: f32,
    /// Pack size including the leader
    pub max_pack_size: usize,
    pub min_allies_for_pack: usize,
    pub loiter_radius: f32,
    pub loiter_jitter_x: f32,
    pub loiter_jitter_y: f32,
    pub wander_chance: f32,
    pub wander_x: f32,
    pub wander_y: f32,
}

/// Apex predator behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharkConfig {
    pub profile: AnimalProfile,
    pub feeding: FeedingConfig,
    /// Below this fullness the hungry hunt radius applies
    pub hunger_threshold: f32,
    pub hunt_radius_relaxed: f32,
    pub hunt_radius_hungry: f32,
    /// A locked target is kept while closer than this
    pub persistence_distance: f32,
    pub lead_factor: f32,
    pub lead_x: f32,
    pub lead_y: f32,
    /// Hunt and eat fish when no trout is in range
    pub fallback_to_fish: bool,
    pub patrol_chance: f32,
    pub patrol_x: f32,
    pub patrol_y: f32,
}

/// Continuous motion (per frame) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Converts per-frame speed (at 60 fps) into units per second
    pub speed_scale: f32,
    /// Snap to target when closer than this
    pub arrival_epsilon: f32,
    /// Start slowing down inside this distance
    pub slowing_radius: f32,
    pub seek_weight: f32,
    pub separation_radius: f32,
    pub separation_weight: f32,
    pub wall_margin: f32,
    pub wall_weight: f32,
    /// Fraction of velocity lost per second
    pub damping: f32,
    /// Radius of the short wander target assigned on arrival
    pub rewander_radius: f32,
    /// Edge length of neighbor buckets
    pub cell_size: f32,
}

/// Logging, statistics and autosave configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Turns between statistics snapshots
    pub stats_interval: u64,
    /// Simulated days between autosaves
    pub autosave_interval_days: u32,
    /// Default env_logger level (off, error, warn, info, debug, trace);
    /// `RUST_LOG` takes precedence
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            clock: ClockConfig::default(),
            seasons: SeasonsConfig::default(),
            population: PopulationConfig::default(),
            plants: PlantConfig::default(),
            fish: FishConfig::default(),
            trout: TroutConfig::default(),
            shark: SharkConfig::default(),
            motion: MotionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 720.0,
            turn_duration_ms: 1000,
            fps: 60,
            max_frame_dt: 0.25,
        }
    }
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            width: 14.0,
            height: 14.0,
            energy_value: 20.0,
            growth_per_turn: 10.0,
            spawn_chance: 0.8,
        }
    }
}

impl Default for FishConfig {
    fn default() -> Self {
        Self {
            profile: AnimalProfile {
                width: 20.0,
                height: 20.0,
                initial_energy: 70.0,
                max_energy: 100.0,
                lifespan: 120.0,
                speed_min: 1.0,
                speed_max: 2.0,
                consumption: 1.0,
                reproduction: ReproductionConfig {
                    energy_fraction: 0.7,
                    min_age: 3.0,
                    chance: 0.1,
                    cost: 30.0,
                    offspring_energy: 50.0,
                },
            },
            flee_radius: 150.0,
            flee_distance: 120.0,
            hunger_fraction: 0.3,
            eat_radius: 120.0,
            school_radius: 140.0,
            school_min_neighbors: 2,
            separation_distance: 30.0,
            cohesion: 0.4,
            separation_weight: 25.0,
            wander_chance: 0.05,
            wander_x: 60.0,
            wander_y: 40.0,
        }
    }
}

impl Default for TroutConfig {
    fn default() -> Self {
        Self {
            profile: AnimalProfile {
                width: 35.0,
                height: 35.0,
                initial_energy: 120.0,
                max_energy: 180.0,
                lifespan: 180.0,
                speed_min: 0.9,
                speed_max: 1.9,
                consumption: 1.5,
                reproduction: ReproductionConfig {
                    energy_fraction: 0.6,
                    min_age: 6.0,
                    chance: 0.08,
                    cost: 50.0,
                    offspring_energy: 100.0,
                },
            },
            feeding: FeedingConfig { cap: 35.0, fraction: 0.5 },
            escape_radius: 190.0,
            flee_distance: 140.0,
            escape_speed_multiplier: 1.6,
            hunger_fraction: 0.45,
            hunt_radius: 260.0,
            pack_radius: 220.0,
            max_pack_size: 3,
            min_allies_for_pack: 1,
            loiter_radius: 120.0,
            loiter_jitter_x: 30.0,
            loiter_jitter_y: 20.0,
            wander_chance: 0.03,
            wander_x: 80.0,
            wander_y: 60.0,
        }
    }
}

impl Default for SharkConfig {
    fn default() -> Self {
        Self {
            profile: AnimalProfile {
                width: 45.0,
                height: 45.0,
                initial_energy: 200.0,
                max_energy: 300.0,
                lifespan: 300.0,
                speed_min: 0.9,
                speed_max: 1.3,
                consumption: 0.8,
                reproduction: ReproductionConfig {
                    energy_fraction: 0.7,
                    min_age: 8.0,
                    chance: 0.05,
                    cost: 80.0,
                    offspring_energy: 150.0,
                },
            },
            feeding: FeedingConfig { cap: 85.0, fraction: 0.7 },
            hunger_threshold: 0.65,
            hunt_radius_relaxed: 260.0,
            hunt_radius_hungry: 400.0,
            persistence_distance: 480.0,
            lead_factor: 0.3,
            lead_x: 40.0,
            lead_y: 20.0,
            fallback_to_fish: false,
            patrol_chance: 0.02,
            patrol_x: 300.0,
            patrol_y: 200.0,
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            speed_scale: 60.0,
            arrival_epsilon: 1.5,
            slowing_radius: 30.0,
            seek_weight: 6.0,
            separation_radius: 24.0,
            separation_weight: 4.0,
            wall_margin: 30.0,
            wall_weight: 3.0,
            damping: 1.5,
            rewander_radius: 16.0,
            cell_size: 64.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stats_interval: 10,
            autosave_interval_days: 30,
            log_level: "info".to_string(),
        }
    }
}

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Species profile for an animal species; plants have none
    pub fn profile(&self, species: Species) -> Option<&AnimalProfile> {
        match species {
            Species::Plant => None,
            Species::Fish => Some(&self.fish.profile),
            Species::Trout => Some(&self.trout.profile),
            Species::Shark => Some(&self.shark.profile),
        }
    }

    /// Footprint of an entity of the given species
    pub fn size_of(&self, species: Species) -> (f32, f32) {
        match self.profile(species) {
            Some(profile) => (profile.width, profile.height),
            None => (self.plants.width, self.plants.height),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if !(self.world.width > 0.0 && self.world.height > 0.0) {
            return invalid("world width and height must be > 0");
        }
        if self.world.turn_duration_ms == 0 || self.world.fps == 0 {
            return invalid("turn_duration_ms and fps must be > 0");
        }
        self.clock.validate().map_err(ConfigError::Invalid)?;
        self.population.validate().map_err(ConfigError::Invalid)?;

        for species in Species::ANIMALS {
            if let Some(profile) = self.profile(species) {
                if profile.max_energy <= 0.0 || profile.lifespan <= 0.0 {
                    return Err(ConfigError::Invalid(format!(
                        "{} max_energy and lifespan must be > 0",
                        species.tag()
                    )));
                }
                if profile.speed_min < 0.0 || profile.speed_min > profile.speed_max {
                    return Err(ConfigError::Invalid(format!(
                        "{} speed range is empty",
                        species.tag()
                    )));
                }
                if profile.width <= 0.0 || profile.height <= 0.0 {
                    return Err(ConfigError::Invalid(format!(
                        "{} size must be > 0",
                        species.tag()
                    )));
                }
            }
        }
        if self.plants.width <= 0.0 || self.plants.height <= 0.0 {
            return invalid("plant size must be > 0");
        }
        if self.trout.max_pack_size == 0 {
            return invalid("trout max_pack_size must include the leader (>= 1)");
        }
        if self.logging.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "unknown log level '{}'",
                self.logging.log_level
            )));
        }
        if self.motion.cell_size <= 0.0 {
            return invalid("motion cell_size must be > 0");
        }
        if self.logging.stats_interval == 0 {
            return invalid("stats_interval must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let loaded: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.world.width, loaded.world.width);
        assert_eq!(config.shark.persistence_distance, loaded.shark.persistence_distance);
        assert_eq!(config.seasons.table.len(), loaded.seasons.table.len());
    }

    #[test]
    fn test_invalid_pack_size() {
        let mut config = Config::default();
        config.trout.max_pack_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_log_level_must_be_known() {
        let mut config = Config::default();
        config.logging.log_level = "Debug".into();
        assert!(config.validate().is_ok());

        config.logging.log_level = "loud".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_feeding_gain_is_capped() {
        let feeding = FeedingConfig { cap: 35.0, fraction: 0.5 };
        assert_eq!(feeding.gain(40.0), 20.0);
        assert_eq!(feeding.gain(100.0), 35.0);
        assert_eq!(feeding.gain(-5.0), 0.0);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = Config::default();
        config.shark.fallback_to_fish = true;
        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert!(loaded.shark.fallback_to_fish);
    }
}
