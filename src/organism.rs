//! Organism structures: plants and the three animal species.

use crate::arena::{EntityId, Identified};
use crate::config::{AnimalProfile, Config, PlantConfig};
use crate::ecology::SeasonModifiers;
use crate::geometry::{Rect, Vec2};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Closed set of organism kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Plant,
    Fish,
    Trout,
    Shark,
}

impl Species {
    pub const ALL: [Species; 4] = [Species::Plant, Species::Fish, Species::Trout, Species::Shark];
    pub const ANIMALS: [Species; 3] = [Species::Fish, Species::Trout, Species::Shark];

    /// Stable lowercase tag used in events and save data
    pub fn tag(&self) -> &'static str {
        match self {
            Species::Plant => "plant",
            Species::Fish => "fish",
            Species::Trout => "trout",
            Species::Shark => "shark",
        }
    }

    /// Species this one flees from
    pub fn predators(&self) -> &'static [Species] {
        match self {
            Species::Fish => &[Species::Trout, Species::Shark],
            Species::Trout => &[Species::Shark],
            Species::Plant | Species::Shark => &[],
        }
    }

    /// Whether `self` may eat `prey`
    pub fn eats(&self, prey: Species, config: &Config) -> bool {
        matches!(
            (self, prey),
            (Species::Fish, Species::Plant)
                | (Species::Trout, Species::Fish)
                | (Species::Shark, Species::Trout)
        ) || (*self == Species::Shark && prey == Species::Fish && config.shark.fallback_to_fish)
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A species tag that does not name any organism kind
#[derive(Debug, Clone, PartialEq, Error)]
#[error("unknown species tag: {0:?}")]
pub struct UnknownSpecies(pub String);

impl FromStr for Species {
    type Err = UnknownSpecies;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plant" | "plants" => Ok(Species::Plant),
            "fish" => Ok(Species::Fish),
            "trout" => Ok(Species::Trout),
            "shark" | "sharks" => Ok(Species::Shark),
            _ => Err(UnknownSpecies(s.to_string())),
        }
    }
}

/// Behavior state tag, set once per turn by the decision engine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimalState {
    #[default]
    Idle,
    Fleeing,
    Eating,
    Hunting,
    Schooling,
    Moving,
    Patrolling,
}

impl AnimalState {
    pub fn tag(&self) -> &'static str {
        match self {
            AnimalState::Idle => "idle",
            AnimalState::Fleeing => "fleeing",
            AnimalState::Eating => "eating",
            AnimalState::Hunting => "hunting",
            AnimalState::Schooling => "schooling",
            AnimalState::Moving => "moving",
            AnimalState::Patrolling => "patrolling",
        }
    }

    /// Lenient parse for save data; unknown tags fall back to idle
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "fleeing" => AnimalState::Fleeing,
            "eating" => AnimalState::Eating,
            "hunting" => AnimalState::Hunting,
            "schooling" => AnimalState::Schooling,
            "moving" => AnimalState::Moving,
            "patrolling" => AnimalState::Patrolling,
            _ => AnimalState::Idle,
        }
    }
}

/// Cause of death tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    Starvation,
    OldAge,
    Predation,
    /// Evicted to keep the species under its population ceiling
    Overpopulation,
}

/// Anything with a position on the playfield
pub trait Located: Identified {
    fn position(&self) -> Vec2;
    fn size(&self) -> Vec2;

    /// Collision rectangle
    #[inline]
    fn rect(&self) -> Rect {
        Rect::at(self.position(), self.size())
    }
}

/// Static food source
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Plant {
    pub(crate) id: EntityId,
    pub position: Vec2,
    pub size: Vec2,
    /// 0 = just eaten, 100 = fully grown
    pub growth: f32,
    /// Energy yielded when fully grown
    pub energy_value: f32,
}

impl Plant {
    /// Fully grown plant
    pub fn new(id: EntityId, position: Vec2, config: &PlantConfig) -> Self {
        Self {
            id,
            position,
            size: Vec2::new(config.width, config.height),
            growth: 100.0,
            energy_value: config.energy_value,
        }
    }

    /// Freshly sprouted plant with no growth yet
    pub fn seedling(id: EntityId, position: Vec2, config: &PlantConfig) -> Self {
        Self {
            growth: 0.0,
            ..Self::new(id, position, config)
        }
    }

    /// Energy a consumer would receive right now
    #[inline]
    pub fn energy_yield(&self) -> f32 {
        self.energy_value * (self.growth.clamp(0.0, 100.0) / 100.0)
    }

    /// Consume the plant, returning its energy and resetting growth
    pub fn consume(&mut self) -> f32 {
        let energy = self.energy_yield();
        self.growth = 0.0;
        energy
    }

    pub fn grow(&mut self, amount: f32) {
        self.growth = (self.growth + amount.max(0.0)).min(100.0);
    }

    #[inline]
    pub fn is_fully_grown(&self) -> bool {
        self.growth >= 100.0
    }
}

impl Identified for Plant {
    #[inline]
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Located for Plant {
    #[inline]
    fn position(&self) -> Vec2 {
        self.position
    }

    #[inline]
    fn size(&self) -> Vec2 {
        self.size
    }
}

/// A fish, trout or shark
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Animal {
    // Identity
    pub(crate) id: EntityId,
    pub species: Species,

    // Physical state
    pub position: Vec2,
    pub velocity: Vec2,
    pub size: Vec2,
    /// Steering destination chosen by the decision engine
    pub target: Vec2,

    // Vital state
    pub energy: f32,
    pub max_energy: f32,
    pub age: f32,
    pub lifespan: f32,

    // Movement and metabolism
    pub base_speed: f32,
    pub speed: f32,
    pub base_consumption: f32,
    pub consumption: f32,
    /// Movement factor of the current season, kept for sprint resets
    pub season_move_mult: f32,
    /// +1 facing right, -1 facing left
    pub direction: i8,

    // Behavior
    pub state: AnimalState,
    /// Non-owning reference to a prey or food entity
    pub target_entity: Option<EntityId>,

    pub cause_of_death: Option<DeathCause>,
}

impl Animal {
    /// Create a new animal at `position` with a random base speed
    pub fn new<R: Rng + ?Sized>(
        id: EntityId,
        species: Species,
        position: Vec2,
        profile: &AnimalProfile,
        rng: &mut R,
    ) -> Self {
        let base_speed = if profile.speed_max > profile.speed_min {
            rng.gen_range(profile.speed_min..=profile.speed_max)
        } else {
            profile.speed_min
        };

        Self {
            id,
            species,
            position,
            velocity: Vec2::ZERO,
            size: Vec2::new(profile.width, profile.height),
            target: position,
            energy: profile.initial_energy.clamp(0.0, profile.max_energy),
            max_energy: profile.max_energy,
            age: 0.0,
            lifespan: profile.lifespan,
            base_speed,
            speed: base_speed,
            base_consumption: profile.consumption,
            consumption: profile.consumption,
            season_move_mult: 1.0,
            direction: 1,
            state: AnimalState::Idle,
            target_entity: None,
            cause_of_death: None,
        }
    }

    /// Set energy, clamped to `[0, max_energy]`
    #[inline]
    pub fn set_energy(&mut self, energy: f32) {
        self.energy = if energy.is_finite() {
            energy.clamp(0.0, self.max_energy)
        } else {
            0.0
        };
    }

    /// Fraction of max energy currently held
    #[inline]
    pub fn fullness(&self) -> f32 {
        if self.max_energy > 0.0 {
            self.energy / self.max_energy
        } else {
            0.0
        }
    }

    /// Scale speed and consumption by the active season
    pub fn apply_season_modifiers(&mut self, modifiers: &SeasonModifiers) {
        self.season_move_mult = modifiers.movement;
        self.speed = self.base_speed * modifiers.movement;
        self.consumption = self.base_consumption * modifiers.energy_consumption;
    }

    /// One turn of metabolism and aging
    pub fn metabolize(&mut self) {
        self.set_energy(self.energy - self.consumption);
        self.age += 1.0;

        if self.cause_of_death.is_none() {
            if self.energy <= 0.0 {
                self.cause_of_death = Some(DeathCause::Starvation);
            } else if self.age >= self.lifespan {
                self.cause_of_death = Some(DeathCause::OldAge);
            }
        }
    }

    /// Dead animals are removed at the end of the turn
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.energy <= 0.0 || self.age >= self.lifespan
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        !self.is_dead()
    }

    #[inline]
    pub fn can_eat(&self, prey: Species, config: &Config) -> bool {
        self.species.eats(prey, config)
    }

    /// Eat a plant, returning the energy obtained (0 if not a herbivore)
    pub fn eat_plant(&mut self, plant: &mut Plant, config: &Config) -> f32 {
        if !self.can_eat(Species::Plant, config) {
            return 0.0;
        }

        let energy = plant.consume();
        self.set_energy(self.energy + energy);
        self.state = AnimalState::Idle;
        self.target_entity = None;
        energy
    }

    /// Eat another animal, returning the energy obtained
    pub fn eat_animal(&mut self, prey: &Animal, config: &Config) -> f32 {
        if !self.can_eat(prey.species, config) {
            return 0.0;
        }

        let feeding = match self.species {
            Species::Trout => &config.trout.feeding,
            Species::Shark => &config.shark.feeding,
            Species::Plant | Species::Fish => return 0.0,
        };
        let energy = feeding.gain(prey.energy);
        self.set_energy(self.energy + energy);
        self.state = AnimalState::Idle;
        self.target_entity = None;
        energy
    }

    /// Energy and age requirements for reproduction, without the random roll
    pub fn is_fertile(&self, config: &Config) -> bool {
        match config.profile(self.species) {
            Some(profile) => {
                let rules = &profile.reproduction;
                self.is_alive()
                    && self.energy > self.max_energy * rules.energy_fraction
                    && self.age > rules.min_age
            }
            None => false,
        }
    }

    /// Fertility check plus the per-turn random chance scaled by `fertility`
    pub fn can_reproduce<R: Rng + ?Sized>(&self, config: &Config, fertility: f32, rng: &mut R) -> bool {
        let chance = match config.profile(self.species) {
            Some(profile) => profile.reproduction.chance * fertility,
            None => return false,
        };
        self.is_fertile(config) && rng.gen::<f32>() < chance
    }

    /// Spawn one offspring at this animal's position, paying the energy cost
    pub fn reproduce<R: Rng + ?Sized>(
        &mut self,
        child_id: EntityId,
        config: &Config,
        rng: &mut R,
    ) -> Option<Animal> {
        if !self.is_fertile(config) {
            return None;
        }
        let profile = config.profile(self.species)?;

        self.set_energy(self.energy - profile.reproduction.cost);

        let mut child = Animal::new(child_id, self.species, self.position, profile, rng);
        child.set_energy(profile.reproduction.offspring_energy);
        child.direction = self.direction;
        Some(child)
    }

    /// Update facing from a horizontal displacement
    #[inline]
    pub fn face(&mut self, dx: f32) {
        if dx > 1e-3 {
            self.direction = 1;
        } else if dx < -1e-3 {
            self.direction = -1;
        }
    }
}

impl Identified for Animal {
    #[inline]
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Located for Animal {
    #[inline]
    fn position(&self) -> Vec2 {
        self.position
    }

    #[inline]
    fn size(&self) -> Vec2 {
        self.size
    }
}
