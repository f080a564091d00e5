//! Per-species decision engine.
//!
//! Once per turn every live animal produces a [`Decision`] from a read-only
//! [`Surroundings`] view of the start-of-turn state. Decisions are then
//! applied in the same order they were made. A decision never holds a
//! reference into the populations; prey and pack mates travel as ids and
//! are resolved again when applied.

pub mod fish;
pub mod shark;
pub mod trout;

use crate::arena::{EntityId, Identified};
use crate::config::Config;
use crate::ecology::Populations;
use crate::geometry::{Bounds, Vec2};
use crate::grid::Surroundings;
use crate::organism::{Animal, AnimalState, Species};
use log::trace;
use rand::Rng;

/// New steering destination and the state it puts the animal in
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Steer {
    pub target: Vec2,
    pub state: AnimalState,
}

/// What to do with the animal's `target_entity`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Lock {
    #[default]
    Keep,
    Clear,
    Set(EntityId),
}

/// Outcome of one animal's decision for one turn
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    /// `None` keeps the previous target and state
    pub steer: Option<Steer>,
    pub lock: Lock,
    /// Multiplies the season-adjusted base speed
    pub speed_factor: f32,
    /// Trout pack (leader first) that converges on the same prey
    pub pack: Vec<EntityId>,
}

impl Decision {
    /// Carry on towards the current target
    pub fn keep() -> Self {
        Self {
            steer: None,
            lock: Lock::Keep,
            speed_factor: 1.0,
            pack: Vec::new(),
        }
    }

    pub fn steer(target: Vec2, state: AnimalState) -> Self {
        Self {
            steer: Some(Steer { target, state }),
            ..Self::keep()
        }
    }

    pub fn with_lock(mut self, lock: Lock) -> Self {
        self.lock = lock;
        self
    }

    pub fn with_speed_factor(mut self, factor: f32) -> Self {
        self.speed_factor = factor;
        self
    }

    pub fn with_pack(mut self, pack: Vec<EntityId>) -> Self {
        self.pack = pack;
        self
    }

    #[inline]
    pub fn state(&self) -> Option<AnimalState> {
        self.steer.map(|s| s.state)
    }
}

/// Everything a species needs to decide
pub struct DecisionContext<'a> {
    pub view: Surroundings<'a>,
    pub config: &'a Config,
    pub bounds: Bounds,
}

impl<'a> DecisionContext<'a> {
    pub fn new(populations: &'a Populations, config: &'a Config) -> Self {
        Self {
            view: Surroundings::new(populations),
            config,
            bounds: Bounds::new(config.world.width, config.world.height),
        }
    }

    /// Clamp a destination so an entity of `animal`'s size stays inside
    #[inline]
    pub fn clamp(&self, animal: &Animal, target: Vec2) -> Vec2 {
        self.bounds.clamp(target, animal.size)
    }
}

/// Point `distance` away from `threat`, straight out from it. A threat at
/// the exact same position gives a random direction.
pub(crate) fn flee_point<R: Rng + ?Sized>(
    animal: &Animal,
    threat: Vec2,
    distance: f32,
    rng: &mut R,
) -> Vec2 {
    let away = (animal.position - threat)
        .normalized()
        .unwrap_or_else(|| crate::geometry::random_unit(rng));
    animal.position + away * distance
}

/// Mean position of a group
pub(crate) fn centroid<'a, I: IntoIterator<Item = &'a Animal>>(group: I) -> Option<Vec2> {
    let mut sum = Vec2::ZERO;
    let mut count = 0usize;
    for member in group {
        sum += member.position;
        count += 1;
    }
    (count > 0).then(|| sum / count as f32)
}

/// Dispatch on species
pub fn decide<R: Rng + ?Sized>(animal: &Animal, ctx: &DecisionContext<'_>, rng: &mut R) -> Decision {
    match animal.species {
        Species::Fish => fish::decide(animal, ctx, rng),
        Species::Trout => trout::decide(animal, ctx, rng),
        Species::Shark => shark::decide(animal, ctx, rng),
        Species::Plant => Decision::keep(),
    }
}

/// Decide for every live animal against the current state
pub fn decide_all<R: Rng + ?Sized>(
    populations: &Populations,
    config: &Config,
    rng: &mut R,
) -> Vec<(EntityId, Decision)> {
    let ctx = DecisionContext::new(populations, config);
    populations
        .all_animals()
        .filter(|animal| animal.is_alive())
        .map(|animal| (animal.id(), decide(animal, &ctx, rng)))
        .collect()
}

/// Apply decisions in order. Returns how many decisions were applied.
pub fn apply_decisions(
    populations: &mut Populations,
    decisions: Vec<(EntityId, Decision)>,
    config: &Config,
) -> usize {
    let bounds = Bounds::new(config.world.width, config.world.height);
    let mut applied = 0;

    for (id, decision) in decisions {
        let Some(animal) = populations.animal_mut(id) else {
            continue;
        };

        animal.speed = animal.base_speed * animal.season_move_mult * decision.speed_factor;
        if let Some(steer) = decision.steer {
            animal.target = bounds.clamp(steer.target, animal.size);
            animal.state = steer.state;
        }
        match decision.lock {
            Lock::Keep => {}
            Lock::Clear => animal.target_entity = None,
            Lock::Set(target) => animal.target_entity = Some(target),
        }
        applied += 1;

        let (Some(steer), Lock::Set(prey)) = (decision.steer, decision.lock) else {
            continue;
        };
        if decision.pack.len() > 1 {
            trace!("Trout {} leads pack of {} onto {}", id, decision.pack.len(), prey);
        }
        for mate_id in decision.pack.iter().copied().filter(|mate| *mate != id) {
            if let Some(mate) = populations.animal_mut(mate_id) {
                if mate.is_dead() {
                    continue;
                }
                mate.target = bounds.clamp(steer.target, mate.size);
                mate.target_entity = Some(prey);
                mate.state = steer.state;
            }
        }
    }

    applied
}
