//! Population bookkeeping: reproduction, death sweeps, plant regrowth and
//! per-species floor/ceiling enforcement.

use super::seasons::SeasonModifiers;
use crate::arena::{Arena, EntityId, Identified};
use crate::config::Config;
use crate::geometry::{Bounds, Vec2};
use crate::organism::{Animal, DeathCause, Located, Plant, Species};
use crate::stats::EcosystemEvent;
use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Count per species
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationCounts {
    pub plants: usize,
    pub fish: usize,
    pub trout: usize,
    pub sharks: usize,
}

impl PopulationCounts {
    pub fn new(plants: usize, fish: usize, trout: usize, sharks: usize) -> Self {
        Self {
            plants,
            fish,
            trout,
            sharks,
        }
    }

    pub fn get(&self, species: Species) -> usize {
        match species {
            Species::Plant => self.plants,
            Species::Fish => self.fish,
            Species::Trout => self.trout,
            Species::Shark => self.sharks,
        }
    }

    pub fn set(&mut self, species: Species, count: usize) {
        match species {
            Species::Plant => self.plants = count,
            Species::Fish => self.fish = count,
            Species::Trout => self.trout = count,
            Species::Shark => self.sharks = count,
        }
    }

    pub fn total(&self) -> usize {
        self.plants + self.fish + self.trout + self.sharks
    }
}

/// Inclusive population bounds for one species
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limit {
    pub min: usize,
    pub max: usize,
}

impl Limit {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn clamp(&self, count: usize) -> usize {
        count.clamp(self.min, self.max)
    }

    #[inline]
    pub fn contains(&self, count: usize) -> bool {
        (self.min..=self.max).contains(&count)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationLimits {
    pub plants: Limit,
    pub fish: Limit,
    pub trout: Limit,
    pub sharks: Limit,
}

impl PopulationLimits {
    pub fn get(&self, species: Species) -> Limit {
        match species {
            Species::Plant => self.plants,
            Species::Fish => self.fish,
            Species::Trout => self.trout,
            Species::Shark => self.sharks,
        }
    }

    pub fn get_mut(&mut self, species: Species) -> &mut Limit {
        match species {
            Species::Plant => &mut self.plants,
            Species::Fish => &mut self.fish,
            Species::Trout => &mut self.trout,
            Species::Shark => &mut self.sharks,
        }
    }
}

impl Default for PopulationLimits {
    fn default() -> Self {
        Self {
            plants: Limit::new(0, 100),
            fish: Limit::new(0, 50),
            trout: Limit::new(0, 30),
            sharks: Limit::new(0, 15),
        }
    }
}

/// Population configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Counts spawned by a default initialize
    pub initial: PopulationCounts,
    pub limits: PopulationLimits,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            initial: PopulationCounts::new(25, 15, 5, 2),
            limits: PopulationLimits::default(),
        }
    }
}

impl PopulationConfig {
    pub fn validate(&self) -> Result<(), String> {
        for species in Species::ALL {
            let limit = self.limits.get(species);
            if limit.min > limit.max {
                return Err(format!("{} population min exceeds max", species.tag()));
            }
        }
        Ok(())
    }

    /// Clamp requested counts into the configured limits, logging any change
    pub fn clamp(&self, requested: PopulationCounts) -> PopulationCounts {
        let mut clamped = requested;
        for species in Species::ALL {
            let wanted = requested.get(species);
            let allowed = self.limits.get(species).clamp(wanted);
            if allowed != wanted {
                warn!(
                    "Requested {} {} outside limits, using {}",
                    wanted,
                    species.tag(),
                    allowed
                );
            }
            clamped.set(species, allowed);
        }
        clamped
    }
}

/// The four entity collections owned by an ecosystem
#[derive(Clone, Debug, Default)]
pub struct Populations {
    pub plants: Arena<Plant>,
    pub fish: Arena<Animal>,
    pub trout: Arena<Animal>,
    pub sharks: Arena<Animal>,
}

impl Populations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.plants.clear();
        self.fish.clear();
        self.trout.clear();
        self.sharks.clear();
    }

    /// Animal collection for a species; `None` for plants
    pub fn animals(&self, species: Species) -> Option<&Arena<Animal>> {
        match species {
            Species::Plant => None,
            Species::Fish => Some(&self.fish),
            Species::Trout => Some(&self.trout),
            Species::Shark => Some(&self.sharks),
        }
    }

    pub fn animals_mut(&mut self, species: Species) -> Option<&mut Arena<Animal>> {
        match species {
            Species::Plant => None,
            Species::Fish => Some(&mut self.fish),
            Species::Trout => Some(&mut self.trout),
            Species::Shark => Some(&mut self.sharks),
        }
    }

    pub fn count(&self, species: Species) -> usize {
        match self.animals(species) {
            Some(arena) => arena.len(),
            None => self.plants.len(),
        }
    }

    pub fn counts(&self) -> PopulationCounts {
        PopulationCounts::new(
            self.plants.len(),
            self.fish.len(),
            self.trout.len(),
            self.sharks.len(),
        )
    }

    /// Look up an animal of any species by id
    pub fn animal(&self, id: EntityId) -> Option<&Animal> {
        self.fish
            .get(id)
            .or_else(|| self.trout.get(id))
            .or_else(|| self.sharks.get(id))
    }

    pub fn animal_mut(&mut self, id: EntityId) -> Option<&mut Animal> {
        if self.fish.contains(id) {
            self.fish.get_mut(id)
        } else if self.trout.contains(id) {
            self.trout.get_mut(id)
        } else {
            self.sharks.get_mut(id)
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.plants.contains(id) || self.animal(id).is_some()
    }

    /// Every animal, in species order
    pub fn all_animals(&self) -> impl Iterator<Item = &Animal> {
        self.fish.iter().chain(self.trout.iter()).chain(self.sharks.iter())
    }

    pub fn all_animals_mut(&mut self) -> impl Iterator<Item = &mut Animal> {
        self.fish
            .iter_mut()
            .chain(self.trout.iter_mut())
            .chain(self.sharks.iter_mut())
    }

    /// Remove every entity whose id is in `doomed`, returning removed animals
    pub fn remove(&mut self, doomed: &HashSet<EntityId>) -> Vec<Animal> {
        self.plants.remove_many(doomed);
        let mut removed = self.fish.remove_many(doomed);
        removed.extend(self.trout.remove_many(doomed));
        removed.extend(self.sharks.remove_many(doomed));
        removed
    }

    /// Drop `target_entity` references that no longer resolve
    pub fn clear_stale_targets(&mut self) {
        let live: HashSet<EntityId> = self
            .plants
            .iter()
            .map(Identified::id)
            .chain(self.all_animals().map(Identified::id))
            .collect();

        for animal in self.all_animals_mut() {
            if let Some(target) = animal.target_entity {
                if !live.contains(&target) {
                    animal.target_entity = None;
                }
            }
        }
    }
}

/// Monotonic entity id allocator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    next: EntityId,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Resume allocation at `next`
    pub fn starting_at(next: EntityId) -> Self {
        Self { next: next.max(1) }
    }

    pub fn allocate(&mut self) -> EntityId {
        let id = self.next;
        self.next += 1;
        id
    }

    #[inline]
    pub fn peek(&self) -> EntityId {
        self.next
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns entities at random positions and runs population passes
pub struct PopulationManager<'a> {
    pub config: &'a Config,
    pub bounds: Bounds,
}

impl<'a> PopulationManager<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            bounds: Bounds::new(config.world.width, config.world.height),
        }
    }

    /// New animal at a random position
    pub fn spawn_animal<R: Rng + ?Sized>(
        &self,
        species: Species,
        ids: &mut IdAllocator,
        rng: &mut R,
    ) -> Option<Animal> {
        let profile = self.config.profile(species)?;
        let size = Vec2::new(profile.width, profile.height);
        let position = self.bounds.random_position(size, rng);
        Some(Animal::new(ids.allocate(), species, position, profile, rng))
    }

    /// New fully grown plant at a random position
    pub fn spawn_plant<R: Rng + ?Sized>(&self, ids: &mut IdAllocator, rng: &mut R) -> Plant {
        let size = Vec2::new(self.config.plants.width, self.config.plants.height);
        let position = self.bounds.random_position(size, rng);
        Plant::new(ids.allocate(), position, &self.config.plants)
    }

    /// Spawn `count` random entities of `species`
    pub fn populate<R: Rng + ?Sized>(
        &self,
        populations: &mut Populations,
        species: Species,
        count: usize,
        ids: &mut IdAllocator,
        rng: &mut R,
    ) {
        for _ in 0..count {
            match populations.animals_mut(species) {
                Some(arena) => {
                    if let Some(animal) = self.spawn_animal(species, ids, rng) {
                        arena.insert(animal);
                    }
                }
                None => populations.plants.insert(self.spawn_plant(ids, rng)),
            }
        }
    }

    /// Give every surviving animal a chance to reproduce. Offspring are
    /// added after the pass; births stop once a species reaches its ceiling.
    pub fn reproduce<R: Rng + ?Sized>(
        &self,
        populations: &mut Populations,
        modifiers: &SeasonModifiers,
        excluded: &HashSet<EntityId>,
        ids: &mut IdAllocator,
        rng: &mut R,
        events: &mut Vec<EcosystemEvent>,
    ) -> usize {
        let mut births = 0;

        for species in Species::ANIMALS {
            let ceiling = self.config.population.limits.get(species).max;
            let fertility = modifiers.fertility.get(species);
            let Some(arena) = populations.animals_mut(species) else {
                continue;
            };
            let mut projected = arena.iter().filter(|a| !excluded.contains(&a.id())).count();
            let mut offspring = Vec::new();

            for parent in arena.iter_mut() {
                if projected >= ceiling {
                    break;
                }
                if excluded.contains(&parent.id()) || parent.is_dead() {
                    continue;
                }
                if !parent.can_reproduce(self.config, fertility, rng) {
                    continue;
                }
                if let Some(child) = parent.reproduce(ids.allocate(), self.config, rng) {
                    events.push(EcosystemEvent::birth(
                        parent.id(),
                        species,
                        parent.position,
                        child.id(),
                    ));
                    offspring.push(child);
                    projected += 1;
                }
            }

            births += offspring.len();
            arena.extend(offspring);
        }

        births
    }

    /// Collect animals that died this turn (starvation or old age)
    pub fn collect_dead(&self, populations: &Populations) -> Vec<(EntityId, Species, Vec2, DeathCause)> {
        populations
            .all_animals()
            .filter(|a| a.is_dead())
            .map(|a| {
                let cause = a.cause_of_death.unwrap_or(if a.energy <= 0.0 {
                    DeathCause::Starvation
                } else {
                    DeathCause::OldAge
                });
                (a.id(), a.species, a.position, cause)
            })
            .collect()
    }

    /// Grow every plant and possibly sprout a seedling
    pub fn grow_plants<R: Rng + ?Sized>(
        &self,
        populations: &mut Populations,
        modifiers: &SeasonModifiers,
        ids: &mut IdAllocator,
        rng: &mut R,
    ) -> bool {
        let plants = &self.config.plants;
        let regen = modifiers.plant_regeneration.max(0.0);

        for plant in populations.plants.iter_mut() {
            plant.grow(plants.growth_per_turn * regen);
        }

        let ceiling = self.config.population.limits.plants.max;
        if populations.plants.len() < ceiling && rng.gen::<f32>() < plants.spawn_chance * regen {
            let size = Vec2::new(plants.width, plants.height);
            let position = self.bounds.random_position(size, rng);
            populations
                .plants
                .insert(Plant::seedling(ids.allocate(), position, plants));
            return true;
        }
        false
    }

    /// Enforce per-species floors and ceilings. Shortfalls are topped up
    /// with random spawns, surpluses evicted at random.
    pub fn balance<R: Rng + ?Sized>(
        &self,
        populations: &mut Populations,
        ids: &mut IdAllocator,
        rng: &mut R,
        events: &mut Vec<EcosystemEvent>,
    ) {
        for species in Species::ALL {
            let limit = self.config.population.limits.get(species);
            let count = populations.count(species);

            if count < limit.min {
                let deficit = limit.min - count;
                debug!("Topping up {} {}", deficit, species.tag());
                self.populate(populations, species, deficit, ids, rng);
            } else if count > limit.max {
                let excess = count - limit.max;
                debug!("Evicting {} {}", excess, species.tag());
                self.evict(populations, species, excess, rng, events);
            }
        }
    }

    fn evict<R: Rng + ?Sized>(
        &self,
        populations: &mut Populations,
        species: Species,
        excess: usize,
        rng: &mut R,
        events: &mut Vec<EcosystemEvent>,
    ) {
        let victims: Vec<(EntityId, Vec2)> = match populations.animals(species) {
            Some(arena) => pick(arena.as_slice(), excess, rng),
            None => pick(populations.plants.as_slice(), excess, rng),
        };

        let doomed: HashSet<EntityId> = victims.iter().map(|(id, _)| *id).collect();
        for (id, position) in victims {
            events.push(EcosystemEvent::death(id, species, position, DeathCause::Overpopulation));
        }
        populations.remove(&doomed);
    }
}

fn pick<T: Located, R: Rng + ?Sized>(items: &[T], amount: usize, rng: &mut R) -> Vec<(EntityId, Vec2)> {
    let amount = amount.min(items.len());
    rand::seq::index::sample(rng, items.len(), amount)
        .into_iter()
        .map(|index| (items[index].id(), items[index].position()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup() -> (Config, Populations, IdAllocator, ChaCha8Rng) {
        (
            Config::default(),
            Populations::new(),
            IdAllocator::new(),
            ChaCha8Rng::seed_from_u64(42),
        )
    }

    #[test]
    fn test_clamp_requested_counts() {
        let config = PopulationConfig::default();
        let clamped = config.clamp(PopulationCounts::new(500, 10, 31, 2));
        assert_eq!(clamped, PopulationCounts::new(100, 10, 30, 2));
    }

    #[test]
    fn test_invalid_limits() {
        let mut config = PopulationConfig::default();
        config.limits.fish = Limit::new(10, 5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_top_up_plants_to_minimum() {
        let (mut config, mut pops, mut ids, mut rng) = setup();
        config.population.limits.plants.min = 20;
        let manager = PopulationManager::new(&config);
        let mut events = Vec::new();

        manager.balance(&mut pops, &mut ids, &mut rng, &mut events);

        assert_eq!(pops.plants.len(), 20);
        assert!(pops.plants.iter().all(|p| manager.bounds.contains(p.position, p.size)));
    }

    #[test]
    fn test_trim_above_ceiling() {
        let (mut config, mut pops, mut ids, mut rng) = setup();
        config.population.limits.trout.max = 4;
        let manager = PopulationManager::new(&config);
        manager.populate(&mut pops, Species::Trout, 9, &mut ids, &mut rng);

        let mut events = Vec::new();
        manager.balance(&mut pops, &mut ids, &mut rng, &mut events);

        assert_eq!(pops.trout.len(), 4);
        assert_eq!(events.len(), 5);
        assert!(events.iter().all(|e| e.cause == Some(DeathCause::Overpopulation)));
    }

    #[test]
    fn test_births_respect_ceiling() {
        let (mut config, mut pops, mut ids, mut rng) = setup();
        config.population.limits.fish.max = 6;
        config.fish.profile.reproduction.chance = 1.0;
        let manager = PopulationManager::new(&config);
        manager.populate(&mut pops, Species::Fish, 5, &mut ids, &mut rng);
        for fish in pops.fish.iter_mut() {
            fish.energy = 95.0;
            fish.age = 10.0;
        }

        let mut events = Vec::new();
        let births = manager.reproduce(
            &mut pops,
            &SeasonModifiers::neutral(),
            &HashSet::new(),
            &mut ids,
            &mut rng,
            &mut events,
        );

        assert_eq!(births, 1);
        assert_eq!(pops.fish.len(), 6);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_seedling_growth() {
        let (mut config, mut pops, mut ids, mut rng) = setup();
        config.plants.spawn_chance = 1.0;
        let manager = PopulationManager::new(&config);

        assert!(manager.grow_plants(&mut pops, &SeasonModifiers::neutral(), &mut ids, &mut rng));
        assert_eq!(pops.plants.len(), 1);
        assert_eq!(pops.plants.as_slice()[0].growth, 0.0);

        manager.grow_plants(&mut pops, &SeasonModifiers::neutral(), &mut ids, &mut rng);
        assert_eq!(pops.plants.as_slice()[0].growth, 10.0);
    }

    #[test]
    fn test_stale_targets_cleared() {
        let (config, mut pops, mut ids, mut rng) = setup();
        let manager = PopulationManager::new(&config);
        manager.populate(&mut pops, Species::Fish, 1, &mut ids, &mut rng);
        manager.populate(&mut pops, Species::Trout, 1, &mut ids, &mut rng);

        let fish_id = pops.fish.ids()[0];
        let trout_id = pops.trout.ids()[0];
        if let Some(trout) = pops.trout.get_mut(trout_id) {
            trout.target_entity = Some(fish_id);
        }

        pops.remove(&[fish_id].into_iter().collect());
        pops.clear_stale_targets();
        assert_eq!(pops.animal(trout_id).and_then(|t| t.target_entity), None);
    }
}
