//! Predator/prey collision resolution.
//!
//! Passes run in trophic order (fish on plants, trout on fish, sharks on
//! trout). Every consumed entity is recorded in a removal set instead of
//! being removed mid-scan, so later passes skip it and the ecosystem can
//! drop everything in one batch.

use super::population::Populations;
use crate::arena::{Arena, EntityId, Identified};
use crate::config::Config;
use crate::organism::{Animal, Located, Species};
use crate::stats::EcosystemEvent;
use std::collections::HashSet;

/// Entities consumed during one interaction phase
#[derive(Debug, Default, Clone)]
pub struct InteractionOutcome {
    pub eaten: HashSet<EntityId>,
    pub meals: usize,
    pub energy_transferred: f32,
}

/// Run all feeding passes for one turn
pub fn resolve_interactions(
    populations: &mut Populations,
    config: &Config,
    events: &mut Vec<EcosystemEvent>,
) -> InteractionOutcome {
    let mut outcome = InteractionOutcome::default();

    graze(populations, config, &mut outcome, events);

    let Populations {
        fish, trout, sharks, ..
    } = populations;

    hunt(trout, &[&*fish], config, &mut outcome, events);

    if config.shark.fallback_to_fish {
        hunt(sharks, &[&*trout, &*fish], config, &mut outcome, events);
    } else {
        hunt(sharks, &[&*trout], config, &mut outcome, events);
    }

    outcome
}

/// Fish eat overlapping grown plants
fn graze(
    populations: &mut Populations,
    config: &Config,
    outcome: &mut InteractionOutcome,
    events: &mut Vec<EcosystemEvent>,
) {
    let Populations { plants, fish, .. } = populations;

    for eater in fish.iter_mut() {
        if eater.is_dead() {
            continue;
        }
        let rect = eater.rect();

        for plant in plants.iter_mut() {
            if outcome.eaten.contains(&plant.id()) || plant.energy_yield() <= 0.0 {
                continue;
            }
            if !rect.overlaps(&plant.rect()) {
                continue;
            }

            let energy = eater.eat_plant(plant, config);
            outcome.eaten.insert(plant.id());
            record(outcome, events, eater, plant.id(), energy);
            break;
        }
    }
}

/// Predators eat the first overlapping live prey, one kill each
fn hunt(
    predators: &mut Arena<Animal>,
    prey_sets: &[&Arena<Animal>],
    config: &Config,
    outcome: &mut InteractionOutcome,
    events: &mut Vec<EcosystemEvent>,
) {
    for predator in predators.iter_mut() {
        if predator.is_dead() || outcome.eaten.contains(&predator.id()) {
            continue;
        }
        let rect = predator.rect();

        let victim = prey_sets.iter().flat_map(|set| set.iter()).find(|prey| {
            prey.is_alive()
                && !outcome.eaten.contains(&prey.id())
                && predator.can_eat(prey.species, config)
                && rect.overlaps(&prey.rect())
        });

        if let Some(prey) = victim {
            let energy = predator.eat_animal(prey, config);
            outcome.eaten.insert(prey.id());
            record(outcome, events, predator, prey.id(), energy);
        }
    }
}

fn record(
    outcome: &mut InteractionOutcome,
    events: &mut Vec<EcosystemEvent>,
    eater: &Animal,
    prey: EntityId,
    energy: f32,
) {
    outcome.meals += 1;
    outcome.energy_transferred += energy;
    events.push(EcosystemEvent::eat(
        eater.id(),
        eater.species,
        eater.position,
        prey,
        energy,
    ));
}

/// Species an interaction pass feeds on, in scan order
pub fn prey_of(species: Species, config: &Config) -> Vec<Species> {
    Species::ALL
        .into_iter()
        .filter(|prey| species.eats(*prey, config))
        .collect()
}
