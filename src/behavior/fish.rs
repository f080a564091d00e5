//! Herbivore decisions: flee, graze, school, wander.

use super::{centroid, flee_point, Decision, DecisionContext, Lock};
use crate::arena::Identified;
use crate::geometry::{jitter, Vec2};
use crate::organism::{Animal, AnimalState};
use rand::Rng;

pub fn decide<R: Rng + ?Sized>(fish: &Animal, ctx: &DecisionContext<'_>, rng: &mut R) -> Decision {
    let cfg = &ctx.config.fish;

    // Survival first: run from the nearest trout or shark
    if let Some(predator) = ctx.view.nearby_predators(fish, cfg.flee_radius).first() {
        let target = flee_point(fish, predator.position, cfg.flee_distance, rng);
        return Decision::steer(ctx.clamp(fish, target), AnimalState::Fleeing).with_lock(Lock::Clear);
    }

    if fish.energy < fish.max_energy * cfg.hunger_fraction {
        let plant = ctx
            .view
            .nearby_plants(fish, cfg.eat_radius)
            .into_iter()
            .find(|plant| plant.energy_yield() > 0.0);
        if let Some(plant) = plant {
            return Decision::steer(ctx.clamp(fish, plant.position), AnimalState::Eating)
                .with_lock(Lock::Set(plant.id()));
        }
    }

    let school = ctx.view.nearby_fish(fish, cfg.school_radius);
    if school.len() >= cfg.school_min_neighbors {
        if let Some(center) = centroid(school.iter().copied()) {
            let mut separation = Vec2::ZERO;
            for mate in &school {
                let away = fish.position - mate.position;
                let dist = away.length();
                if dist > 0.0 && dist < cfg.separation_distance {
                    separation += away / dist;
                }
            }

            let target = fish.position
                + (center - fish.position) * cfg.cohesion
                + separation * cfg.separation_weight;
            return Decision::steer(ctx.clamp(fish, target), AnimalState::Schooling)
                .with_lock(Lock::Clear);
        }
    }

    if rng.gen::<f32>() < cfg.wander_chance {
        let target = fish.position + jitter(cfg.wander_x, cfg.wander_y, rng);
        return Decision::steer(ctx.clamp(fish, target), AnimalState::Moving);
    }

    Decision::keep()
}
