//! Apex predator decisions: persistent pursuit with a lead point, or patrol.

use super::{Decision, DecisionContext, Lock};
use crate::arena::Identified;
use crate::config::SharkConfig;
use crate::geometry::{jitter, Vec2};
use crate::organism::{Animal, AnimalState, Species};
use rand::Rng;

/// Hunt radius for the shark's current fullness
pub fn hunt_radius(shark: &Animal, ctx: &DecisionContext<'_>) -> f32 {
    let cfg = &ctx.config.shark;
    if shark.fullness() < cfg.hunger_threshold {
        cfg.hunt_radius_hungry
    } else {
        cfg.hunt_radius_relaxed
    }
}

/// Point slightly past `prey` along the line of approach from `shark`
pub fn lead_point(shark: Vec2, prey: Vec2, cfg: &SharkConfig) -> Vec2 {
    let delta = prey - shark;
    let dist = match delta.length() {
        d if d > 0.0 => d,
        _ => 1.0,
    };
    prey + Vec2::new(
        delta.x / dist * cfg.lead_factor * cfg.lead_x,
        delta.y / dist * cfg.lead_factor * cfg.lead_y,
    )
}

fn is_prey(prey: &Animal, ctx: &DecisionContext<'_>) -> bool {
    prey.is_alive() && Species::Shark.eats(prey.species, ctx.config)
}

pub fn decide<R: Rng + ?Sized>(shark: &Animal, ctx: &DecisionContext<'_>, rng: &mut R) -> Decision {
    let cfg = &ctx.config.shark;
    let radius = hunt_radius(shark, ctx);

    // Stay on a locked target while it is alive and within persistence range
    let locked = shark
        .target_entity
        .and_then(|id| ctx.view.animal(id))
        .filter(|prey| is_prey(prey, ctx))
        .filter(|prey| prey.position.distance(shark.position) <= cfg.persistence_distance);

    let (prey, lock) = match locked {
        Some(prey) => (Some(prey), Lock::Keep),
        None => {
            let mut found = ctx.view.nearby_trout(shark, radius).first().copied();
            if found.is_none() && cfg.fallback_to_fish {
                found = ctx.view.nearby_fish(shark, radius).first().copied();
            }
            match found {
                Some(prey) => (Some(prey), Lock::Set(prey.id())),
                None => (None, Lock::Clear),
            }
        }
    };

    if let Some(prey) = prey {
        let aim = lead_point(shark.position, prey.position, cfg);
        return Decision::steer(ctx.clamp(shark, aim), AnimalState::Hunting).with_lock(lock);
    }

    if rng.gen::<f32>() < cfg.patrol_chance {
        let target = ctx.bounds.center() + jitter(cfg.patrol_x, cfg.patrol_y, rng);
        return Decision::steer(ctx.clamp(shark, target), AnimalState::Patrolling).with_lock(lock);
    }

    Decision::keep().with_lock(lock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::pond::Pond;

    #[test]
    fn test_hunger_widens_radius() {
        let mut pond = Pond::new();
        let shark = pond.add(Species::Shark, 100.0, 100.0);
        let trout = pond.add(Species::Trout, 400.0, 100.0);

        // Relaxed radius is 260, the trout is 300 away
        assert_ne!(pond.decide(shark).lock, Lock::Set(trout));

        pond.animal(shark).energy = 100.0;
        let decision = pond.decide(shark);
        assert_eq!(decision.lock, Lock::Set(trout));
        assert_eq!(decision.state(), Some(AnimalState::Hunting));
    }

    #[test]
    fn test_lead_point_overshoots_prey() {
        let mut pond = Pond::new();
        let shark = pond.add(Species::Shark, 100.0, 100.0);
        pond.add(Species::Trout, 200.0, 100.0);

        let target = pond.decide(shark).steer.unwrap().target;
        assert!((target.x - 212.0).abs() < 1e-3);
        assert!((target.y - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_lock_persists_within_range() {
        let mut pond = Pond::new();
        let shark = pond.add(Species::Shark, 100.0, 100.0);
        let locked = pond.add(Species::Trout, 400.0, 100.0);
        let closer = pond.add(Species::Trout, 150.0, 100.0);
        pond.animal(shark).target_entity = Some(locked);

        // 300 away: outside the relaxed radius but inside persistence
        let decision = pond.decide(shark);
        assert_eq!(decision.lock, Lock::Keep);
        assert!(decision.steer.unwrap().target.x > 400.0);
        assert_ne!(decision.lock, Lock::Set(closer));
    }

    #[test]
    fn test_lock_dropped_beyond_persistence() {
        let mut pond = Pond::new();
        let shark = pond.add(Species::Shark, 0.0, 0.0);
        let trout = pond.add(Species::Trout, 500.0, 0.0);
        pond.animal(shark).target_entity = Some(trout);

        pond.turn();
        assert_eq!(pond.animal(shark).target_entity, None);
        assert_ne!(pond.animal(shark).state, AnimalState::Hunting);
    }

    #[test]
    fn test_fish_fallback() {
        let mut pond = Pond::new();
        let shark = pond.add(Species::Shark, 100.0, 100.0);
        let fish = pond.add(Species::Fish, 150.0, 100.0);

        assert_ne!(pond.decide(shark).lock, Lock::Set(fish));

        pond.config.shark.fallback_to_fish = true;
        assert_eq!(pond.decide(shark).lock, Lock::Set(fish));
    }

    #[test]
    fn test_patrol_heads_for_center() {
        let mut pond = Pond::new();
        pond.config.shark.patrol_chance = 1.0;
        let shark = pond.add(Species::Shark, 0.0, 0.0);

        let steer = pond.decide(shark).steer.unwrap();
        assert_eq!(steer.state, AnimalState::Patrolling);
        assert!((steer.target.x - 500.0).abs() <= 300.0);
        assert!((steer.target.y - 360.0).abs() <= 200.0);
    }
}
