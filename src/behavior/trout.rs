//! Mid-tier predator decisions: escape sharks, hunt fish (alone or as a
//! pack), loiter near allies, wander.

use super::{centroid, flee_point, Decision, DecisionContext, Lock};
use crate::arena::Identified;
use crate::geometry::jitter;
use crate::organism::{Animal, AnimalState, Species};
use rand::Rng;

pub fn decide<R: Rng + ?Sized>(trout: &Animal, ctx: &DecisionContext<'_>, rng: &mut R) -> Decision {
    let cfg = &ctx.config.trout;

    if let Some(shark) = ctx.view.nearby_sharks(trout, cfg.escape_radius).first() {
        let target = flee_point(trout, shark.position, cfg.flee_distance, rng);
        return Decision::steer(ctx.clamp(trout, target), AnimalState::Fleeing)
            .with_speed_factor(cfg.escape_speed_multiplier);
    }

    let hungry = trout.energy < trout.max_energy * cfg.hunger_fraction;
    if hungry {
        // A previously chosen fish is followed as long as it is still alive
        let known = trout
            .target_entity
            .and_then(|id| ctx.view.animal(id))
            .filter(|prey| prey.species == Species::Fish && prey.is_alive());
        let prey = known.or_else(|| ctx.view.nearby_fish(trout, cfg.hunt_radius).first().copied());

        if let Some(prey) = prey {
            let decision = Decision::steer(ctx.clamp(trout, prey.position), AnimalState::Hunting)
                .with_lock(Lock::Set(prey.id()));

            let allies = ctx.view.nearby_trout(trout, cfg.pack_radius);
            if allies.len() >= cfg.min_allies_for_pack {
                let pack = ctx
                    .view
                    .form_trout_pack(trout, cfg.pack_radius, cfg.max_pack_size);
                return decision.with_pack(pack);
            }
            return decision;
        }
    }

    let allies = ctx.view.nearby_trout(trout, cfg.loiter_radius);
    if let Some(center) = centroid(allies.iter().copied()) {
        let target = center + jitter(cfg.loiter_jitter_x, cfg.loiter_jitter_y, rng);
        return Decision::steer(ctx.clamp(trout, target), AnimalState::Moving);
    }

    if rng.gen::<f32>() < cfg.wander_chance {
        let target = trout.position + jitter(cfg.wander_x, cfg.wander_y, rng);
        return Decision::steer(ctx.clamp(trout, target), AnimalState::Moving);
    }

    Decision::keep()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::pond::Pond;
    use crate::geometry::Vec2;

    #[test]
    fn test_escape_uses_sprint() {
        let mut pond = Pond::new();
        let trout = pond.add(Species::Trout, 300.0, 300.0);
        pond.add(Species::Shark, 300.0, 200.0);

        let decision = pond.decide(trout);
        assert_eq!(decision.state(), Some(AnimalState::Fleeing));
        assert_eq!(decision.speed_factor, 1.6);
        let target = decision.steer.unwrap().target;
        assert!((target.y - 440.0).abs() < 1e-3);

        // Speed reverts once the shark is gone
        pond.turn();
        let sprinting = pond.animal(trout).speed;
        pond.pops.sharks.clear();
        pond.turn();
        let cruising = pond.animal(trout).speed;
        assert!(cruising < sprinting);
        assert!((cruising - pond.animal(trout).base_speed).abs() < 1e-6);
    }

    #[test]
    fn test_solo_hunt() {
        let mut pond = Pond::new();
        let trout = pond.add(Species::Trout, 100.0, 100.0);
        pond.animal(trout).energy = 50.0;
        let fish = pond.add(Species::Fish, 250.0, 100.0);

        let decision = pond.decide(trout);
        assert_eq!(decision.state(), Some(AnimalState::Hunting));
        assert_eq!(decision.lock, Lock::Set(fish));
        assert!(decision.pack.is_empty());
    }

    #[test]
    fn test_pack_converges_on_shared_prey() {
        let mut pond = Pond::new();
        let leader = pond.add(Species::Trout, 100.0, 100.0);
        let ally = pond.add(Species::Trout, 100.0, 200.0);
        let fish = pond.add(Species::Fish, 200.0, 150.0);
        pond.animal(leader).energy = 50.0;
        pond.animal(ally).energy = 50.0;

        let decision = pond.decide(leader);
        assert_eq!(decision.pack, vec![leader, ally]);

        pond.turn();
        assert_eq!(pond.animal(leader).target_entity, Some(fish));
        assert_eq!(pond.animal(ally).target_entity, Some(fish));
        assert_eq!(pond.animal(ally).state, AnimalState::Hunting);
    }

    #[test]
    fn test_pack_recruits_sated_ally() {
        let mut pond = Pond::new();
        let leader = pond.add(Species::Trout, 100.0, 100.0);
        let ally = pond.add(Species::Trout, 120.0, 100.0);
        let fish = pond.add(Species::Fish, 300.0, 100.0);
        pond.animal(leader).energy = 50.0;

        let decisions = vec![(leader, pond.decide(leader))];
        crate::behavior::apply_decisions(&mut pond.pops, decisions, &pond.config);

        assert_eq!(pond.animal(ally).target_entity, Some(fish));
        assert_eq!(pond.animal(ally).target, Vec2::new(300.0, 100.0));
    }

    #[test]
    fn test_stale_prey_is_reacquired() {
        let mut pond = Pond::new();
        let trout = pond.add(Species::Trout, 100.0, 100.0);
        pond.animal(trout).energy = 50.0;
        pond.animal(trout).target_entity = Some(12345);
        let fish = pond.add(Species::Fish, 150.0, 100.0);

        assert_eq!(pond.decide(trout).lock, Lock::Set(fish));
    }

    #[test]
    fn test_known_prey_followed_beyond_radius() {
        let mut pond = Pond::new();
        let trout = pond.add(Species::Trout, 0.0, 0.0);
        let far = pond.add(Species::Fish, 900.0, 600.0);
        let near = pond.add(Species::Fish, 100.0, 0.0);
        pond.animal(trout).energy = 50.0;
        pond.animal(trout).target_entity = Some(far);

        let decision = pond.decide(trout);
        assert_eq!(decision.lock, Lock::Set(far));
        assert_ne!(decision.lock, Lock::Set(near));
    }

    #[test]
    fn test_sated_trout_loiters_with_allies() {
        let mut pond = Pond::new();
        let trout = pond.add(Species::Trout, 400.0, 400.0);
        pond.add(Species::Trout, 460.0, 400.0);
        pond.add(Species::Fish, 420.0, 420.0);

        let decision = pond.decide(trout);
        let steer = decision.steer.unwrap();
        assert_eq!(steer.state, AnimalState::Moving);
        assert!((steer.target.x - 460.0).abs() <= 30.0);
        assert!((steer.target.y - 400.0).abs() <= 20.0);
    }
}
