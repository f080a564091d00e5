//! Continuous per-frame motion.
//!
//! Each frame an animal steers towards its decision target with three
//! weighted accelerations: seek (with slowing near the target), separation
//! from same-species neighbors, and a push away from walls. Velocity is
//! damped and clamped to the animal's current speed. Steering is computed
//! for a whole species first and then integrated, so no animal sees a
//! neighbor's position from the same frame.
//!
//! A hunting animal with a live lock re-aims at its prey every frame
//! instead of at the point chosen on the last turn, and keeps closing in
//! after it arrives.

use crate::arena::{EntityId, Identified};
use crate::behavior::shark::lead_point;
use crate::config::{Config, MotionConfig};
use crate::ecology::Populations;
use crate::geometry::{random_unit, Bounds, Vec2};
use crate::grid::BucketGrid;
use crate::organism::{Animal, AnimalState, Species};
use rand::Rng;
use std::collections::HashMap;

/// Acceleration and arrival flag computed for one animal
#[derive(Clone, Copy, Debug, PartialEq)]
struct Steering {
    acceleration: Vec2,
    arrived: bool,
}

/// Moves animals towards their targets between AI turns
#[derive(Clone, Debug)]
pub struct MotionIntegrator {
    grid: BucketGrid,
    bounds: Bounds,
}

impl MotionIntegrator {
    pub fn new(config: &Config) -> Self {
        let bounds = Bounds::new(config.world.width, config.world.height);
        Self {
            grid: BucketGrid::new(bounds, config.motion.cell_size),
            bounds,
        }
    }

    /// Advance every animal by `dt` seconds. Returns how many animals
    /// reached their target this frame.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        populations: &mut Populations,
        config: &Config,
        dt: f32,
        rng: &mut R,
    ) -> usize {
        let dt = if dt.is_finite() {
            dt.clamp(0.0, config.world.max_frame_dt)
        } else {
            0.0
        };
        if dt <= 0.0 {
            return 0;
        }

        let pursuits = pursuit_points(populations, config);

        let mut arrivals = 0;
        for species in Species::ANIMALS {
            let Some(arena) = populations.animals_mut(species) else {
                continue;
            };

            for animal in arena.iter_mut() {
                if let Some(&aim) = pursuits.get(&animal.id()) {
                    animal.target = self.bounds.clamp(aim, animal.size);
                }
            }

            let flock = arena.as_slice();
            self.grid.rebuild(flock.iter().map(|a| a.position));
            let steering: Vec<Steering> = flock
                .iter()
                .map(|animal| {
                    let pursuing = pursuits.contains_key(&animal.id());
                    steer(animal, pursuing, flock, &self.grid, &config.motion, self.bounds)
                })
                .collect();

            for (animal, steering) in arena.iter_mut().zip(steering) {
                let pursuing = pursuits.contains_key(&animal.id());
                if integrate(animal, steering, pursuing, &config.motion, self.bounds, dt, rng) {
                    arrivals += 1;
                }
            }
        }
        arrivals
    }
}

/// Aim points for every hunter whose locked prey is still alive, taken
/// from start-of-frame positions
fn pursuit_points(populations: &Populations, config: &Config) -> HashMap<EntityId, Vec2> {
    populations
        .all_animals()
        .filter(|hunter| hunter.state == AnimalState::Hunting)
        .filter_map(|hunter| {
            let prey = hunter.target_entity.and_then(|id| populations.animal(id))?;
            if !prey.is_alive() {
                return None;
            }
            let aim = match hunter.species {
                Species::Shark => lead_point(hunter.position, prey.position, &config.shark),
                _ => prey.position,
            };
            Some((hunter.id(), aim))
        })
        .collect()
}

#[inline]
fn max_speed(animal: &Animal, motion: &MotionConfig) -> f32 {
    (animal.speed * motion.speed_scale).max(0.0)
}

fn steer(
    animal: &Animal,
    pursuing: bool,
    flock: &[Animal],
    grid: &BucketGrid,
    motion: &MotionConfig,
    bounds: Bounds,
) -> Steering {
    let to_target = animal.target - animal.position;
    let distance = to_target.length();
    if distance < motion.arrival_epsilon {
        return Steering {
            acceleration: Vec2::ZERO,
            arrived: true,
        };
    }

    let top_speed = max_speed(animal, motion);

    // Seek, easing off inside the slowing radius unless closing on prey
    let mut desired_speed = top_speed;
    if !pursuing && motion.slowing_radius > 0.0 && distance < motion.slowing_radius {
        desired_speed *= distance / motion.slowing_radius;
    }
    let desired = to_target / distance * desired_speed;
    let mut acceleration = (desired - animal.velocity) * motion.seek_weight;

    // Separation from same-species neighbors
    let radius = motion.separation_radius;
    if radius > 0.0 {
        let mut push = Vec2::ZERO;
        for index in grid.query(animal.position, radius) {
            let Some(other) = flock.get(index) else {
                continue;
            };
            if other.id() == animal.id() {
                continue;
            }
            let away = animal.position - other.position;
            let d = away.length();
            if d > 0.0 && d < radius {
                push += away / d * (1.0 - d / radius);
            }
        }
        acceleration += push * (motion.separation_weight * top_speed);
    }

    // Wall avoidance
    let margin = motion.wall_margin;
    if margin > 0.0 {
        let max = bounds.max_corner(animal.size);
        let mut wall = Vec2::ZERO;
        if animal.position.x < margin {
            wall.x += (margin - animal.position.x) / margin;
        }
        if animal.position.x > max.x - margin {
            wall.x -= (animal.position.x - (max.x - margin)) / margin;
        }
        if animal.position.y < margin {
            wall.y += (margin - animal.position.y) / margin;
        }
        if animal.position.y > max.y - margin {
            wall.y -= (animal.position.y - (max.y - margin)) / margin;
        }
        // Never push away from a target that itself sits near the wall
        if to_target.x * wall.x < 0.0 {
            wall.x = 0.0;
        }
        if to_target.y * wall.y < 0.0 {
            wall.y = 0.0;
        }
        acceleration += wall * (motion.wall_weight * top_speed);
    }

    Steering {
        acceleration,
        arrived: false,
    }
}

/// Apply one frame of steering. Returns true on arrival.
fn integrate<R: Rng + ?Sized>(
    animal: &mut Animal,
    steering: Steering,
    pursuing: bool,
    motion: &MotionConfig,
    bounds: Bounds,
    dt: f32,
    rng: &mut R,
) -> bool {
    if steering.arrived {
        animal.position = bounds.clamp(animal.target, animal.size);
        if pursuing {
            return true;
        }
        // Pick a short hop so the animal never visibly stops
        let hop = animal.position + random_unit(rng) * motion.rewander_radius;
        animal.target = bounds.clamp(hop, animal.size);
        return true;
    }

    let top_speed = max_speed(animal, motion);
    let damping = (1.0 - motion.damping * dt).max(0.0);
    let velocity = (animal.velocity + steering.acceleration * dt) * damping;
    animal.velocity = if velocity.is_finite() {
        velocity.clamp_length(top_speed)
    } else {
        Vec2::ZERO
    };

    // Never step past the target
    let to_target = animal.target - animal.position;
    let mut step = animal.velocity * dt;
    if step.length_squared() > to_target.length_squared() && step.length_squared() > 0.0 {
        step = step.clamp_length(to_target.length());
    }

    let previous = animal.position;
    animal.position = bounds.clamp(animal.position + step, animal.size);
    animal.face(animal.position.x - previous.x);
    false
}
