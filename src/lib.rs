//! # AQUASIM
//!
//! Predator-prey aquarium simulator: plants, fish, trout and sharks driven
//! by a per-turn decision engine and a continuous motion integrator.
//!
//! ## Features
//!
//! - **Two-rate scheduling**: discrete AI turns plus per-frame steering
//! - **Seasons and day cycle**: modifiers for speed, metabolism, regrowth and fertility
//! - **Configurable**: YAML configuration files
//! - **Reproducible**: Seeded random number generation, restored with checkpoints
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aquasim::{Config, Ecosystem};
//!
//! let mut eco = Ecosystem::new_with_seed(Config::default(), 42);
//!
//! // Ten AI turns, each followed by a second of motion
//! for _ in 0..10 {
//!     eco.simulate_turn();
//!     for _ in 0..60 {
//!         eco.advance_motion(1.0 / 60.0);
//!     }
//! }
//!
//! println!("{}", eco.get_statistics().summary());
//! ```
//!
//! ## Checkpoints
//!
//! ```rust,no_run
//! use aquasim::{Config, Ecosystem};
//! use aquasim::checkpoint::Checkpoint;
//!
//! let mut eco = Ecosystem::new(Config::default());
//! eco.run(100);
//!
//! let checkpoint = eco.create_checkpoint();
//! checkpoint.save("checkpoint.bin").unwrap();
//!
//! let loaded = Checkpoint::load("checkpoint.bin").unwrap();
//! let restored = Ecosystem::from_checkpoint(loaded).unwrap();
//! ```

pub mod arena;
pub mod behavior;
pub mod checkpoint;
pub mod config;
pub mod driver;
pub mod ecology;
pub mod ecosystem;
pub mod geometry;
pub mod grid;
pub mod motion;
pub mod organism;
pub mod saves;
pub mod stats;

// Re-export main types
pub use arena::EntityId;
pub use config::Config;
pub use driver::TurnDriver;
pub use ecology::PopulationCounts;
pub use ecosystem::Ecosystem;
pub use geometry::Vec2;
pub use organism::{Animal, AnimalState, Plant, Species};
pub use stats::{EcosystemEvent, EventKind, Statistics};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark
pub fn benchmark(turns: u64, frames_per_turn: u32, seed: u64) -> BenchmarkResult {
    use std::time::Instant;

    let mut eco = Ecosystem::new_with_seed(Config::default(), seed);
    let initial = eco.counts().total();
    let dt = 1.0 / frames_per_turn.max(1) as f32;

    let start = Instant::now();
    for _ in 0..turns {
        eco.simulate_turn();
        for _ in 0..frames_per_turn {
            eco.advance_motion(dt);
        }
    }
    let elapsed = start.elapsed().as_secs_f64().max(f64::EPSILON);

    BenchmarkResult {
        turns,
        frames_per_turn,
        initial_entities: initial,
        final_entities: eco.counts().total(),
        elapsed_secs: elapsed,
        turns_per_second: turns as f64 / elapsed,
    }
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub turns: u64,
    pub frames_per_turn: u32,
    pub initial_entities: usize,
    pub final_entities: usize,
    pub elapsed_secs: f64,
    pub turns_per_second: f64,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Turns: {} ({} frames each)", self.turns, self.frames_per_turn)?;
        writeln!(f, "Entities: {} -> {}", self.initial_entities, self.final_entities)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} turns/s", self.turns_per_second)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_quick_simulation() {
        let mut eco = Ecosystem::new_with_seed(Config::default(), 1);
        eco.run(100);

        assert_eq!(eco.turn_count(), 100);
    }

    #[test]
    fn test_benchmark() {
        let result = benchmark(20, 10, 7);

        assert_eq!(result.turns, 20);
        assert!(result.turns_per_second > 0.0);
    }
}
