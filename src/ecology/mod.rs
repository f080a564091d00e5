//! Ecological systems of the aquarium.
//!
//! This module contains:
//! - Day/night and season clock
//! - Seasonal modifiers (movement, metabolism, plant regrowth, fertility)
//! - Trophic interactions (who eats whom on collision)
//! - Population management (reproduction, death, floors and ceilings)

pub mod clock;
pub mod interaction;
pub mod population;
pub mod seasons;

pub use clock::{ClockConfig, DayPhase, TimeClock};
pub use interaction::{resolve_interactions, InteractionOutcome};
pub use population::{
    IdAllocator, Limit, PopulationConfig, PopulationCounts, PopulationLimits, PopulationManager,
    Populations,
};
pub use seasons::{Season, SeasonModifiers, SeasonsConfig, SpeciesFactors};
