//! Seasonal variation system.

use crate::organism::Species;
use serde::{Deserialize, Serialize};

/// The four seasons
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub const COUNT: usize = 4;
    pub const ORDER: [Season; Season::COUNT] =
        [Season::Spring, Season::Summer, Season::Autumn, Season::Winter];

    /// Season for a clock season index (wraps)
    pub fn from_index(index: usize) -> Season {
        Self::ORDER[index % Self::COUNT]
    }

    pub fn index(&self) -> usize {
        match self {
            Season::Spring => 0,
            Season::Summer => 1,
            Season::Autumn => 2,
            Season::Winter => 3,
        }
    }

    /// Get next season
    pub fn next(&self) -> Season {
        Self::from_index(self.index() + 1)
    }

    /// Get display name
    pub fn name(&self) -> &'static str {
        match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
            Season::Winter => "Winter",
        }
    }
}

/// Per-animal-species multipliers
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesFactors {
    pub fish: f32,
    pub trout: f32,
    pub shark: f32,
}

impl SpeciesFactors {
    pub const NEUTRAL: SpeciesFactors = SpeciesFactors {
        fish: 1.0,
        trout: 1.0,
        shark: 1.0,
    };

    pub fn get(&self, species: Species) -> f32 {
        match species {
            Species::Fish => self.fish,
            Species::Trout => self.trout,
            Species::Shark => self.shark,
            Species::Plant => 1.0,
        }
    }
}

impl Default for SpeciesFactors {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Environmental multipliers active during one season
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeasonModifiers {
    pub season: Season,
    #[serde(default)]
    pub description: String,
    /// Multiplies animal speed
    pub movement: f32,
    /// Multiplies per-turn energy drain
    pub energy_consumption: f32,
    /// Multiplies plant growth and seedling chance
    pub plant_regeneration: f32,
    /// Multiplies reproduction chance
    #[serde(default)]
    pub fertility: SpeciesFactors,
}

impl SeasonModifiers {
    /// All factors 1.0
    pub fn neutral() -> Self {
        Self::neutral_for(Season::Spring)
    }

    pub fn neutral_for(season: Season) -> Self {
        Self {
            season,
            description: String::new(),
            movement: 1.0,
            energy_consumption: 1.0,
            plant_regeneration: 1.0,
            fertility: SpeciesFactors::NEUTRAL,
        }
    }
}

/// Seasons configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonsConfig {
    /// Is seasonal variation enabled
    pub enabled: bool,
    pub table: Vec<SeasonModifiers>,
}

impl Default for SeasonsConfig {
    fn default() -> Self {
        let entry = |season: Season,
                     description: &str,
                     movement: f32,
                     energy_consumption: f32,
                     plant_regeneration: f32,
                     fertility: [f32; 3]| {
            SeasonModifiers {
                season,
                description: description.to_string(),
                movement,
                energy_consumption,
                plant_regeneration,
                fertility: SpeciesFactors {
                    fish: fertility[0],
                    trout: fertility[1],
                    shark: fertility[2],
                },
            }
        };

        Self {
            enabled: true,
            table: vec![
                entry(Season::Spring, "Mild sprouts and gentle currents.", 1.05, 0.92, 1.2, [1.3, 1.15, 1.05]),
                entry(Season::Summer, "Intense heat and fast migrations.", 1.08, 1.05, 1.05, [1.05, 1.0, 1.15]),
                entry(Season::Autumn, "Leaf-laden currents, a slower pace.", 0.95, 0.98, 0.85, [0.9, 0.95, 1.0]),
                entry(Season::Winter, "Cold water and scarce algae.", 0.82, 1.2, 0.55, [0.7, 0.8, 0.9]),
            ],
        }
    }
}

impl SeasonsConfig {
    /// Modifiers for `season`; neutral when disabled or missing from the table
    pub fn modifiers(&self, season: Season) -> SeasonModifiers {
        if !self.enabled {
            return SeasonModifiers::neutral_for(season);
        }
        self.table
            .iter()
            .find(|entry| entry.season == season)
            .cloned()
            .unwrap_or_else(|| SeasonModifiers::neutral_for(season))
    }
}
