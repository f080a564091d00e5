//! Discrete day/night and season clock.
//!
//! All derived fields are recomputed from `turn`, so a clock can be
//! persisted as that single scalar.

use super::seasons::Season;
use serde::{Deserialize, Serialize};

/// Day cycle configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Turns in one full day
    pub day_cycle_turns: u32,
    /// Day progress below which it is dawn
    pub dawn_fraction: f64,
    /// Day progress below which it is dusk (after midday)
    pub dusk_fraction: f64,
    pub days_per_season: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            day_cycle_turns: 32,
            dawn_fraction: 0.18,
            dusk_fraction: 0.68,
            days_per_season: 6,
        }
    }
}

impl ClockConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.day_cycle_turns == 0 {
            return Err("day_cycle_turns must be > 0".to_string());
        }
        if self.days_per_season == 0 {
            return Err("days_per_season must be > 0".to_string());
        }
        if !(0.0 < self.dawn_fraction && self.dawn_fraction < 0.5) {
            return Err("dawn_fraction must be in (0, 0.5)".to_string());
        }
        if !(0.5 < self.dusk_fraction && self.dusk_fraction < 1.0) {
            return Err("dusk_fraction must be in (0.5, 1)".to_string());
        }
        Ok(())
    }
}

/// Phase of the day
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayPhase {
    Dawn,
    Day,
    Dusk,
    Night,
}

impl DayPhase {
    pub fn name(&self) -> &'static str {
        match self {
            DayPhase::Dawn => "Dawn",
            DayPhase::Day => "Day",
            DayPhase::Dusk => "Dusk",
            DayPhase::Night => "Night",
        }
    }
}

/// Turn counter with derived day, season and phase
#[derive(Clone, Debug, PartialEq)]
pub struct TimeClock {
    config: ClockConfig,
    turn: f64,
    day: u64,
    season_index: usize,
    day_progress: f64,
}

impl TimeClock {
    pub fn new(config: ClockConfig) -> Self {
        Self::from_turn(config, 0.0)
    }

    /// Rebuild a clock from a persisted turn value
    pub fn from_turn(config: ClockConfig, turn: f64) -> Self {
        let mut clock = Self {
            config,
            turn: 0.0,
            day: 1,
            season_index: 0,
            day_progress: 0.0,
        };
        clock.set_turn(turn);
        clock
    }

    /// Advance by `delta_turns` (negative or non-finite deltas are ignored)
    pub fn advance(&mut self, delta_turns: f64) {
        if delta_turns.is_finite() && delta_turns > 0.0 {
            self.set_turn(self.turn + delta_turns);
        }
    }

    fn set_turn(&mut self, turn: f64) {
        let turn = if turn.is_finite() { turn.max(0.0) } else { 0.0 };
        let cycle = f64::from(self.config.day_cycle_turns.max(1));
        let days_per_season = u64::from(self.config.days_per_season.max(1));

        self.turn = turn;
        self.day_progress = (turn % cycle) / cycle;
        self.day = (turn / cycle).floor() as u64 + 1;
        self.season_index = (((self.day - 1) / days_per_season) % Season::COUNT as u64) as usize;
    }

    #[inline]
    pub fn turn(&self) -> f64 {
        self.turn
    }

    /// 1-based day number
    #[inline]
    pub fn day(&self) -> u64 {
        self.day
    }

    #[inline]
    pub fn day_progress(&self) -> f64 {
        self.day_progress
    }

    #[inline]
    pub fn season_index(&self) -> usize {
        self.season_index
    }

    pub fn season(&self) -> Season {
        Season::from_index(self.season_index)
    }

    /// Fraction of the current season already elapsed
    pub fn season_progress(&self) -> f64 {
        let days_per_season = u64::from(self.config.days_per_season.max(1));
        let day_in_season = (self.day - 1) % days_per_season;
        (day_in_season as f64 + self.day_progress) / days_per_season as f64
    }

    pub fn phase(&self) -> DayPhase {
        let p = self.day_progress;
        if p < self.config.dawn_fraction {
            DayPhase::Dawn
        } else if p < 0.5 {
            DayPhase::Day
        } else if p < self.config.dusk_fraction {
            DayPhase::Dusk
        } else {
            DayPhase::Night
        }
    }

    #[inline]
    pub fn is_night(&self) -> bool {
        self.phase() == DayPhase::Night
    }

    /// Ambient light in [0.1, 1.0]: ramps up through dawn, full during the
    /// day, ramps down through dusk and stays dim at night.
    pub fn light_factor(&self) -> f64 {
        let p = self.day_progress;
        let dawn = self.config.dawn_fraction;
        let dusk = self.config.dusk_fraction;
        match self.phase() {
            DayPhase::Dawn => 0.1 + 0.9 * (p / dawn),
            DayPhase::Day => 1.0,
            DayPhase::Dusk => 1.0 - 0.9 * ((p - 0.5) / (dusk - 0.5)),
            DayPhase::Night => 0.1,
        }
    }
}
