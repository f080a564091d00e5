//! Statistics and per-turn events exposed to presentation layers.

use crate::arena::EntityId;
use crate::ecology::{DayPhase, PopulationCounts, Season};
use crate::geometry::Vec2;
use crate::organism::{DeathCause, Species};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Kind of transient ecosystem event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Eat,
    Birth,
    Death,
}

/// Something that happened during the last turn
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EcosystemEvent {
    pub kind: EventKind,
    pub position: Vec2,
    /// Eater, parent or deceased species
    pub species: Option<Species>,
    /// Energy gained when eating
    pub amount: Option<f32>,
    /// Eater, parent or deceased entity
    pub subject: Option<EntityId>,
    /// Prey eaten or child born
    pub other: Option<EntityId>,
    pub cause: Option<DeathCause>,
}

impl EcosystemEvent {
    pub fn eat(eater: EntityId, species: Species, position: Vec2, prey: EntityId, amount: f32) -> Self {
        Self {
            kind: EventKind::Eat,
            position,
            species: Some(species),
            amount: Some(amount),
            subject: Some(eater),
            other: Some(prey),
            cause: None,
        }
    }

    pub fn birth(parent: EntityId, species: Species, position: Vec2, child: EntityId) -> Self {
        Self {
            kind: EventKind::Birth,
            position,
            species: Some(species),
            amount: None,
            subject: Some(parent),
            other: Some(child),
            cause: None,
        }
    }

    pub fn death(id: EntityId, species: Species, position: Vec2, cause: DeathCause) -> Self {
        Self {
            kind: EventKind::Death,
            position,
            species: Some(species),
            amount: None,
            subject: Some(id),
            other: None,
            cause: Some(cause),
        }
    }
}

/// Statistics snapshot for one turn
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Statistics {
    pub turn: u64,
    pub counts: PopulationCounts,
    pub day: u64,
    pub season: Season,
    pub phase: DayPhase,
    pub day_progress: f64,
    pub season_progress: f64,
    pub is_night: bool,
    pub light_factor: f64,
    /// Mean energy per animal species (fish, trout, shark)
    pub mean_energy: [f32; 3],
    pub births: usize,
    pub deaths: usize,
    pub meals: usize,
}

impl Statistics {
    /// Tally births, deaths and meals from a turn's event log
    pub fn count_events(&mut self, events: &[EcosystemEvent]) {
        self.births = events.iter().filter(|e| e.kind == EventKind::Birth).count();
        self.deaths = events.iter().filter(|e| e.kind == EventKind::Death).count();
        self.meals = events.iter().filter(|e| e.kind == EventKind::Eat).count();
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "T:{:6} | Day:{:4} {:6} {:5} | Plants:{:3} Fish:{:3} Trout:{:3} Sharks:{:3} | +{} -{} eat:{}",
            self.turn,
            self.day,
            self.season.name(),
            self.phase.name(),
            self.counts.plants,
            self.counts.fish,
            self.counts.trout,
            self.counts.sharks,
            self.births,
            self.deaths,
            self.meals,
        )
    }
}

/// Historical statistics tracker
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsHistory {
    pub snapshots: Vec<Statistics>,
    /// Recording interval in turns
    pub interval: u64,
}

impl StatsHistory {
    pub fn new(interval: u64) -> Self {
        Self {
            snapshots: Vec::new(),
            interval: interval.max(1),
        }
    }

    /// Record `stats` if its turn falls on the recording interval
    pub fn maybe_record(&mut self, stats: &Statistics) -> bool {
        if stats.turn % self.interval.max(1) == 0 {
            self.snapshots.push(stats.clone());
            true
        } else {
            false
        }
    }

    pub fn latest(&self) -> Option<&Statistics> {
        self.snapshots.last()
    }

    /// Population of one species over time
    pub fn population_series(&self, species: Species) -> Vec<(u64, usize)> {
        self.snapshots
            .iter()
            .map(|s| (s.turn, s.counts.get(species)))
            .collect()
    }

    /// Peak population reached by one species
    pub fn peak(&self, species: Species) -> usize {
        self.snapshots
            .iter()
            .map(|s| s.counts.get(species))
            .max()
            .unwrap_or(0)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
