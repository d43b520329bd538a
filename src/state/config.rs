//! Race configuration.
//!
//! Holds the data the core depends on but does not compute: the canonical
//! round distances, the name and color pools, and the sizing and timing
//! knobs for the round transition.

use std::time::Duration;

use serde::Deserialize;

use super::error::RaceError;
use super::horse::distinct_entries;

/// Horses in a roster.
pub const DEFAULT_ROSTER_SIZE: usize = 20;

/// Horses drawn into each round.
pub const DEFAULT_ROUND_SIZE: usize = 10;

/// Delay between entering `transitioning` and re-entering `racing`.
pub const DEFAULT_TRANSITION_DELAY: Duration = Duration::from_millis(100);

/// Canonical distance in meters for each round, by position.
pub const ROUND_DISTANCES: [u32; 6] = [1200, 1400, 1600, 1800, 2000, 2200];

pub const HORSE_NAMES: [&str; 24] = [
    "Thunder Bolt",
    "Silver Storm",
    "Golden Arrow",
    "Midnight Star",
    "Desert Wind",
    "Royal Flush",
    "Lucky Charm",
    "Blue Diamond",
    "Wild Spirit",
    "Shadow Runner",
    "Fire Dancer",
    "Ocean Breeze",
    "Storm Chaser",
    "Night Rider",
    "Crimson Tide",
    "Morning Glory",
    "Iron Duke",
    "Velvet Thunder",
    "Summer Rain",
    "Black Pearl",
    "Northern Light",
    "Rapid Fire",
    "Silent Knight",
    "Copper Comet",
];

pub const HORSE_COLORS: [&str; 24] = [
    "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6",
    "#bcf60c", "#fabebe", "#008080", "#e6beff", "#9a6324", "#fffac8", "#800000", "#aaffc3",
    "#808000", "#ffd8b1", "#000075", "#808080", "#000000", "#a9a9a9", "#ff69b4", "#2f4f4f",
];

/// What happens to a scheduled `transitioning -> racing` step when a
/// superseding action runs before it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumePolicy {
    /// `pause`, `start`, program generation and finishing the last round
    /// cancel the pending step.
    #[default]
    Cancellable,
    /// Nothing cancels the pending step; it forces `racing` when it fires.
    Legacy,
}

impl ResumePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cancellable => "cancellable",
            Self::Legacy => "legacy",
        }
    }
}

/// Race configuration.
///
/// Every field has a default, so a partial JSON document is enough. The
/// defaults give 6 rounds of 10 horses drawn from a roster of 20; other
/// distance counts and sizes are accepted as long as `validate` passes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Round distances; the schedule has one round per entry
    pub distances: Vec<u32>,

    /// Candidate horse names
    pub horse_names: Vec<String>,

    /// Candidate horse colors
    pub colors: Vec<String>,

    /// Horses per roster
    pub roster_size: usize,

    /// Horses per round
    pub round_size: usize,

    /// Delay before the next round starts racing, in milliseconds
    pub transition_delay_ms: u64,

    pub resume_policy: ResumePolicy,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            distances: ROUND_DISTANCES.to_vec(),
            horse_names: HORSE_NAMES.iter().map(|s| s.to_string()).collect(),
            colors: HORSE_COLORS.iter().map(|s| s.to_string()).collect(),
            roster_size: DEFAULT_ROSTER_SIZE,
            round_size: DEFAULT_ROUND_SIZE,
            transition_delay_ms: DEFAULT_TRANSITION_DELAY.as_millis() as u64,
            resume_policy: ResumePolicy::default(),
        }
    }
}

impl RaceConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json(json: &str) -> Result<Self, RaceError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_resume_policy(mut self, policy: ResumePolicy) -> Self {
        self.resume_policy = policy;
        self
    }

    pub fn with_distances(mut self, distances: Vec<u32>) -> Self {
        self.distances = distances;
        self
    }

    /// Number of rounds a schedule built from this config has.
    pub fn round_count(&self) -> usize {
        self.distances.len()
    }

    pub fn transition_delay(&self) -> Duration {
        Duration::from_millis(self.transition_delay_ms)
    }

    /// Check the cardinality rules the generator and scheduler rely on.
    pub fn validate(&self) -> Result<(), RaceError> {
        if self.roster_size == 0 {
            return Err(RaceError::InvalidConfig(
                "roster_size must be at least 1".to_string(),
            ));
        }

        if self.round_size == 0 || self.round_size > self.roster_size {
            return Err(RaceError::InvalidConfig(format!(
                "round_size must be between 1 and {}, got {}",
                self.roster_size, self.round_size
            )));
        }

        if self.distances.is_empty() {
            return Err(RaceError::InvalidConfig(
                "at least one round distance is required".to_string(),
            ));
        }

        check_pool("name", &self.horse_names, self.roster_size)?;
        check_pool("color", &self.colors, self.roster_size)?;

        Ok(())
    }
}

fn check_pool(pool: &'static str, entries: &[String], required: usize) -> Result<(), RaceError> {
    let available = distinct_entries(entries).len();
    if available < required {
        return Err(RaceError::PoolExhausted {
            pool,
            available,
            required,
        });
    }
    Ok(())
}
