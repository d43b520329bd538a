//! Race schedule construction.
//!
//! A schedule is one round per configured distance. Each round draws its
//! horses from the full roster independently, so a horse can run in several
//! rounds but never twice in the same one.

use std::sync::Arc;

use rand::seq::index;
use rand::Rng;

use super::config::RaceConfig;
use super::error::RaceError;
use super::horse::Horse;

/// One race event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    /// 1-based position in the schedule
    pub round_number: u32,

    /// Distance in meters
    pub distance: u32,

    /// Competing horses, in draw order
    pub horses: Vec<Arc<Horse>>,
}

impl Round {
    pub fn new(round_number: u32, distance: u32, horses: Vec<Arc<Horse>>) -> Self {
        Self {
            round_number,
            distance,
            horses,
        }
    }

    /// Ids of the competing horses, in draw order.
    pub fn horse_ids(&self) -> Vec<u32> {
        self.horses.iter().map(|h| h.id).collect()
    }

    /// Check if a horse runs in this round.
    pub fn has_horse(&self, horse_id: u32) -> bool {
        self.horses.iter().any(|h| h.id == horse_id)
    }

    pub fn horse_count(&self) -> usize {
        self.horses.len()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let horses: Vec<serde_json::Value> = self.horses.iter().map(|h| h.to_json()).collect();

        serde_json::json!({
            "roundNumber": self.round_number,
            "distance": self.distance,
            "horses": horses
        })
    }
}

/// Build a schedule from a full roster.
///
/// Round `i` takes `config.distances[i]` and `config.round_size` horses
/// sampled without replacement from `roster`.
pub fn build_schedule<R: Rng + ?Sized>(
    roster: &[Arc<Horse>],
    config: &RaceConfig,
    rng: &mut R,
) -> Result<Vec<Round>, RaceError> {
    if roster.len() != config.roster_size {
        return Err(RaceError::InvalidScheduleState {
            expected: config.roster_size,
            actual: roster.len(),
        });
    }

    if config.round_size > roster.len() {
        return Err(RaceError::InvalidConfig(format!(
            "round_size {} exceeds roster of {}",
            config.round_size,
            roster.len()
        )));
    }

    let schedule = config
        .distances
        .iter()
        .enumerate()
        .map(|(i, &distance)| {
            let horses = index::sample(rng, roster.len(), config.round_size)
                .into_iter()
                .map(|idx| Arc::clone(&roster[idx]))
                .collect();
            Round::new(i as u32 + 1, distance, horses)
        })
        .collect();

    Ok(schedule)
}
