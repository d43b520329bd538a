//! Race progression data.
//!
//! # Status Diagram
//!
//! ```text
//!              start                  pause
//!   ┌──────┐ ─────────▶ ┌────────┐ ─────────▶ ┌────────┐
//!   │ Idle │            │ Racing │            │ Paused │
//!   └──────┘ ◀─┐        └────────┘ ◀───────── └────────┘
//!              │           │   ▲      start
//!              │ last      │   │ delay
//!              │ round     │   │ elapsed
//!              │   finish_round│
//!              │           ▼   │
//!              │     ┌───────────────┐
//!              └──── │ Transitioning │
//!                    └───────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use serde::Serialize;

use super::horse::Roster;
use super::schedule::Round;

/// Race status state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RaceStatus {
    /// No round running
    #[default]
    Idle,
    /// A round is running
    Racing,
    /// Stopped by the user mid-round
    Paused,
    /// Between rounds, waiting for the next one to start
    Transitioning,
}

impl RaceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Racing => "racing",
            Self::Paused => "paused",
            Self::Transitioning => "transitioning",
        }
    }

    pub fn is_racing(&self) -> bool {
        matches!(self, Self::Racing)
    }
}

impl fmt::Display for RaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A horse's finishing place in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placing {
    pub position: u32,
    pub id: u32,
    pub name: String,
}

impl Placing {
    pub fn new(position: u32, id: u32, name: impl Into<String>) -> Self {
        Self {
            position,
            id,
            name: name.into(),
        }
    }
}

/// Finishing order for one round, as reported by the race simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceResult {
    pub round_number: u32,
    pub results: Vec<Placing>,
}

impl RaceResult {
    pub fn new(round_number: u32, results: Vec<Placing>) -> Self {
        Self {
            round_number,
            results,
        }
    }

    /// The horse placed first, if any.
    pub fn winner(&self) -> Option<&Placing> {
        self.results.iter().min_by_key(|p| p.position)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let results: Vec<serde_json::Value> = self
            .results
            .iter()
            .map(|p| serde_json::json!({"position": p.position, "id": p.id, "name": p.name}))
            .collect();

        serde_json::json!({
            "roundNumber": self.round_number,
            "results": results
        })
    }
}

/// A scheduled `transitioning -> racing` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransition {
    /// Round that starts racing when this fires
    pub round_number: u32,
    pub due_at: Instant,
}

impl PendingTransition {
    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.due_at
    }
}

/// Session race state.
///
/// `current_round_index` stays within `[0, race_schedule.len()]`; at the
/// upper bound the race is complete and `current_round` is `None`.
#[derive(Debug, Clone, Default)]
pub struct RaceState {
    /// Empty or a full roster
    pub horses: Roster,

    /// Empty or one round per configured distance
    pub race_schedule: Vec<Round>,

    pub current_round: Option<Round>,

    pub race_status: RaceStatus,

    /// Results in the order they were recorded
    pub race_results: Vec<RaceResult>,

    /// Index into `race_schedule` of the current/next round
    pub current_round_index: usize,

    pub race_started: bool,

    pub race_finished: bool,

    /// Horse id to progress along the track
    pub current_positions: BTreeMap<u32, f64>,

    /// Seconds elapsed in the current round
    pub elapsed_time: f64,

    /// When the current program was generated
    pub program_generated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl RaceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if every scheduled round has been run.
    pub fn is_complete(&self) -> bool {
        self.current_round_index >= self.race_schedule.len()
    }

    /// Convert to a JSON snapshot for the UI.
    pub fn to_json(&self) -> serde_json::Value {
        let horses: Vec<serde_json::Value> = self.horses.iter().map(|h| h.to_json()).collect();
        let schedule: Vec<serde_json::Value> =
            self.race_schedule.iter().map(|r| r.to_json()).collect();
        let results: Vec<serde_json::Value> =
            self.race_results.iter().map(|r| r.to_json()).collect();
        let positions: serde_json::Map<String, serde_json::Value> = self
            .current_positions
            .iter()
            .map(|(id, progress)| (id.to_string(), serde_json::json!(progress)))
            .collect();

        serde_json::json!({
            "horses": horses,
            "raceSchedule": schedule,
            "currentRound": self.current_round.as_ref().map(|r| r.to_json()),
            "raceStatus": self.race_status.as_str(),
            "raceResults": results,
            "currentRoundIndex": self.current_round_index,
            "raceStarted": self.race_started,
            "raceFinished": self.race_finished,
            "currentPositions": positions,
            "elapsedTime": self.elapsed_time,
            "isRaceComplete": self.is_complete(),
            "programGeneratedAt": self.program_generated_at.map(|t| t.to_rfc3339())
        })
    }
}
