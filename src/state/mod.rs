//! State management module for horse racing.
//!
//! - `config` - Distances, name/color pools, sizing and transition timing
//! - `horse` - Horse type and roster generation
//! - `schedule` - Rounds and schedule construction
//! - `race` - Race status, results and the session state struct
//! - `controller` - The controller that owns the state and drives the race
//! - `error` - Error type shared by the above
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                            RaceController                            │
//! │                                                                      │
//! │  RaceConfig ──▶ generate_roster ──▶ build_schedule ──▶ RaceState     │
//! │                  (20 horses)         (6 rounds x 10)     │           │
//! │                                                          ▼           │
//! │  actions: generate_program, start_race, pause_race, finish_round     │
//! │  queries: horses, race_schedule, is_race_complete, to_json           │
//! │                                                                      │
//! │  PendingTransition ──(poll_transition)──▶ status = racing            │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod horse;
pub mod race;
pub mod schedule;

// Re-export commonly used types
pub use config::{
    RaceConfig, ResumePolicy, DEFAULT_ROSTER_SIZE, DEFAULT_ROUND_SIZE, DEFAULT_TRANSITION_DELAY,
    HORSE_COLORS, HORSE_NAMES, ROUND_DISTANCES,
};
pub use controller::RaceController;
pub use error::RaceError;
pub use horse::{generate_roster, Horse, Roster, MAX_CONDITION, MIN_CONDITION};
pub use race::{PendingTransition, Placing, RaceResult, RaceState, RaceStatus};
pub use schedule::{build_schedule, Round};
