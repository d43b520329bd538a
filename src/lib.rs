//! Horse Race State Library
//!
//! This crate provides the state and control logic for a turn-based horse
//! racing simulation.
//!
//! # Overview
//!
//! - **Roster Generation** - A fixed-size roster of horses with unique names,
//!   unique colors and random condition scores.
//!
//! - **Schedule Building** - One round per canonical distance, each with a
//!   random subset of the roster.
//!
//! - **Race Control** - A small status state machine (idle, racing, paused,
//!   transitioning) that starts, pauses and advances rounds and stores the
//!   results reported by the race simulation.
//!
//! # Design Principles
//!
//! 1. **One writer** - All state lives in a `RaceController`; actions are its
//!    public methods and mutations are private.
//!
//! 2. **No partial commits** - Fallible work happens before the first write.
//!
//! 3. **No rendering, no timers** - The host polls the controller to fire the
//!    delayed start of the next round.
//!
//! 4. **Serialization-ready** - State snapshots convert to JSON for the UI.
//!
//! # Example
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use horse_race_state::{Placing, RaceConfig, RaceController, RaceResult, RaceStatus};
//!
//! let mut race = RaceController::with_seed(RaceConfig::default(), 7).unwrap();
//! race.generate_program().unwrap();
//! assert_eq!(race.race_schedule().len(), 6);
//!
//! race.start_race();
//! assert_eq!(race.race_status(), RaceStatus::Racing);
//!
//! // The simulation reports the finishing order
//! let round = race.current_round().unwrap().clone();
//! let winner = &round.horses[0];
//! race.record_result(RaceResult::new(
//!     round.round_number,
//!     vec![Placing::new(1, winner.id, winner.name.clone())],
//! ));
//!
//! let now = Instant::now();
//! race.finish_round_at(now);
//! assert_eq!(race.race_status(), RaceStatus::Transitioning);
//!
//! race.poll_transition(now + Duration::from_millis(100));
//! assert_eq!(race.race_status(), RaceStatus::Racing);
//! assert_eq!(race.current_round_index(), 1);
//! ```

pub mod state;

// Re-export everything from state module at crate root
pub use state::*;
