//! Race controller.
//!
//! Owns the session `RaceState` and is its only writer. Public methods are
//! the actions a host UI triggers; the private `set_*`/`clear_*` methods are
//! the mutations those actions commit, each one a single synchronous write.
//!
//! The one deferred step is the `transitioning -> racing` hop after a round
//! finishes. It is stored as a `PendingTransition` deadline and fires when
//! the host calls `poll_transition`/`tick` after the deadline has passed.

use std::sync::Arc;
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use super::config::{RaceConfig, ResumePolicy};
use super::error::RaceError;
use super::horse::{generate_roster, Horse, Roster};
use super::race::{PendingTransition, RaceResult, RaceState, RaceStatus};
use super::schedule::{build_schedule, Round};

/// Single-session race controller.
#[derive(Debug)]
pub struct RaceController {
    config: RaceConfig,
    state: RaceState,
    rng: SmallRng,
    pending: Option<PendingTransition>,
}

impl Default for RaceController {
    fn default() -> Self {
        Self::from_parts(RaceConfig::default(), SmallRng::from_entropy())
    }
}

impl RaceController {
    /// Create a controller with an entropy-seeded RNG.
    pub fn new(config: RaceConfig) -> Result<Self, RaceError> {
        config.validate()?;
        Ok(Self::from_parts(config, SmallRng::from_entropy()))
    }

    /// Create a controller whose rosters and schedules are reproducible.
    pub fn with_seed(config: RaceConfig, seed: u64) -> Result<Self, RaceError> {
        config.validate()?;
        Ok(Self::from_parts(config, SmallRng::seed_from_u64(seed)))
    }

    fn from_parts(config: RaceConfig, rng: SmallRng) -> Self {
        Self {
            config,
            state: RaceState::new(),
            rng,
            pending: None,
        }
    }

    // Actions

    /// Replace the roster with a freshly generated one.
    pub fn generate_horses(&mut self) -> Result<(), RaceError> {
        let roster = generate_roster(&self.config, &mut self.rng).map_err(|e| {
            warn!(error = %e, "roster generation failed");
            e
        })?;
        self.set_horses(roster);
        Ok(())
    }

    /// Build a new program: fresh roster, fresh schedule, progress reset.
    ///
    /// The roster and schedule are built before anything is committed, so a
    /// failure leaves the previous program in place.
    pub fn generate_program(&mut self) -> Result<(), RaceError> {
        let (roster, schedule) = self.build_program().map_err(|e| {
            warn!(error = %e, "program generation failed");
            e
        })?;

        self.cancel_pending();
        self.reset_progress();
        self.mark_program_generated();
        self.set_horses(roster);
        self.set_race_schedule(schedule);
        self.clear_race_results();

        info!(
            rounds = self.state.race_schedule.len(),
            horses = self.state.horses.len(),
            "program generated"
        );
        Ok(())
    }

    fn build_program(&mut self) -> Result<(Roster, Vec<Round>), RaceError> {
        let roster = generate_roster(&self.config, &mut self.rng)?;
        let schedule = build_schedule(&roster, &self.config, &mut self.rng)?;
        Ok((roster, schedule))
    }

    /// Start (or resume) the round at the current index.
    ///
    /// Does nothing while already racing. Once the schedule is exhausted it
    /// clears results and rewinds the index instead of starting.
    pub fn start_race(&mut self) {
        if self.state.race_status.is_racing() {
            debug!("start ignored: already racing");
            return;
        }

        if self.state.is_complete() {
            debug!(
                index = self.state.current_round_index,
                "start on exhausted schedule, rewinding"
            );
            self.clear_race_results();
            return;
        }

        self.cancel_pending();
        let round = self.state.race_schedule[self.state.current_round_index].clone();
        self.set_current_round(Some(round));
        self.set_race_status(RaceStatus::Racing);
    }

    pub fn pause_race(&mut self) {
        self.cancel_pending();
        self.set_race_status(RaceStatus::Paused);
    }

    /// Finish the current round, using the current instant for the delay.
    pub fn finish_round(&mut self) {
        self.finish_round_at(Instant::now());
    }

    /// Finish the current round as of `now`.
    ///
    /// Moves to the next round and schedules it to start racing after the
    /// configured delay, or goes idle when no rounds remain.
    pub fn finish_round_at(&mut self, now: Instant) {
        self.set_race_status(RaceStatus::Transitioning);
        self.increment_round_index();

        let index = self.state.current_round_index;
        match self.state.race_schedule.get(index).cloned() {
            Some(round) => {
                let pending = PendingTransition {
                    round_number: round.round_number,
                    due_at: now + self.config.transition_delay(),
                };
                self.set_current_round(Some(round));
                debug!(round = pending.round_number, "next round scheduled");
                self.pending = Some(pending);
            }
            None => {
                self.cancel_pending();
                self.set_race_status(RaceStatus::Idle);
                self.set_current_round(None);
                info!(results = self.state.race_results.len(), "race complete");
            }
        }
    }

    /// Fire the pending transition if it is due as of `now`.
    ///
    /// Returns whether it fired. A fired transition sets `racing` whatever
    /// the status is at that moment.
    pub fn poll_transition(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(pending) if pending.is_due(now) => {
                self.pending = None;
                if self.state.race_status != RaceStatus::Transitioning {
                    debug!(
                        status = %self.state.race_status,
                        "pending transition overrides current status"
                    );
                }
                self.set_race_status(RaceStatus::Racing);
                true
            }
            _ => false,
        }
    }

    pub fn tick(&mut self) -> bool {
        self.poll_transition(Instant::now())
    }

    /// Append a round's finishing order. No ordering checks are made.
    pub fn record_result(&mut self, result: RaceResult) {
        self.push_race_result(result);
    }

    /// Drop all results and rewind to the first round.
    pub fn clear_results(&mut self) {
        self.clear_race_results();
    }

    /// Zero race progress, keeping status, schedule and roster.
    pub fn reset_race_state(&mut self) {
        self.reset_progress();
    }

    /// Record a horse's progress along the track.
    pub fn set_position(&mut self, horse_id: u32, progress: f64) {
        self.state.current_positions.insert(horse_id, progress);
    }

    pub fn advance_elapsed(&mut self, seconds: f64) {
        self.state.elapsed_time += seconds;
    }

    pub fn mark_started(&mut self) {
        self.state.race_started = true;
    }

    pub fn mark_finished(&mut self) {
        self.state.race_finished = true;
    }

    // Queries

    pub fn horses(&self) -> &[Arc<Horse>] {
        &self.state.horses
    }

    pub fn race_schedule(&self) -> &[Round] {
        &self.state.race_schedule
    }

    /// Check if the round index has run past the schedule.
    pub fn is_race_complete(&self) -> bool {
        self.state.is_complete()
    }

    pub fn state(&self) -> &RaceState {
        &self.state
    }

    pub fn current_round(&self) -> Option<&Round> {
        self.state.current_round.as_ref()
    }

    pub fn race_status(&self) -> RaceStatus {
        self.state.race_status
    }

    pub fn race_results(&self) -> &[RaceResult] {
        &self.state.race_results
    }

    pub fn current_round_index(&self) -> usize {
        self.state.current_round_index
    }

    pub fn pending_transition(&self) -> Option<&PendingTransition> {
        self.pending.as_ref()
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.state.to_json()
    }

    // Mutations

    fn set_horses(&mut self, horses: Roster) {
        debug!(count = horses.len(), "horses set");
        self.state.horses = horses;
    }

    fn set_race_schedule(&mut self, schedule: Vec<Round>) {
        debug!(rounds = schedule.len(), "schedule set");
        self.state.race_schedule = schedule;
    }

    fn set_current_round(&mut self, round: Option<Round>) {
        self.state.current_round = round;
    }

    fn set_race_status(&mut self, status: RaceStatus) {
        debug!(from = %self.state.race_status, to = %status, "race status");
        self.state.race_status = status;
    }

    fn push_race_result(&mut self, result: RaceResult) {
        debug!(round = result.round_number, "result recorded");
        self.state.race_results.push(result);
    }

    fn clear_race_results(&mut self) {
        self.state.race_results.clear();
        self.state.current_round_index = 0;
    }

    /// Saturates at the schedule length.
    fn increment_round_index(&mut self) {
        let len = self.state.race_schedule.len();
        self.state.current_round_index = (self.state.current_round_index + 1).min(len);
    }

    fn reset_progress(&mut self) {
        self.state.race_started = false;
        self.state.race_finished = false;
        self.state.current_positions.clear();
        self.state.race_results.clear();
        self.state.elapsed_time = 0.0;
        self.state.current_round = None;
        self.state.current_round_index = 0;
    }

    fn mark_program_generated(&mut self) {
        self.set_race_status(RaceStatus::Idle);
        self.state.program_generated_at = Some(chrono::Utc::now());
    }

    fn cancel_pending(&mut self) {
        if self.config.resume_policy == ResumePolicy::Legacy {
            return;
        }
        if let Some(pending) = self.pending.take() {
            debug!(round = pending.round_number, "pending transition cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::race::Placing;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::time::Duration;

    fn make_controller() -> RaceController {
        RaceController::with_seed(RaceConfig::default(), 42).unwrap()
    }

    fn make_program() -> RaceController {
        let mut controller = make_controller();
        controller.generate_program().unwrap();
        controller
    }

    fn make_round(round_number: u32, distance: u32) -> Round {
        Round::new(round_number, distance, Vec::new())
    }

    fn make_result(round_number: u32) -> RaceResult {
        RaceResult::new(
            round_number,
            vec![
                Placing::new(1, 1, "Thunder Bolt"),
                Placing::new(2, 2, "Silver Storm"),
            ],
        )
    }

    #[test]
    fn test_generate_horses() {
        let mut controller = make_controller();
        controller.generate_horses().unwrap();

        let horses = controller.horses();
        assert_eq!(horses.len(), 20);

        let names: HashSet<_> = horses.iter().map(|h| h.name.as_str()).collect();
        let colors: HashSet<_> = horses.iter().map(|h| h.color.as_str()).collect();
        assert_eq!(names.len(), 20);
        assert_eq!(colors.len(), 20);
        assert!(horses.iter().all(|h| (1..=100).contains(&h.condition)));

        // Only the roster changes
        assert!(controller.race_schedule().is_empty());
    }

    #[test]
    fn test_generate_program() {
        let controller = make_program();

        assert_eq!(controller.race_status(), RaceStatus::Idle);
        assert_eq!(controller.race_schedule().len(), 6);
        assert_eq!(controller.current_round_index(), 0);
        assert!(controller.race_results().is_empty());
        assert!(controller.current_round().is_none());
        assert!(!controller.is_race_complete());
        assert!(controller.state().program_generated_at.is_some());

        for (i, round) in controller.race_schedule().iter().enumerate() {
            assert_eq!(round.round_number, i as u32 + 1);
            assert_eq!(round.distance, controller.config().distances[i]);
            assert_eq!(round.horse_count(), 10);
            // Rounds reference the committed roster
            for horse in &round.horses {
                assert!(controller.horses().iter().any(|h| Arc::ptr_eq(h, horse)));
            }
        }
    }

    #[test]
    fn test_generate_program_resets_previous_run() {
        let mut controller = make_program();
        let old_roster = controller.horses().to_vec();

        controller.start_race();
        controller.set_position(3, 250.0);
        controller.advance_elapsed(12.5);
        controller.mark_started();
        controller.record_result(make_result(1));
        controller.finish_round_at(Instant::now());
        assert_eq!(controller.current_round_index(), 1);

        controller.generate_program().unwrap();

        let state = controller.state();
        assert_eq!(state.race_status, RaceStatus::Idle);
        assert!(state.race_results.is_empty());
        assert_eq!(state.current_round_index, 0);
        assert!(state.current_positions.is_empty());
        assert_eq!(state.elapsed_time, 0.0);
        assert!(!state.race_started);
        assert!(state.current_round.is_none());
        assert!(controller.pending_transition().is_none());
        assert!(!Arc::ptr_eq(&old_roster[0], &controller.horses()[0]));
    }

    #[test]
    fn test_generate_program_failure_keeps_state() {
        let mut controller = make_program();
        controller.start_race();
        controller.record_result(make_result(1));
        let before = controller.to_json();

        controller.config.horse_names.truncate(5);
        let err = controller.generate_program().unwrap_err();

        assert!(matches!(err, RaceError::PoolExhausted { pool: "name", .. }));
        assert_eq!(controller.to_json(), before);
        assert!(matches!(
            controller.generate_horses(),
            Err(RaceError::PoolExhausted { .. })
        ));
        assert_eq!(controller.to_json(), before);
    }

    #[test]
    fn test_seeded_programs_reproducible() {
        let mut a = make_controller();
        let mut b = make_controller();
        a.generate_program().unwrap();
        b.generate_program().unwrap();

        let ids = |c: &RaceController| -> Vec<Vec<u32>> {
            c.race_schedule().iter().map(|r| r.horse_ids()).collect()
        };
        assert_eq!(ids(&a), ids(&b));
        assert_eq!(a.horses(), b.horses());
    }

    #[test]
    fn test_start_race() {
        let mut controller = make_controller();
        controller.state.race_schedule = vec![make_round(1, 1000), make_round(2, 1200)];

        controller.start_race();

        assert_eq!(controller.race_status(), RaceStatus::Racing);
        assert_eq!(controller.current_round(), Some(&make_round(1, 1000)));
    }

    #[test]
    fn test_start_while_racing_is_noop() {
        let mut controller = make_program();
        controller.start_race();
        controller.record_result(make_result(1));
        controller.state.current_round_index = 2;
        let before = controller.to_json();

        controller.start_race();

        assert_eq!(controller.to_json(), before);
    }

    #[test]
    fn test_start_on_exhausted_schedule_rewinds() {
        let mut controller = make_controller();
        controller.state.race_schedule = vec![make_round(1, 1000)];
        controller.state.current_round_index = 1;
        controller.record_result(make_result(1));

        controller.start_race();

        assert_eq!(controller.race_status(), RaceStatus::Idle);
        assert_eq!(controller.current_round_index(), 0);
        assert!(controller.race_results().is_empty());
        assert!(controller.current_round().is_none());

        // The next start runs the first round again
        controller.start_race();
        assert_eq!(controller.race_status(), RaceStatus::Racing);
        assert_eq!(controller.current_round().map(|r| r.round_number), Some(1));
    }

    #[test]
    fn test_pause_from_any_status() {
        let mut controller = make_controller();

        controller.pause_race();
        assert_eq!(controller.race_status(), RaceStatus::Paused);

        controller.state.race_status = RaceStatus::Transitioning;
        controller.pause_race();
        assert_eq!(controller.race_status(), RaceStatus::Paused);
    }

    #[test]
    fn test_resume_after_pause() {
        let mut controller = make_program();
        controller.start_race();
        controller.pause_race();

        controller.start_race();
        assert_eq!(controller.race_status(), RaceStatus::Racing);
        assert_eq!(controller.current_round().map(|r| r.round_number), Some(1));
    }

    #[test]
    fn test_finish_round_schedules_next() {
        let mut controller = make_program();
        controller.start_race();
        let now = Instant::now();

        controller.finish_round_at(now);

        assert_eq!(controller.race_status(), RaceStatus::Transitioning);
        assert_eq!(controller.current_round_index(), 1);
        assert_eq!(controller.current_round().map(|r| r.round_number), Some(2));

        let pending = *controller.pending_transition().unwrap();
        assert_eq!(pending.round_number, 2);
        assert_eq!(pending.due_at, now + Duration::from_millis(100));

        // Not due yet
        assert!(!controller.poll_transition(now + Duration::from_millis(99)));
        assert_eq!(controller.race_status(), RaceStatus::Transitioning);

        assert!(controller.poll_transition(now + Duration::from_millis(100)));
        assert_eq!(controller.race_status(), RaceStatus::Racing);
        assert!(controller.pending_transition().is_none());
        assert!(!controller.poll_transition(now + Duration::from_secs(1)));
    }

    #[test]
    fn test_finish_round_single_round_completes() {
        let mut controller = make_controller();
        controller.state.race_schedule = vec![make_round(1, 1000)];
        controller.start_race();

        controller.finish_round();

        assert_eq!(controller.current_round_index(), 1);
        assert_eq!(controller.race_status(), RaceStatus::Idle);
        assert!(controller.current_round().is_none());
        assert!(controller.is_race_complete());
        assert!(controller.pending_transition().is_none());
    }

    #[test]
    fn test_finish_round_on_exhausted_schedule() {
        let mut controller = make_controller();
        controller.state.race_schedule = vec![make_round(1, 1000)];
        controller.state.current_round_index = 1;
        controller.state.current_round = Some(make_round(1, 1000));

        controller.finish_round();

        assert_eq!(controller.race_status(), RaceStatus::Idle);
        assert!(controller.current_round().is_none());
        // Index never runs past the schedule
        assert_eq!(controller.current_round_index(), 1);
    }

    #[test]
    fn test_full_program_run() {
        let mut controller = make_program();
        let mut now = Instant::now();

        controller.start_race();
        for round in 1..=6 {
            assert_eq!(controller.race_status(), RaceStatus::Racing);
            assert_eq!(
                controller.current_round().map(|r| r.round_number),
                Some(round)
            );
            controller.record_result(make_result(round));
            controller.finish_round_at(now);
            now += Duration::from_millis(100);
            controller.poll_transition(now);
        }

        assert!(controller.is_race_complete());
        assert_eq!(controller.race_status(), RaceStatus::Idle);
        assert_eq!(controller.race_results().len(), 6);

        // Starting again rewinds rather than racing
        controller.start_race();
        assert_eq!(controller.race_status(), RaceStatus::Idle);
        assert!(controller.race_results().is_empty());
        assert!(!controller.is_race_complete());
    }

    #[test]
    fn test_pause_cancels_pending_transition() {
        let mut controller = make_program();
        controller.start_race();
        let now = Instant::now();
        controller.finish_round_at(now);

        controller.pause_race();

        assert!(controller.pending_transition().is_none());
        assert!(!controller.poll_transition(now + Duration::from_secs(1)));
        assert_eq!(controller.race_status(), RaceStatus::Paused);
    }

    #[test]
    fn test_legacy_policy_overwrites_pause() {
        let config = RaceConfig::default().with_resume_policy(ResumePolicy::Legacy);
        let mut controller = RaceController::with_seed(config, 1).unwrap();
        controller.generate_program().unwrap();
        controller.start_race();
        let now = Instant::now();
        controller.finish_round_at(now);

        controller.pause_race();
        assert_eq!(controller.race_status(), RaceStatus::Paused);
        assert!(controller.pending_transition().is_some());

        assert!(controller.poll_transition(now + Duration::from_millis(100)));
        assert_eq!(controller.race_status(), RaceStatus::Racing);
    }

    #[test]
    fn test_legacy_policy_survives_new_program() {
        let config = RaceConfig::default().with_resume_policy(ResumePolicy::Legacy);
        let mut controller = RaceController::with_seed(config, 1).unwrap();
        controller.generate_program().unwrap();
        controller.start_race();
        let now = Instant::now();
        controller.finish_round_at(now);

        controller.generate_program().unwrap();
        assert_eq!(controller.race_status(), RaceStatus::Idle);

        assert!(controller.poll_transition(now + Duration::from_millis(100)));
        assert_eq!(controller.race_status(), RaceStatus::Racing);
    }

    #[test]
    fn test_legacy_policy_overwrites_completed_race() {
        let config = RaceConfig::default()
            .with_distances(vec![1000, 1200])
            .with_resume_policy(ResumePolicy::Legacy);
        let mut controller = RaceController::with_seed(config, 1).unwrap();
        controller.generate_program().unwrap();
        controller.start_race();
        let now = Instant::now();

        controller.finish_round_at(now);
        controller.finish_round_at(now);
        assert_eq!(controller.race_status(), RaceStatus::Idle);
        assert!(controller.is_race_complete());
        assert!(controller.pending_transition().is_some());

        assert!(controller.poll_transition(now + Duration::from_millis(100)));
        assert_eq!(controller.race_status(), RaceStatus::Racing);
        assert!(controller.current_round().is_none());
    }

    #[test]
    fn test_last_round_cancels_pending_transition() {
        let config = RaceConfig::default().with_distances(vec![1000, 1200]);
        let mut controller = RaceController::with_seed(config, 1).unwrap();
        controller.generate_program().unwrap();
        controller.start_race();
        let now = Instant::now();

        controller.finish_round_at(now);
        controller.finish_round_at(now);

        assert!(controller.pending_transition().is_none());
        assert!(!controller.poll_transition(now + Duration::from_millis(100)));
        assert_eq!(controller.race_status(), RaceStatus::Idle);
    }

    #[test]
    fn test_record_and_clear_results() {
        let mut controller = make_controller();
        controller.record_result(make_result(2));
        controller.record_result(make_result(1));

        assert_eq!(
            controller
                .race_results()
                .iter()
                .map(|r| r.round_number)
                .collect::<Vec<_>>(),
            vec![2, 1]
        );

        controller.state.current_round_index = 2;
        controller.clear_results();
        assert!(controller.race_results().is_empty());
        assert_eq!(controller.current_round_index(), 0);
    }

    #[test]
    fn test_reset_race_state() {
        let mut controller = make_program();
        controller.start_race();
        controller.mark_started();
        controller.mark_finished();
        controller.set_position(1, 50.0);
        controller.set_position(2, 75.0);
        controller.record_result(make_result(1));
        controller.advance_elapsed(1000.0);
        controller.state.current_round_index = 2;

        controller.reset_race_state();

        let state = controller.state();
        assert!(!state.race_started);
        assert!(!state.race_finished);
        assert!(state.current_positions.is_empty());
        assert!(state.race_results.is_empty());
        assert_eq!(state.elapsed_time, 0.0);
        assert!(state.current_round.is_none());
        assert_eq!(state.current_round_index, 0);

        // Left alone
        assert_eq!(state.race_status, RaceStatus::Racing);
        assert_eq!(state.race_schedule.len(), 6);
        assert_eq!(state.horses.len(), 20);
    }

    #[test]
    fn test_mark_program_generated_sets_idle() {
        let mut controller = make_controller();
        controller.state.race_status = RaceStatus::Racing;

        controller.mark_program_generated();

        assert_eq!(controller.race_status(), RaceStatus::Idle);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = RaceConfig {
            colors: Vec::new(),
            ..RaceConfig::default()
        };
        assert!(matches!(
            RaceController::new(config),
            Err(RaceError::PoolExhausted { pool: "color", .. })
        ));
    }

    #[test]
    fn test_snapshot_json() {
        let mut controller = make_program();
        controller.start_race();

        let json = controller.to_json();
        assert_eq!(json["raceStatus"], "racing");
        assert_eq!(json["horses"].as_array().map(|a| a.len()), Some(20));
        assert_eq!(json["raceSchedule"].as_array().map(|a| a.len()), Some(6));
        assert_eq!(json["currentRound"]["roundNumber"], 1);
        assert_eq!(json["isRaceComplete"], false);

        let generated_at = json["programGeneratedAt"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(generated_at).is_ok());
    }

    proptest! {
        #[test]
        fn prop_race_complete_iff_index_past_schedule(len in 0usize..12, index in 0usize..20) {
            let mut controller = make_controller();
            controller.state.race_schedule = (1..=len as u32).map(|n| make_round(n, 1000)).collect();
            controller.state.current_round_index = index;

            prop_assert_eq!(controller.is_race_complete(), index >= len);
        }

        #[test]
        fn prop_index_stays_within_schedule(len in 0usize..8, finishes in 0usize..16) {
            let mut controller = make_controller();
            controller.state.race_schedule = (1..=len as u32).map(|n| make_round(n, 1000)).collect();

            for _ in 0..finishes {
                controller.finish_round();
                prop_assert!(controller.current_round_index() <= len);
            }
            if controller.is_race_complete() {
                prop_assert!(controller.current_round().is_none());
            }
        }
    }
}
