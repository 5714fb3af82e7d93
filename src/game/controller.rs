//! Round state machine
//!
//! `Idle -> Playback -> AwaitingInput -> Evaluating -> Idle`
//!
//! The controller owns every piece of mutable game state. Time only moves when
//! the caller advances it, so playback and feedback timers are deterministic.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::event::{EventSink, GameEvent};
use super::sequence::{Sequence, generate};
use super::tile::{Tile, TileSet};
use super::timeline::{ScheduledAction, TimerAction, TimerId, Timeline};
use crate::settings::{Settings, SettingsError};

/// Current phase of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Phase {
    /// Waiting for the start control
    #[default]
    Idle,
    /// Sequence is being shown; input disabled
    Playback,
    /// Player is reproducing the sequence
    AwaitingInput,
    /// Judging a completed input log
    Evaluating,
}

/// Per-round counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoundState {
    /// Length of the sequence for the current (or next) round
    pub target_length: usize,
    /// Inputs judged so far this round
    pub position: usize,
    pub correct_count: usize,
    pub phase: Phase,
}

/// Session score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GameState {
    /// Consecutive rounds won
    pub streak: u32,
    /// Highest streak this session
    pub best_streak: u32,
}

pub struct RoundController {
    settings: Settings,
    tiles: TileSet,
    seed: u64,
    rng: Pcg32,
    round: RoundState,
    game: GameState,
    sequence: Sequence,
    inputs: Vec<Tile>,
    timeline: Timeline,
    /// Pending feedback clear per tile; a newer highlight supersedes it
    feedback_clears: Vec<(Tile, TimerId)>,
    rounds_started: u32,
}

impl RoundController {
    /// Create a controller with validated settings and a run seed
    pub fn new(settings: Settings, seed: u64) -> Result<Self, SettingsError> {
        settings.validate()?;
        let tiles = settings.tile_set().map_err(|_| SettingsError::NoTiles)?;
        Ok(Self {
            round: RoundState {
                target_length: settings.initial_length,
                position: 0,
                correct_count: 0,
                phase: Phase::Idle,
            },
            settings,
            tiles,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            game: GameState::default(),
            sequence: Vec::new(),
            inputs: Vec::new(),
            timeline: Timeline::new(),
            feedback_clears: Vec::new(),
            rounds_started: 0,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn tiles(&self) -> &TileSet {
        &self.tiles
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn round(&self) -> RoundState {
        self.round
    }

    pub fn game(&self) -> GameState {
        self.game
    }

    pub fn phase(&self) -> Phase {
        self.round.phase
    }

    /// Sequence of the running round (empty while idle)
    pub fn sequence(&self) -> &[Tile] {
        &self.sequence
    }

    /// Tiles activated so far in the current (or last) round
    pub fn inputs(&self) -> &[Tile] {
        &self.inputs
    }

    pub fn now(&self) -> u64 {
        self.timeline.now()
    }

    pub fn pending_timers(&self) -> impl Iterator<Item = ScheduledAction> + '_ {
        self.timeline.pending()
    }

    /// Time of the next scheduled timer, if any
    pub fn next_due(&self) -> Option<u64> {
        self.timeline.next_due()
    }

    /// Begin a new round. Returns false (and does nothing) unless idle.
    pub fn start_round(&mut self, sink: &mut impl EventSink) -> bool {
        if self.round.phase != Phase::Idle {
            log::debug!("Start ignored in phase {:?}", self.round.phase);
            return false;
        }

        let sequence = match generate(self.round.target_length, &self.tiles, &mut self.rng) {
            Ok(sequence) => sequence,
            Err(e) => {
                log::error!("Cannot start round: {}", e);
                return false;
            }
        };

        self.rounds_started += 1;
        log::info!(
            "Round {} started (length {}, streak {})",
            self.rounds_started,
            sequence.len(),
            self.game.streak
        );

        self.sequence = sequence;
        self.inputs.clear();
        self.round.position = 0;
        self.round.correct_count = 0;
        self.round.phase = Phase::Playback;
        sink.emit(GameEvent::StartDisabled);

        let slot_ms = self.settings.slot_ms;
        let highlight_ms = self.settings.highlight_ms;
        for (slot, &tile) in self.sequence.iter().enumerate() {
            let slot_start = (slot as u64).saturating_mul(slot_ms);
            self.timeline.schedule(slot_start, TimerAction::Highlight { slot, tile });
            self.timeline.schedule(
                slot_start.saturating_add(highlight_ms),
                TimerAction::Unhighlight { slot, tile },
            );
        }
        let playback_ms = (self.sequence.len() as u64).saturating_mul(slot_ms);
        self.timeline.schedule(playback_ms, TimerAction::EnableInput);

        true
    }

    /// Handle a tile activation. Returns false when input is not being accepted.
    pub fn activate(&mut self, tile: Tile, sink: &mut impl EventSink) -> bool {
        if self.round.phase != Phase::AwaitingInput {
            log::debug!("Activation of {} ignored in phase {:?}", tile, self.round.phase);
            return false;
        }

        self.inputs.push(tile);
        let expected = self.sequence.get(self.round.position).copied();
        if expected == Some(tile) {
            self.round.correct_count += 1;
            sink.emit(GameEvent::CorrectFeedback { tile });
        } else {
            log::debug!(
                "Miss at position {}: expected {:?}, got {}",
                self.round.position,
                expected,
                tile
            );
            sink.emit(GameEvent::IncorrectFeedback { tile });
        }
        // Misses still count toward the round; judging waits for a full log
        self.round.position += 1;
        self.cancel_feedback_clear(tile);
        let id = self
            .timeline
            .schedule(self.settings.feedback_ms, TimerAction::ClearFeedback { tile });
        self.feedback_clears.push((tile, id));

        if self.round.position >= self.round.target_length {
            self.round.phase = Phase::Evaluating;
            self.evaluate(sink);
        }
        true
    }

    /// Fire every timer due at or before `now_ms`
    pub fn advance_to(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        while let Some(scheduled) = self.timeline.pop_due(now_ms) {
            self.fire(scheduled.action, sink);
        }
        self.timeline.settle(now_ms);
    }

    pub fn advance_by(&mut self, dt_ms: u64, sink: &mut impl EventSink) {
        let target = self.timeline.now().saturating_add(dt_ms);
        self.advance_to(target, sink);
    }

    /// Start a fresh session: scores cleared, pending timers dropped
    pub fn reset_session(&mut self, sink: &mut impl EventSink) {
        self.timeline.cancel_all();
        self.feedback_clears.clear();
        self.game = GameState::default();
        self.round = RoundState {
            target_length: self.settings.initial_length,
            position: 0,
            correct_count: 0,
            phase: Phase::Idle,
        };
        self.sequence.clear();
        self.inputs.clear();
        self.rounds_started = 0;
        log::info!("Session reset");
        sink.emit(GameEvent::InputDisabled);
        sink.emit(GameEvent::StartEnabled);
    }

    fn fire(&mut self, action: TimerAction, sink: &mut impl EventSink) {
        match action {
            TimerAction::Highlight { slot, tile } => {
                self.cancel_feedback_clear(tile);
                sink.emit(GameEvent::Highlight { tile, slot })
            }
            TimerAction::Unhighlight { slot, tile } => {
                sink.emit(GameEvent::Unhighlight { tile, slot })
            }
            TimerAction::EnableInput => {
                if self.round.phase == Phase::Playback {
                    self.round.phase = Phase::AwaitingInput;
                    sink.emit(GameEvent::InputEnabled);
                }
            }
            TimerAction::ClearFeedback { tile } => {
                self.feedback_clears.retain(|&(t, _)| t != tile);
                sink.emit(GameEvent::FeedbackCleared { tile })
            }
        }
    }

    fn cancel_feedback_clear(&mut self, tile: Tile) {
        if let Some(index) = self.feedback_clears.iter().position(|&(t, _)| t == tile) {
            let (_, id) = self.feedback_clears.swap_remove(index);
            self.timeline.cancel(id);
        }
    }

    fn evaluate(&mut self, sink: &mut impl EventSink) {
        if self.round.correct_count == self.round.target_length {
            self.game.streak += 1;
            self.game.best_streak = self.game.best_streak.max(self.game.streak);
            self.round.target_length += 1;
            log::info!(
                "Round won (streak {}, best {}), next length {}",
                self.game.streak,
                self.game.best_streak,
                self.round.target_length
            );
            sink.emit(GameEvent::RoundWon {
                streak: self.game.streak,
                best_streak: self.game.best_streak,
            });
        } else {
            self.game.streak = 1;
            self.game.best_streak = self.game.best_streak.max(self.game.streak);
            self.round.target_length = self.settings.initial_length;
            log::info!(
                "Round lost ({}/{} correct)",
                self.round.correct_count,
                self.round.position
            );
            sink.emit(GameEvent::RoundLost);
        }

        self.sequence.clear();
        self.round.position = 0;
        self.round.correct_count = 0;
        self.round.phase = Phase::Idle;
        sink.emit(GameEvent::InputDisabled);
        sink.emit(GameEvent::StartEnabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn controller(seed: u64) -> RoundController {
        RoundController::new(Settings::default(), seed).unwrap()
    }

    /// Start a round and run playback to completion
    fn start_and_play(c: &mut RoundController) -> Vec<GameEvent> {
        let mut events = Vec::new();
        assert!(c.start_round(&mut events));
        let playback_ms = c.sequence().len() as u64 * c.settings().slot_ms;
        c.advance_by(playback_ms, &mut events);
        assert_eq!(c.phase(), Phase::AwaitingInput);
        events
    }

    fn wrong_tile(c: &RoundController, expected: Tile) -> Tile {
        c.tiles().iter().find(|&t| t != expected).unwrap()
    }

    fn win_round(c: &mut RoundController) -> Vec<GameEvent> {
        start_and_play(c);
        let mut events = Vec::new();
        for tile in c.sequence().to_vec() {
            c.activate(tile, &mut events);
        }
        events
    }

    #[test]
    fn test_fresh_controller() {
        let c = controller(1);
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.round().target_length, 3);
        assert_eq!(c.game(), GameState { streak: 0, best_streak: 0 });
        assert!(c.sequence().is_empty());
        assert_eq!(c.now(), 0);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = Settings {
            highlight_ms: 2000,
            ..Default::default()
        };
        assert!(RoundController::new(settings, 1).is_err());
    }

    #[test]
    fn test_playback_timing() {
        let mut c = controller(5);
        let mut events = Vec::new();
        c.start_round(&mut events);
        assert_eq!(events, vec![GameEvent::StartDisabled]);
        let seq = c.sequence().to_vec();
        assert_eq!(seq.len(), 3);

        let schedule: Vec<(u64, TimerAction)> =
            c.pending_timers().map(|s| (s.at_ms, s.action)).collect();
        assert_eq!(
            schedule,
            vec![
                (0, TimerAction::Highlight { slot: 0, tile: seq[0] }),
                (1000, TimerAction::Unhighlight { slot: 0, tile: seq[0] }),
                (1100, TimerAction::Highlight { slot: 1, tile: seq[1] }),
                (2100, TimerAction::Unhighlight { slot: 1, tile: seq[1] }),
                (2200, TimerAction::Highlight { slot: 2, tile: seq[2] }),
                (3200, TimerAction::Unhighlight { slot: 2, tile: seq[2] }),
                (3300, TimerAction::EnableInput),
            ]
        );

        // Input stays closed until the last slot has elapsed
        events.clear();
        c.advance_to(3299, &mut events);
        assert_eq!(c.phase(), Phase::Playback);
        assert!(!c.activate(seq[0], &mut events));
        assert!(!events.contains(&GameEvent::InputEnabled));
        assert_eq!(events.len(), 6);
        assert_eq!(events[0], GameEvent::Highlight { tile: seq[0], slot: 0 });
        assert_eq!(events[5], GameEvent::Unhighlight { tile: seq[2], slot: 2 });

        events.clear();
        c.advance_to(3300, &mut events);
        assert_eq!(events, vec![GameEvent::InputEnabled]);
        assert_eq!(c.phase(), Phase::AwaitingInput);
    }

    #[test]
    fn test_scenario_a_round_won() {
        let mut c = controller(11);
        win_round(&mut c);
        let before = c.game().streak;

        let events = win_round(&mut c);
        let seq_len = 4;
        assert_eq!(c.inputs().len(), seq_len);
        let correct = events
            .iter()
            .filter(|e| matches!(e, GameEvent::CorrectFeedback { .. }))
            .count();
        assert_eq!(correct, seq_len);
        assert_eq!(
            &events[events.len() - 3..],
            &[
                GameEvent::RoundWon { streak: before + 1, best_streak: before + 1 },
                GameEvent::InputDisabled,
                GameEvent::StartEnabled,
            ]
        );
        assert_eq!(c.round().target_length, 5);
        assert_eq!(c.phase(), Phase::Idle);
    }

    #[test]
    fn test_scenario_b_count_then_judge() {
        let mut c = controller(12);
        start_and_play(&mut c);
        let seq = c.sequence().to_vec();
        let miss = wrong_tile(&c, seq[1]);
        let mut events = Vec::new();

        assert!(c.activate(seq[0], &mut events));
        assert!(c.activate(miss, &mut events));
        assert_eq!(events[1], GameEvent::IncorrectFeedback { tile: miss });
        // Round keeps going after the miss
        assert_eq!(c.phase(), Phase::AwaitingInput);
        assert_eq!(c.round().position, 2);
        assert!(!events.contains(&GameEvent::RoundLost));

        assert!(c.activate(seq[2], &mut events));
        assert_eq!(
            events,
            vec![
                GameEvent::CorrectFeedback { tile: seq[0] },
                GameEvent::IncorrectFeedback { tile: miss },
                GameEvent::CorrectFeedback { tile: seq[2] },
                GameEvent::RoundLost,
                GameEvent::InputDisabled,
                GameEvent::StartEnabled,
            ]
        );
        assert_eq!(c.round().target_length, 3);
        assert_eq!(c.game().streak, 1);
        assert_eq!(c.phase(), Phase::Idle);
    }

    #[test]
    fn test_scenario_c_start_while_running_is_noop() {
        let mut c = controller(13);
        let mut events = Vec::new();
        c.start_round(&mut events);
        let round = c.round();
        let seq = c.sequence().to_vec();
        let pending = c.pending_timers().count();

        events.clear();
        assert!(!c.start_round(&mut events));
        assert!(events.is_empty());
        assert_eq!(c.round(), round);
        assert_eq!(c.sequence(), seq.as_slice());
        assert_eq!(c.pending_timers().count(), pending);

        c.advance_by(10_000, &mut events);
        assert_eq!(c.phase(), Phase::AwaitingInput);
        events.clear();
        assert!(!c.start_round(&mut events));
        assert!(events.is_empty());
    }

    #[test]
    fn test_scenario_d_first_win_sets_best() {
        let mut c = controller(14);
        let events = win_round(&mut c);
        assert!(events.contains(&GameEvent::RoundWon { streak: 1, best_streak: 1 }));
        assert_eq!(c.game(), GameState { streak: 1, best_streak: 1 });
        assert_eq!(c.round().target_length, 4);
    }

    #[test]
    fn test_idle_activation_ignored() {
        let mut c = controller(15);
        let mut events = Vec::new();
        let round = c.round();
        assert!(!c.activate(Tile(1), &mut events));
        assert!(events.is_empty());
        assert_eq!(c.round(), round);
        assert!(c.inputs().is_empty());
        assert_eq!(c.pending_timers().count(), 0);
    }

    #[test]
    fn test_feedback_reverts_after_duration() {
        let mut c = controller(16);
        start_and_play(&mut c);
        let tile = c.sequence()[0];
        let mut events = Vec::new();
        c.activate(tile, &mut events);
        events.clear();

        c.advance_by(999, &mut events);
        assert!(events.is_empty());
        c.advance_by(1, &mut events);
        assert_eq!(events, vec![GameEvent::FeedbackCleared { tile }]);
    }

    #[test]
    fn test_repeat_click_extends_feedback() {
        let settings = Settings {
            tile_count: 1,
            ..Default::default()
        };
        let mut c = RoundController::new(settings, 30).unwrap();
        start_and_play(&mut c);
        let tile = Tile(1);
        let mut events = Vec::new();

        c.activate(tile, &mut events);
        c.advance_by(500, &mut events);
        c.activate(tile, &mut events);
        events.clear();

        // Only the second click's clear is left
        c.advance_by(500, &mut events);
        assert!(events.is_empty());
        assert_eq!(c.pending_timers().count(), 1);
        c.advance_by(500, &mut events);
        assert_eq!(events, vec![GameEvent::FeedbackCleared { tile }]);
    }

    #[test]
    fn test_playback_highlight_drops_stale_feedback_clear() {
        let settings = Settings {
            tile_count: 1,
            ..Default::default()
        };
        let mut c = RoundController::new(settings, 31).unwrap();
        win_round(&mut c);
        assert_eq!(c.pending_timers().count(), 1);

        let mut events = Vec::new();
        c.start_round(&mut events);
        events.clear();
        c.advance_by(0, &mut events);
        assert_eq!(events, vec![GameEvent::Highlight { tile: Tile(1), slot: 0 }]);

        events.clear();
        c.advance_by(1000, &mut events);
        assert_eq!(events, vec![GameEvent::Unhighlight { tile: Tile(1), slot: 0 }]);
    }

    #[test]
    fn test_oversized_slot_rejected_before_scheduling() {
        let settings = Settings {
            slot_ms: u64::MAX / 2,
            highlight_ms: 1,
            ..Default::default()
        };
        assert!(matches!(
            RoundController::new(settings, 32),
            Err(SettingsError::DurationTooLong { .. })
        ));
    }

    #[test]
    fn test_streak_and_length_progression() {
        let mut c = controller(17);
        for round in 1..=4u32 {
            win_round(&mut c);
            assert_eq!(c.game().streak, round);
            assert_eq!(c.round().target_length, 3 + round as usize);
        }

        start_and_play(&mut c);
        let seq = c.sequence().to_vec();
        assert_eq!(seq.len(), 7);
        let mut events = Vec::new();
        let miss = wrong_tile(&c, seq[0]);
        c.activate(miss, &mut events);
        for &tile in &seq[1..] {
            c.activate(tile, &mut events);
        }
        assert!(events.contains(&GameEvent::RoundLost));
        assert_eq!(c.game(), GameState { streak: 1, best_streak: 4 });
        assert_eq!(c.round().target_length, 3);
    }

    #[test]
    fn test_invariants_over_random_play() {
        let mut c = controller(18);
        let mut player = Pcg32::seed_from_u64(99);
        let mut last_best = 0;

        for _ in 0..200 {
            start_and_play(&mut c);
            let seq = c.sequence().to_vec();
            let mut events = Vec::new();
            for &tile in &seq {
                let pressed = if player.random_bool(0.9) { tile } else { wrong_tile(&c, tile) };
                c.activate(pressed, &mut events);
                assert!(c.round().position <= c.round().target_length);
            }
            let game = c.game();
            assert!(game.best_streak >= last_best);
            assert!(game.best_streak >= game.streak);
            last_best = game.best_streak;
            assert_eq!(c.phase(), Phase::Idle);
            c.advance_by(c.settings().feedback_ms, &mut events);
        }
    }

    #[test]
    fn test_independent_instances() {
        let mut a = controller(20);
        let b = controller(20);
        win_round(&mut a);
        assert_eq!(a.game().streak, 1);
        assert_eq!(b.game().streak, 0);
        assert_eq!(b.round().target_length, 3);
    }

    #[test]
    fn test_reset_session() {
        let mut c = controller(21);
        win_round(&mut c);
        let mut events = Vec::new();
        c.start_round(&mut events);

        events.clear();
        c.reset_session(&mut events);
        assert_eq!(events, vec![GameEvent::InputDisabled, GameEvent::StartEnabled]);
        assert_eq!(c.game(), GameState::default());
        assert_eq!(c.round().target_length, 3);
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.pending_timers().count(), 0);
        assert!(c.start_round(&mut events));
    }
}
