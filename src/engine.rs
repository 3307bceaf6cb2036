// Winner selection engine
//
// Owns the wheel's resting angle and the in-flight spin (timing state plus the
// roster snapshot taken at start). Holds no globals and no clock: the host
// passes the current time, the RNG and the display collaborator into every
// call, and persists the engine between calls however it likes.
//
//   Idle --start_spin--> Spinning --tick(t=1) / force_stop--> Settling --settle--> Idle

use std::fmt;

use spacetimedb::rand::Rng;
use spacetimedb::SpacetimeType;

use crate::config::WheelConfig;
use crate::pointer::resolve_winner_index;
use crate::roster::{Participant, RosterProvider};
use crate::sampler::draw_winners;
use crate::segments::{layout_segments, Segment};
use crate::spin::SpinState;

/// Receives what the wheel looks like and who won
pub trait WheelDisplay {
    /// Called once per tick while a spin is in flight, and once on landing
    fn on_frame(&mut self, angle: f64, segments: &[Segment]);

    fn on_result(&mut self, winners: &WinnerSet);
}

/// Winners of one spin. The wheel's pick is always first.
#[derive(Debug, Clone, PartialEq)]
pub struct WinnerSet {
    winners: Vec<Participant>,
}

impl WinnerSet {
    pub fn wheel_pick(&self) -> Option<&Participant> {
        self.winners.first()
    }

    pub fn len(&self) -> usize {
        self.winners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.winners.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.winners.iter()
    }
}

/// Why a spin request was refused. Nothing is mutated when this is returned.
#[derive(Debug, Clone, PartialEq)]
pub enum SpinRejection {
    EmptyRoster,
    NoWinnersRequested,
    TooManyWinners { requested: u32, available: u32 },
}

impl fmt::Display for SpinRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpinRejection::EmptyRoster => write!(
                f,
                "No students registered yet! Students need to join the session and register first."
            ),
            SpinRejection::NoWinnersRequested => write!(f, "Pick at least one winner."),
            SpinRejection::TooManyWinners { requested, available } => write!(
                f,
                "Cannot pick {} winners from {} students. Please reduce the number of winners.",
                requested, available
            ),
        }
    }
}

impl std::error::Error for SpinRejection {}

#[derive(Debug, Clone, PartialEq)]
pub enum SpinStart {
    Started { duration_ms: f64, target_angle: f64 },
    /// A spin (or its settle pause) is already in progress
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Idle,
    Spinning { progress: f64 },
    /// Landed on this tick; winners are due at `settle_at_ms`
    Landed { settle_at_ms: u64 },
    Settling { settle_at_ms: u64 },
}

#[derive(SpacetimeType, Debug, Clone, PartialEq)]
pub struct ActiveSpin {
    pub state: SpinState,
    /// Roster copy taken at start; segment i is roster[i]
    pub roster: Vec<Participant>,
    pub segments: Vec<Segment>,
    pub winner_count: u32,
    /// Only meaningful once the spin has landed
    pub settle_at_ms: u64,
}

#[derive(SpacetimeType, Debug, Clone, PartialEq)]
pub enum WheelPhase {
    Idle,
    Spinning(ActiveSpin),
    Settling(ActiveSpin),
}

#[derive(SpacetimeType, Debug, Clone, PartialEq)]
pub struct WheelEngine {
    resting_angle: f64,
    phase: WheelPhase,
}

impl Default for WheelEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl WheelEngine {
    pub fn new() -> Self {
        Self { resting_angle: 0.0, phase: WheelPhase::Idle }
    }

    pub fn resting_angle(&self) -> f64 {
        self.resting_angle
    }

    /// Angle the wheel is drawn at right now
    pub fn current_angle(&self) -> f64 {
        self.spin_state().map(|s| s.current_angle).unwrap_or(self.resting_angle)
    }

    pub fn is_spinning(&self) -> bool {
        matches!(self.phase, WheelPhase::Spinning(_))
    }

    /// Spinning, or landed and waiting out the settle delay
    pub fn is_busy(&self) -> bool {
        !matches!(self.phase, WheelPhase::Idle)
    }

    fn active(&self) -> Option<&ActiveSpin> {
        match &self.phase {
            WheelPhase::Spinning(active) | WheelPhase::Settling(active) => Some(active),
            WheelPhase::Idle => None,
        }
    }

    pub fn spin_state(&self) -> Option<&SpinState> {
        self.active().map(|a| &a.state)
    }

    /// Roster snapshot of the spin in flight
    pub fn snapshot(&self) -> Option<&[Participant]> {
        self.active().map(|a| a.roster.as_slice())
    }

    pub fn settle_due(&self, now_ms: u64) -> bool {
        match &self.phase {
            WheelPhase::Settling(active) => now_ms >= active.settle_at_ms,
            _ => false,
        }
    }

    /// Validate the request against a fresh roster snapshot and start spinning.
    ///
    /// Busy wheels ignore the request without looking at the roster.
    pub fn start_spin<P, R>(
        &mut self,
        provider: &P,
        winner_count: u32,
        now_ms: u64,
        config: &WheelConfig,
        rng: &mut R,
    ) -> Result<SpinStart, SpinRejection>
    where
        P: RosterProvider + ?Sized,
        R: Rng + ?Sized,
    {
        if self.is_busy() {
            return Ok(SpinStart::Ignored);
        }

        let roster = provider.roster();
        if roster.is_empty() {
            return Err(SpinRejection::EmptyRoster);
        }
        if winner_count == 0 {
            return Err(SpinRejection::NoWinnersRequested);
        }
        if winner_count as usize > roster.len() {
            return Err(SpinRejection::TooManyWinners {
                requested: winner_count,
                available: roster.len() as u32,
            });
        }

        let state = SpinState::begin(self.resting_angle, now_ms, config, rng);
        let started = SpinStart::Started {
            duration_ms: state.duration_ms,
            target_angle: state.target_angle,
        };
        let segments = layout_segments(&roster);

        self.phase = WheelPhase::Spinning(ActiveSpin {
            state,
            roster,
            segments,
            winner_count,
            settle_at_ms: 0,
        });
        Ok(started)
    }

    /// Push the current frame to the display (no-op when idle)
    pub fn render<D: WheelDisplay + ?Sized>(&self, display: &mut D) {
        if let Some(active) = self.active() {
            display.on_frame(active.state.current_angle, &active.segments);
        }
    }

    /// Advance the animation to `now_ms` and render the frame
    pub fn tick<D: WheelDisplay + ?Sized>(
        &mut self,
        now_ms: u64,
        config: &WheelConfig,
        display: &mut D,
    ) -> TickOutcome {
        let mut active = match std::mem::replace(&mut self.phase, WheelPhase::Idle) {
            WheelPhase::Spinning(active) => active,
            WheelPhase::Settling(active) => {
                let settle_at_ms = active.settle_at_ms;
                self.phase = WheelPhase::Settling(active);
                return TickOutcome::Settling { settle_at_ms };
            }
            WheelPhase::Idle => return TickOutcome::Idle,
        };

        let landed = active.state.advance(now_ms);
        display.on_frame(active.state.current_angle, &active.segments);

        if landed {
            let settle_at_ms = self.land(active, now_ms, config);
            TickOutcome::Landed { settle_at_ms }
        } else {
            let progress = active.state.progress_at(now_ms);
            self.phase = WheelPhase::Spinning(active);
            TickOutcome::Spinning { progress }
        }
    }

    /// Jump straight to t = 1. Returns the settle deadline, or None when not spinning.
    pub fn force_stop<D: WheelDisplay + ?Sized>(
        &mut self,
        now_ms: u64,
        config: &WheelConfig,
        display: &mut D,
    ) -> Option<u64> {
        let mut active = match std::mem::replace(&mut self.phase, WheelPhase::Idle) {
            WheelPhase::Spinning(active) => active,
            other => {
                self.phase = other;
                return None;
            }
        };

        active.state.finish();
        display.on_frame(active.state.current_angle, &active.segments);
        Some(self.land(active, now_ms, config))
    }

    fn land(&mut self, mut active: ActiveSpin, now_ms: u64, config: &WheelConfig) -> u64 {
        let settle_at_ms = now_ms + config.settle_delay_ms as u64;
        active.settle_at_ms = settle_at_ms;
        self.resting_angle = active.state.current_angle;
        self.phase = WheelPhase::Settling(active);
        settle_at_ms
    }

    /// Resolve the pointer and draw the winners. Only valid after landing;
    /// the settle delay itself is the host's to enforce.
    pub fn settle<R, D>(&mut self, rng: &mut R, display: &mut D) -> Option<WinnerSet>
    where
        R: Rng + ?Sized,
        D: WheelDisplay + ?Sized,
    {
        let active = match std::mem::replace(&mut self.phase, WheelPhase::Idle) {
            WheelPhase::Settling(active) => active,
            other => {
                self.phase = other;
                return None;
            }
        };

        let wheel_index = resolve_winner_index(active.state.current_angle, active.roster.len());
        let winners = WinnerSet {
            winners: draw_winners(&active.roster, wheel_index, active.winner_count as usize, rng),
        };
        self.resting_angle = active.state.current_angle;

        display.on_result(&winners);
        Some(winners)
    }

    /// Put the wheel back at angle 0 for the next pick. Refused while busy.
    pub fn reset_for_new_pick(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        self.resting_angle = 0.0;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacetimedb::rand::rngs::mock::StepRng;
    use spacetimedb::Timestamp;
    use std::f64::consts::TAU;

    #[derive(Default)]
    struct Recorder {
        frames: Vec<f64>,
        results: Vec<Vec<String>>,
    }

    impl WheelDisplay for Recorder {
        fn on_frame(&mut self, angle: f64, _segments: &[Segment]) {
            self.frames.push(angle);
        }

        fn on_result(&mut self, winners: &WinnerSet) {
            self.results.push(winners.iter().map(|p| p.name.clone()).collect());
        }
    }

    fn roster(names: &[&str]) -> Vec<Participant> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Participant {
                id: i as u64 + 1,
                name: name.to_string(),
                registered_at: Timestamp::from_micros_since_unix_epoch(0),
            })
            .collect()
    }

    #[test]
    fn test_rejections_leave_engine_untouched() {
        let config = WheelConfig::default();
        let mut rng = StepRng::new(0, 0);
        let mut engine = WheelEngine::new();

        let empty: Vec<Participant> = Vec::new();
        assert_eq!(
            engine.start_spin(&empty, 1, 0, &config, &mut rng),
            Err(SpinRejection::EmptyRoster)
        );

        let three = roster(&["Alice", "Bob", "Carol"]);
        assert_eq!(
            engine.start_spin(&three, 5, 0, &config, &mut rng),
            Err(SpinRejection::TooManyWinners { requested: 5, available: 3 })
        );
        assert_eq!(
            engine.start_spin(&three, 0, 0, &config, &mut rng),
            Err(SpinRejection::NoWinnersRequested)
        );
        assert_eq!(engine, WheelEngine::new());
        assert!(engine.spin_state().is_none());
    }

    #[test]
    fn test_rejection_messages() {
        let err = SpinRejection::TooManyWinners { requested: 5, available: 3 };
        assert_eq!(
            err.to_string(),
            "Cannot pick 5 winners from 3 students. Please reduce the number of winners."
        );
        assert!(SpinRejection::EmptyRoster.to_string().starts_with("No students registered yet"));
    }

    #[test]
    fn test_second_start_is_ignored() {
        let config = WheelConfig::default();
        let mut rng = StepRng::new(0, 0);
        let mut engine = WheelEngine::new();
        let four = roster(&["Alice", "Bob", "Carol", "Dave"]);

        assert!(matches!(
            engine.start_spin(&four, 1, 100, &config, &mut rng),
            Ok(SpinStart::Started { .. })
        ));
        let before = engine.clone();
        assert_eq!(engine.start_spin(&four, 2, 200, &config, &mut rng), Ok(SpinStart::Ignored));
        assert_eq!(engine, before);
    }

    #[test]
    fn test_tick_lands_then_settles() {
        let config = WheelConfig::default();
        let mut rng = StepRng::new(0, 0);
        let mut display = Recorder::default();
        let mut engine = WheelEngine::new();
        let four = roster(&["Alice", "Bob", "Carol", "Dave"]);

        engine.start_spin(&four, 1, 1_000, &config, &mut rng).unwrap();
        assert!(engine.is_spinning());

        assert!(matches!(engine.tick(2_500, &config, &mut display), TickOutcome::Spinning { .. }));
        assert_eq!(engine.tick(4_000, &config, &mut display), TickOutcome::Landed { settle_at_ms: 4_500 });
        assert!(!engine.is_spinning());
        assert!(engine.is_busy());
        assert_eq!(engine.tick(4_100, &config, &mut display), TickOutcome::Settling { settle_at_ms: 4_500 });
        assert!(!engine.settle_due(4_499));
        assert!(engine.settle_due(4_500));

        // Zero RNG: 3000 ms and exactly five turns, so the wheel rests where it began
        assert!((engine.resting_angle() - TAU * 5.0).abs() < 1e-9);
        assert_eq!(display.frames.len(), 2);

        let winners = engine.settle(&mut rng, &mut display).unwrap();
        assert_eq!(winners.wheel_pick().map(|p| p.name.as_str()), Some("Dave"));
        assert_eq!(display.results, vec![vec!["Dave".to_string()]]);
        assert!(!engine.is_busy());
        assert_eq!(engine.tick(5_000, &config, &mut display), TickOutcome::Idle);
    }

    #[test]
    fn test_force_stop_snaps_to_target() {
        let config = WheelConfig::default();
        let mut rng = StepRng::new(0, 0);
        let mut display = Recorder::default();
        let mut engine = WheelEngine::new();
        let four = roster(&["Alice", "Bob", "Carol", "Dave"]);

        engine.start_spin(&four, 2, 0, &config, &mut rng).unwrap();
        engine.tick(500, &config, &mut display);
        let target = engine.spin_state().unwrap().target_angle;

        assert_eq!(engine.force_stop(600, &config, &mut display), Some(1_100));
        assert_eq!(engine.current_angle(), target);
        assert_eq!(*display.frames.last().unwrap(), target);

        // Only valid while spinning
        assert_eq!(engine.force_stop(700, &config, &mut display), None);
        let winners = engine.settle(&mut rng, &mut display).unwrap();
        assert_eq!(winners.len(), 2);
        assert_eq!(engine.force_stop(800, &config, &mut display), None);
    }

    #[test]
    fn test_settle_requires_landing() {
        let config = WheelConfig::default();
        let mut rng = StepRng::new(0, 0);
        let mut display = Recorder::default();
        let mut engine = WheelEngine::new();
        assert!(engine.settle(&mut rng, &mut display).is_none());

        engine.start_spin(&roster(&["Alice", "Bob"]), 1, 0, &config, &mut rng).unwrap();
        assert!(engine.settle(&mut rng, &mut display).is_none());
        assert!(engine.is_spinning());
    }

    #[test]
    fn test_snapshot_is_frozen_at_start() {
        let config = WheelConfig::default();
        let mut rng = StepRng::new(0, 0);
        let mut engine = WheelEngine::new();
        let mut live = roster(&["Alice", "Bob"]);

        engine.start_spin(&live, 2, 0, &config, &mut rng).unwrap();
        live.push(Participant {
            id: 3,
            name: "Carol".to_string(),
            registered_at: Timestamp::from_micros_since_unix_epoch(0),
        });

        assert_eq!(engine.snapshot().map(|s| s.len()), Some(2));
    }

    #[test]
    fn test_next_spin_starts_from_resting_angle() {
        let config = WheelConfig::default();
        let mut rng = StepRng::new(0, 0);
        let mut display = Recorder::default();
        let mut engine = WheelEngine::new();
        let two = roster(&["Alice", "Bob"]);

        engine.start_spin(&two, 1, 0, &config, &mut rng).unwrap();
        engine.force_stop(10, &config, &mut display);
        engine.settle(&mut rng, &mut display);
        let rest = engine.resting_angle();

        engine.start_spin(&two, 1, 20, &config, &mut rng).unwrap();
        let state = engine.spin_state().unwrap();
        assert_eq!(state.start_angle, rest);
        assert!(state.target_angle > rest);
    }

    #[test]
    fn test_reset_refused_while_busy() {
        let config = WheelConfig::default();
        let mut rng = StepRng::new(0, 0);
        let mut display = Recorder::default();
        let mut engine = WheelEngine::new();

        engine.start_spin(&roster(&["Alice", "Bob"]), 1, 0, &config, &mut rng).unwrap();
        assert!(!engine.reset_for_new_pick());

        engine.force_stop(1, &config, &mut display);
        assert!(!engine.reset_for_new_pick());

        engine.settle(&mut rng, &mut display);
        assert!(engine.resting_angle() != 0.0);
        assert!(engine.reset_for_new_pick());
        assert_eq!(engine.resting_angle(), 0.0);
    }
}
