//! Staged startup machine (spec §4.1): P0 IMU-Warmup → P1 Calibrating →
//! P2 Seeding → P3 Ramp → P4 Free-Control.
//!
//! Mirrors the teacher's `MachineStateMachine`: an explicit event enum
//! driving `handle_event`, sticky transitions (never regresses), and a
//! `TransitionResult` that distinguishes an accepted transition from a
//! rejected one.

use quad_common::consts::{STARTUP_KALMAN, STARTUP_RUNS};

/// The five ordered startup phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupPhase {
    ImuWarmup,
    Calibrating,
    Seeding,
    Ramp,
    Free,
}

/// Event driving a startup transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupEvent {
    /// A new IMU frame's interval fell in `[TS_MIN, TS_MAX]`.
    ImuFrameInBand,
    /// A new IMU frame's interval fell outside the band.
    ImuFrameOutOfBand,
    /// IMU calibration has completed.
    CalibrationDone,
    /// The seeding Kalman call has run once.
    Seeded,
    /// One more Kalman update happened while ramping.
    RampTick,
}

/// Result of a transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionResult {
    Ok(StartupPhase),
    /// No phase change; the event was a no-op in the current phase
    /// (e.g. another in-band frame while already warmed up).
    Unchanged(StartupPhase),
}

/// Drives the phase forward and holds the counters spec.md §4.1 needs to
/// decide each transition (`STARTUP_RUNS` consecutive in-band frames,
/// `STARTUP_KALMAN` ramp ticks).
#[derive(Debug, Clone)]
pub struct StartupMachine {
    phase: StartupPhase,
    /// Consecutive in-band IMU frames counted during P0 (`imu_ts_ok`).
    imu_ts_ok: u32,
    /// Kalman updates consumed during P3 (`runs_kalman`, offset from 0).
    ramp_ticks: u32,
    /// Length of the ramp window; `STARTUP_KALMAN` in production, made
    /// configurable so spec.md §8 scenario 6 (`STARTUP_KALMAN = 4`) is
    /// directly testable without touching the compiled-in constant.
    ramp_len: u32,
}

impl StartupMachine {
    pub const fn new() -> Self {
        Self::with_ramp_len(STARTUP_KALMAN)
    }

    pub const fn with_ramp_len(ramp_len: u32) -> Self {
        Self {
            phase: StartupPhase::ImuWarmup,
            imu_ts_ok: 0,
            ramp_ticks: 0,
            ramp_len,
        }
    }

    #[inline]
    pub const fn phase(&self) -> StartupPhase {
        self.phase
    }

    /// Ramp ticks consumed so far; used by the caller to compute the
    /// per-rotor ramp command of spec.md §4.1.
    #[inline]
    pub const fn ramp_ticks(&self) -> u32 {
        self.ramp_ticks
    }

    /// Feed an event and advance the phase if its entry condition is met.
    ///
    /// Phase transitions are sticky (spec.md §4.1): an event that doesn't
    /// apply to the current phase, or doesn't yet meet the phase's exit
    /// condition, leaves the phase unchanged.
    pub fn handle_event(&mut self, event: StartupEvent) -> TransitionResult {
        use StartupEvent::*;
        use StartupPhase::*;

        match (self.phase, event) {
            (ImuWarmup, ImuFrameOutOfBand) => {
                self.imu_ts_ok = 0;
                TransitionResult::Unchanged(ImuWarmup)
            }
            (ImuWarmup, ImuFrameInBand) => {
                self.imu_ts_ok += 1;
                if self.imu_ts_ok >= STARTUP_RUNS {
                    self.phase = Calibrating;
                    TransitionResult::Ok(Calibrating)
                } else {
                    TransitionResult::Unchanged(ImuWarmup)
                }
            }
            (Calibrating, CalibrationDone) => {
                self.phase = Seeding;
                TransitionResult::Ok(Seeding)
            }
            (Seeding, Seeded) => {
                self.phase = Ramp;
                TransitionResult::Ok(Ramp)
            }
            (Ramp, RampTick) => {
                self.ramp_ticks += 1;
                if self.ramp_ticks >= self.ramp_len {
                    self.phase = Free;
                    TransitionResult::Ok(Free)
                } else {
                    TransitionResult::Unchanged(Ramp)
                }
            }
            (other, _) => TransitionResult::Unchanged(other),
        }
    }

    /// Per-rotor ramp command for the current ramp tick (spec.md §4.1):
    /// `max(w_min, controller_w - (STARTUP_KALMAN - runs_kalman) * (w_hover - w_min) / STARTUP_KALMAN)`.
    ///
    /// Callers feed this *before* the tick's [`Self::handle_event`]
    /// (`RampTick` not yet counted), so the first ramp command uses the
    /// full remaining window (spec.md §8 scenario 6: `r=1` yields the
    /// formula's `STARTUP_KALMAN - 0`, not `- 1`).
    pub fn ramp_command(&self, controller_w: f64, w_min: f64, w_hover: f64) -> f64 {
        let remaining = (self.ramp_len - self.ramp_ticks.min(self.ramp_len)) as f64;
        let step = (w_hover - w_min) / self.ramp_len as f64;
        (controller_w - remaining * step).max(w_min)
    }
}

impl Default for StartupMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warmup_requires_consecutive_in_band_frames() {
        let mut sm = StartupMachine::new();
        for _ in 0..STARTUP_RUNS - 1 {
            assert_eq!(
                sm.handle_event(StartupEvent::ImuFrameInBand),
                TransitionResult::Unchanged(StartupPhase::ImuWarmup)
            );
        }
        assert_eq!(
            sm.handle_event(StartupEvent::ImuFrameInBand),
            TransitionResult::Ok(StartupPhase::Calibrating)
        );
    }

    #[test]
    fn out_of_band_frame_resets_counter() {
        let mut sm = StartupMachine::new();
        for _ in 0..STARTUP_RUNS - 1 {
            sm.handle_event(StartupEvent::ImuFrameInBand);
        }
        sm.handle_event(StartupEvent::ImuFrameOutOfBand);
        // needs a fresh full run now
        for _ in 0..STARTUP_RUNS - 1 {
            assert_eq!(
                sm.handle_event(StartupEvent::ImuFrameInBand),
                TransitionResult::Unchanged(StartupPhase::ImuWarmup)
            );
        }
        assert_eq!(
            sm.handle_event(StartupEvent::ImuFrameInBand),
            TransitionResult::Ok(StartupPhase::Calibrating)
        );
    }

    #[test]
    fn full_sequence_to_free_control() {
        let mut sm = StartupMachine::new();
        for _ in 0..STARTUP_RUNS {
            sm.handle_event(StartupEvent::ImuFrameInBand);
        }
        assert_eq!(sm.phase(), StartupPhase::Calibrating);
        assert_eq!(
            sm.handle_event(StartupEvent::CalibrationDone),
            TransitionResult::Ok(StartupPhase::Seeding)
        );
        assert_eq!(
            sm.handle_event(StartupEvent::Seeded),
            TransitionResult::Ok(StartupPhase::Ramp)
        );
        for i in 0..STARTUP_KALMAN {
            assert_eq!(sm.phase(), StartupPhase::Ramp);
            let result = sm.handle_event(StartupEvent::RampTick);
            if i + 1 == STARTUP_KALMAN {
                assert_eq!(result, TransitionResult::Ok(StartupPhase::Free));
            } else {
                assert_eq!(result, TransitionResult::Unchanged(StartupPhase::Ramp));
            }
        }
        assert_eq!(sm.phase(), StartupPhase::Free);
    }

    #[test]
    fn ramp_clamp_matches_scenario_6() {
        // spec.md §8 scenario 6: STARTUP_KALMAN=4, w_min=100, w_hover=300,
        // controller desires 400 throughout -> {200, 250, 300, 350}, then
        // the straight controller value once Free.
        let mut sm = StartupMachine::with_ramp_len(4);
        for _ in 0..STARTUP_RUNS {
            sm.handle_event(StartupEvent::ImuFrameInBand);
        }
        sm.handle_event(StartupEvent::CalibrationDone);
        sm.handle_event(StartupEvent::Seeded);
        assert_eq!(sm.phase(), StartupPhase::Ramp);

        let (w_min, w_hover, controller_w) = (100.0, 300.0, 400.0);
        let mut expected = vec![200.0, 250.0, 300.0, 350.0].into_iter();
        for _ in 0..4 {
            let cmd = sm.ramp_command(controller_w, w_min, w_hover);
            assert_eq!(cmd, expected.next().unwrap());
            sm.handle_event(StartupEvent::RampTick);
        }
        assert_eq!(sm.phase(), StartupPhase::Free);
    }

    #[test]
    fn sticky_phase_does_not_regress_on_fault_events() {
        let mut sm = StartupMachine::new();
        for _ in 0..STARTUP_RUNS {
            sm.handle_event(StartupEvent::ImuFrameInBand);
        }
        sm.handle_event(StartupEvent::CalibrationDone);
        assert_eq!(
            sm.handle_event(StartupEvent::ImuFrameOutOfBand),
            TransitionResult::Unchanged(StartupPhase::Seeding)
        );
        assert_eq!(sm.phase(), StartupPhase::Seeding);
    }
}
