//! The loop orchestrator (spec §2/§4, C7): wires every gateway and
//! supporting module together and drives one iteration at a time.
//!
//! Generic over the six gateway traits rather than trait objects, the
//! way the teacher parameterizes its control unit over axis drivers —
//! no dynamic dispatch on the hot path, and the concrete types are fixed
//! once at process start.

use std::time::{Duration, Instant};

use quad_common::config::ModeFlags;
use quad_common::consts::{GPS_INIT_TIMEOUT, TS_DEFAULT_US};
use quad_common::state::{GpsFix, RotorSpeeds, StateSlot};

use crate::clock::LoopClock;
use crate::error::{GatewayError, LoopError};
use crate::fault::{FaultOutcome, FaultTracker};
use crate::gateways::{CalibrationStatus, ControllerGateway, GpsGateway, ImuGateway, KalmanGateway, MotorGateway, PathPlannerGateway};
use crate::io::Readiness;
use crate::logging::LogChannels;
use crate::manual::{ManualEffect, ManualInput, ManualKey};
use crate::motor_rate::MotorRateLimiter;
use crate::startup::{StartupEvent, StartupMachine, StartupPhase};
use crate::timing::{TimingGate, TimingOutcome};

/// What the caller should do after one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Keep looping.
    Continue,
    /// First shutdown signal observed: motors idled, loop continues
    /// logging-only until the caller invokes full teardown.
    Interrupted,
    /// Fault budget exhausted; caller must tear down now.
    FatalAbort,
}

/// Owns every collaborator and all loop-clock/stage state (spec.md §3's
/// "Ownership" paragraph): gateways own their devices, the orchestrator
/// owns the clock marks, stage counters, and fault counters.
/// Bundles the six gateway handles for [`Orchestrator::new`], the way the
/// teacher groups related driver handles before wiring them into a
/// control unit rather than threading each one through separately.
pub struct Gateways<I, G, M, K, P, C> {
    pub imu: I,
    pub gps: G,
    pub motor: M,
    pub kalman: K,
    pub planner: P,
    pub controller: C,
}

pub struct Orchestrator<I, G, M, K, P, C> {
    imu: I,
    gps: G,
    motor: M,
    kalman: K,
    planner: P,
    controller: C,

    startup: StartupMachine,
    timing: TimingGate,
    faults: FaultTracker,
    motor_rate: MotorRateLimiter,
    manual: ManualInput,
    clock: LoopClock,

    modes: ModeFlags,
    mass_kg: f64,
    interrupted: bool,
    kalman_ran_once: bool,
    pending_gps: Option<GpsFix>,
}

impl<I, G, M, K, P, C> Orchestrator<I, G, M, K, P, C>
where
    I: ImuGateway,
    G: GpsGateway,
    M: MotorGateway,
    K: KalmanGateway,
    P: PathPlannerGateway,
    C: ControllerGateway,
{
    pub fn new(gateways: Gateways<I, G, M, K, P, C>, modes: ModeFlags, mass_kg: f64, now: Instant) -> Self {
        let Gateways {
            imu,
            gps,
            motor,
            kalman,
            planner,
            controller,
        } = gateways;
        Self {
            imu,
            gps,
            motor,
            kalman,
            planner,
            controller,
            startup: StartupMachine::new(),
            timing: TimingGate::new(),
            faults: FaultTracker::new(),
            motor_rate: MotorRateLimiter::new(now),
            manual: ManualInput::new(),
            clock: LoopClock::new(now),
            modes,
            mass_kg,
            interrupted: false,
            kalman_ran_once: false,
            pending_gps: None,
        }
    }

    #[inline]
    pub fn phase(&self) -> StartupPhase {
        self.startup.phase()
    }

    #[inline]
    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    /// The IMU gateway, for callers that need backend-specific details
    /// (e.g. `main`'s replay-cadence sleep under `imu_comm_fake`).
    #[inline]
    pub fn imu(&self) -> &I {
        &self.imu
    }

    /// Block (bounded by `GPS_INIT_TIMEOUT`) for GPS's first fix, if GPS
    /// is enabled (spec.md §5's one other named wait, and §6's exit-code
    /// contract: this is an init failure, not a loop fault).
    pub fn wait_initial_gps_fix(&mut self) -> Result<(), GatewayError> {
        if !self.modes.use_gps {
            return Ok(());
        }
        let fix = self.gps.wait_initial_fix(GPS_INIT_TIMEOUT)?;
        self.pending_gps = Some(fix);
        Ok(())
    }

    /// Whether the IMU/GPS gateway should be polled this tick: real
    /// descriptors gate on mux readiness; a gateway with no descriptor
    /// (the simulated path) is a clock-driven generator polled every
    /// iteration (spec.md §5 — no background thread drives it).
    fn should_read_imu(&self, readiness: Readiness) -> bool {
        self.imu.fd().is_none_or(|_| readiness.imu)
    }

    fn should_read_gps(&self, readiness: Readiness) -> bool {
        self.modes.use_gps && self.gps.fd().is_none_or(|_| readiness.gps)
    }

    /// Run one loop iteration: IMU-read → GPS-read → stage/Kalman →
    /// controller → motor → operator input (spec.md §2, §5's ordering
    /// guarantee).
    pub fn step(&mut self, now: Instant, readiness: Readiness, key: Option<ManualKey>, log: &mut LogChannels) -> Result<StepOutcome, LoopError> {
        let mut err_imu = false;
        let mut err_gps = false;

        if self.should_read_imu(readiness) {
            match self.imu.read_frame() {
                Ok(_) => {
                    if let Err(e) = self.on_imu_frame(now, log) {
                        log.write_line("err", now, &format!("{e}"));
                        self.idle_motors_on_interrupt(now, log);
                        return Ok(StepOutcome::FatalAbort);
                    }
                }
                Err(e) => {
                    err_imu = true;
                    log.write_line("err", now, &format!("imu read error: {e}"));
                }
            }
        }

        if self.should_read_gps(readiness) {
            if self.modes.gps_zero {
                self.synthesize_zero_gps(now, log);
            } else {
                match self.gps.read() {
                    Ok(Some(fix)) if fix.fix_quality.is_3d() => {
                        self.clock.mark_gps(now);
                        self.pending_gps = Some(fix);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        err_gps = true;
                        log.write_line("err", now, &format!("gps read error: {e}"));
                    }
                }
            }
        }

        // Fault accounting is gated on IMU warmup having completed
        // (spec.md §9 Open Question #1): no motors spin yet in P0, so a
        // sensor hiccup there cannot trigger the fatal path.
        if self.startup.phase() != StartupPhase::ImuWarmup {
            let had_error = err_imu || err_gps;
            match self.faults.record(had_error) {
                FaultOutcome::FatalAbort => {
                    self.idle_motors_on_interrupt(now, log);
                    return Ok(StepOutcome::FatalAbort);
                }
                FaultOutcome::Recovered { cleared } => {
                    log.write_line("err", now, &format!("recovered after {cleared} errors"));
                }
                FaultOutcome::Ok => {}
            }
        }

        if let Some(key) = key
            && self.apply_manual_key(key, now, log)
        {
            return Ok(StepOutcome::Interrupted);
        }

        if self.interrupted {
            return Ok(StepOutcome::Interrupted);
        }

        Ok(StepOutcome::Continue)
    }

    fn on_imu_frame(&mut self, now: Instant, log: &mut LogChannels) -> Result<(), LoopError> {
        let dt = self.clock.tick_imu(now);

        if self.startup.phase() == StartupPhase::ImuWarmup {
            let in_band = self.modes.ol_ts_stabil || (dt >= quad_common::consts::TS_MIN && dt <= quad_common::consts::TS_MAX);
            let event = if in_band { StartupEvent::ImuFrameInBand } else { StartupEvent::ImuFrameOutOfBand };
            if let crate::startup::TransitionResult::Ok(StartupPhase::Calibrating) = self.startup.handle_event(event) {
                let _ = self.imu.start_calibration();
            }
            return Ok(());
        }

        if self.startup.phase() == StartupPhase::Calibrating {
            // P1: drop samples until calibration completes (spec.md
            // §4.1). Still pop the averaging buffer each tick so the
            // gateway's own convergence bookkeeping advances.
            let _ = self.imu.unread_average();
            if self.imu.calibration_status() == CalibrationStatus::Ready {
                self.startup.handle_event(StartupEvent::CalibrationDone);
            }
            return Ok(());
        }

        let Some(avg) = self.imu.unread_average() else {
            return Ok(());
        };

        match self.startup.phase() {
            StartupPhase::Seeding => {
                let gps = self.pending_gps.take();
                self.kalman.seed(&avg, gps, self.modes.kalman_bias);
                self.planner.setpoint_mut().set(StateSlot::Theta, avg.magn[2]);
                self.startup.handle_event(StartupEvent::Seeded);
                self.clock.tick_kalman(now);
                self.kalman_ran_once = true;
                log.write_line("kalman_in", now, "seeded");
            }
            StartupPhase::Ramp | StartupPhase::Free => {
                let last_kalman = self.clock.last_kalman();
                let dt_kalman = self.clock.tick_kalman(now);
                let went_backward = now < last_kalman;
                let outcome = self.timing.check(dt_kalman, went_backward);
                if let TimingOutcome::Negative = outcome {
                    let observed = last_kalman.saturating_duration_since(now);
                    log.write_line("t_err", now, "negative clock delta");
                    return Err(LoopError::negative_clock(observed));
                }
                let effective_dt = match outcome {
                    TimingOutcome::InRange(d) => d,
                    TimingOutcome::Clamped { value, warn } => {
                        if warn {
                            log.write_line("t_err", now, &format!("dt clamped to {value:?}"));
                        }
                        value
                    }
                    TimingOutcome::Negative => unreachable!("handled above"),
                };

                let gps = self.kalman_ran_once.then(|| self.pending_gps.take()).flatten();
                let w_for_kalman = if self.startup.phase() == StartupPhase::Ramp {
                    RotorSpeeds::uniform(self.motor.w_hover())
                } else {
                    self.motor.w_curr()
                };
                let _ = self.kalman.update(w_for_kalman, &avg, effective_dt, self.mass_kg, gps);
                self.kalman_ran_once = true;
                log.write_line("x_hat", now, &format!("{:?}", self.kalman.x_hat().0));

                if self.interrupted {
                    return Ok(());
                }

                self.planner.update_setpoint(self.kalman.x_hat(), self.motor.w_hover());
                let dt_motor = now.saturating_duration_since(self.motor_rate.last_dispatch());
                let desired = self.controller.control(self.kalman.x_hat(), self.planner.setpoint(), dt_motor);

                if self.startup.phase() == StartupPhase::Ramp {
                    let mut ramped = RotorSpeeds::zero();
                    for (i, w) in desired.0.iter().enumerate() {
                        ramped.0[i] = self.startup.ramp_command(*w, self.motor.w_min(), self.motor.w_hover());
                    }
                    self.startup.handle_event(StartupEvent::RampTick);
                    self.dispatch_motor(now, ramped, log);
                } else {
                    self.dispatch_motor(now, desired, log);
                }
            }
            StartupPhase::ImuWarmup | StartupPhase::Calibrating => unreachable!("handled above"),
        }

        Ok(())
    }

    fn dispatch_motor(&mut self, now: Instant, w: RotorSpeeds, log: &mut LogChannels) {
        if !self.motor_rate.due(now) {
            return;
        }
        if self.motor.set_vel_rads(w).is_ok() {
            self.motor_rate.mark_dispatched(now);
            log.write_line("w", now, &format!("{:?}", w.0));
        }
    }

    /// Apply one decoded operator keystroke. Returns `true` if the
    /// caller should report `Interrupted` this step (spec.md §4.7).
    fn apply_manual_key(&mut self, key: ManualKey, now: Instant, log: &mut LogChannels) -> bool {
        let sp = self.planner.setpoint_mut();
        match self.manual.apply(key, sp, self.mass_kg) {
            ManualEffect::Quit => {
                self.idle_motors_on_interrupt(now, log);
                true
            }
            ManualEffect::ModeToggled(enabled) => {
                log.write_line("int", now, &format!("manual mode -> {enabled}"));
                false
            }
            ManualEffect::SetpointEdited => false,
            ManualEffect::MassChanged(mass) => {
                self.mass_kg = mass;
                let _ = self.motor.update_w_hover(mass);
                false
            }
            ManualEffect::IgnoredModeOff => {
                log.write_line("int", now, "key ignored: manual mode off");
                false
            }
        }
    }

    /// Synthesize a fresh zero-origin GPS fix once per second in place of
    /// reading a real device (spec.md line 107), admissible only while
    /// the path planner is holding Hover — GPS_ZERO is a bench-test
    /// mode, not a substitute for a real fix mid-mission.
    fn synthesize_zero_gps(&mut self, now: Instant, log: &mut LogChannels) {
        if self.planner.mode() != crate::gateways::PathPlannerMode::Hover {
            return;
        }
        let due = self.clock.last_gps().is_none_or(|last| now.saturating_duration_since(last) >= Duration::from_secs(1));
        if !due {
            return;
        }
        self.clock.mark_gps(now);
        self.pending_gps = Some(GpsFix {
            pos: [0.0, 0.0, 0.0],
            fix_quality: quad_common::state::FixQuality::Fix3d,
        });
        log.write_line("gps", now, "synthesized zero-origin fix (gps_zero)");
    }

    fn idle_motors_on_interrupt(&mut self, now: Instant, log: &mut LogChannels) {
        self.interrupted = true;
        let _ = self.motor.set_idle();
        log.write_line("int", now, "interrupted: motors idled");
    }

    /// Full teardown in reverse init order (spec.md §3's Lifecycle).
    pub fn shutdown(mut self) -> Result<(), GatewayError> {
        self.motor.deinit()
    }
}

#[allow(dead_code)]
const _ASSERT_DT_DEFAULT_IN_BAND: u64 = TS_DEFAULT_US;
#[allow(dead_code)]
const _ASSERT_TIMEOUT: Duration = GPS_INIT_TIMEOUT;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateways::sim::{SimController, SimGps, SimImu, SimKalman, SimMotor, SimPathPlanner};
    use quad_common::consts::{MASA_DEFAULT, STARTUP_KALMAN, STARTUP_RUNS, TS_MIN};
    use std::fs;

    fn make_orch() -> Orchestrator<SimImu, SimGps, SimMotor, SimKalman, SimPathPlanner, SimController> {
        let modes = ModeFlags { use_gps: false, ..ModeFlags::default() };
        Orchestrator::new(
            Gateways {
                imu: SimImu::new(2),
                gps: SimGps::default(),
                motor: SimMotor::new(100.0, 900.0, MASA_DEFAULT, 200.0),
                kalman: SimKalman::new(),
                planner: SimPathPlanner::new(),
                controller: SimController::new(50.0, 300.0),
            },
            modes,
            MASA_DEFAULT,
            Instant::now(),
        )
    }

    fn readiness_none() -> Readiness {
        Readiness::default()
    }

    fn run_through_warmup(orch: &mut Orchestrator<SimImu, SimGps, SimMotor, SimKalman, SimPathPlanner, SimController>, log: &mut LogChannels, t0: Instant) -> Instant {
        let mut now = t0;
        for _ in 0..STARTUP_RUNS {
            now += TS_MIN + Duration::from_micros(500);
            orch.step(now, readiness_none(), None, log).unwrap();
        }
        now
    }

    #[test]
    fn reaches_calibrating_after_startup_runs() {
        let dir = tempfile::tempdir().unwrap();
        let t0 = Instant::now();
        let mut log = LogChannels::open(dir.path(), t0).unwrap();
        let mut orch = make_orch();
        run_through_warmup(&mut orch, &mut log, t0);
        assert_eq!(orch.phase(), StartupPhase::Calibrating);
    }

    #[test]
    fn reaches_free_control_eventually() {
        let dir = tempfile::tempdir().unwrap();
        let t0 = Instant::now();
        let mut log = LogChannels::open(dir.path(), t0).unwrap();
        let mut orch = make_orch();
        let mut now = run_through_warmup(&mut orch, &mut log, t0);

        // Calibration: a couple of polls to let SimImu's handshake flip Ready.
        for _ in 0..3 {
            now += TS_MIN;
            orch.step(now, readiness_none(), None, &mut log).unwrap();
        }
        assert_eq!(orch.phase(), StartupPhase::Seeding);

        // Seeding consumes exactly one averaged sample.
        now += TS_MIN;
        orch.step(now, readiness_none(), None, &mut log).unwrap();
        assert_eq!(orch.phase(), StartupPhase::Ramp);

        for _ in 0..=STARTUP_KALMAN {
            now += TS_MIN;
            orch.step(now, readiness_none(), None, &mut log).unwrap();
        }
        assert_eq!(orch.phase(), StartupPhase::Free);
    }

    fn run_to_free(orch: &mut Orchestrator<SimImu, SimGps, SimMotor, SimKalman, SimPathPlanner, SimController>, log: &mut LogChannels, t0: Instant) -> Instant {
        let mut now = run_through_warmup(orch, log, t0);
        for _ in 0..3 {
            now += TS_MIN;
            orch.step(now, readiness_none(), None, log).unwrap();
        }
        now += TS_MIN;
        orch.step(now, readiness_none(), None, log).unwrap();
        for _ in 0..=STARTUP_KALMAN {
            now += TS_MIN;
            orch.step(now, readiness_none(), None, log).unwrap();
        }
        assert_eq!(orch.phase(), StartupPhase::Free);
        now
    }

    #[test]
    fn scenario_2_timing_glitch_clamps_and_warns_once() {
        // spec.md §8 scenario 2: a single 30ms IMU gap once in Free
        // control is clamped to TS_MAX, warns exactly once, and does not
        // abort the loop.
        let dir = tempfile::tempdir().unwrap();
        let t0 = Instant::now();
        let mut log = LogChannels::open(dir.path(), t0).unwrap();
        let mut orch = make_orch();
        let mut now = run_to_free(&mut orch, &mut log, t0);

        now += Duration::from_millis(30);
        let outcome = orch.step(now, readiness_none(), None, &mut log).unwrap();
        assert_eq!(outcome, StepOutcome::Continue);
        assert_eq!(orch.phase(), StartupPhase::Free);

        now += TS_MIN;
        let outcome = orch.step(now, readiness_none(), None, &mut log).unwrap();
        assert_eq!(outcome, StepOutcome::Continue);

        drop(log);
        let t_err = fs::read_to_string(dir.path().join("t_err")).unwrap();
        assert_eq!(t_err.lines().count(), 1, "exactly one warning, not a flood: {t_err:?}");
    }

    #[test]
    fn initial_gps_fix_reaches_kalman_seed() {
        // spec.md §4.1 P2: x_hat is seeded from the averaged IMU sample
        // *and* GPS position if available — the initial fix captured by
        // `wait_initial_gps_fix` before the loop starts must still be
        // pending when Seeding runs, not only on later iterations.
        let dir = tempfile::tempdir().unwrap();
        let t0 = Instant::now();
        let mut log = LogChannels::open(dir.path(), t0).unwrap();
        let modes = ModeFlags { use_gps: true, ..ModeFlags::default() };
        let mut orch = Orchestrator::new(
            Gateways {
                imu: SimImu::new(2),
                gps: SimGps::new([1.0, 2.0, 3.0]),
                motor: SimMotor::new(100.0, 900.0, MASA_DEFAULT, 200.0),
                kalman: SimKalman::new(),
                planner: SimPathPlanner::new(),
                controller: SimController::new(50.0, 300.0),
            },
            modes,
            MASA_DEFAULT,
            t0,
        );
        orch.wait_initial_gps_fix().unwrap();

        let mut now = run_through_warmup(&mut orch, &mut log, t0);
        for _ in 0..3 {
            now += TS_MIN;
            orch.step(now, readiness_none(), None, &mut log).unwrap();
        }
        assert_eq!(orch.phase(), StartupPhase::Seeding);

        now += TS_MIN;
        orch.step(now, readiness_none(), None, &mut log).unwrap();
        assert_eq!(orch.phase(), StartupPhase::Ramp);

        let x_hat = orch.kalman.x_hat();
        assert_eq!(x_hat.get(StateSlot::X), 1.0);
        assert_eq!(x_hat.get(StateSlot::Y), 2.0);
        assert_eq!(x_hat.get(StateSlot::Z), 3.0);
    }

    #[test]
    fn clock_regression_in_free_control_is_a_fatal_abort() {
        // spec.md §8 scenario 3 / line 175: a backward jump in the
        // monotonic clock during Free control is a fatal timing fault,
        // not a clamp — it idles the motors and ends the loop.
        let dir = tempfile::tempdir().unwrap();
        let t0 = Instant::now();
        let mut log = LogChannels::open(dir.path(), t0).unwrap();
        let mut orch = make_orch();
        let now = run_to_free(&mut orch, &mut log, t0);

        let went_back = now - Duration::from_millis(5);
        let outcome = orch.step(went_back, readiness_none(), None, &mut log).unwrap();
        assert_eq!(outcome, StepOutcome::FatalAbort);

        drop(log);
        let t_err = fs::read_to_string(dir.path().join("t_err")).unwrap();
        assert!(t_err.contains("negative clock delta"));
    }

    #[test]
    fn scenario_5_gps_loss_mid_flight_does_not_escalate() {
        // spec.md §8 scenario 5: GPS stops producing fixes mid-flight;
        // Kalman keeps running on IMU alone and no fault is recorded.
        let dir = tempfile::tempdir().unwrap();
        let t0 = Instant::now();
        let mut log = LogChannels::open(dir.path(), t0).unwrap();
        let modes = ModeFlags { use_gps: true, ..ModeFlags::default() };
        let mut orch = Orchestrator::new(
            Gateways {
                imu: SimImu::new(2),
                gps: SimGps::default(),
                motor: SimMotor::new(100.0, 900.0, MASA_DEFAULT, 200.0),
                kalman: SimKalman::new(),
                planner: SimPathPlanner::new(),
                controller: SimController::new(50.0, 300.0),
            },
            modes,
            MASA_DEFAULT,
            t0,
        );
        orch.wait_initial_gps_fix().unwrap();
        let mut now = run_to_free(&mut orch, &mut log, t0);

        orch.gps.set_enabled(false);
        for _ in 0..10 {
            now += TS_MIN;
            let outcome = orch.step(now, Readiness { stdin: false, imu: false, gps: false }, None, &mut log).unwrap();
            assert_eq!(outcome, StepOutcome::Continue);
        }
        assert_eq!(orch.phase(), StartupPhase::Free, "Kalman must keep running without GPS");
    }

    #[test]
    fn gps_zero_synthesizes_once_per_second_in_hover() {
        // spec.md line 107: gps_zero synthesizes a fresh zero-origin fix
        // once per second, admissible while the planner holds Hover.
        let dir = tempfile::tempdir().unwrap();
        let t0 = Instant::now();
        let mut log = LogChannels::open(dir.path(), t0).unwrap();
        let modes = ModeFlags { use_gps: true, gps_zero: true, ..ModeFlags::default() };
        let mut orch = Orchestrator::new(
            Gateways {
                imu: SimImu::new(2),
                gps: SimGps::default(),
                motor: SimMotor::new(100.0, 900.0, MASA_DEFAULT, 200.0),
                kalman: SimKalman::new(),
                planner: SimPathPlanner::new(),
                controller: SimController::new(50.0, 300.0),
            },
            modes,
            MASA_DEFAULT,
            t0,
        );
        let readiness = Readiness { stdin: false, imu: false, gps: true };
        orch.step(t0, readiness, None, &mut log).unwrap();
        orch.step(t0 + Duration::from_millis(200), readiness, None, &mut log).unwrap();
        orch.step(t0 + Duration::from_millis(1_100), readiness, None, &mut log).unwrap();

        drop(log);
        let gps_log = fs::read_to_string(dir.path().join("gps")).unwrap();
        assert_eq!(gps_log.lines().count(), 2, "one synthesis at t0, one past the 1s mark: {gps_log:?}");
    }

    #[test]
    fn ol_ts_stabil_ignores_timing_during_warmup() {
        // spec.md §6 env flags / original's OL_TS_STABIL: with the flag
        // set, every IMU frame counts toward STARTUP_RUNS regardless of
        // whether its Δt is in band.
        let dir = tempfile::tempdir().unwrap();
        let t0 = Instant::now();
        let mut log = LogChannels::open(dir.path(), t0).unwrap();
        let modes = ModeFlags { use_gps: false, ol_ts_stabil: true, ..ModeFlags::default() };
        let mut orch = Orchestrator::new(
            Gateways {
                imu: SimImu::new(2),
                gps: SimGps::default(),
                motor: SimMotor::new(100.0, 900.0, MASA_DEFAULT, 200.0),
                kalman: SimKalman::new(),
                planner: SimPathPlanner::new(),
                controller: SimController::new(50.0, 300.0),
            },
            modes,
            MASA_DEFAULT,
            t0,
        );

        let mut now = t0;
        for _ in 0..STARTUP_RUNS {
            // Wildly out of band; without ol_ts_stabil this would reset
            // the counter every frame and Calibrating would never arrive.
            now += Duration::from_millis(200);
            orch.step(now, readiness_none(), None, &mut log).unwrap();
        }
        assert_eq!(orch.phase(), StartupPhase::Calibrating);
    }

    #[test]
    fn quit_key_idles_motors_and_interrupts() {
        let dir = tempfile::tempdir().unwrap();
        let t0 = Instant::now();
        let mut log = LogChannels::open(dir.path(), t0).unwrap();
        let mut orch = make_orch();
        let outcome = orch.step(t0, readiness_none(), Some(ManualKey::Quit), &mut log).unwrap();
        assert_eq!(outcome, StepOutcome::Interrupted);
        assert!(orch.interrupted());
    }
}
