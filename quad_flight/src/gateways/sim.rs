//! Deterministic in-process gateway implementations.
//!
//! These stand in for the real IMU/GPS/motor/Kalman/path-planner/
//! controller drivers, which spec.md places out of scope. They exist so
//! the orchestrator is buildable and its control flow testable end to
//! end, the way `evo_hal::drivers::simulation::SimulationDriver`
//! substitutes for real hardware in the teacher's workspace — not to
//! claim any sensor physics or filter numerics.

use std::os::unix::io::RawFd;
use std::time::Duration;

use quad_common::consts::ROTOR_COUNT;
use quad_common::state::{FixQuality, GpsFix, ImuAverage, RotorSpeeds, Setpoint, StateSlot, StateVector};

use crate::error::GatewayError;

use super::{CalibrationStatus, ControllerGateway, GpsGateway, ImuGateway, KalmanGateway, MotorGateway, PathPlannerGateway, PathPlannerMode};

/// Deterministic IMU source: yields one frame per call, and models the
/// calibration handshake as a fixed number of `calibration_status` polls.
pub struct SimImu {
    status: CalibrationStatus,
    calib_polls_remaining: u32,
    frames_read: u64,
    null_estimate: ImuAverage,
    z0: f64,
}

impl SimImu {
    /// `calib_polls` is how many `calibration_status()` calls after
    /// `start_calibration()` it takes to report `Ready` — a stand-in for
    /// the real driver's convergence time.
    pub fn new(calib_polls: u32) -> Self {
        Self {
            status: CalibrationStatus::NoEstimate,
            calib_polls_remaining: calib_polls,
            frames_read: 0,
            null_estimate: ImuAverage {
                acc: [0.0, 0.0, 9.81],
                gyro: [0.0, 0.0, 0.0],
                magn: [0.01, 0.02, 0.03],
                dt: Duration::from_micros(0),
            },
            z0: 0.0,
        }
    }
}

impl Default for SimImu {
    fn default() -> Self {
        Self::new(5)
    }
}

impl ImuGateway for SimImu {
    fn fd(&self) -> Option<RawFd> {
        None
    }

    fn read_frame(&mut self) -> Result<bool, GatewayError> {
        self.frames_read += 1;
        Ok(true)
    }

    fn calibration_status(&self) -> CalibrationStatus {
        self.status
    }

    fn start_calibration(&mut self) -> Result<(), GatewayError> {
        self.status = CalibrationStatus::Calibrating;
        Ok(())
    }

    fn calib_null_estimate(&self) -> ImuAverage {
        self.null_estimate
    }

    fn unread_average(&mut self) -> Option<ImuAverage> {
        // Drive the calibration handshake forward on each poll.
        if self.status == CalibrationStatus::Calibrating {
            if self.calib_polls_remaining == 0 {
                self.status = CalibrationStatus::Ready;
            } else {
                self.calib_polls_remaining -= 1;
                return None;
            }
        }
        if self.status != CalibrationStatus::Ready {
            return None;
        }
        Some(ImuAverage {
            acc: [0.0, 0.0, 9.81],
            gyro: [0.0, 0.0, 0.0],
            magn: self.null_estimate.magn,
            dt: Duration::from_micros(0),
        })
    }

    fn set_z0(&mut self, z0: f64) {
        self.z0 = z0;
    }
}

/// Deterministic GPS source: a fixed 3D fix at a configured local-frame
/// position, always available.
pub struct SimGps {
    fix: GpsFix,
    enabled: bool,
}

impl SimGps {
    pub fn new(pos: [f64; 3]) -> Self {
        Self {
            fix: GpsFix {
                pos,
                fix_quality: FixQuality::Fix3d,
            },
            enabled: true,
        }
    }
}

impl Default for SimGps {
    fn default() -> Self {
        Self::new([0.0, 0.0, 0.0])
    }
}

impl SimGps {
    /// Simulate fix loss (`enabled = false`) or recovery, for scenarios
    /// that exercise GPS dropout mid-flight.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl GpsGateway for SimGps {
    fn fd(&self) -> Option<RawFd> {
        None
    }

    fn read(&mut self) -> Result<Option<GpsFix>, GatewayError> {
        Ok(self.enabled.then_some(self.fix))
    }

    fn wait_initial_fix(&mut self, _timeout: Duration) -> Result<GpsFix, GatewayError> {
        Ok(self.fix)
    }
}

/// Deterministic motor transport: clamps commanded speeds and derives
/// `w_hover` from mass with a simple linear model (real thrust curves are
/// the out-of-scope motor driver's concern).
pub struct SimMotor {
    w_curr: RotorSpeeds,
    w_min: f64,
    w_max: f64,
    weight_kg: f64,
    hover_gain: f64,
}

impl SimMotor {
    pub fn new(w_min: f64, w_max: f64, weight_kg: f64, hover_gain: f64) -> Self {
        Self {
            w_curr: RotorSpeeds::zero(),
            w_min,
            w_max,
            weight_kg,
            hover_gain,
        }
    }
}

impl Default for SimMotor {
    fn default() -> Self {
        Self::new(100.0, 900.0, quad_common::consts::MASA_DEFAULT, 200.0)
    }
}

impl MotorGateway for SimMotor {
    fn set_idle(&mut self) -> Result<(), GatewayError> {
        self.w_curr = RotorSpeeds::uniform(self.w_min);
        Ok(())
    }

    fn set_vel_rads(&mut self, mut w: RotorSpeeds) -> Result<(), GatewayError> {
        w.clamp(self.w_min, self.w_max);
        self.w_curr = w;
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), GatewayError> {
        self.w_curr = RotorSpeeds::zero();
        Ok(())
    }

    fn w_curr(&self) -> RotorSpeeds {
        self.w_curr
    }

    fn w_min(&self) -> f64 {
        self.w_min
    }

    fn w_hover(&self) -> f64 {
        self.w_min + self.weight_kg * self.hover_gain
    }

    fn weight(&self) -> f64 {
        self.weight_kg
    }

    fn update_w_hover(&mut self, mass_kg: f64) -> Result<(), GatewayError> {
        if mass_kg <= 0.0 {
            return Err(GatewayError::Fatal("motor", "mass must be positive".into()));
        }
        self.weight_kg = mass_kg;
        Ok(())
    }
}

/// Deterministic filter stand-in: a first-order complementary integrator
/// over the averaged IMU sample. Structurally valid, numerically naive.
pub struct SimKalman {
    x_hat: StateVector,
}

impl SimKalman {
    pub fn new() -> Self {
        Self {
            x_hat: StateVector::zero(),
        }
    }
}

impl Default for SimKalman {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanGateway for SimKalman {
    fn update(
        &mut self,
        _w: RotorSpeeds,
        imu: &ImuAverage,
        dt: Duration,
        _mass_kg: f64,
        gps: Option<GpsFix>,
    ) -> Result<(), GatewayError> {
        let dt_s = dt.as_secs_f64();
        let psi = self.x_hat.get(StateSlot::Psi) + imu.gyro[2] * dt_s;
        let phi = self.x_hat.get(StateSlot::Phi) + imu.gyro[1] * dt_s;
        let theta = self.x_hat.get(StateSlot::Theta) + imu.gyro[0] * dt_s;
        self.x_hat.set(StateSlot::Psi, psi);
        self.x_hat.set(StateSlot::Phi, phi);
        self.x_hat.set(StateSlot::Theta, theta);
        if let Some(fix) = gps {
            self.x_hat.set(StateSlot::X, fix.pos[0]);
            self.x_hat.set(StateSlot::Y, fix.pos[1]);
            self.x_hat.set(StateSlot::Z, fix.pos[2]);
        }
        Ok(())
    }

    fn x_hat(&self) -> &StateVector {
        &self.x_hat
    }

    fn seed(&mut self, null_estimate: &ImuAverage, gps: Option<GpsFix>, kalman_bias: bool) {
        self.x_hat = StateVector::zero();
        self.x_hat.set(StateSlot::Psi, null_estimate.magn[0]);
        self.x_hat.set(StateSlot::Phi, null_estimate.magn[1]);
        self.x_hat.set(StateSlot::Theta, null_estimate.magn[2]);
        if let Some(fix) = gps {
            self.x_hat.set(StateSlot::X, fix.pos[0]);
            self.x_hat.set(StateSlot::Y, fix.pos[1]);
            self.x_hat.set(StateSlot::Z, fix.pos[2]);
        }
        if kalman_bias {
            self.x_hat.set(StateSlot::Bax, null_estimate.acc[0]);
            self.x_hat.set(StateSlot::Bay, null_estimate.acc[1]);
            self.x_hat.set(StateSlot::Baz, null_estimate.acc[2] - 9.81);
        }
    }
}

/// Hover-mode path planner: setpoint is seeded once and stays stationary
/// (glossary: "HOVER mode"), matching spec.md §4.6's minimal contract.
pub struct SimPathPlanner {
    sp: Setpoint,
}

impl SimPathPlanner {
    pub fn new() -> Self {
        Self {
            sp: Setpoint::zero(),
        }
    }
}

impl Default for SimPathPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl PathPlannerGateway for SimPathPlanner {
    fn mode(&self) -> PathPlannerMode {
        PathPlannerMode::Hover
    }

    fn setpoint(&self) -> &Setpoint {
        &self.sp
    }

    fn setpoint_mut(&mut self) -> &mut Setpoint {
        &mut self.sp
    }

    fn update_setpoint(&mut self, _x_hat: &StateVector, _w_hover: f64) {
        // Hover: setpoint stays put once seeded.
    }
}

/// Proportional attitude controller producing per-rotor speed commands
/// around the hover point — the minimal structurally valid stand-in for
/// the out-of-scope control law.
pub struct SimController {
    kp: f64,
    w_hover: f64,
}

impl SimController {
    pub fn new(kp: f64, w_hover: f64) -> Self {
        Self { kp, w_hover }
    }
}

impl Default for SimController {
    fn default() -> Self {
        Self::new(50.0, 300.0)
    }
}

impl ControllerGateway for SimController {
    fn control(&mut self, x_hat: &StateVector, sp: &Setpoint, _dt: Duration) -> RotorSpeeds {
        let err_phi = sp.get(StateSlot::Phi) - x_hat.get(StateSlot::Phi);
        let err_theta = sp.get(StateSlot::Theta) - x_hat.get(StateSlot::Theta);
        let mut w = [self.w_hover; ROTOR_COUNT];
        w[0] += self.kp * err_phi;
        w[1] -= self.kp * err_phi;
        w[2] += self.kp * err_theta;
        w[3] -= self.kp * err_theta;
        RotorSpeeds(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imu_reaches_ready_after_calib_polls() {
        let mut imu = SimImu::new(2);
        imu.start_calibration().unwrap();
        assert!(imu.unread_average().is_none());
        assert!(imu.unread_average().is_none());
        assert!(imu.unread_average().is_some());
        assert_eq!(imu.calibration_status(), CalibrationStatus::Ready);
    }

    #[test]
    fn motor_clamps_commanded_speed() {
        let mut motor = SimMotor::new(100.0, 400.0, 1.0, 200.0);
        motor.set_vel_rads(RotorSpeeds([50.0, 500.0, 200.0, -10.0])).unwrap();
        assert_eq!(motor.w_curr().0, [100.0, 400.0, 200.0, 100.0]);
    }

    #[test]
    fn motor_rejects_nonpositive_mass() {
        let mut motor = SimMotor::default();
        assert!(motor.update_w_hover(0.0).is_err());
    }

    #[test]
    fn kalman_seed_sets_euler_from_magnetometer() {
        let mut k = SimKalman::new();
        let imu = ImuAverage {
            acc: [0.0, 0.0, 9.81],
            gyro: [0.0; 3],
            magn: [0.1, 0.2, 0.3],
            dt: Duration::from_micros(0),
        };
        k.seed(&imu, None, false);
        assert_eq!(k.x_hat().get(StateSlot::Psi), 0.1);
        assert_eq!(k.x_hat().get(StateSlot::Phi), 0.2);
        assert_eq!(k.x_hat().get(StateSlot::Theta), 0.3);
    }

    #[test]
    fn controller_zero_error_holds_hover() {
        let mut ctrl = SimController::new(50.0, 300.0);
        let x_hat = StateVector::zero();
        let sp = Setpoint::zero();
        let w = ctrl.control(&x_hat, &sp, Duration::from_micros(4_000));
        assert_eq!(w.0, [300.0; 4]);
    }
}
