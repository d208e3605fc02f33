//! Gateway trait contracts (spec §2, C2–C6): the narrow interfaces the
//! orchestrator consumes for every external collaborator that is out of
//! scope for this crate (IMU driver, GPS parser, motor transport, Kalman
//! numerics, path planner, controller).
//!
//! Mirrors the teacher's `HalDriver` trait shape (`evo_common::hal::
//! driver::HalDriver`): a small lifecycle-oriented trait returning
//! `Result<_, GatewayError>`, with a deterministic `sim` implementation
//! substituting for real hardware/numerics.

pub mod replay;
pub mod sim;

use std::os::unix::io::RawFd;
use std::time::Duration;

use quad_common::state::{GpsFix, ImuAverage, RotorSpeeds, Setpoint, StateVector};

use crate::error::GatewayError;

/// IMU calibration lifecycle, as polled by the orchestrator during P1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStatus {
    Calibrating,
    NoEstimate,
    Ready,
}

/// IMU gateway (C2): raw frame reads, calibration, averaged samples.
pub trait ImuGateway {
    /// Descriptor to register with the [`crate::io::Multiplexer`], if the
    /// gateway is backed by a real device.
    fn fd(&self) -> Option<RawFd>;

    /// Read one raw frame. Returns whether a frame was actually produced
    /// (`imu_update` in spec.md's C source) — a ready descriptor does not
    /// guarantee a full frame.
    fn read_frame(&mut self) -> Result<bool, GatewayError>;

    fn calibration_status(&self) -> CalibrationStatus;

    fn start_calibration(&mut self) -> Result<(), GatewayError>;

    /// The null estimate built during calibration, used to seed `x_hat`.
    fn calib_null_estimate(&self) -> ImuAverage;

    /// Pop the next averaged sample if both "unread" and "average ready"
    /// hold (spec.md §4.1 P2 entry condition).
    fn unread_average(&mut self) -> Option<ImuAverage>;

    /// Inform the IMU of the GPS-derived starting altitude.
    fn set_z0(&mut self, z0: f64);
}

/// GPS gateway (C2): fix reads and 3D-fix check.
pub trait GpsGateway {
    fn fd(&self) -> Option<RawFd>;

    /// Non-blocking read of the next fix, if any is pending.
    fn read(&mut self) -> Result<Option<GpsFix>, GatewayError>;

    /// Block (bounded by `timeout`) for the first fix during init.
    fn wait_initial_fix(&mut self, timeout: Duration) -> Result<GpsFix, GatewayError>;
}

/// Motor gateway (C3): idle, set velocity, deinit, and the bookkeeping
/// fields the orchestrator reads every iteration.
pub trait MotorGateway {
    fn set_idle(&mut self) -> Result<(), GatewayError>;

    fn set_vel_rads(&mut self, w: RotorSpeeds) -> Result<(), GatewayError>;

    fn deinit(&mut self) -> Result<(), GatewayError>;

    fn w_curr(&self) -> RotorSpeeds;
    fn w_min(&self) -> f64;
    fn w_hover(&self) -> f64;
    fn weight(&self) -> f64;

    /// Re-derive `w_hover` from a new vehicle mass (spec.md §4.7).
    fn update_w_hover(&mut self, mass_kg: f64) -> Result<(), GatewayError>;
}

/// State estimator gateway (C4): the Kalman filter's narrow interface.
pub trait KalmanGateway {
    fn update(
        &mut self,
        w: RotorSpeeds,
        imu: &ImuAverage,
        dt: Duration,
        mass_kg: f64,
        gps: Option<GpsFix>,
    ) -> Result<(), GatewayError>;

    fn x_hat(&self) -> &StateVector;

    /// Seed `x_hat` from the calibration null-estimate and, if available,
    /// an initial GPS position (spec.md §4.1 P2).
    fn seed(&mut self, null_estimate: &ImuAverage, gps: Option<GpsFix>, kalman_bias: bool);
}

/// Operating mode the path planner is in; only `Hover` is defined here,
/// matching spec.md's glossary and the only mode the orchestrator's
/// seeding/zero-GPS logic depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPlannerMode {
    Hover,
}

/// Path planner gateway (C5): owns and refreshes the setpoint.
pub trait PathPlannerGateway {
    fn mode(&self) -> PathPlannerMode;

    fn setpoint(&self) -> &Setpoint;
    fn setpoint_mut(&mut self) -> &mut Setpoint;

    fn update_setpoint(&mut self, x_hat: &StateVector, w_hover: f64);
}

/// Controller gateway (C6): setpoint + state → desired rotor speeds.
pub trait ControllerGateway {
    fn control(&mut self, x_hat: &StateVector, sp: &Setpoint, dt: Duration) -> RotorSpeeds;
}

/// Which IMU backend `main` wired up, chosen from the `imu_device` CLI
/// argument: the sim sentinel, or a recorded-log path to replay.
pub enum ImuSource {
    Sim(sim::SimImu),
    Replay(replay::ReplayImu),
}

impl ImuSource {
    /// Delay before the next recorded frame is due, for the poll loop's
    /// sleep-to-match-timestamps cadence under `ModeFlags::imu_comm_fake`
    /// (spec.md line 136). `None` outside replay mode.
    pub fn next_replay_delay(&self, elapsed: Duration) -> Option<Duration> {
        match self {
            ImuSource::Sim(_) => None,
            ImuSource::Replay(r) => r.next_frame_t_us().map(|t_us| Duration::from_micros(t_us).saturating_sub(elapsed)),
        }
    }
}

impl ImuGateway for ImuSource {
    fn fd(&self) -> Option<RawFd> {
        match self {
            ImuSource::Sim(g) => g.fd(),
            ImuSource::Replay(g) => g.fd(),
        }
    }

    fn read_frame(&mut self) -> Result<bool, GatewayError> {
        match self {
            ImuSource::Sim(g) => g.read_frame(),
            ImuSource::Replay(g) => g.read_frame(),
        }
    }

    fn calibration_status(&self) -> CalibrationStatus {
        match self {
            ImuSource::Sim(g) => g.calibration_status(),
            ImuSource::Replay(g) => g.calibration_status(),
        }
    }

    fn start_calibration(&mut self) -> Result<(), GatewayError> {
        match self {
            ImuSource::Sim(g) => g.start_calibration(),
            ImuSource::Replay(g) => g.start_calibration(),
        }
    }

    fn calib_null_estimate(&self) -> ImuAverage {
        match self {
            ImuSource::Sim(g) => g.calib_null_estimate(),
            ImuSource::Replay(g) => g.calib_null_estimate(),
        }
    }

    fn unread_average(&mut self) -> Option<ImuAverage> {
        match self {
            ImuSource::Sim(g) => g.unread_average(),
            ImuSource::Replay(g) => g.unread_average(),
        }
    }

    fn set_z0(&mut self, z0: f64) {
        match self {
            ImuSource::Sim(g) => g.set_z0(z0),
            ImuSource::Replay(g) => g.set_z0(z0),
        }
    }
}

/// Which GPS backend `main` wired up, chosen from the optional
/// `gps_device` CLI argument: the simulated local-origin fix, or a
/// recorded-log path to replay.
pub enum GpsSource {
    Sim(sim::SimGps),
    Replay(replay::ReplayGps),
}

impl GpsGateway for GpsSource {
    fn fd(&self) -> Option<RawFd> {
        match self {
            GpsSource::Sim(g) => g.fd(),
            GpsSource::Replay(g) => g.fd(),
        }
    }

    fn read(&mut self) -> Result<Option<GpsFix>, GatewayError> {
        match self {
            GpsSource::Sim(g) => g.read(),
            GpsSource::Replay(g) => g.read(),
        }
    }

    fn wait_initial_fix(&mut self, timeout: Duration) -> Result<GpsFix, GatewayError> {
        match self {
            GpsSource::Sim(g) => g.wait_initial_fix(timeout),
            GpsSource::Replay(g) => g.wait_initial_fix(timeout),
        }
    }
}
