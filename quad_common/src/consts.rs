//! System-wide constants for the flight-control workspace.
//!
//! Single source of truth for every numeric limit named in the loop's
//! timing, startup, and fault-accounting rules. Bit-level values matter
//! here: a recorded IMU log replayed against these constants must drive
//! the same startup/ramp/timing-gate transitions as the live run.

use std::time::Duration;

/// Number of consecutive in-band IMU intervals required to leave P0 (IMU warmup).
pub const STARTUP_RUNS: u32 = 10;

/// Number of Kalman updates in the P3 ramp before free control (P4).
pub const STARTUP_KALMAN: u32 = 100;

/// Minimum allowed IMU-sample interval.
pub const TS_MIN: Duration = Duration::from_micros(9_000);

/// Maximum allowed IMU-sample interval.
pub const TS_MAX: Duration = Duration::from_micros(15_000);

/// Synthetic Δt fed to the first Kalman call (P2 seeding).
pub const TS_DEFAULT_US: u64 = 10_000;

/// Number of out-of-range Δt events to suppress between timing warnings.
pub const TS_ERROR_WAIT: u32 = 100;

/// Minimum interval between motor command dispatches.
pub const MOT_UPDATE_T: Duration = Duration::from_micros(4_000);

/// Consecutive-error threshold above which the loop aborts.
pub const MAX_ERRORS: u32 = 20;

/// Consecutive-OK threshold required to clear an error streak.
pub const FIXED: u32 = 3;

/// Timeout waiting for an initial GPS fix during init.
pub const GPS_INIT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default log directory when none is given on the command line.
pub const DEFAULT_LOG_DIR: &str = "/var/log/quad-flight";

/// Default vehicle mass [kg], restored by `WEIGHT_RESET`.
pub const MASA_DEFAULT: f64 = 1.0;

/// Per-keystroke Euler-angle adjustment in manual mode [rad].
pub const MANUAL_EULER_STEP: f64 = 0.05;

/// Per-keystroke altitude adjustment in manual mode [m].
pub const MANUAL_Z_STEP: f64 = 0.05;

/// Per-keystroke mass adjustment in manual mode [kg].
pub const MANUAL_WEIGHT_STEP: f64 = 0.05;

/// Number of rotors on the vehicle.
pub const ROTOR_COUNT: usize = 4;
