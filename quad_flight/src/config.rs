//! CLI surface (spec §6): `quad-flight <IMU_DEVICE> [LOG_DIR] [GPS_DEVICE]`,
//! merged with an optional TOML file via [`quad_common::config`].
//!
//! `imu_device` of [`Cli::IMU_SIM_SENTINEL`] selects the in-process
//! simulated IMU; any other value is a path to a recorded JSON-lines log
//! replayed via [`crate::gateways::replay::ReplayImu`]. Omitting
//! `gps_device` selects the simulated/local-GPS path; providing one
//! selects GPS-from-logfile replay via
//! [`crate::gateways::replay::ReplayGps`]. Neither is a real device
//! driver here (spec.md scopes those out) — the path only threads
//! through which [`crate::gateways::GpsGateway`]/
//! [`crate::gateways::ImuGateway`] `main` constructs.

use std::path::PathBuf;

use clap::Parser;

use quad_common::config::{ConfigError, ConfigLoader, FlightConfig};
use quad_common::consts::DEFAULT_LOG_DIR;

/// Command-line arguments, named after the original's positional
/// invocation order.
#[derive(Debug, Parser)]
#[command(name = "quad-flight", about = "Real-time quadrotor flight-control loop")]
pub struct Cli {
    /// IMU device path, or [`Cli::IMU_SIM_SENTINEL`] for the in-process
    /// simulated IMU.
    pub imu_device: String,

    /// Directory for the per-channel log files.
    #[arg(default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,

    /// GPS replay-log path. Omit for the simulated GPS source.
    pub gps_device: Option<String>,

    /// Optional TOML config file merged over the built-in defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// `imu_device` value selecting the in-process simulated IMU rather
    /// than a recorded-log path to replay.
    pub const IMU_SIM_SENTINEL: &'static str = "sim";

    /// Resolve the full [`FlightConfig`], honoring `--config` if given.
    pub fn resolve_config(&self) -> Result<FlightConfig, ConfigError> {
        let cfg = match &self.config {
            Some(path) => FlightConfig::load(path)?,
            None => FlightConfig::default(),
        };
        cfg.validate()?;
        Ok(cfg)
    }
}
