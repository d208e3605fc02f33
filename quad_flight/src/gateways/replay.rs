//! File-backed replay gateways for the CLI's device-path arguments
//! (spec.md §6 CLI contract). Each log is a JSON-lines file, one record
//! per sample, loaded eagerly the way the teacher's `StatePersistence`
//! loads a whole persisted-state file up front rather than streaming it.

use std::fs;
use std::os::unix::io::RawFd;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use quad_common::state::{FixQuality, GpsFix, ImuAverage};

use crate::error::GatewayError;

use super::{CalibrationStatus, GpsGateway, ImuGateway};

#[derive(Debug, Clone, Deserialize)]
struct ImuRecord {
    /// Microseconds since the recording started; used to pace replay
    /// (`ModeFlags::imu_comm_fake`) to match the original cadence.
    t_us: u64,
    acc: [f64; 3],
    gyro: [f64; 3],
    magn: [f64; 3],
}

fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path, kind: &'static str) -> Result<Vec<T>, GatewayError> {
    let text = fs::read_to_string(path)
        .map_err(|e| GatewayError::Fatal(kind, format!("failed to open replay log {}: {e}", path.display())))?;
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).map_err(|e| GatewayError::Fatal(kind, format!("malformed replay record: {e}"))))
        .collect()
}

/// Replays a recorded IMU log instead of polling a live device. No
/// calibration handshake to wait out: the recorded samples are already
/// post-averaging, so `start_calibration` completes immediately.
pub struct ReplayImu {
    frames: Vec<ImuRecord>,
    cursor: usize,
    status: CalibrationStatus,
    null_estimate: ImuAverage,
    z0: f64,
}

impl ReplayImu {
    pub fn open(path: &Path) -> Result<Self, GatewayError> {
        let frames: Vec<ImuRecord> = read_jsonl(path, "imu")?;
        let null_estimate = frames
            .first()
            .map(|r| ImuAverage { acc: r.acc, gyro: [0.0; 3], magn: r.magn, dt: Duration::ZERO })
            .unwrap_or(ImuAverage::zero());
        Ok(Self { frames, cursor: 0, status: CalibrationStatus::NoEstimate, null_estimate, z0: 0.0 })
    }

    /// Recorded timestamp of the next frame to be replayed, for the
    /// poll loop's sleep-to-match-timestamps delay (spec.md line 136).
    pub fn next_frame_t_us(&self) -> Option<u64> {
        self.frames.get(self.cursor).map(|r| r.t_us)
    }
}

impl ImuGateway for ReplayImu {
    fn fd(&self) -> Option<RawFd> {
        None
    }

    fn read_frame(&mut self) -> Result<bool, GatewayError> {
        Ok(self.cursor < self.frames.len())
    }

    fn calibration_status(&self) -> CalibrationStatus {
        self.status
    }

    fn start_calibration(&mut self) -> Result<(), GatewayError> {
        self.status = CalibrationStatus::Ready;
        Ok(())
    }

    fn calib_null_estimate(&self) -> ImuAverage {
        self.null_estimate
    }

    fn unread_average(&mut self) -> Option<ImuAverage> {
        let record = self.frames.get(self.cursor)?;
        self.cursor += 1;
        Some(ImuAverage { acc: record.acc, gyro: record.gyro, magn: record.magn, dt: Duration::from_micros(record.t_us) })
    }

    fn set_z0(&mut self, z0: f64) {
        self.z0 = z0;
    }
}

#[derive(Debug, Clone, Deserialize)]
struct GpsRecord {
    pos: [f64; 3],
}

/// Replays a recorded GPS fix log instead of polling a live receiver.
pub struct ReplayGps {
    fixes: Vec<GpsRecord>,
    cursor: usize,
}

impl ReplayGps {
    pub fn open(path: &Path) -> Result<Self, GatewayError> {
        let fixes: Vec<GpsRecord> = read_jsonl(path, "gps")?;
        Ok(Self { fixes, cursor: 0 })
    }
}

impl GpsGateway for ReplayGps {
    fn fd(&self) -> Option<RawFd> {
        None
    }

    fn read(&mut self) -> Result<Option<GpsFix>, GatewayError> {
        let Some(record) = self.fixes.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        Ok(Some(GpsFix { pos: record.pos, fix_quality: FixQuality::Fix3d }))
    }

    fn wait_initial_fix(&mut self, _timeout: Duration) -> Result<GpsFix, GatewayError> {
        self.fixes
            .first()
            .map(|r| GpsFix { pos: r.pos, fix_quality: FixQuality::Fix3d })
            .ok_or_else(|| GatewayError::Fatal("gps", "replay log is empty".into()))
    }
}
