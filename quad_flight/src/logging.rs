//! Per-channel append-only logging facade (spec §5, C9): one text file
//! per channel under `log_dir`, each line prefixed with elapsed
//! `tv_sec.tv_usec` relative to the loop's start. Side-effect-free from
//! the orchestrator's perspective: a write failure degrades to a
//! `tracing` warning rather than aborting the loop.

use std::fs::{self, File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;

/// The fixed channel set named in spec.md §5.
pub const CHANNELS: &[&str] = &[
    "err", "imu_raw", "imu_data", "imu_avg", "w", "w_ctrl", "x_hat", "kalman_in", "gps", "tv", "t_err", "int", "buk",
];

#[derive(Debug, Error)]
pub enum LogError {
    #[error("unknown log channel: {0}")]
    UnknownChannel(String),
    #[error("failed to open log directory {0}: {1}")]
    Open(PathBuf, std::io::Error),
}

/// Handles for every channel, opened once at init in append mode.
pub struct LogChannels {
    files: heapless::index_map::FnvIndexMap<&'static str, File, 16>,
    start: Instant,
}

impl LogChannels {
    /// Open (creating if needed) every channel file under `log_dir`.
    pub fn open(log_dir: &Path, start: Instant) -> Result<Self, LogError> {
        fs::create_dir_all(log_dir).map_err(|e| LogError::Open(log_dir.to_path_buf(), e))?;

        let mut files = heapless::index_map::FnvIndexMap::new();
        for &channel in CHANNELS {
            let path = log_dir.join(channel);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| LogError::Open(path, e))?;
            files
                .insert(channel, file)
                .unwrap_or_else(|_| panic!("CHANNELS exceeds FnvIndexMap capacity"));
        }
        Ok(Self { files, start })
    }

    /// Append one timestamped line to `channel`. A failed write is
    /// logged via `tracing` and otherwise swallowed: logging must never
    /// take down the control loop (spec.md §5, C9).
    pub fn write_line(&mut self, channel: &str, now: Instant, body: &str) {
        let Some(file) = self.files.get_mut(channel) else {
            tracing::warn!(channel, "write to unknown log channel");
            return;
        };
        let elapsed = now.saturating_duration_since(self.start);
        if let Err(e) = writeln!(file, "{} {}", format_elapsed(elapsed), body) {
            tracing::warn!(channel, error = %e, "log write failed");
        }
    }
}

fn format_elapsed(d: Duration) -> String {
    format!("{}.{:06}", d.as_secs(), d.subsec_micros())
}

/// Install the process-wide `tracing` subscriber per `log_level`
/// (spec.md §9's ambient stack: operational logs go through `tracing`,
/// per-channel data logs go through [`LogChannels`]).
pub fn init_tracing(log_level: quad_common::config::LogLevel) {
    use quad_common::config::LogLevel;
    use tracing_subscriber::EnvFilter;

    let level = match log_level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
