//! Prelude module for common re-exports.
//!
//! # Usage
//!
//! ```rust
//! use quad_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, FlightConfig, LogLevel, ModeFlags};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::*;

// ─── State & Sensor Types ───────────────────────────────────────────
pub use crate::state::{FixQuality, GpsFix, ImuAverage, RotorSpeeds, Setpoint, StateSlot, StateVector};
