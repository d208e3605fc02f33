//! Loop-level error types.
//!
//! Mirrors the teacher's `CycleError`: a small `thiserror` enum per
//! concern, `Display` derived, convertible at the boundary, no `unwrap`
//! outside tests.

use std::time::Duration;
use thiserror::Error;

/// Error surfaced by a sensor/actuator gateway for one iteration.
///
/// Gateways never hand the orchestrator a sentinel "ok" value mixed
/// with real data — either the call returns `Ok(sample)` or one of
/// these variants, and the orchestrator decides what happens next.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GatewayError {
    /// Transient read/parse hiccup; accumulated into fault hysteresis.
    #[error("transient {0} error: {1}")]
    Transient(&'static str, String),
    /// The device failed in a way that cannot be recovered by retrying.
    #[error("fatal {0} error: {1}")]
    Fatal(&'static str, String),
}

/// A timing anomaly detected by the [`crate::timing::TimingGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingFault {
    /// Δt fell outside `[TS_MIN, TS_MAX]` and was clamped to the bound.
    OutOfRange,
    /// Δt was negative (clock ran backward).
    Negative,
}

/// Top-level error for one iteration or for the loop as a whole.
#[derive(Debug, Error)]
pub enum LoopError {
    #[error("timing fault: {0:?}")]
    Timing(TimingFault),

    #[error("sensor gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("fatal: {0}")]
    Fatal(String),
}

impl LoopError {
    /// Build the fatal error for a sustained negative clock delta.
    pub fn negative_clock(observed: Duration) -> Self {
        LoopError::Fatal(format!(
            "clock ran backward: observed delta {:?} is negative",
            observed
        ))
    }

    /// Build the fatal error for exceeding the consecutive-error budget.
    pub fn too_many_errors(count: u32, max: u32) -> Self {
        LoopError::Fatal(format!(
            "consecutive error count {count} exceeded budget {max}"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_informative() {
        let e = GatewayError::Transient("imu", "short read".into());
        assert!(e.to_string().contains("imu"));
        assert!(e.to_string().contains("short read"));
    }

    #[test]
    fn fatal_messages_mention_cause() {
        let e = LoopError::too_many_errors(21, 20);
        assert!(e.to_string().contains("21"));
        assert!(e.to_string().contains("20"));
    }
}
