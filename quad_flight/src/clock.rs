//! Monotonic timestamps the orchestrator needs across iterations (spec
//! §3/§4): when the loop started, and when each collaborator was last
//! serviced. All marks are `Instant`-based; there is no wall-clock
//! dependency anywhere in the loop.

use std::time::{Duration, Instant};

/// The loop's start time plus the last-serviced time for each
/// collaborator, used to compute the Δt handed to timing/fault/rate
/// logic every iteration.
#[derive(Debug, Clone, Copy)]
pub struct LoopClock {
    start: Instant,
    last_imu: Instant,
    last_kalman: Instant,
    last_frame: Instant,
    last_motor_cmd: Instant,
    last_gps: Option<Instant>,
}

impl LoopClock {
    pub fn new(now: Instant) -> Self {
        Self {
            start: now,
            last_imu: now,
            last_kalman: now,
            last_frame: now,
            last_motor_cmd: now,
            last_gps: None,
        }
    }

    #[inline]
    pub fn uptime(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start)
    }

    /// Interval since the previous IMU frame, and records `now` as the
    /// new mark.
    pub fn tick_imu(&mut self, now: Instant) -> Duration {
        let dt = now.saturating_duration_since(self.last_imu);
        self.last_imu = now;
        dt
    }

    /// Interval since the previous Kalman update, and records `now` as
    /// the new mark.
    pub fn tick_kalman(&mut self, now: Instant) -> Duration {
        let dt = now.saturating_duration_since(self.last_kalman);
        self.last_kalman = now;
        dt
    }

    /// The mark `tick_kalman` last rebased against, for callers that need
    /// to detect backward motion before the saturating subtraction hides
    /// it (`now < last_kalman`).
    #[inline]
    pub fn last_kalman(&self) -> Instant {
        self.last_kalman
    }

    pub fn mark_frame(&mut self, now: Instant) {
        self.last_frame = now;
    }

    #[inline]
    pub fn last_frame(&self) -> Instant {
        self.last_frame
    }

    pub fn mark_motor_cmd(&mut self, now: Instant) {
        self.last_motor_cmd = now;
    }

    #[inline]
    pub fn last_motor_cmd(&self) -> Instant {
        self.last_motor_cmd
    }

    pub fn mark_gps(&mut self, now: Instant) {
        self.last_gps = Some(now);
    }

    #[inline]
    pub fn last_gps(&self) -> Option<Instant> {
        self.last_gps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_grows_monotonically() {
        let t0 = Instant::now();
        let clock = LoopClock::new(t0);
        assert_eq!(clock.uptime(t0), Duration::ZERO);
        assert_eq!(clock.uptime(t0 + Duration::from_secs(1)), Duration::from_secs(1));
    }

    #[test]
    fn tick_imu_returns_interval_and_rebases() {
        let t0 = Instant::now();
        let mut clock = LoopClock::new(t0);
        let t1 = t0 + Duration::from_micros(10_000);
        assert_eq!(clock.tick_imu(t1), Duration::from_micros(10_000));
        let t2 = t1 + Duration::from_micros(5_000);
        assert_eq!(clock.tick_imu(t2), Duration::from_micros(5_000));
    }

    #[test]
    fn gps_mark_starts_unset() {
        let t0 = Instant::now();
        let mut clock = LoopClock::new(t0);
        assert!(clock.last_gps().is_none());
        clock.mark_gps(t0);
        assert_eq!(clock.last_gps(), Some(t0));
    }
}
