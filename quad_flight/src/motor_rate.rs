//! Motor update rate limiter (spec §4.3): dispatch only when the wall
//! interval since the last successful dispatch exceeds `MOT_UPDATE_T`
//! microseconds or one second has elapsed.

use std::time::{Duration, Instant};

use quad_common::consts::MOT_UPDATE_T;

/// Tracks the last successful motor dispatch time.
#[derive(Debug, Clone, Copy)]
pub struct MotorRateLimiter {
    last_dispatch: Instant,
}

impl MotorRateLimiter {
    pub fn new(now: Instant) -> Self {
        Self { last_dispatch: now }
    }

    /// True if a dispatch is due at `now`.
    pub fn due(&self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_dispatch);
        elapsed >= MOT_UPDATE_T || elapsed >= Duration::from_secs(1)
    }

    /// Record that a dispatch happened at `now`.
    pub fn mark_dispatched(&mut self, now: Instant) {
        self.last_dispatch = now;
    }

    #[inline]
    pub fn last_dispatch(&self) -> Instant {
        self.last_dispatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_due_immediately() {
        let t0 = Instant::now();
        let limiter = MotorRateLimiter::new(t0);
        assert!(!limiter.due(t0 + Duration::from_micros(1_000)));
    }

    #[test]
    fn due_after_mot_update_t() {
        let t0 = Instant::now();
        let limiter = MotorRateLimiter::new(t0);
        assert!(limiter.due(t0 + MOT_UPDATE_T + Duration::from_micros(1)));
    }

    #[test]
    fn due_after_one_second_even_if_under_mot_update_t() {
        // MOT_UPDATE_T is microseconds-scale; one full second always wins.
        let t0 = Instant::now();
        let limiter = MotorRateLimiter::new(t0);
        assert!(limiter.due(t0 + Duration::from_secs(1)));
    }

    #[test]
    fn mark_dispatched_resets_window() {
        let t0 = Instant::now();
        let mut limiter = MotorRateLimiter::new(t0);
        let t1 = t0 + MOT_UPDATE_T + Duration::from_micros(1);
        assert!(limiter.due(t1));
        limiter.mark_dispatched(t1);
        assert!(!limiter.due(t1 + Duration::from_micros(1)));
    }
}
