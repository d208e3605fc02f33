//! Fault accounting (spec §4.4): consecutive-error / consecutive-OK
//! hysteresis, gated on IMU warmup having completed per spec.md §9's
//! first Open Question (see DESIGN.md).

use quad_common::consts::{FIXED, MAX_ERRORS};

/// Result of feeding one iteration's outcome to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOutcome {
    /// Nothing notable happened.
    Ok,
    /// `count_ok` reached `FIXED` after a prior error streak; the streak
    /// is now forgotten. Carries the streak length that was cleared, for
    /// the recovery log line.
    Recovered { cleared: u32 },
    /// `count_err` exceeded `MAX_ERRORS`: fatal, shutdown must follow.
    FatalAbort,
}

/// Tracks `count_err`/`count_ok` exactly as spec.md §4.4 describes.
#[derive(Debug, Clone)]
pub struct FaultTracker {
    count_err: u32,
    count_ok: u32,
}

impl FaultTracker {
    pub const fn new() -> Self {
        Self {
            count_err: 0,
            // Starts at FIXED: the loop begins "recovered", matching the
            // original's initialization (`count_ok = FIXED`).
            count_ok: FIXED,
        }
    }

    /// Feed this iteration's combined error status. `had_error` is the OR
    /// of `err_imu`, `err_gps`, `retval` from spec.md §4.4. Only call this
    /// once IMU warmup has completed (spec.md §9 Open Question #1); the
    /// caller is responsible for that gate, this tracker trusts it.
    pub fn record(&mut self, had_error: bool) -> FaultOutcome {
        if had_error {
            self.count_ok = 0;
            self.count_err += 1;
            if self.count_err > MAX_ERRORS {
                return FaultOutcome::FatalAbort;
            }
            return FaultOutcome::Ok;
        }

        if self.count_ok < FIXED {
            self.count_ok += 1;
            if self.count_ok == FIXED && self.count_err > 0 {
                let cleared = self.count_err;
                self.count_err = 0;
                return FaultOutcome::Recovered { cleared };
            }
        } else if self.count_err > 0 {
            let cleared = self.count_err;
            self.count_err = 0;
            return FaultOutcome::Recovered { cleared };
        }
        FaultOutcome::Ok
    }

    #[inline]
    pub const fn count_err(&self) -> u32 {
        self.count_err
    }
}

impl Default for FaultTracker {
    fn default() -> Self {
        Self::new()
    }
}
