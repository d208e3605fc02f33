//! Two-phase shutdown (spec §5, C8): SIGINT/SIGQUIT convert into an
//! `interrupted` flag on first delivery (idle motors, keep sensor/Kalman
//! logging running) and a `terminate` flag on the second, which tears
//! everything down.

use std::sync::atomic::{AtomicU8, Ordering};

use nix::sys::signal::{self, SigHandler, Signal};

const RUNNING: u8 = 0;
const INTERRUPTED: u8 = 1;
const TERMINATE: u8 = 2;

static PHASE: AtomicU8 = AtomicU8::new(RUNNING);

extern "C" fn on_signal(_signum: libc::c_int) {
    // Signal-safe: one atomic compare-and-swap, no allocation. Only the
    // second delivery (PHASE already INTERRUPTED) advances to TERMINATE.
    if PHASE
        .compare_exchange(RUNNING, INTERRUPTED, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        PHASE
            .compare_exchange(INTERRUPTED, TERMINATE, Ordering::SeqCst, Ordering::SeqCst)
            .ok();
    }
}

/// Current shutdown phase, as observed by the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    Running,
    Interrupted,
    Terminate,
}

/// Installs `SIGINT`/`SIGQUIT` handlers and exposes the resulting phase.
///
/// Mirrors the teacher's preference for explicit, narrow `nix` wrappers
/// over raw libc signal calls.
pub struct ShutdownManager;

impl ShutdownManager {
    /// # Safety contract
    /// Installing a signal handler is only sound once per process; the
    /// orchestrator calls this exactly once during init.
    pub fn install() -> Result<Self, nix::Error> {
        let handler = SigHandler::Handler(on_signal);
        unsafe {
            signal::signal(Signal::SIGINT, handler)?;
            signal::signal(Signal::SIGQUIT, handler)?;
        }
        Ok(Self)
    }

    pub fn phase(&self) -> ShutdownPhase {
        match PHASE.load(Ordering::SeqCst) {
            RUNNING => ShutdownPhase::Running,
            INTERRUPTED => ShutdownPhase::Interrupted,
            _ => ShutdownPhase::Terminate,
        }
    }

    /// Programmatic equivalent of a first signal delivery, for fatal
    /// internal faults (spec.md §6) that must trigger the same two-phase
    /// path as an operator `Ctrl-C`.
    pub fn request_interrupt(&self) {
        let _ = PHASE.compare_exchange(RUNNING, INTERRUPTED, Ordering::SeqCst, Ordering::SeqCst);
    }

    /// Force straight to full teardown, e.g. after the loop has already
    /// idled motors and is exiting naturally.
    pub fn request_terminate(&self) {
        PHASE.store(TERMINATE, Ordering::SeqCst);
    }
}
