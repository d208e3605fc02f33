//! Blocking I/O multiplexer (spec §5): the loop's single genuine wait
//! point, wrapping `nix::poll` over stdin plus any real device
//! descriptors. Simulated gateways never register a descriptor here —
//! see [`crate::gateways`] — so in a fully simulated run this degenerates
//! to polling stdin alone, with no background thread required.

use std::os::unix::io::{AsRawFd, BorrowedFd, RawFd};
use std::time::Duration;

use nix::poll::{PollFd, PollFlags, PollTimeout};

use crate::error::GatewayError;

/// Which registered descriptors were ready after a `poll` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub stdin: bool,
    pub imu: bool,
    pub gps: bool,
}

/// Registers stdin unconditionally and the IMU/GPS descriptors only when
/// the respective gateway reports a real one.
pub struct Multiplexer {
    stdin_fd: RawFd,
    imu_fd: Option<RawFd>,
    gps_fd: Option<RawFd>,
}

impl Multiplexer {
    pub fn new(stdin: &impl AsRawFd, imu_fd: Option<RawFd>, gps_fd: Option<RawFd>) -> Self {
        Self {
            stdin_fd: stdin.as_raw_fd(),
            imu_fd,
            gps_fd,
        }
    }

    /// Block up to `timeout` waiting for any registered descriptor to
    /// become readable. A timeout with no descriptor ready is not an
    /// error: the orchestrator treats it as "nothing happened this tick".
    pub fn poll(&self, timeout: Duration) -> Result<Readiness, GatewayError> {
        let stdin = unsafe { BorrowedFd::borrow_raw(self.stdin_fd) };
        let imu = self.imu_fd.map(|fd| unsafe { BorrowedFd::borrow_raw(fd) });
        let gps = self.gps_fd.map(|fd| unsafe { BorrowedFd::borrow_raw(fd) });

        let mut fds = Vec::with_capacity(3);
        fds.push(PollFd::new(stdin, PollFlags::POLLIN));
        if let Some(fd) = &imu {
            fds.push(PollFd::new(*fd, PollFlags::POLLIN));
        }
        if let Some(fd) = &gps {
            fds.push(PollFd::new(*fd, PollFlags::POLLIN));
        }

        let poll_timeout = PollTimeout::from(timeout.as_millis() as u16);
        nix::poll::poll(&mut fds, poll_timeout)
            .map_err(|e| GatewayError::Transient("poll", e.to_string()))?;

        let ready = |pfd: &PollFd| pfd.revents().is_some_and(|r| r.contains(PollFlags::POLLIN));
        let mut idx = 0;
        let stdin_ready = ready(&fds[idx]);
        idx += 1;
        let imu_ready = if imu.is_some() {
            let r = ready(&fds[idx]);
            idx += 1;
            r
        } else {
            false
        };
        let gps_ready = if gps.is_some() { ready(&fds[idx]) } else { false };

        Ok(Readiness {
            stdin: stdin_ready,
            imu: imu_ready,
            gps: gps_ready,
        })
    }
}
