//! `quad-flight` binary entrypoint: parse the CLI, wire up the
//! simulated or replay-log gateways per the device arguments (spec.md
//! scopes real drivers out), and drive the orchestrator loop until
//! shutdown.

use std::io::Read as _;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;

use quad_flight::config::Cli;
use quad_flight::gateways::replay::{ReplayGps, ReplayImu};
use quad_flight::gateways::sim::{SimController, SimGps, SimImu, SimKalman, SimMotor, SimPathPlanner};
use quad_flight::gateways::{GpsSource, ImuSource};
use quad_flight::io::Multiplexer;
use quad_flight::logging::{init_tracing, LogChannels};
use quad_flight::manual::ManualKey;
use quad_flight::orchestrator::{Gateways, Orchestrator, StepOutcome};
use quad_flight::shutdown::{ShutdownManager, ShutdownPhase};

fn decode_key(byte: u8) -> Option<ManualKey> {
    match byte {
        b'q' => Some(ManualKey::Quit),
        b'm' => Some(ManualKey::ToggleManualMode),
        b'w' => Some(ManualKey::ThetaInc),
        b's' => Some(ManualKey::ThetaDec),
        b'a' => Some(ManualKey::PhiDec),
        b'd' => Some(ManualKey::PhiInc),
        b'e' => Some(ManualKey::PsiInc),
        b'r' => Some(ManualKey::PsiDec),
        b'+' => Some(ManualKey::ZInc),
        b'-' => Some(ManualKey::ZDec),
        b'0' => Some(ManualKey::WeightReset),
        b'[' => Some(ManualKey::WeightDec),
        b']' => Some(ManualKey::WeightInc),
        _ => None,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.resolve_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.log_level);

    let mut log = match LogChannels::open(&cli.log_dir, Instant::now()) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("failed to open log directory: {e}");
            return ExitCode::FAILURE;
        }
    };

    let shutdown_mgr = match ShutdownManager::install() {
        Ok(m) => m,
        Err(e) => {
            eprintln!("failed to install signal handlers: {e}");
            return ExitCode::FAILURE;
        }
    };

    let now = Instant::now();
    let stdin = std::io::stdin();
    let mux = Multiplexer::new(&stdin, None, None);

    let imu = if cli.imu_device == Cli::IMU_SIM_SENTINEL {
        ImuSource::Sim(SimImu::default())
    } else {
        match ReplayImu::open(std::path::Path::new(&cli.imu_device)) {
            Ok(r) => ImuSource::Replay(r),
            Err(e) => {
                eprintln!("failed to open IMU replay log: {e}");
                return ExitCode::FAILURE;
            }
        }
    };
    let gps = match &cli.gps_device {
        None => GpsSource::Sim(SimGps::default()),
        Some(path) => match ReplayGps::open(std::path::Path::new(path)) {
            Ok(r) => GpsSource::Replay(r),
            Err(e) => {
                eprintln!("failed to open GPS replay log: {e}");
                return ExitCode::FAILURE;
            }
        },
    };
    let motor = SimMotor::new(100.0, 900.0, config.initial_mass_kg, 200.0);
    let kalman = SimKalman::new();
    let planner = SimPathPlanner::new();
    let controller = SimController::default();

    let mut orch = Orchestrator::new(
        Gateways {
            imu,
            gps,
            motor,
            kalman,
            planner,
            controller,
        },
        config.modes,
        config.initial_mass_kg,
        now,
    );

    if let Err(e) = orch.wait_initial_gps_fix() {
        eprintln!("GPS init failed: {e}");
        return ExitCode::FAILURE;
    }

    let loop_start = Instant::now();

    loop {
        if shutdown_mgr.phase() == ShutdownPhase::Terminate {
            break;
        }
        // Captured before this pass's step so a transition to Interrupted
        // *this* pass still gets one full iteration of sensor/Kalman
        // logging (spec.md §8 scenario 3) before the next pass tears down.
        let was_interrupted = shutdown_mgr.phase() == ShutdownPhase::Interrupted;

        // The readiness wait is the loop's one suspension point; under
        // imu_comm_fake it is sized to match the replay log's recorded
        // cadence instead of the fixed default (spec.md line 136).
        let poll_timeout = if config.modes.imu_comm_fake {
            orch.imu().next_replay_delay(loop_start.elapsed()).unwrap_or(Duration::from_millis(20))
        } else {
            Duration::from_millis(20)
        };

        let readiness = match mux.poll(poll_timeout) {
            Ok(r) => r,
            Err(e) => {
                log.write_line("err", Instant::now(), &format!("poll failed: {e}"));
                continue;
            }
        };

        let key = if readiness.stdin {
            let mut buf = [0u8; 1];
            match std::io::stdin().read(&mut buf) {
                Ok(1) => decode_key(buf[0]),
                _ => None,
            }
        } else if shutdown_mgr.phase() == ShutdownPhase::Interrupted {
            Some(ManualKey::Quit)
        } else {
            None
        };

        let now = Instant::now();
        match orch.step(now, readiness, key, &mut log) {
            Ok(StepOutcome::Continue) => {}
            Ok(StepOutcome::Interrupted) => {
                shutdown_mgr.request_interrupt();
            }
            Ok(StepOutcome::FatalAbort) => {
                shutdown_mgr.request_terminate();
                break;
            }
            Err(e) => {
                log.write_line("err", now, &format!("loop error: {e}"));
            }
        }

        if was_interrupted {
            shutdown_mgr.request_terminate();
        }
    }

    if let Err(e) = orch.shutdown() {
        eprintln!("motor deinit failed during shutdown: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
