//! Worker thread running one connection's control pipeline off the main
//! thread, so a long solve for one connection never blocks another.
//!
//! Telemetry snapshots are handed over on a channel. If more than one
//! snapshot is waiting when the worker becomes free, only the newest is
//! planned on and the older ones are dropped: a superseded cycle's result
//! would be stale by the time it was ready, so supersession is
//! cancel-and-replace, never a queue.
//!
//! Every processed signal produces exactly one command. When planning fails
//! the worker applies the fallback policy instead of forwarding nothing:
//! invalid telemetry re-issues the previous command unchanged, any other
//! failure holds the last steering and commands a gentle braking throttle
//! until planning recovers.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

// External
use log::{debug, warn};
use serde::Serialize;
use std::sync::mpsc::{Receiver, Sender};

// Internal
use crate::params::CtrlExecParams;
use crate::pipeline::{Pipeline, PipelineError, StatusReport};
use ctrl_if::{ActuationCmd, Telemetry};
use util::module::State;

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

/// Signals exchanged between the main thread and a worker.
#[derive(Debug)]
pub enum WorkerSignal {
    /// A new telemetry snapshot to plan on. Snapshots still waiting when a
    /// newer one arrives are superseded by it.
    NewTelem(Box<Telemetry>),

    /// The worker should stop its operations
    Stop,

    /// A completed control cycle
    Cycle(Box<CycleReport>),
}

/// How the command of a cycle was produced.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum CycleOutcome {
    /// Planning succeeded, the command is fresh
    Nominal,

    /// The telemetry was invalid, the cycle was skipped and the previous
    /// command re-issued unchanged
    InputHeld,

    /// Planning failed, the last steering is held and a braking throttle
    /// commanded
    SafeFallback,
}

/// Unhandlable worker errors.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Could not send a signal to the main thread: {0}")]
    SendFailed(#[from] std::sync::mpsc::SendError<WorkerSignal>),
}

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// The product of one worker cycle.
#[derive(Debug)]
pub struct CycleReport {
    /// The command to forward to actuation. Always present and always
    /// finite, whatever happened during the cycle.
    pub cmd: ActuationCmd,

    /// How the command was produced
    pub outcome: CycleOutcome,

    /// The pipeline's status report, present for nominal cycles only
    pub status: Option<StatusReport>,
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Run one connection's control pipeline until a `Stop` signal arrives or
/// the channel closes.
pub fn worker_thread(
    mut pipeline: Pipeline,
    params: CtrlExecParams,
    main_sender: Sender<WorkerSignal>,
    main_receiver: Receiver<WorkerSignal>,
) -> Result<(), WorkerError> {
    // The last issued command, the basis of every fallback. Until the first
    // successful cycle this is all zeros: straight ahead, coasting.
    let mut last_cmd = ActuationCmd::default();

    while let Ok(signal) = main_receiver.recv() {
        let mut telem = match signal {
            WorkerSignal::Stop => break,
            WorkerSignal::NewTelem(t) => t,
            other => {
                warn!("Unexpected signal from main thread: {:?}", other);
                continue;
            }
        };

        // Cancel-and-replace: drain anything that arrived while the previous
        // cycle was running, keeping only the newest snapshot.
        let mut stop_requested = false;
        while let Ok(next) = main_receiver.try_recv() {
            match next {
                WorkerSignal::NewTelem(t) => {
                    debug!("Telemetry snapshot superseded before processing");
                    telem = t;
                }
                WorkerSignal::Stop => {
                    stop_requested = true;
                    break;
                }
                other => warn!("Unexpected signal from main thread: {:?}", other),
            }
        }
        if stop_requested {
            break;
        }

        let report = match pipeline.proc(&telem) {
            Ok((cmd, status)) => {
                last_cmd = cmd.clone();
                CycleReport {
                    cmd,
                    outcome: CycleOutcome::Nominal,
                    status: Some(status),
                }
            }
            Err(e @ PipelineError::Telemetry(_)) => {
                warn!("Cycle skipped on invalid telemetry: {}", e);
                CycleReport {
                    cmd: last_cmd.clone(),
                    outcome: CycleOutcome::InputHeld,
                    status: None,
                }
            }
            Err(e) => {
                warn!("Cycle failed, applying safe fallback: {}", e);

                let opt_params = pipeline.opt_params();
                let mut cmd = last_cmd.clone();
                cmd.throttle = params
                    .fallback_throttle
                    .clamp(opt_params.throttle_min, opt_params.throttle_max);

                // The displayed trajectories of the held command are stale
                cmd.predicted_x.clear();
                cmd.predicted_y.clear();
                cmd.reference_x.clear();
                cmd.reference_y.clear();

                last_cmd = cmd.clone();
                CycleReport {
                    cmd,
                    outcome: CycleOutcome::SafeFallback,
                    status: None,
                }
            }
        };

        main_sender.send(WorkerSignal::Cycle(Box::new(report)))?;
    }

    debug!("Worker stopping");
    Ok(())
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::pipeline;
    use crate::traj_opt;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    const RECV_TIMEOUT: Duration = Duration::from_secs(30);

    fn test_pipeline() -> Pipeline {
        let opt_params = traj_opt::Params {
            solve_budget_s: 10.0,
            ..Default::default()
        };
        Pipeline::with_params(pipeline::Params::default(), opt_params)
    }

    fn telem_with_waypoints(n: usize) -> Telemetry {
        let xs = [0.0, 25.0, 50.0, 75.0, 100.0];
        let ys = [0.0, 5.0, 8.0, 9.0, 9.5];

        Telemetry {
            waypoints_x: xs[..n].to_vec(),
            waypoints_y: ys[..n].to_vec(),
            x: 10.0,
            y: 2.0,
            psi: 0.1,
            speed: 20.0,
            steering_angle: 0.0,
            throttle: 0.0,
        }
    }

    fn recv_cycle(rx: &Receiver<WorkerSignal>) -> Box<CycleReport> {
        match rx.recv_timeout(RECV_TIMEOUT) {
            Ok(WorkerSignal::Cycle(report)) => report,
            other => panic!("Expected a cycle report, got {:?}", other),
        }
    }

    #[test]
    fn test_cancel_and_replace() {
        let (to_worker_tx, to_worker_rx) = channel();
        let (from_worker_tx, from_worker_rx) = channel();

        // Queue two snapshots before the worker starts: the first must be
        // superseded and only the second planned on.
        to_worker_tx
            .send(WorkerSignal::NewTelem(Box::new(telem_with_waypoints(4))))
            .unwrap();
        to_worker_tx
            .send(WorkerSignal::NewTelem(Box::new(telem_with_waypoints(5))))
            .unwrap();

        let handle = std::thread::spawn(move || {
            worker_thread(
                test_pipeline(),
                CtrlExecParams::default(),
                from_worker_tx,
                to_worker_rx,
            )
        });

        let report = recv_cycle(&from_worker_rx);
        assert_eq!(report.outcome, CycleOutcome::Nominal);
        assert_eq!(report.cmd.reference_x.len(), 5);

        to_worker_tx.send(WorkerSignal::Stop).unwrap();
        handle.join().unwrap().unwrap();

        // Exactly one cycle came out of the two snapshots
        assert!(from_worker_rx.try_recv().is_err());
    }

    #[test]
    fn test_invalid_telemetry_holds_previous_command() {
        let (to_worker_tx, to_worker_rx) = channel();
        let (from_worker_tx, from_worker_rx) = channel();

        let handle = std::thread::spawn(move || {
            worker_thread(
                test_pipeline(),
                CtrlExecParams::default(),
                from_worker_tx,
                to_worker_rx,
            )
        });

        // A nominal cycle first so there is a previous command to hold
        to_worker_tx
            .send(WorkerSignal::NewTelem(Box::new(telem_with_waypoints(4))))
            .unwrap();
        let nominal = recv_cycle(&from_worker_rx);
        assert_eq!(nominal.outcome, CycleOutcome::Nominal);

        // Then an empty snapshot
        let mut bad = telem_with_waypoints(4);
        bad.waypoints_x.clear();
        bad.waypoints_y.clear();
        to_worker_tx
            .send(WorkerSignal::NewTelem(Box::new(bad)))
            .unwrap();

        let held = recv_cycle(&from_worker_rx);
        assert_eq!(held.outcome, CycleOutcome::InputHeld);
        assert_eq!(held.cmd.steering_angle, nominal.cmd.steering_angle);
        assert_eq!(held.cmd.throttle, nominal.cmd.throttle);
        assert!(held.status.is_none());

        to_worker_tx.send(WorkerSignal::Stop).unwrap();
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn test_failed_planning_applies_safe_fallback() {
        let (to_worker_tx, to_worker_rx) = channel();
        let (from_worker_tx, from_worker_rx) = channel();

        let params = CtrlExecParams::default();
        let fallback_throttle = params.fallback_throttle;

        let handle = std::thread::spawn(move || {
            worker_thread(test_pipeline(), params, from_worker_tx, to_worker_rx)
        });

        // Nominal cycle to establish a steering command
        to_worker_tx
            .send(WorkerSignal::NewTelem(Box::new(telem_with_waypoints(4))))
            .unwrap();
        let nominal = recv_cycle(&from_worker_rx);
        assert_eq!(nominal.outcome, CycleOutcome::Nominal);
        assert!(nominal.cmd.steering_angle != 0.0);

        // Three waypoints pass validation but cannot be fitted
        to_worker_tx
            .send(WorkerSignal::NewTelem(Box::new(telem_with_waypoints(3))))
            .unwrap();

        let fallback = recv_cycle(&from_worker_rx);
        assert_eq!(fallback.outcome, CycleOutcome::SafeFallback);
        // Last steering held, braking commanded
        assert_eq!(fallback.cmd.steering_angle, nominal.cmd.steering_angle);
        assert_eq!(fallback.cmd.throttle, fallback_throttle);
        assert!(fallback.cmd.predicted_x.is_empty());

        // Planning recovers on the next good snapshot
        to_worker_tx
            .send(WorkerSignal::NewTelem(Box::new(telem_with_waypoints(4))))
            .unwrap();
        let recovered = recv_cycle(&from_worker_rx);
        assert_eq!(recovered.outcome, CycleOutcome::Nominal);

        to_worker_tx.send(WorkerSignal::Stop).unwrap();
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn test_stop_without_processing() {
        let (to_worker_tx, to_worker_rx) = channel();
        let (from_worker_tx, from_worker_rx) = channel();

        to_worker_tx.send(WorkerSignal::Stop).unwrap();

        let handle = std::thread::spawn(move || {
            worker_thread(
                test_pipeline(),
                CtrlExecParams::default(),
                from_worker_tx,
                to_worker_rx,
            )
        });

        handle.join().unwrap().unwrap();
        assert!(from_worker_rx.try_recv().is_err());
    }
}
