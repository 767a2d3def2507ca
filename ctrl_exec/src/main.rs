//! Main controller executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Initialise the control pipeline and hand it to a worker thread
//!     - Main loop, once per control cycle:
//!         - Send the next telemetry snapshot to the worker
//!         - Await the worker's command (or declare the cycle late)
//!         - Log and archive the cycle's outputs
//!
//! The transport to a real vehicle or simulator is owned by an external
//! collaborator. This executable drives the pipeline from a scenario file
//! instead: a JSON list of telemetry snapshots played back at the configured
//! cycle period, which exercises exactly the interface the collaborator
//! uses.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use ctrl_lib::{
    params::CtrlExecParams,
    pipeline::Pipeline,
    worker::{self, WorkerSignal},
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::{eyre, WrapErr}, Report};
use log::{info, warn};
use serde::Serialize;
use std::env;
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use ctrl_if::Telemetry;
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    module::State,
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Flat per-cycle record of the issued command, for the command archive.
#[derive(Serialize)]
struct CmdRecord {
    time_s: f64,
    outcome: worker::CycleOutcome,
    steering_angle: f64,
    throttle: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "ctrl_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("MPC Controller Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: CtrlExecParams = util::params::load(
        "ctrl_exec.toml"
    ).wrap_err("Could not load exec params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE PIPELINE ----

    let mut pipeline = Pipeline::default();
    pipeline
        .init(("pipeline.toml", "traj_opt.toml"))
        .wrap_err("Failed to initialise the control pipeline")?;

    info!("Control pipeline initialised");

    // ---- LOAD SCENARIO ----

    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        return Err(eyre!("Usage: ctrl_exec <scenario.json>"));
    }

    info!("Loading scenario from \"{}\"", &args[1]);

    let scenario_str = std::fs::read_to_string(&args[1])
        .wrap_err("Failed to read the scenario file")?;
    let scenario: Vec<Telemetry> = serde_json::from_str(&scenario_str)
        .wrap_err("Failed to parse the scenario file")?;

    info!("Loaded scenario with {} telemetry snapshots\n", scenario.len());

    // ---- START WORKER ----

    let (to_worker_tx, to_worker_rx) = channel();
    let (from_worker_tx, from_worker_rx) = channel();

    let worker_params = exec_params.clone();
    let worker_handle = thread::spawn(move || {
        worker::worker_thread(pipeline, worker_params, from_worker_tx, to_worker_rx)
    });

    // ---- INITIALISE ARCHIVES ----

    let mut status_archive = Archiver::from_path(&session, "status_report.csv")
        .map_err(|e| eyre!("Failed to create the status archive: {}", e))?;
    let mut cmd_archive = Archiver::from_path(&session, "cmd.csv")
        .map_err(|e| eyre!("Failed to create the command archive: {}", e))?;

    // ---- MAIN LOOP ----

    let cycle_timeout = Duration::from_secs_f64(exec_params.cycle_timeout_s);

    for (cycle, telem) in scenario.into_iter().enumerate() {
        let cycle_start = Instant::now();

        to_worker_tx
            .send(WorkerSignal::NewTelem(Box::new(telem)))
            .map_err(|_| eyre!("Worker channel closed"))?;

        match from_worker_rx.recv_timeout(cycle_timeout) {
            Ok(WorkerSignal::Cycle(report)) => {
                info!(
                    "Cycle {:4}: [{:?}] steering {:+.4}, throttle {:+.4}",
                    cycle,
                    report.outcome,
                    report.cmd.steering_angle,
                    report.cmd.throttle
                );

                if let Some(ref status) = report.status {
                    if let Err(e) = status_archive.serialise(status) {
                        warn!("Failed to archive the status report: {}", e);
                    }
                }

                let record = CmdRecord {
                    time_s: session::get_elapsed_seconds(),
                    outcome: report.outcome,
                    steering_angle: report.cmd.steering_angle,
                    throttle: report.cmd.throttle,
                };
                if let Err(e) = cmd_archive.serialise(&record) {
                    warn!("Failed to archive the command: {}", e);
                }
            }
            Ok(other) => warn!("Unexpected signal from worker: {:?}", other),
            Err(RecvTimeoutError::Timeout) => warn!(
                "Cycle {} produced no command within {:.2} s",
                cycle, exec_params.cycle_timeout_s
            ),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(eyre!("Worker thread stopped unexpectedly"))
            }
        }

        // Pace the loop to the cycle period
        let elapsed_s = cycle_start.elapsed().as_secs_f64();
        if elapsed_s < exec_params.cycle_period_s {
            thread::sleep(Duration::from_secs_f64(
                exec_params.cycle_period_s - elapsed_s
            ));
        }
        else {
            warn!("Cycle {} overran the period ({:.3} s)", cycle, elapsed_s);
        }
    }

    // ---- SHUTDOWN ----

    to_worker_tx
        .send(WorkerSignal::Stop)
        .map_err(|_| eyre!("Worker channel closed"))?;

    match worker_handle.join() {
        Ok(Ok(())) => info!("Worker stopped"),
        Ok(Err(e)) => warn!("Worker stopped with error: {}", e),
        Err(_) => return Err(eyre!("Worker thread panicked")),
    }

    info!("Scenario complete");

    Ok(())
}
