//! # Control pipeline module
//!
//! One pipeline instance runs the complete planning chain for one vehicle
//! connection, once per control cycle:
//!
//! ```text
//!     telemetry -> frame transform -> path fit -> latency compensation
//!               -> trajectory solve -> actuator mapping -> command
//! ```
//!
//! Every data product of a cycle (transformed waypoints, fitted curve,
//! planning state, solution) is scoped to that cycle. The only state the
//! pipeline carries across cycles is the optimiser warm start, one slot per
//! pipeline instance and therefore per connection.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::{Deserialize, Serialize};

// Internal
use crate::act_map;
use crate::frame::{self, FrameError};
use crate::latency;
use crate::model::Control;
use crate::path_fit::{self, FitError};
use crate::traj_opt::{self, SolveError, TrajOpt};
use ctrl_if::{ActuationCmd, TelemError, Telemetry};
use util::{module::State, params};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Pipeline parameters.
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Actuation latency the planner compensates for, in seconds
    pub latency_s: f64,
}

/// The control pipeline for a single vehicle connection.
#[derive(Default)]
pub struct Pipeline {
    params: Params,

    /// The trajectory optimiser
    opt: TrajOpt,

    /// Warm start slot, holding the previous cycle's actuation sequence.
    /// Cleared whenever a cycle fails.
    warm_start: Option<Vec<Control>>,
}

/// The status report containing monitoring quantities for one cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    /// Cross-track error of the latency-compensated planning state
    pub cte: f64,

    /// Heading error of the latency-compensated planning state, in radians
    pub epsi_rad: f64,

    /// First-step steering angle before actuator mapping, in radians
    pub steer_rad: f64,

    /// Final cost of the solve
    pub cost: f64,

    /// Descent iterations used by the solve
    pub iters: usize,

    /// Wall-clock duration of the solve in seconds
    pub solve_time_s: f64,

    /// True if the solve was seeded from the previous cycle's solution
    pub warm_started: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors raised during a pipeline cycle.
///
/// All of these are local to the cycle that raised them, the caller applies
/// its fallback policy and carries on with the next snapshot.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The telemetry snapshot failed validation.
    #[error("Invalid telemetry: {0}")]
    Telemetry(#[from] TelemError),

    /// The waypoints could not be transformed into the vehicle frame.
    #[error("Frame transform failed: {0}")]
    Frame(#[from] FrameError),

    /// The reference path could not be fitted.
    #[error("Reference path fit failed: {0}")]
    Fit(#[from] FitError),

    /// The trajectory solve failed.
    #[error("Trajectory solve failed: {0}")]
    Solve(#[from] SolveError),

    /// A non-finite value appeared in the planning state or in the output
    /// command.
    #[error("Non-finite value in the planning state or output command")]
    NonFinite,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self { latency_s: 0.1 }
    }
}

impl State for Pipeline {
    /// Paths to the pipeline and optimiser parameter files
    type InitData = (&'static str, &'static str);
    type InitError = params::LoadError;

    type InputData = Telemetry;
    type OutputData = ActuationCmd;
    type StatusReport = StatusReport;
    type ProcError = PipelineError;

    /// Initialise the pipeline from the parameter files.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        let (pipeline_params_path, opt_params_path) = init_data;

        self.params = params::load(pipeline_params_path)?;
        self.opt = TrajOpt::new(params::load(opt_params_path)?);
        self.warm_start = None;

        Ok(())
    }

    /// Run one full planning cycle on the given telemetry snapshot.
    fn proc(&mut self, telem: &Telemetry)
        -> Result<(ActuationCmd, StatusReport), PipelineError>
    {
        // The warm start is consumed up front so a failed cycle never leaves
        // a stale sequence behind for a later one.
        let warm = self.warm_start.take();
        let warm_started = warm.is_some();

        telem.validate()?;

        // Move the reference into the vehicle frame and fit it
        let (ref_x, ref_y) = frame::to_vehicle_frame(
            &telem.waypoints_x,
            &telem.waypoints_y,
            telem.x,
            telem.y,
            telem.psi
        )?;

        let path = path_fit::fit(&ref_x, &ref_y)?;

        // Plan from where the vehicle will be once the command bites
        let current = latency::initial_state(&path, telem.speed);
        let last_ctrl = Control {
            steer_rad: telem.steering_angle,
            throttle: telem.throttle,
        };
        let planned = latency::compensate(
            &current,
            &last_ctrl,
            &path,
            self.params.latency_s,
            self.opt.params().lf_m
        );

        if !planned.is_finite() {
            return Err(PipelineError::NonFinite)
        }

        let solution = self.opt.solve(&planned, &path, warm.as_deref())?;

        // Map into the actuator's conventions
        let cmd = ActuationCmd {
            steering_angle: act_map::map_steering(solution.steer_rad, self.opt.params()),
            throttle: act_map::map_throttle(solution.throttle, self.opt.params()),
            predicted_x: solution.predicted.iter().map(|p| p.0).collect(),
            predicted_y: solution.predicted.iter().map(|p| p.1).collect(),
            reference_x: ref_x,
            reference_y: ref_y,
        };

        if !cmd.is_finite() {
            return Err(PipelineError::NonFinite)
        }

        // Keep the sequence for the next cycle's warm start
        self.warm_start = Some(solution.controls.clone());

        let report = StatusReport {
            cte: planned.cte,
            epsi_rad: planned.epsi,
            steer_rad: solution.steer_rad,
            cost: solution.cost,
            iters: solution.iters,
            solve_time_s: solution.solve_time_s,
            warm_started,
        };

        debug!(
            "Cycle: cte {:.3}, epsi {:.3} rad, steer {:.3} rad, throttle {:.3}, {} iters",
            report.cte,
            report.epsi_rad,
            report.steer_rad,
            cmd.throttle,
            report.iters
        );

        Ok((cmd, report))
    }
}

impl Pipeline {
    /// Build a pipeline directly from parameter values.
    pub fn with_params(params: Params, opt_params: traj_opt::Params) -> Self {
        Self {
            params,
            opt: TrajOpt::new(opt_params),
            warm_start: None,
        }
    }

    /// The optimiser's parameters.
    pub fn opt_params(&self) -> &traj_opt::Params {
        self.opt.params()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn test_pipeline() -> Pipeline {
        // Generous budget so debug builds never trip the wall-clock abort
        let opt_params = traj_opt::Params {
            solve_budget_s: 10.0,
            ..Default::default()
        };
        Pipeline::with_params(Params::default(), opt_params)
    }

    fn scenario_telem() -> Telemetry {
        Telemetry {
            waypoints_x: vec![0.0, 25.0, 50.0, 75.0],
            waypoints_y: vec![0.0, 5.0, 8.0, 9.0],
            x: 10.0,
            y: 2.0,
            psi: 0.1,
            speed: 20.0,
            steering_angle: 0.0,
            throttle: 0.0,
        }
    }

    #[test]
    fn test_scenario_cycle() {
        // Full cycle on a path that bends away to the vehicle's left.
        let mut pipeline = test_pipeline();

        let (cmd, report) = pipeline.proc(&scenario_telem()).unwrap();

        // The fitted reference tilts up and sits above the vehicle
        let path = path_fit::fit(&cmd.reference_x, &cmd.reference_y).unwrap();
        assert!(path.coeffs()[1] > 0.0);
        assert!(path.eval(0.0) > 0.0);

        // Projected cross-track error matches the curve offset at the origin
        assert!(report.cte > 0.1 && report.cte < 0.4);

        // The raw steering angle moves the vehicle towards the curve
        // (negative increases heading in the model), and the mapped command
        // comes out small, nonzero and sign-flipped
        assert!(report.steer_rad < 0.0);
        assert!(cmd.steering_angle > 0.05 && cmd.steering_angle < 0.5);
        assert!(cmd.throttle.abs() < 0.5);

        // One predicted point per horizon step
        assert_eq!(cmd.predicted_x.len(), pipeline.opt_params().n_steps);
        assert_eq!(cmd.predicted_y.len(), pipeline.opt_params().n_steps);

        // The tail of the prediction has closed most of the initial offset
        let n = cmd.predicted_x.len();
        let mut tail_dev = 0.0;
        for i in (n - 3)..n {
            tail_dev += (path.eval(cmd.predicted_x[i]) - cmd.predicted_y[i]).abs();
        }
        tail_dev /= 3.0;
        assert!(tail_dev < report.cte.abs());

        // Commands are always within the actuator ranges
        assert!(cmd.steering_angle.abs() <= 1.0);
        assert!(cmd.throttle >= pipeline.opt_params().throttle_min);
        assert!(cmd.throttle <= pipeline.opt_params().throttle_max);
    }

    #[test]
    fn test_warm_start_across_cycles() {
        let mut pipeline = test_pipeline();
        let telem = scenario_telem();

        let (_, first) = pipeline.proc(&telem).unwrap();
        assert!(!first.warm_started);

        let (_, second) = pipeline.proc(&telem).unwrap();
        assert!(second.warm_started);
    }

    #[test]
    fn test_invalid_telemetry_rejected() {
        let mut pipeline = test_pipeline();

        let mut telem = scenario_telem();
        telem.waypoints_x.clear();
        telem.waypoints_y.clear();
        assert!(matches!(
            pipeline.proc(&telem),
            Err(PipelineError::Telemetry(TelemError::NoWaypoints))
        ));

        let mut telem = scenario_telem();
        telem.speed = f64::NAN;
        assert!(matches!(
            pipeline.proc(&telem),
            Err(PipelineError::Telemetry(TelemError::NonFiniteField("speed")))
        ));
    }

    #[test]
    fn test_too_few_waypoints_fail_fit() {
        let mut pipeline = test_pipeline();

        let mut telem = scenario_telem();
        telem.waypoints_x.truncate(3);
        telem.waypoints_y.truncate(3);

        assert!(matches!(
            pipeline.proc(&telem),
            Err(PipelineError::Fit(FitError::TooFewPoints { .. }))
        ));
    }

    #[test]
    fn test_degenerate_waypoints_fail_fit() {
        let mut pipeline = test_pipeline();

        // All waypoints at the same spot ahead of the vehicle
        let mut telem = scenario_telem();
        telem.waypoints_x = vec![20.0; 4];
        telem.waypoints_y = vec![5.0; 4];

        assert!(matches!(
            pipeline.proc(&telem),
            Err(PipelineError::Fit(FitError::RankDeficient))
        ));
    }

    #[test]
    fn test_failed_cycle_clears_warm_start() {
        let mut pipeline = test_pipeline();
        let telem = scenario_telem();

        pipeline.proc(&telem).unwrap();
        assert!(pipeline.warm_start.is_some());

        let mut bad = scenario_telem();
        bad.waypoints_x.truncate(3);
        bad.waypoints_y.truncate(3);
        // Validation passes but the fit fails, and the slot must not keep the
        // stale sequence. Warm starts only ever seed the cycle directly after
        // the one that produced them.
        assert!(pipeline.proc(&bad).is_err());
        assert!(pipeline.warm_start.is_none());
    }
}
