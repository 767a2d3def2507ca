//! Trajectory optimiser parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use util::maths;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the trajectory optimiser.
///
/// Loaded once at initialisation and read-only for the lifetime of the
/// controller.
#[derive(Deserialize, Debug, Clone)]
pub struct Params {

    /// Number of steps in the planning horizon
    pub n_steps: usize,

    /// Duration of one horizon step in seconds
    pub dt_s: f64,

    /// Distance from the vehicle's centre of gravity to the front axle in
    /// meters
    pub lf_m: f64,

    /// The speed the optimiser tracks when the path allows it
    pub ref_speed: f64,

    /// Cross-track error weight
    pub w_cte: f64,

    /// Heading error weight
    pub w_epsi: f64,

    /// Speed error weight
    pub w_speed: f64,

    /// Steering magnitude weight
    pub w_steer: f64,

    /// Throttle magnitude weight
    pub w_throttle: f64,

    /// Step-to-step steering change weight
    pub w_steer_rate: f64,

    /// Step-to-step throttle change weight
    pub w_throttle_rate: f64,

    /// Maximum steering angle magnitude in radians
    pub steer_max_rad: f64,

    /// Minimum throttle (full brake)
    pub throttle_min: f64,

    /// Maximum throttle
    pub throttle_max: f64,

    /// Maximum steering slew rate in radians/second, bounding the
    /// step-to-step steering change within the planned sequence
    pub steer_rate_max_rads: f64,

    /// Maximum number of descent iterations per solve
    pub max_iters: usize,

    /// Relative cost improvement below which the solve is converged
    pub cost_tol: f64,

    /// Wall-clock budget for one solve in seconds
    pub solve_budget_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            n_steps: 10,
            dt_s: 0.1,
            lf_m: 2.67,
            ref_speed: 40.0,
            w_cte: 2.0,
            w_epsi: 20.0,
            w_speed: 0.05,
            w_steer: 5.0,
            w_throttle: 1.0,
            w_steer_rate: 100.0,
            w_throttle_rate: 10.0,
            steer_max_rad: maths::deg_to_rad(25.0),
            throttle_min: -1.0,
            throttle_max: 1.0,
            steer_rate_max_rads: 0.6,
            max_iters: 200,
            cost_tol: 1e-4,
            solve_budget_s: 0.05,
        }
    }
}
