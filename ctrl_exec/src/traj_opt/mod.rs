//! # Trajectory optimiser module
//!
//! Each control cycle the optimiser solves a finite-horizon tracking problem
//! over the kinematic bicycle model. The decision variables are the steering
//! and throttle sequences over the horizon; the state trajectory is
//! reconstructed from them by forward-Euler rollout from the
//! latency-compensated initial state, so the model equations hold by
//! construction and only the actuator box bounds remain as explicit
//! constraints.
//!
//! The objective is a weighted sum of squared cross-track error, heading
//! error and speed error, plus squared actuator magnitudes and squared
//! step-to-step actuator changes. The change terms damp steering chatter and
//! break ties between near-equal tracking solutions in favour of the
//! smoother actuation.
//!
//! The solve itself is an iterative projected gradient descent with a
//! backtracking line search. Only the first step of the optimised sequence
//! is ever applied, the rest is kept as the warm start for the next cycle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod solver;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::Params;
pub use solver::{Solution, TrajOpt};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors raised by the trajectory optimiser.
///
/// Any of these aborts the cycle, the caller is expected to fall back to a
/// safe actuation rather than forward an unvalidated result.
#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    /// The solve failed to reach a local optimum within the iteration
    /// budget.
    #[error("Solve did not converge within {max_iters} iterations")]
    Diverged {
        max_iters: usize
    },

    /// The solve exceeded its wall-clock budget and was aborted. A late
    /// command is as bad as a wrong one.
    #[error("Solve exceeded its budget of {budget_s} s")]
    BudgetExceeded {
        budget_s: f64
    },

    /// A non-finite value appeared in the state, cost or gradient.
    #[error("Non-finite value encountered during the solve")]
    NonFinite,
}
