//! Trajectory optimiser solve routines

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::time::Instant;
use log::debug;
use ordered_float::OrderedFloat;

// Internal
use crate::model::{self, Control, VehicleState};
use crate::path_fit::PathModel;
use super::{Params, SolveError};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Step used for the central finite difference gradient.
const FD_STEP: f64 = 1e-6;

/// Maximum number of step length halvings in one line search.
const MAX_BACKTRACKS: usize = 40;

/// Largest step length the line search will try.
const ALPHA_MAX: f64 = 1.0;

/// Growth factor applied to the previously accepted step length when opening
/// a new line search.
const ALPHA_GROWTH: f64 = 4.0;

/// Shrink factor applied while backtracking.
const ALPHA_SHRINK: f64 = 0.5;

/// Cost decrease below this is treated as a stationary point.
const STALL_EPS: f64 = 1e-12;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The trajectory optimiser.
///
/// Holds only the immutable parameters, every solve is an independent
/// request/response with no state carried between cycles other than the warm
/// start the caller chooses to pass back in.
#[derive(Debug, Clone, Default)]
pub struct TrajOpt {
    params: Params,
}

/// The product of one successful solve.
#[derive(Debug, Clone)]
pub struct Solution {
    /// First-step steering angle in radians, the only steering value to be
    /// applied
    pub steer_rad: f64,

    /// First-step throttle
    pub throttle: f64,

    /// Predicted vehicle-frame positions over the horizon, one per step
    pub predicted: Vec<(f64, f64)>,

    /// The full optimised actuation sequence, returned so the caller can
    /// warm start the next cycle
    pub controls: Vec<Control>,

    /// Final value of the objective
    pub cost: f64,

    /// Number of descent iterations used
    pub iters: usize,

    /// Wall-clock duration of the solve in seconds
    pub solve_time_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajOpt {
    /// Create a new optimiser from the given parameters.
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    /// The optimiser's parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Solve the tracking problem from the given initial state against the
    /// given reference curve.
    ///
    /// `warm_start` may carry the previous cycle's actuation sequence, which
    /// is shifted one step before use. A warm start of the wrong length is
    /// ignored.
    pub fn solve(
        &self,
        initial: &VehicleState,
        path: &PathModel,
        warm_start: Option<&[Control]>
    ) -> Result<Solution, SolveError> {
        let start = Instant::now();
        let p = &self.params;

        if !initial.is_finite() {
            return Err(SolveError::NonFinite)
        }

        // Initial guess: shifted warm start if one is available, otherwise
        // zero actuation.
        let mut u = match warm_start {
            Some(ws) if ws.len() == p.n_steps && !ws.is_empty() => {
                let mut shifted: Vec<Control> = ws[1..].to_vec();
                if let Some(last) = ws.last() {
                    shifted.push(*last);
                }
                shifted
            }
            _ => vec![Control::default(); p.n_steps],
        };
        self.project(&mut u);

        let mut cost = self.cost(initial, &u, path);
        if !cost.is_finite() {
            return Err(SolveError::NonFinite)
        }

        let mut alpha = ALPHA_MAX;
        let mut iters = 0;
        let mut converged = false;

        for _ in 0..p.max_iters {
            if start.elapsed().as_secs_f64() > p.solve_budget_s {
                return Err(SolveError::BudgetExceeded {
                    budget_s: p.solve_budget_s
                })
            }

            iters += 1;

            let grad = self.gradient(initial, &u, path);
            if grad
                .iter()
                .any(|g| !g.steer_rad.is_finite() || !g.throttle.is_finite())
            {
                return Err(SolveError::NonFinite)
            }

            // Line search: walk the step length down from slightly above the
            // last accepted one, keeping the lowest-cost candidate seen.
            let mut best_cost = OrderedFloat(f64::INFINITY);
            let mut best_u = u.clone();
            let mut best_alpha = alpha;

            let mut trial_alpha = (alpha * ALPHA_GROWTH).min(ALPHA_MAX);
            for _ in 0..MAX_BACKTRACKS {
                let mut candidate: Vec<Control> = u
                    .iter()
                    .zip(grad.iter())
                    .map(|(ui, gi)| Control {
                        steer_rad: ui.steer_rad - trial_alpha * gi.steer_rad,
                        throttle: ui.throttle - trial_alpha * gi.throttle,
                    })
                    .collect();
                self.project(&mut candidate);

                let candidate_cost = self.cost(initial, &candidate, path);

                if OrderedFloat(candidate_cost) < best_cost {
                    best_cost = OrderedFloat(candidate_cost);
                    best_u = candidate;
                    best_alpha = trial_alpha;
                }

                if candidate_cost < cost {
                    break;
                }

                trial_alpha *= ALPHA_SHRINK;
            }

            // No step length produced a decrease, the projected gradient is
            // stationary here.
            if best_cost.into_inner() >= cost - STALL_EPS {
                converged = true;
                break;
            }

            let improvement = (cost - best_cost.into_inner())
                / cost.abs().max(1.0);

            u = best_u;
            cost = best_cost.into_inner();
            alpha = best_alpha;

            if improvement < p.cost_tol {
                converged = true;
                break;
            }
        }

        if !converged {
            return Err(SolveError::Diverged {
                max_iters: p.max_iters
            })
        }

        let states = self.rollout(initial, &u, path);
        if states.iter().any(|s| !s.is_finite()) {
            return Err(SolveError::NonFinite)
        }

        let predicted: Vec<(f64, f64)> = states[1..]
            .iter()
            .map(|s| (s.x, s.y))
            .collect();

        let first = match u.first() {
            Some(c) => *c,
            None => Control::default(),
        };

        let solve_time_s = start.elapsed().as_secs_f64();
        debug!(
            "Solve converged after {} iterations, cost {:.3}, {:.1} ms",
            iters,
            cost,
            solve_time_s * 1e3
        );

        Ok(Solution {
            steer_rad: first.steer_rad,
            throttle: first.throttle,
            predicted,
            controls: u,
            cost,
            iters,
            solve_time_s,
        })
    }

    /// Roll the model out over the horizon under the given actuation
    /// sequence. Returns `n_steps + 1` states including the initial one.
    fn rollout(
        &self,
        initial: &VehicleState,
        u: &[Control],
        path: &PathModel
    ) -> Vec<VehicleState> {
        let p = &self.params;

        let mut states = Vec::with_capacity(u.len() + 1);
        states.push(*initial);

        let mut state = *initial;
        for ctrl in u.iter() {
            state = model::step(&state, ctrl, path, p.dt_s, p.lf_m);
            states.push(state);
        }

        states
    }

    /// Evaluate the objective for the given actuation sequence.
    fn cost(
        &self,
        initial: &VehicleState,
        u: &[Control],
        path: &PathModel
    ) -> f64 {
        let p = &self.params;
        let states = self.rollout(initial, u, path);

        let mut cost = 0.0;

        // Tracking terms over the horizon. The initial state is fixed so it
        // contributes nothing the optimiser can change.
        for state in states[1..].iter() {
            cost += p.w_cte * state.cte.powi(2);
            cost += p.w_epsi * state.epsi.powi(2);
            cost += p.w_speed * (state.v - p.ref_speed).powi(2);
        }

        // Actuator magnitude terms
        for ctrl in u.iter() {
            cost += p.w_steer * ctrl.steer_rad.powi(2);
            cost += p.w_throttle * ctrl.throttle.powi(2);
        }

        // Actuator smoothness terms
        for pair in u.windows(2) {
            cost += p.w_steer_rate
                * (pair[1].steer_rad - pair[0].steer_rad).powi(2);
            cost += p.w_throttle_rate
                * (pair[1].throttle - pair[0].throttle).powi(2);
        }

        cost
    }

    /// Central finite difference gradient of the objective with respect to
    /// every element of the actuation sequence.
    fn gradient(
        &self,
        initial: &VehicleState,
        u: &[Control],
        path: &PathModel
    ) -> Vec<Control> {
        let mut grad = vec![Control::default(); u.len()];

        let mut work = u.to_vec();

        for k in 0..u.len() {
            let steer = work[k].steer_rad;
            work[k].steer_rad = steer + FD_STEP;
            let upper = self.cost(initial, &work, path);
            work[k].steer_rad = steer - FD_STEP;
            let lower = self.cost(initial, &work, path);
            work[k].steer_rad = steer;
            grad[k].steer_rad = (upper - lower) / (2.0 * FD_STEP);

            let throttle = work[k].throttle;
            work[k].throttle = throttle + FD_STEP;
            let upper = self.cost(initial, &work, path);
            work[k].throttle = throttle - FD_STEP;
            let lower = self.cost(initial, &work, path);
            work[k].throttle = throttle;
            grad[k].throttle = (upper - lower) / (2.0 * FD_STEP);
        }

        grad
    }

    /// Project an actuation sequence onto the feasible box: steering and
    /// throttle magnitude bounds, then the steering slew bound chained along
    /// the sequence.
    fn project(&self, u: &mut Vec<Control>) {
        let p = &self.params;

        for ctrl in u.iter_mut() {
            ctrl.steer_rad = ctrl.steer_rad.clamp(-p.steer_max_rad, p.steer_max_rad);
            ctrl.throttle = ctrl.throttle.clamp(p.throttle_min, p.throttle_max);
        }

        let slew = p.steer_rate_max_rads * p.dt_s;
        for k in 1..u.len() {
            let prev = u[k - 1].steer_rad;
            u[k].steer_rad = u[k].steer_rad.clamp(prev - slew, prev + slew);
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
