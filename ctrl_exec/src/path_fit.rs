//! # Reference path fitting
//!
//! The vehicle-frame waypoints are fitted with an order-3 polynomial
//! `y = f(x)` by least squares. The fit goes through an SVD of the
//! Vandermonde design matrix rather than the normal equations, the latter
//! squares the condition number and falls over on the short, nearly
//! collinear waypoint sets the simulator sends.
//!
//! The resulting [`PathModel`] is only valid for the cycle it was fitted in.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Order of the fitted polynomial.
pub const POLY_ORDER: usize = 3;

/// Relative singular value threshold below which the design matrix is
/// treated as rank deficient.
const RANK_TOL: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An order-3 polynomial reference curve in the vehicle frame.
///
/// Coefficients are stored constant term first, so
/// `f(x) = coeffs[0] + coeffs[1]*x + coeffs[2]*x^2 + coeffs[3]*x^3`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PathModel {
    coeffs: [f64; POLY_ORDER + 1],
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised while fitting the reference path.
#[derive(Debug, Error)]
pub enum FitError {
    /// Fewer points than needed to determine an order-3 polynomial.
    #[error("Need at least {required} waypoints for the fit, got {actual}")]
    TooFewPoints {
        required: usize,
        actual: usize
    },

    /// The coordinate slices are of different lengths.
    #[error("Waypoint slices have mismatched lengths ({x_len} x values, {y_len} y values)")]
    LengthMismatch {
        x_len: usize,
        y_len: usize
    },

    /// The design matrix is rank deficient, which happens when x values are
    /// duplicated or otherwise fail to span the polynomial basis.
    #[error("Waypoint x values are degenerate, the fit is rank deficient")]
    RankDeficient,

    /// The decomposition could not be solved.
    #[error("Failed to solve the least squares system: {0}")]
    SolveFailed(&'static str),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathModel {
    /// Build a path model directly from coefficients, constant term first.
    pub fn new(coeffs: [f64; POLY_ORDER + 1]) -> Self {
        Self { coeffs }
    }

    /// The polynomial coefficients, constant term first.
    pub fn coeffs(&self) -> &[f64; POLY_ORDER + 1] {
        &self.coeffs
    }

    /// Evaluate `f(x)` using Horner's scheme.
    pub fn eval(&self, x: f64) -> f64 {
        self.coeffs
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * x + c)
    }

    /// Evaluate the analytic derivative `f'(x)`.
    ///
    /// The derivative gives the reference curve's tangent, used to compute
    /// the heading error.
    pub fn slope(&self, x: f64) -> f64 {
        let mut acc = 0.0;
        for i in (1..=POLY_ORDER).rev() {
            acc = acc * x + self.coeffs[i] * i as f64;
        }
        acc
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Fit an order-3 polynomial to the given vehicle-frame waypoints.
pub fn fit(xs: &[f64], ys: &[f64]) -> Result<PathModel, FitError> {
    if xs.len() != ys.len() {
        return Err(FitError::LengthMismatch {
            x_len: xs.len(),
            y_len: ys.len()
        })
    }

    if xs.len() < POLY_ORDER + 1 {
        return Err(FitError::TooFewPoints {
            required: POLY_ORDER + 1,
            actual: xs.len()
        })
    }

    // Vandermonde design matrix, one row per waypoint
    let design = DMatrix::from_fn(xs.len(), POLY_ORDER + 1, |row, col| {
        xs[row].powi(col as i32)
    });
    let rhs = DVector::from_column_slice(ys);

    let svd = design.svd(true, true);

    // Detect rank deficiency relative to the largest singular value
    let sv_max = svd.singular_values.max();
    let sv_tol = sv_max * RANK_TOL;

    let rank = svd
        .singular_values
        .iter()
        .filter(|sv| **sv > sv_tol)
        .count();

    if rank < POLY_ORDER + 1 {
        return Err(FitError::RankDeficient)
    }

    let solution = match svd.solve(&rhs, sv_tol) {
        Ok(s) => s,
        Err(e) => return Err(FitError::SolveFailed(e))
    };

    let mut coeffs = [0.0; POLY_ORDER + 1];
    for (i, c) in coeffs.iter_mut().enumerate() {
        *c = solution[i];
    }

    Ok(PathModel::new(coeffs))
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
