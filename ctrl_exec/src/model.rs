//! # Kinematic bicycle model
//!
//! The planning model treats the vehicle as a bicycle with the steering axle
//! a distance `Lf` ahead of the centre of gravity. The state carries the
//! tracking errors (cross-track and heading error) alongside the pose so
//! that the optimiser can propagate them with the same forward-Euler update
//! it uses for the pose itself.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use crate::path_fit::PathModel;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Vehicle state in the vehicle frame at the planning instant.
#[derive(Debug, Copy, Clone, Default, Serialize)]
pub struct VehicleState {
    /// Position along the vehicle's heading axis
    pub x: f64,

    /// Position along the vehicle's lateral axis
    pub y: f64,

    /// Heading relative to the vehicle frame's x axis, in radians
    pub psi: f64,

    /// Speed
    pub v: f64,

    /// Cross-track error to the reference curve
    pub cte: f64,

    /// Heading error to the reference curve tangent, in radians
    pub epsi: f64,
}

/// One step's actuation: steering angle and throttle.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct Control {
    /// Steering angle in radians
    pub steer_rad: f64,

    /// Throttle (positive) or brake (negative)
    pub throttle: f64,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Propagate the state one step of length `dt_s` under the given actuation.
///
/// The cross-track and heading errors are propagated against the reference
/// curve `path`, which must be the curve fitted in the same cycle as `prev`.
pub fn step(
    prev: &VehicleState,
    ctrl: &Control,
    path: &PathModel,
    dt_s: f64,
    lf_m: f64
) -> VehicleState {
    let turn_rate = prev.v / lf_m * ctrl.steer_rad;

    VehicleState {
        x: prev.x + prev.v * prev.psi.cos() * dt_s,
        y: prev.y + prev.v * prev.psi.sin() * dt_s,
        psi: prev.psi - turn_rate * dt_s,
        v: prev.v + ctrl.throttle * dt_s,
        cte: path.eval(prev.x) - prev.y + prev.v * prev.epsi.sin() * dt_s,
        epsi: prev.psi - path.slope(prev.x).atan() - turn_rate * dt_s,
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehicleState {
    /// True if every component of the state is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.psi.is_finite()
            && self.v.is_finite()
            && self.cte.is_finite()
            && self.epsi.is_finite()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_straight_line_step() {
        // On a straight reference with no errors and no actuation the state
        // just advances along x.
        let path = PathModel::new([0.0; 4]);
        let state = VehicleState {
            v: 10.0,
            ..Default::default()
        };

        let next = step(&state, &Control::default(), &path, 0.1, 2.67);

        assert!((next.x - 1.0).abs() < 1e-12);
        assert!(next.y.abs() < 1e-12);
        assert!(next.psi.abs() < 1e-12);
        assert!((next.v - 10.0).abs() < 1e-12);
        assert!(next.cte.abs() < 1e-12);
        assert!(next.epsi.abs() < 1e-12);
    }

    #[test]
    fn test_steering_turns_heading() {
        let path = PathModel::new([0.0; 4]);
        let state = VehicleState {
            v: 10.0,
            ..Default::default()
        };
        let ctrl = Control {
            steer_rad: 0.1,
            throttle: 0.5,
        };

        let next = step(&state, &ctrl, &path, 0.1, 2.67);

        // Positive steering decreases heading in this model's convention
        assert!(next.psi < 0.0);
        assert!((next.psi + 10.0 / 2.67 * 0.1 * 0.1).abs() < 1e-12);
        assert!((next.v - 10.05).abs() < 1e-12);
    }

    #[test]
    fn test_is_finite() {
        let mut state = VehicleState::default();
        assert!(state.is_finite());

        state.cte = f64::NAN;
        assert!(!state.is_finite());
    }
}
