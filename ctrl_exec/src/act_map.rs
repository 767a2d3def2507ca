//! # Actuator mapping
//!
//! The optimiser works in steering radians while the actuation interface
//! expects a normalised value in [-1, 1] with the opposite sign convention.
//! This module owns that conversion so the mismatch lives in exactly one
//! place.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use crate::traj_opt::Params;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Map an optimiser steering angle in radians into the actuator's normalised
/// range.
///
/// The actuator's positive direction is the negation of the model's, so the
/// angle is divided by the maximum steering angle and negated. The result is
/// clamped into [-1, 1] against numerical overshoot from the optimiser.
pub fn map_steering(steer_rad: f64, params: &Params) -> f64 {
    (-steer_rad / params.steer_max_rad).clamp(-1.0, 1.0)
}

/// Map an optimiser throttle into the actuator's range.
///
/// Throttle passes through unchanged apart from clamping to the configured
/// bounds.
pub fn map_throttle(throttle: f64, params: &Params) -> f64 {
    throttle.clamp(params.throttle_min, params.throttle_max)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn test_params() -> Params {
        Params::default()
    }

    #[test]
    fn test_steering_sign_negation() {
        let params = test_params();

        // A positive model angle becomes a negative actuator command
        assert!(map_steering(0.2, &params) < 0.0);
        assert!(map_steering(-0.2, &params) > 0.0);
        assert_eq!(map_steering(0.0, &params), 0.0);
    }

    #[test]
    fn test_steering_scaling() {
        let params = test_params();

        // Full lock maps onto the end of the normalised range
        assert!((map_steering(params.steer_max_rad, &params) + 1.0).abs() < 1e-12);
        assert!((map_steering(-params.steer_max_rad, &params) - 1.0).abs() < 1e-12);

        // Half lock maps onto half range
        let half = map_steering(params.steer_max_rad / 2.0, &params);
        assert!((half + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_steering_overshoot_clamped() {
        let params = test_params();

        // Values beyond full lock clamp rather than exceed the range
        assert_eq!(map_steering(params.steer_max_rad * 2.0, &params), -1.0);
        assert_eq!(map_steering(-params.steer_max_rad * 2.0, &params), 1.0);
    }

    #[test]
    fn test_throttle_clamping() {
        let params = test_params();

        assert_eq!(map_throttle(0.3, &params), 0.3);
        assert_eq!(map_throttle(1.7, &params), 1.0);
        assert_eq!(map_throttle(-2.0, &params), -1.0);
    }
}
