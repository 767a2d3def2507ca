//! # Latency compensation
//!
//! Commands issued now only take effect after the actuation latency has
//! elapsed. Planning from the telemetry state and applying the first command
//! would therefore be consistently one latency period late. To remove that
//! bias the current state is projected forward through the latency with the
//! kinematic bicycle model under the last applied actuation, and the
//! optimiser plans from the projected state instead.
//!
//! The heading error of the projected state re-evaluates the reference
//! tangent at the projected x position rather than at the origin: the
//! tangent where the vehicle will actually be is the one the first planned
//! step is measured against.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use crate::model::{Control, VehicleState};
use crate::path_fit::PathModel;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the vehicle-frame state at the planning instant.
///
/// Immediately after the frame transform the vehicle sits at the origin with
/// zero heading, so the cross-track error reduces to `f(0)` and the heading
/// error to `-atan(f'(0))`.
pub fn initial_state(path: &PathModel, speed: f64) -> VehicleState {
    VehicleState {
        x: 0.0,
        y: 0.0,
        psi: 0.0,
        v: speed,
        cte: path.eval(0.0),
        epsi: -path.slope(0.0).atan(),
    }
}

/// Project `state` forward through the actuation latency.
///
/// `last_ctrl` is the actuation currently applied to the vehicle, which keeps
/// acting for the whole latency period.
pub fn compensate(
    state: &VehicleState,
    last_ctrl: &Control,
    path: &PathModel,
    latency_s: f64,
    lf_m: f64
) -> VehicleState {
    let turn_rate = state.v / lf_m * last_ctrl.steer_rad;

    let x = state.x + state.v * state.psi.cos() * latency_s;
    let psi = state.psi - turn_rate * latency_s;

    VehicleState {
        x,
        y: state.y + state.v * state.psi.sin() * latency_s,
        psi,
        v: state.v + last_ctrl.throttle * latency_s,
        cte: state.cte + state.v * state.psi.sin() * latency_s,
        epsi: psi - path.slope(x).atan() - turn_rate * latency_s,
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_initial_state_errors() {
        // f(x) = 1 + 0.5x, curve above and tilted relative to the vehicle
        let path = PathModel::new([1.0, 0.5, 0.0, 0.0]);

        let state = initial_state(&path, 15.0);

        assert!((state.cte - 1.0).abs() < 1e-12);
        assert!((state.epsi + 0.5f64.atan()).abs() < 1e-12);
        assert!((state.v - 15.0).abs() < 1e-12);
        assert_eq!(state.x, 0.0);
        assert_eq!(state.y, 0.0);
        assert_eq!(state.psi, 0.0);
    }

    #[test]
    fn test_zero_latency_keeps_pose() {
        let path = PathModel::new([0.3, 0.1, 0.0, 0.0]);
        let state = initial_state(&path, 20.0);
        let ctrl = Control {
            steer_rad: 0.05,
            throttle: 0.4,
        };

        let projected = compensate(&state, &ctrl, &path, 0.0, 2.67);

        assert!((projected.x - state.x).abs() < 1e-12);
        assert!((projected.y - state.y).abs() < 1e-12);
        assert!((projected.psi - state.psi).abs() < 1e-12);
        assert!((projected.v - state.v).abs() < 1e-12);
        assert!((projected.cte - state.cte).abs() < 1e-12);
    }

    #[test]
    fn test_projection_advances_along_heading() {
        let path = PathModel::new([0.0; 4]);
        let state = initial_state(&path, 20.0);

        let projected = compensate(
            &state, &Control::default(), &path, 0.1, 2.67
        );

        // Straight ahead at 20 for 0.1s
        assert!((projected.x - 2.0).abs() < 1e-12);
        assert!(projected.y.abs() < 1e-12);
        assert!(projected.psi.abs() < 1e-12);
    }

    #[test]
    fn test_latency_monotonically_grows_lateral_deviation() {
        // With a nonzero heading the projected cross-track error must grow
        // strictly with the configured latency.
        let path = PathModel::new([0.0; 4]);
        let state = VehicleState {
            x: 0.0,
            y: 0.0,
            psi: 0.1,
            v: 10.0,
            cte: 0.2,
            epsi: 0.1,
        };

        let latencies = [0.0, 0.05, 0.1, 0.2, 0.4];
        let mut prev_cte = None;

        for latency_s in latencies.iter() {
            let projected = compensate(
                &state, &Control::default(), &path, *latency_s, 2.67
            );

            if let Some(prev) = prev_cte {
                assert!(
                    projected.cte > prev,
                    "cte {} did not grow past {} at latency {}",
                    projected.cte, prev, latency_s
                );
            }
            prev_cte = Some(projected.cte);
        }
    }

    #[test]
    fn test_throttle_grows_speed_over_latency() {
        let path = PathModel::new([0.0; 4]);
        let state = initial_state(&path, 20.0);
        let ctrl = Control {
            steer_rad: 0.0,
            throttle: 1.0,
        };

        let projected = compensate(&state, &ctrl, &path, 0.1, 2.67);
        assert!((projected.v - 20.1).abs() < 1e-12);
    }
}
