//! # Actuation command
//!
//! The command produced by the controller at the end of every control cycle,
//! handed back to the transport collaborator for delivery to the vehicle.
//! The predicted and reference trajectories ride along for display purposes
//! and use the simulator's display message field names.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// The actuation command for one control cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActuationCmd {
    /// Normalised steering command in [-1, 1].
    ///
    /// The sign convention is the actuator's, which is the negation of the
    /// internal steering angle convention.
    pub steering_angle: f64,

    /// Throttle (positive) or brake (negative) command, clamped to the
    /// configured actuator bounds.
    pub throttle: f64,

    /// Vehicle-frame x positions of the predicted trajectory over the
    /// planning horizon.
    #[serde(rename = "mpc_x")]
    pub predicted_x: Vec<f64>,

    /// Vehicle-frame y positions of the predicted trajectory.
    #[serde(rename = "mpc_y")]
    pub predicted_y: Vec<f64>,

    /// Vehicle-frame x positions of the reference waypoints.
    #[serde(rename = "next_x")]
    pub reference_x: Vec<f64>,

    /// Vehicle-frame y positions of the reference waypoints.
    #[serde(rename = "next_y")]
    pub reference_y: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl ActuationCmd {
    /// True if every numeric field of the command is finite.
    ///
    /// A command failing this check must never be forwarded to actuation.
    pub fn is_finite(&self) -> bool {
        self.steering_angle.is_finite()
            && self.throttle.is_finite()
            && self.predicted_x.iter().all(|v| v.is_finite())
            && self.predicted_y.iter().all(|v| v.is_finite())
            && self.reference_x.iter().all(|v| v.is_finite())
            && self.reference_y.iter().all(|v| v.is_finite())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_is_finite() {
        let mut cmd = ActuationCmd::default();
        assert!(cmd.is_finite());

        cmd.predicted_x = vec![1.0, f64::NAN];
        assert!(!cmd.is_finite());

        cmd.predicted_x = vec![1.0, 2.0];
        cmd.steering_angle = f64::INFINITY;
        assert!(!cmd.is_finite());
    }

    #[test]
    fn test_display_field_names() {
        let cmd = ActuationCmd {
            steering_angle: -0.1,
            throttle: 0.3,
            predicted_x: vec![1.0],
            predicted_y: vec![0.5],
            reference_x: vec![2.0],
            reference_y: vec![0.7],
        };

        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"mpc_x\""));
        assert!(json.contains("\"next_y\""));
        assert!(json.contains("\"steering_angle\""));
    }
}
