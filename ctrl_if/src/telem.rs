//! # Vehicle telemetry snapshot
//!
//! One snapshot is delivered per control cycle by the transport collaborator.
//! Field names follow the simulator's telemetry message so that snapshots can
//! be deserialised straight off the wire.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// A complete telemetry snapshot for one control cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Telemetry {
    /// World-frame x positions of the reference waypoints, ordered along the
    /// path direction.
    #[serde(rename = "ptsx")]
    pub waypoints_x: Vec<f64>,

    /// World-frame y positions of the reference waypoints.
    #[serde(rename = "ptsy")]
    pub waypoints_y: Vec<f64>,

    /// World-frame x position of the vehicle.
    pub x: f64,

    /// World-frame y position of the vehicle.
    pub y: f64,

    /// Heading of the vehicle in radians.
    pub psi: f64,

    /// Current speed of the vehicle.
    pub speed: f64,

    /// The last steering angle applied to the vehicle, in radians.
    pub steering_angle: f64,

    /// The last throttle value applied to the vehicle.
    pub throttle: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// Errors raised by telemetry validation. A snapshot failing validation must
/// not be processed, the cycle is skipped instead.
#[derive(Debug, thiserror::Error)]
pub enum TelemError {
    /// The snapshot contains no reference waypoints at all.
    #[error("Telemetry contains no reference waypoints")]
    NoWaypoints,

    /// The waypoint coordinate vectors are of different lengths.
    #[error("Waypoint vectors have mismatched lengths ({x_len} x values, {y_len} y values)")]
    WaypointLengthMismatch {
        x_len: usize,
        y_len: usize
    },

    /// A field holds a NaN or infinite value.
    #[error("Telemetry field {0} is not finite")]
    NonFiniteField(&'static str),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Telemetry {
    /// Validate the snapshot, checking waypoint consistency and that every
    /// numeric field is finite.
    pub fn validate(&self) -> Result<(), TelemError> {
        if self.waypoints_x.is_empty() {
            return Err(TelemError::NoWaypoints)
        }

        if self.waypoints_x.len() != self.waypoints_y.len() {
            return Err(TelemError::WaypointLengthMismatch {
                x_len: self.waypoints_x.len(),
                y_len: self.waypoints_y.len()
            })
        }

        if !self.waypoints_x.iter().all(|v| v.is_finite()) {
            return Err(TelemError::NonFiniteField("ptsx"))
        }
        if !self.waypoints_y.iter().all(|v| v.is_finite()) {
            return Err(TelemError::NonFiniteField("ptsy"))
        }

        // Scalar fields
        if !self.x.is_finite() {
            return Err(TelemError::NonFiniteField("x"))
        }
        if !self.y.is_finite() {
            return Err(TelemError::NonFiniteField("y"))
        }
        if !self.psi.is_finite() {
            return Err(TelemError::NonFiniteField("psi"))
        }
        if !self.speed.is_finite() {
            return Err(TelemError::NonFiniteField("speed"))
        }
        if !self.steering_angle.is_finite() {
            return Err(TelemError::NonFiniteField("steering_angle"))
        }
        if !self.throttle.is_finite() {
            return Err(TelemError::NonFiniteField("throttle"))
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
