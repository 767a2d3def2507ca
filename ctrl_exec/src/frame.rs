//! # Frame transform
//!
//! Reference waypoints arrive in the world frame. All planning happens in the
//! vehicle frame, with the vehicle at the origin and its heading along the
//! x axis, which keeps the polynomial fit well conditioned (the path runs
//! roughly along x ahead of the vehicle) and makes the initial pose of every
//! cycle the origin by construction.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised by the frame transform.
#[derive(Debug, Error)]
pub enum FrameError {
    /// No waypoints were supplied.
    #[error("Cannot transform an empty waypoint set")]
    NoWaypoints,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Transform world-frame waypoints into the vehicle frame.
///
/// The vehicle is at `(px, py)` with heading `psi_rad`. Each waypoint is
/// translated so the vehicle sits at the origin and then rotated by
/// `-psi_rad` so the heading axis becomes the local x axis. The transform is
/// an isometry, pairwise distances between waypoints are unchanged.
pub fn to_vehicle_frame(
    world_x: &[f64],
    world_y: &[f64],
    px: f64,
    py: f64,
    psi_rad: f64
) -> Result<(Vec<f64>, Vec<f64>), FrameError> {
    if world_x.is_empty() {
        return Err(FrameError::NoWaypoints)
    }

    let (sin_psi, cos_psi) = psi_rad.sin_cos();

    let mut veh_x = Vec::with_capacity(world_x.len());
    let mut veh_y = Vec::with_capacity(world_y.len());

    for (wx, wy) in world_x.iter().zip(world_y.iter()) {
        let dx = wx - px;
        let dy = wy - py;

        veh_x.push(dx * cos_psi + dy * sin_psi);
        veh_y.push(dy * cos_psi - dx * sin_psi);
    }

    Ok((veh_x, veh_y))
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
