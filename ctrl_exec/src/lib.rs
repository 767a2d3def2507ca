//! # Controller library.
//!
//! This library holds the per-cycle trajectory planning pipeline of the MPC
//! Control Software. Each control cycle the pipeline takes a telemetry
//! snapshot, plans over a short horizon and produces a single actuation
//! command plus the predicted trajectory for display.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Actuator mapping - converts optimiser outputs into the actuator's
/// normalised conventions
pub mod act_map;

/// Frame transform - moves reference waypoints from the world frame into the
/// vehicle frame
pub mod frame;

/// Latency compensation - projects the vehicle state through the actuation
/// delay so the optimiser plans from where the vehicle will actually be
pub mod latency;

/// Kinematic bicycle model shared by latency compensation and the optimiser
pub mod model;

/// Executable parameters
pub mod params;

/// Reference path fitting - least squares polynomial fit of the vehicle-frame
/// waypoints
pub mod path_fit;

/// Control pipeline - runs one full planning cycle from telemetry to command
pub mod pipeline;

/// Trajectory optimiser - finite-horizon constrained solve over the bicycle
/// model
pub mod traj_opt;

/// Per-connection worker thread driving the pipeline
pub mod worker;
