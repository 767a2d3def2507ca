//! # Controller interface library
//!
//! This library defines the data exchanged between the controller core and
//! the external telemetry/actuation collaborator (for instance a driving
//! simulator bridge). The collaborator owns the transport itself, the
//! controller only ever sees the deserialised snapshots and produces the
//! command structures defined here.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod cmd;
pub mod telem;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use cmd::ActuationCmd;
pub use telem::{Telemetry, TelemError};
