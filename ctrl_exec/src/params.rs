//! # Controller Executable Parameters
//!
//! This module provides parameters for the controller executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters governing the executable's cycle management and safety
/// fallbacks.
#[derive(Deserialize, Debug, Clone)]
pub struct CtrlExecParams {

    /// Target period of one control cycle in seconds
    pub cycle_period_s: f64,

    /// Time to wait for a worker's cycle result before declaring the cycle
    /// late, in seconds
    pub cycle_timeout_s: f64,

    /// Throttle commanded while falling back after a failed cycle. Negative
    /// values brake, bringing the vehicle down to a safer speed until
    /// planning recovers.
    pub fallback_throttle: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Default for CtrlExecParams {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.1,
            cycle_timeout_s: 0.5,
            fallback_throttle: -0.3,
        }
    }
}
