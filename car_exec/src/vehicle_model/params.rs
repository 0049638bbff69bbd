//! Vehicle model parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters describing the vehicle's geometry and actuation limits.
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Distance between the front and rear axles (wheelbase)
    pub axle_dist_m: f64,

    /// Maximum wheel deflection (steering angle magnitude)
    pub max_wheel_deflection_rad: f64,

    /// Maximum steering actuator rate
    pub max_phi_velocity_rads: f64,

    /// Maximum speed while driving forward
    pub max_forward_speed_ms: f64,

    /// Maximum speed while driving backward
    pub max_backward_speed_ms: f64,

    /// Desired acceleration while driving forward
    pub desired_forward_acceleration_mss: f64,

    /// Desired deceleration while driving forward
    pub desired_forward_deceleration_mss: f64,

    /// Desired acceleration while driving backward
    pub desired_backward_acceleration_mss: f64,

    /// Desired deceleration while driving backward
    pub desired_backward_deceleration_mss: f64,

    /// Maximum lateral acceleration tolerated through curves
    pub max_lateral_acceleration_mss: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    /// Nominal values for the reference vehicle.
    fn default() -> Self {
        Self {
            axle_dist_m: 2.85,
            max_wheel_deflection_rad: 0.47,
            max_phi_velocity_rads: 1.0,
            max_forward_speed_ms: 2.0,
            max_backward_speed_ms: 1.0,
            desired_forward_acceleration_mss: 1.0,
            desired_forward_deceleration_mss: 1.0,
            desired_backward_acceleration_mss: 0.5,
            desired_backward_deceleration_mss: 1.0,
            max_lateral_acceleration_mss: 1.2,
        }
    }
}
