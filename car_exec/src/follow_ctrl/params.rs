//! Path following control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for path following control
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Stanley cross-track gain
    pub stanley_gain: f64,

    /// Multiplier on the cross-track gain applied when the bracket ends at a
    /// stopping point (heading term suppressed)
    pub stopping_gain_mult: f64,

    /// Wheel angle tracking proportional gain
    pub wheel_angle_k_p: f64,

    /// Wheel angle tracking derivative gain
    pub wheel_angle_k_d: f64,

    /// Steering pre-positioning proportional gain used while held at a stop
    pub hold_k_p: f64,

    /// Longitudinal speed tracking proportional gain
    pub speed_k_p: f64,

    /// Longitudinal speed tracking integral gain
    pub speed_k_i: f64,

    /// Timestep of the inner steering actuator loop
    pub actuator_dt_s: f64,

    /// Timestep stamped on every emitted command
    pub cmd_timestep_s: f64,

    /// Creep speed imposed on the neighbours of every stopping point
    pub creep_speed_ms: f64,

    /// Speed above which the Stanley term is attenuated by `1/v`
    pub speed_attenuation_threshold_ms: f64,

    /// Fraction of the way along the final segment before a stopping point
    /// at which the stop is triggered
    pub segment_release_fraction: f64,

    /// Wheel angle error below which the hold at a stop is released
    pub wheel_angle_tolerance_rad: f64,

    /// Distance from steering saturation below which the hold is released
    pub saturation_margin_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    /// Nominal tuning for the reference vehicle.
    fn default() -> Self {
        Self {
            stanley_gain: 1.5,
            stopping_gain_mult: 4.0,
            wheel_angle_k_p: 2.0,
            wheel_angle_k_d: 0.1,
            hold_k_p: 8.0,
            speed_k_p: 0.5,
            speed_k_i: 0.00005,
            actuator_dt_s: 0.025,
            cmd_timestep_s: 0.1,
            creep_speed_ms: 0.2,
            speed_attenuation_threshold_ms: 4.5,
            segment_release_fraction: 0.95,
            wheel_angle_tolerance_rad: 0.002,
            saturation_margin_rad: 0.1,
        }
    }
}
