//! # Follow controllers
//!
//! The control laws behind the path follower: the Stanley steering law used
//! while driving, the steering pre-positioning law used while held at a
//! stopping point, and the PI speed tracker. The struct owns the controller
//! memory (previous wheel angle error and the speed integrator) so that the
//! laws stay re-entrant per tick.
//!
//! Every steering and speed command passes through the same actuator stage:
//! a rate-limited wheel angle update, a hard clamp at the maximum wheel
//! deflection, and truncation to the milliradian grid the actuator accepts.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::Params;
use crate::pose::{Pose2D, State2D};
use crate::vehicle_model::VehicleModel;
use util::maths;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Resolution of the actuator command grid.
const CMD_QUANTUM: f64 = 1.0e-3;

/// Speed-proportional relaxation of the wheel angle toward center in the
/// actuator stage.
const SPEED_RELAX: f64 = 0.01;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The follow controllers and their memory.
#[derive(Debug, Clone, Serialize)]
pub struct FollowControllers {
    /// Wheel angle error on the previous tick.
    prev_wheel_angle_error: f64,

    /// Accumulated speed tracking error.
    vpasterror: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FollowControllers {
    pub fn new() -> Self {
        Self {
            prev_wheel_angle_error: 0.0,
            vpasterror: 0.0,
        }
    }

    /// Clear all controller memory.
    pub fn reset(&mut self) {
        self.prev_wheel_angle_error = 0.0;
        self.vpasterror = 0.0;
    }

    /// Clear the wheel angle error memory, done when leaving a stop so the
    /// derivative term does not kick against the new segment.
    pub(crate) fn reset_wheel_angle_error(&mut self) {
        self.prev_wheel_angle_error = 0.0;
    }

    /// Stanley steering law for the driving modes.
    ///
    /// Returns the next steering command and the cross-track distance of the
    /// axle reference point. `the_path` is the projected path matching the
    /// current gear, `front` the matching axle projection of the vehicle.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn drive_steering(
        &mut self,
        params: &Params,
        model: &VehicleModel,
        the_path: &[State2D],
        prev_index: usize,
        next_index: usize,
        s: &State2D,
        front: &State2D,
        reverse_mode: bool,
        coming_to_stop: bool,
        how_far: f64,
    ) -> (f64, f64) {
        let prev = &the_path[prev_index];
        let next = &the_path[next_index];

        let foot = closest_point(&front.position, &prev.position, &next.position);

        // Desired heading: the direction into the bracket, blended toward
        // the heading out of it as the vehicle progresses along the segment
        let heading = if prev_index > 0 {
            next.position - the_path[prev_index - 1].position
        } else {
            next.position - prev.position
        };
        let mut desired_heading = heading.y.atan2(heading.x);

        let next_heading = if coming_to_stop || next_index + 1 >= the_path.len() {
            next.orientation + if reverse_mode { std::f64::consts::PI } else { 0.0 }
        } else {
            let ahead = the_path[next_index + 1].position - prev.position;
            ahead.y.atan2(ahead.x)
        };

        desired_heading += maths::wrap_to_pi(next_heading - desired_heading) * how_far;

        // Which side of the segment is the axle reference on?
        let mut direction = path_side(&front.position, &foot.position, &prev.position, &next.position);

        let mut d_theta = maths::wrap_to_pi(
            s.orientation - desired_heading + if reverse_mode { std::f64::consts::PI } else { 0.0 },
        );

        if reverse_mode {
            d_theta = -d_theta;
            direction = -direction;
        }

        let k = params.stanley_gain;
        let dist = (front.position - foot.position).norm();
        let inverse_speed = if s.v > params.speed_attenuation_threshold_ms {
            1.0 / s.v
        } else {
            1.0
        };

        // Approaching a stop the heading term is suppressed and the vehicle
        // steers on cross-track alone
        let phi_target = if next.coming_to_stop {
            (params.stopping_gain_mult * k * dist * direction * inverse_speed).atan()
        } else {
            maths::wrap_to_pi(-d_theta + (k * dist * direction * inverse_speed).atan())
        };

        // Wheel angle PD toward the target
        let phi_error = phi_target - s.phi;
        let d_phi_error = (phi_error - self.prev_wheel_angle_error) / params.actuator_dt_s;
        self.prev_wheel_angle_error = phi_error;

        let demand = maths::clamp(
            &(phi_error * params.wheel_angle_k_p + d_phi_error * params.wheel_angle_k_d),
            &-1.0,
            &1.0,
        );

        (quantize(actuator_step(params, model, demand, s)), dist)
    }

    /// Steering pre-positioning while the vehicle is held at a stopping
    /// point, turning the wheels toward the segment about to be entered.
    ///
    /// Returns the next steering command and the wheel angle error driving
    /// it (the release decision is made on the error).
    pub(crate) fn hold_steering(
        &self,
        params: &Params,
        model: &VehicleModel,
        s: &State2D,
        desired_heading: f64,
    ) -> (f64, f64) {
        let phi_error = -maths::wrap_to_pi(s.orientation - desired_heading) - s.phi;

        // Derivative term held at zero: there is no meaningful error history
        // across a stop
        let demand = maths::clamp(&(phi_error * params.hold_k_p), &-1.0, &1.0);

        (quantize(actuator_step(params, model, demand, s)), phi_error)
    }

    /// PI tracker on the reference speed interpolated along the bracket.
    /// Returns the quantized speed increment to apply to the command.
    pub(crate) fn speed_delta(
        &mut self,
        params: &Params,
        s: &State2D,
        prev_v: f64,
        next_v: f64,
        how_far: f64,
        reverse_mode: bool,
    ) -> f64 {
        let v_ref = (1.0 - how_far) * prev_v + how_far * next_v;

        // Command speed is signed; the tracking error lives on the speed
        // along the gear direction
        let measured = if reverse_mode { -s.v } else { s.v };
        let verror = measured - v_ref;

        self.vpasterror += verror * params.actuator_dt_s;

        let mut dv = -(params.speed_k_p * verror + params.speed_k_i * self.vpasterror);
        if reverse_mode {
            dv = -dv;
        }

        quantize(dv)
    }
}

impl Default for FollowControllers {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Rate-limited wheel angle update toward a normalised demand in `[-1, 1]`,
/// clamped at the maximum wheel deflection.
fn actuator_step(params: &Params, model: &VehicleModel, demand: f64, s: &State2D) -> f64 {
    let phi_max = model.params.max_wheel_deflection_rad;

    let steer = s.phi
        + params.actuator_dt_s
            * (demand * model.params.max_phi_velocity_rads
                - s.phi / phi_max * s.v * SPEED_RELAX);

    maths::clamp(&steer, &-phi_max, &phi_max)
}

/// Truncate a command onto the actuator grid.
fn quantize(value: f64) -> f64 {
    (value * 1000.0).trunc() * CMD_QUANTUM
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Perpendicular foot of `point` on the line through `prev` and `next`,
/// with the vertical special case handled to avoid the division by zero.
pub(crate) fn closest_point(
    point: &Vector2<f64>,
    prev: &Vector2<f64>,
    next: &Vector2<f64>,
) -> Pose2D {
    let position = if next.x == prev.x {
        Vector2::new(next.x, point.y)
    } else {
        let m = (next.y - prev.y) / (next.x - prev.x);
        let m2 = m * m;
        let b = next.y - m * next.x;

        Vector2::new(
            (m * point.y + point.x - m * b) / (m2 + 1.0),
            (m2 * point.y + m * point.x + b) / (m2 + 1.0),
        )
    };

    Pose2D {
        position,
        orientation: (next.y - prev.y).atan2(next.x - prev.x),
    }
}

/// Fraction of the way along the segment `prev -> next` at which `point`
/// projects, clamped to `[0, 1]`. Zero-length segments pin to the start.
pub(crate) fn how_far_along(
    point: &Vector2<f64>,
    prev: &Vector2<f64>,
    next: &Vector2<f64>,
) -> f64 {
    let r = point - prev;
    let d = next - prev;

    let len2 = d.norm_squared();
    if len2 <= f64::EPSILON {
        return 0.0;
    }

    maths::clamp(&(r.dot(&d) / len2), &0.0, &1.0)
}

/// Which side of the bracket the axle reference point is on: `-1.0` if the
/// probe point rotated to the left of the segment is nearer, `+1.0`
/// otherwise.
///
/// The probe normal swaps the segment components before rotating. This is
/// not the standard perpendicular; the sign conventions downstream depend on
/// this exact construction.
pub(crate) fn path_side(
    front: &Vector2<f64>,
    foot: &Vector2<f64>,
    prev: &Vector2<f64>,
    next: &Vector2<f64>,
) -> f64 {
    let mut norm = Vector2::new(next.y - prev.y, next.x - prev.x);

    let len = norm.norm();
    if len > f64::EPSILON {
        norm /= len;
    }

    let left = foot + 2.0 * Vector2::new(-norm.y, norm.x);
    let right = foot + 2.0 * Vector2::new(norm.y, -norm.x);

    if (front - left).norm_squared() < (front - right).norm_squared() {
        -1.0
    } else {
        1.0
    }
}
