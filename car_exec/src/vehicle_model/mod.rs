//! # Vehicle model
//!
//! Pure kinematic queries for the car-like vehicle: axle projections used by
//! the steering law, orientation and speed estimates along a reference path,
//! acceleration/deceleration reachability, and a one-step Ackermann
//! integrator used for offline simulation of command lists.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;

// Internal
use crate::pose::{Gear, Pose2D, State2D};
use util::maths;
use util::params as param_loader;

pub use params::Params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The kinematic vehicle model.
///
/// All queries are pure; the model holds nothing but its parameters.
#[derive(Debug, Clone)]
pub struct VehicleModel {
    pub params: Params,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehicleModel {
    /// Initialise the model from a parameter file.
    pub fn init(params_path: &str) -> Result<Self, param_loader::LoadError> {
        Ok(Self::new(param_loader::load(params_path)?))
    }

    pub fn new(params: Params) -> Self {
        Self { params }
    }

    /// Get the front axle state with respect to the rear axle state.
    pub fn front_axle_state(&self, s: &State2D) -> State2D {
        let mut front = *s;
        front.position += self.params.axle_dist_m * heading_vector(s.orientation);
        front
    }

    /// Get the fake front axle state: the front axle mirrored behind the rear
    /// axle, used as the steering reference while driving backward.
    pub fn fake_front_axle_state(&self, s: &State2D) -> State2D {
        let mut front = *s;
        front.position -= self.params.axle_dist_m * heading_vector(s.orientation);
        front
    }

    /// Desired heading at `cur` while driving forward, estimated from the
    /// neighbouring states.
    ///
    /// The displacement `next - prev` is the vector mean of the two segment
    /// directions meeting at `cur`. Degenerate triplets keep the current
    /// heading.
    pub fn forward_orientation(&self, prev: &State2D, cur: &State2D, next: &State2D) -> f64 {
        let d = next.position - prev.position;
        if d.norm() <= f64::EPSILON {
            return cur.orientation;
        }
        d.y.atan2(d.x)
    }

    /// Desired heading at `cur` while driving backward: the vehicle points
    /// against its direction of travel.
    pub fn backward_orientation(&self, prev: &State2D, cur: &State2D, next: &State2D) -> f64 {
        maths::wrap_to_pi(self.forward_orientation(prev, cur, next) + std::f64::consts::PI)
    }

    /// Geometry-limited speed at `cur` while driving forward.
    pub fn forward_speed(&self, prev: &State2D, cur: &State2D, next: &State2D) -> f64 {
        self.curve_limited_speed(
            self.curvature_at(prev, cur, next),
            self.params.max_forward_speed_ms,
        )
    }

    /// Geometry-limited speed at `cur` while driving backward.
    pub fn backward_speed(&self, prev: &State2D, cur: &State2D, next: &State2D) -> f64 {
        self.curve_limited_speed(
            self.curvature_at(prev, cur, next),
            self.params.max_backward_speed_ms,
        )
    }

    /// Maximum speed reachable over `distance` when starting at `v_ref` and
    /// accelerating at the gear's desired rate.
    pub fn acceleration_constraint(&self, v_ref: f64, distance: f64, gear: Gear) -> f64 {
        let accel = match gear {
            Gear::Forward => self.params.desired_forward_acceleration_mss,
            Gear::Backward => self.params.desired_backward_acceleration_mss,
        };
        (v_ref * v_ref + 2.0 * accel * distance).sqrt()
    }

    /// Maximum speed from which `v_ref` is reachable over `distance` when
    /// decelerating at the gear's desired rate.
    pub fn deceleration_constraint(&self, v_ref: f64, distance: f64, gear: Gear) -> f64 {
        let decel = match gear {
            Gear::Forward => self.params.desired_forward_deceleration_mss,
            Gear::Backward => self.params.desired_backward_deceleration_mss,
        };
        (v_ref * v_ref + 2.0 * decel * distance).sqrt()
    }

    /// Advance a pose by one integration step of the kinematic bicycle.
    pub fn next_pose(&self, pose: &Pose2D, v: f64, phi: f64, dt: f64) -> Pose2D {
        Pose2D {
            position: pose.position + v * dt * heading_vector(pose.orientation),
            orientation: maths::wrap_to_pi(
                pose.orientation + v / self.params.axle_dist_m * phi.tan() * dt,
            ),
        }
    }

    /// Advance a state over its own timestep. The speed is signed, so
    /// backward motion is a negative `v`.
    pub fn next_state(&self, s: &State2D) -> State2D {
        let pose = self.next_pose(&s.pose(), s.v, s.phi, s.t);
        let mut next = *s;
        next.position = pose.position;
        next.orientation = pose.orientation;
        next
    }

    /// Unsigned Menger curvature of the triplet. Degenerate triplets (any
    /// coincident pair) are treated as straight.
    fn curvature_at(&self, prev: &State2D, cur: &State2D, next: &State2D) -> f64 {
        let a = cur.position - prev.position;
        let b = next.position - cur.position;
        let c = next.position - prev.position;

        let denom = a.norm() * b.norm() * c.norm();
        if denom <= f64::EPSILON {
            return 0.0;
        }

        (2.0 * (a.x * b.y - a.y * b.x) / denom).abs()
    }

    /// Cap a gear speed limit by the lateral acceleration constraint.
    fn curve_limited_speed(&self, curvature: f64, speed_cap_ms: f64) -> f64 {
        if curvature <= f64::EPSILON {
            return speed_cap_ms;
        }
        speed_cap_ms.min((self.params.max_lateral_acceleration_mss / curvature).sqrt())
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Unit vector along a heading angle.
fn heading_vector(orientation: f64) -> Vector2<f64> {
    Vector2::new(orientation.cos(), orientation.sin())
}

#[cfg(test)]
mod test {
    use super::*;

    const PI: f64 = std::f64::consts::PI;

    fn model() -> VehicleModel {
        VehicleModel::new(Params::default())
    }

    #[test]
    fn test_axle_projections() {
        let model = model();
        let wheelbase = model.params.axle_dist_m;

        let s = State2D::new(1.0, 2.0, 0.0, 0.0, Gear::Forward);
        let front = model.front_axle_state(&s);
        assert!((front.position.x - (1.0 + wheelbase)).abs() < 1e-9);
        assert!((front.position.y - 2.0).abs() < 1e-9);

        let fake = model.fake_front_axle_state(&s);
        assert!((fake.position.x - (1.0 - wheelbase)).abs() < 1e-9);

        let s = State2D::new(0.0, 0.0, PI / 2.0, 0.0, Gear::Forward);
        let front = model.front_axle_state(&s);
        assert!(front.position.x.abs() < 1e-9);
        assert!((front.position.y - wheelbase).abs() < 1e-9);
    }

    #[test]
    fn test_orientation_estimates() {
        let model = model();
        let prev = State2D::new(0.0, 0.0, 0.0, 1.0, Gear::Forward);
        let cur = State2D::new(1.0, 0.1, 0.0, 1.0, Gear::Forward);
        let next = State2D::new(2.0, 0.0, 0.0, 1.0, Gear::Forward);

        assert!(model.forward_orientation(&prev, &cur, &next).abs() < 1e-9);
        assert!((model.backward_orientation(&prev, &cur, &next) - PI).abs() < 1e-9);

        // Coincident neighbours keep the current heading
        let cur = State2D::new(1.0, 0.1, 0.4, 1.0, Gear::Forward);
        assert!((model.forward_orientation(&prev, &cur, &prev) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_speed_estimates() {
        let model = model();

        // Straight triplet is capped by the gear speed limit
        let prev = State2D::new(0.0, 0.0, 0.0, 0.0, Gear::Forward);
        let cur = State2D::new(1.0, 0.0, 0.0, 0.0, Gear::Forward);
        let next = State2D::new(2.0, 0.0, 0.0, 0.0, Gear::Forward);
        assert!(
            (model.forward_speed(&prev, &cur, &next) - model.params.max_forward_speed_ms).abs()
                < 1e-9
        );

        // A unit-curvature corner is limited by lateral acceleration
        let cur = State2D::new(1.0, 1.0, 0.0, 0.0, Gear::Forward);
        let expected = model.params.max_lateral_acceleration_mss.sqrt();
        assert!((model.forward_speed(&prev, &cur, &next) - expected).abs() < 1e-9);
        assert!(model.backward_speed(&prev, &cur, &next) <= model.params.max_backward_speed_ms);
    }

    #[test]
    fn test_reachability_constraints() {
        let model = model();

        // v^2 = 0.2^2 + 2 * 1.0 * 0.48 = 1.0
        let v = model.acceleration_constraint(0.2, 0.48, Gear::Forward);
        assert!((v - 1.0).abs() < 1e-9);

        let v = model.deceleration_constraint(0.0, 0.5, Gear::Forward);
        assert!((v - 1.0f64.sqrt()).abs() < 1e-9);

        // Backward gear uses the backward rates
        let v = model.acceleration_constraint(0.0, 1.0, Gear::Backward);
        assert!((v - 1.0f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_next_state() {
        let model = model();

        let mut s = State2D::new(0.0, 0.0, 0.0, 1.0, Gear::Forward);
        s.t = 0.1;
        let next = model.next_state(&s);
        assert!((next.position.x - 0.1).abs() < 1e-9);
        assert!(next.position.y.abs() < 1e-9);
        assert!(next.orientation.abs() < 1e-9);

        // Steering turns the heading, negative speed moves backward
        s.phi = 0.3;
        let next = model.next_state(&s);
        assert!(next.orientation > 0.0);

        s.phi = 0.0;
        s.v = -1.0;
        let next = model.next_state(&s);
        assert!((next.position.x + 0.1).abs() < 1e-9);
    }
}
