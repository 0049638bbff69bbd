//! # Pose and state entities
//!
//! This module defines the planar pose and vehicle state types shared by the
//! vehicle model and the path-following controller. A [`State2D`] is both a
//! point of the reference path and an actuation command: the controller
//! consumes path states and emits command states.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Driving direction of the transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gear {
    Forward,
    Backward,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A planar pose: position and heading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    /// Position in the map frame, in meters.
    pub position: Vector2<f64>,

    /// Heading (angle to the positive x axis) in radians, in `(-pi, pi]`.
    pub orientation: f64,
}

/// The full kinematic state of the vehicle at the rear axle.
///
/// `v` is signed on the vehicle and command side (negative while driving
/// backward); reference path states always carry `v >= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct State2D {
    /// Position in the map frame, in meters.
    pub position: Vector2<f64>,

    /// Heading in radians, in `(-pi, pi]`.
    pub orientation: f64,

    /// Steering (wheel) angle in radians.
    pub phi: f64,

    /// Longitudinal speed in meters per second.
    pub v: f64,

    /// Driving direction.
    pub gear: Gear,

    /// Timestep the state (as a command) is valid for, in seconds.
    pub t: f64,

    /// Set on the last path point before a required stop.
    pub coming_to_stop: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State2D {
    /// Build a state at the given position, heading and speed, with the
    /// steering centered and the timestep cleared.
    pub fn new(x: f64, y: f64, orientation: f64, v: f64, gear: Gear) -> Self {
        Self {
            position: Vector2::new(x, y),
            orientation,
            phi: 0.0,
            v,
            gear,
            t: 0.0,
            coming_to_stop: false,
        }
    }

    /// The pose part of the state.
    pub fn pose(&self) -> Pose2D {
        Pose2D {
            position: self.position,
            orientation: self.orientation,
        }
    }

    /// True if every numeric field of the state is finite.
    pub fn is_finite(&self) -> bool {
        self.position.x.is_finite()
            && self.position.y.is_finite()
            && self.orientation.is_finite()
            && self.phi.is_finite()
            && self.v.is_finite()
            && self.t.is_finite()
    }
}

impl Default for State2D {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, Gear::Forward)
    }
}
