//! # Car autonomy library
//!
//! This library implements the path-following layer of the car's autonomy
//! stack. An upstream planner hands over a geometrically feasible reference
//! path (a sequence of planar states annotated with gear and nominal speed),
//! and [`follow_ctrl`] turns it into a time-sequenced stream of low-level
//! actuation commands which drive the vehicle along the path, slow it down
//! around gear reversals and the goal, and bring it to a clean halt at each
//! required stop.
//!
//! The [`vehicle_model`] module provides the kinematic queries the controller
//! is built on (axle projections, reachable-speed constraints, and the
//! one-step Ackermann integrator used for offline simulation).

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod follow_ctrl;
pub mod pose;
pub mod vehicle_model;
