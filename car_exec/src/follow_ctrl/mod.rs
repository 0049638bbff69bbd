//! # Path following control module
//!
//! This module keeps the vehicle on the reference path produced by the
//! upstream planner. The raw path is first consolidated: per-state desired
//! headings and feasible speed envelopes are computed, and the indices at
//! which the vehicle must come to rest (gear reversals and the goal) are
//! collected. Per tick the controller then localises the vehicle against the
//! consolidated path, runs a Stanley steering law on the cross-track and
//! heading errors of the gear-appropriate axle projection, tracks the
//! interpolated reference speed with a PI loop, and steps a small control
//! state machine through the stop points until the goal is reached.
//!
//! Reverse driving reuses the same steering law by mirroring: the steering
//! reference becomes a fake front axle behind the rear axle and the heading
//! error is flipped by pi, so a reverse segment is followed exactly like a
//! forward one.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod localize;
pub mod params;
pub mod path;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controllers::FollowControllers;
pub use localize::Cursor;
pub use params::Params;
pub use path::ConsolidatedPath;
pub use state::{FollowCtrl, FollowCtrlMode, StatusReport};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur during processing of the module.
#[derive(Debug, thiserror::Error)]
pub enum FollowCtrlError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(#[from] util::params::LoadError),

    /// The reference path does not have enough states to define a segment.
    #[error("Reference path must contain at least 2 states, got {0}")]
    PathTooShort(usize),

    /// A reference path state carries a NaN or infinite value. This is a
    /// precondition violation by the upstream planner.
    #[error("Reference path state {0} contains a non-finite value")]
    NonFiniteState(usize),

    /// A drive operation was requested before any path was consolidated.
    #[error("No consolidated path is installed")]
    NoPath,
}
