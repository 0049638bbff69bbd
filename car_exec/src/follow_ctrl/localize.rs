//! # Path localisation
//!
//! Finds the pair of consolidated path indices bracketing the vehicle. The
//! search is windowed around the waypoint cursor and refuses to scan across
//! a `coming_to_stop` marker, which keeps the bracket from jumping over a
//! stopping point near a cusp, where the path folds back over itself and a
//! plain nearest-point search has a second minimum.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use super::path::ConsolidatedPath;
use crate::pose::State2D;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The waypoint cursor: where along the consolidated path the controller
/// believes the vehicle to be.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Cursor {
    /// Index of the waypoint behind the vehicle.
    pub prev_waypoint: usize,

    /// Index of the waypoint ahead of the vehicle.
    pub next_waypoint: usize,

    /// Index of the most recently executed stopping point.
    pub last_cusp: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Cursor {
    /// Cursor state for a freshly consolidated path.
    pub fn new() -> Self {
        Self {
            prev_waypoint: 0,
            next_waypoint: 1,
            last_cusp: 0,
        }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Find the `(prev, next)` indices bracketing the vehicle state `s`.
pub fn localize(path: &ConsolidatedPath, s: &State2D, cursor: &Cursor) -> (usize, usize) {
    let raw = &path.raw;
    let last = path.last_index();

    // Window the search around the cursor, never behind the last stop
    let start = cursor
        .last_cusp
        .max(cursor.next_waypoint.saturating_sub(2));
    let end = (cursor.next_waypoint + 2).min(last);

    // Nearest raw state within the window, stopping at a stop marker
    let mut besti = start;
    let mut bestd = f64::MAX;

    for i in (start + 1)..end {
        if raw[i - 1].coming_to_stop {
            break;
        }

        let d = (s.position - raw[i].position).norm();
        if d < bestd {
            bestd = d;
            besti = i;
        }
    }

    // Select the bracket around the nearest state
    let (mut prev_index, mut next_index);

    if besti + 1 > last {
        prev_index = besti - 1;
        next_index = besti;
    } else if besti == 0 {
        prev_index = besti;
        next_index = besti + 1;
    } else if besti == cursor.last_cusp {
        prev_index = besti;
        next_index = besti + 1;
    } else {
        let prev_d2 = (s.position - raw[besti - 1].position).norm_squared();
        let next_d2 = (s.position - raw[besti + 1].position).norm_squared();

        if prev_d2 < next_d2 {
            prev_index = besti - 1;
            next_index = besti;
        } else {
            prev_index = besti;
            next_index = besti + 1;
        }
    }

    // Back off one index rather than sit on the far side of an unexecuted
    // stop
    if prev_index > 0
        && raw[prev_index - 1].coming_to_stop
        && prev_index != cursor.prev_waypoint
    {
        prev_index -= 1;
        next_index -= 1;
    }

    (prev_index, next_index)
}
