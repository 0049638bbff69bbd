//! # Consolidated reference path
//!
//! Consolidation turns the planner's raw state list into the controller's
//! working representation: three index-aligned paths (the raw rear-axle
//! states plus their front-axle and fake-front-axle projections), the sorted
//! list of stopping indices, and the feasible speed envelope around every
//! stop.
//!
//! Keeping the projections precomputed trades 3x path memory for an
//! allocation-free tick: the steering law indexes straight into the
//! projection matching the current gear.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::info;
use serde::{Deserialize, Serialize};

// Internal
use super::FollowCtrlError;
use crate::pose::{Gear, State2D};
use crate::vehicle_model::VehicleModel;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The consolidated reference path.
///
/// All three paths have the same length and are index-aligned: `forward[i]`
/// is `raw[i]` advanced one wheelbase along its heading, `reverse[i]` is
/// `raw[i]` retarded one wheelbase. `stopping` is strictly increasing and
/// always ends with the last index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedPath {
    /// Reference states at the rear axle.
    pub raw: Vec<State2D>,

    /// Front axle projections, the steering reference for forward driving.
    pub forward: Vec<State2D>,

    /// Fake front axle projections, the steering reference for reverse
    /// driving.
    pub reverse: Vec<State2D>,

    /// Indices at which the vehicle must be at rest.
    pub stopping: Vec<usize>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ConsolidatedPath {
    /// Consolidate a raw reference path.
    ///
    /// The endpoints are preserved as given. Every interior state gets its
    /// orientation and speed recomputed from its neighbour triplet with the
    /// gear-appropriate estimator; interior states where the gear flips
    /// (cusps) get zero speed and a stopping index instead. The goal is
    /// always a stopping index. Finally the speed envelope around every stop
    /// is propagated outward under the vehicle's acceleration and
    /// deceleration limits.
    pub fn consolidate(
        input: &[State2D],
        model: &VehicleModel,
        creep_speed_ms: f64,
    ) -> Result<Self, FollowCtrlError> {
        if input.len() < 2 {
            return Err(FollowCtrlError::PathTooShort(input.len()));
        }
        for (i, s) in input.iter().enumerate() {
            if !s.is_finite() {
                return Err(FollowCtrlError::NonFiniteState(i));
            }
        }

        let n = input.len();
        let mut path = Self {
            raw: Vec::with_capacity(n),
            forward: Vec::with_capacity(n),
            reverse: Vec::with_capacity(n),
            stopping: Vec::new(),
        };

        path.push_state(input[0], model);
        if input[0].v == 0.0 {
            path.stopping.push(0);
        }

        for i in 1..n - 1 {
            let (prev, mut cur, next) = (input[i - 1], input[i], input[i + 1]);

            if cur.gear == prev.gear {
                match cur.gear {
                    Gear::Forward => {
                        cur.orientation = model.forward_orientation(&prev, &cur, &next);
                        cur.v = model.forward_speed(&prev, &cur, &next);
                    }
                    Gear::Backward => {
                        cur.orientation = model.backward_orientation(&prev, &cur, &next);
                        cur.v = model.backward_speed(&prev, &cur, &next);
                    }
                }
            } else {
                // A cusp: the vehicle must be at rest to swap gear
                cur.v = 0.0;
                path.stopping.push(i);
            }

            path.push_state(cur, model);
        }

        path.push_state(input[n - 1], model);
        path.stopping.push(n - 1);

        path.update_low_speed_regions(model, creep_speed_ms);

        info!(
            "Consolidated reference path: {} states, {} stopping points",
            path.len(),
            path.stopping.len()
        );

        Ok(path)
    }

    /// Number of states in the path.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Index of the goal state.
    pub fn last_index(&self) -> usize {
        self.raw.len() - 1
    }

    /// Append a raw state together with its axle projections.
    fn push_state(&mut self, s: State2D, model: &VehicleModel) {
        self.forward.push(model.front_axle_state(&s));
        self.reverse.push(model.fake_front_axle_state(&s));
        self.raw.push(s);
    }

    /// Set the speed at an index across all three paths.
    fn set_speed(&mut self, index: usize, v: f64) {
        self.raw[index].v = v;
        self.forward[index].v = v;
        self.reverse[index].v = v;
    }

    /// Mark an index as the last point before a stop across all three paths.
    fn mark_coming_to_stop(&mut self, index: usize) {
        self.raw[index].coming_to_stop = true;
        self.forward[index].coming_to_stop = true;
        self.reverse[index].coming_to_stop = true;
    }

    /// Propagate the feasible speed envelope outward from every stopping
    /// point.
    ///
    /// The immediate neighbours of a stop are clamped to the creep speed
    /// (stop indices themselves keep their zero). Walking further out, a
    /// state's speed is lowered to the speed reachable from its
    /// stop-adjacent neighbour under the deceleration limit (leftward) or
    /// the acceleration limit (rightward); the walk ends as soon as the
    /// constraint stops biting.
    fn update_low_speed_regions(&mut self, model: &VehicleModel, creep_speed_ms: f64) {
        let n = self.len();

        for k in 0..self.stopping.len() {
            let stop = self.stopping[k];

            // Walk leftward, against the driving direction
            if stop >= 1 {
                let first = stop - 1;
                self.set_speed(first, self.raw[first].v.min(creep_speed_ms));
                self.mark_coming_to_stop(first);

                let mut next = first;
                while next >= 1 {
                    let prev = next - 1;
                    let dist = (self.raw[prev].position - self.raw[next].position).norm();
                    let reachable =
                        model.deceleration_constraint(self.raw[next].v, dist, self.raw[prev].gear);

                    if reachable < self.raw[prev].v {
                        self.set_speed(prev, reachable);
                    } else {
                        break;
                    }

                    next = prev;
                }
            }

            // Walk rightward, along the driving direction
            if stop + 1 < n {
                let first = stop + 1;
                self.set_speed(first, self.raw[first].v.min(creep_speed_ms));

                let mut prev = first;
                while prev + 1 < n {
                    let next = prev + 1;
                    let dist = (self.raw[prev].position - self.raw[next].position).norm();
                    let reachable =
                        model.acceleration_constraint(self.raw[prev].v, dist, self.raw[prev].gear);

                    if reachable < self.raw[next].v {
                        self.set_speed(next, reachable);
                    } else {
                        break;
                    }

                    prev = next;
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vehicle_model::Params as ModelParams;

    const CREEP: f64 = 0.2;

    fn model() -> VehicleModel {
        VehicleModel::new(ModelParams::default())
    }

    /// Straight line along x with the given spacing, all forward gear.
    fn straight_input(num: usize, spacing: f64, v: f64) -> Vec<State2D> {
        let mut states: Vec<State2D> = (0..num)
            .map(|i| State2D::new(i as f64 * spacing, 0.0, 0.0, v, Gear::Forward))
            .collect();
        states.last_mut().unwrap().v = 0.0;
        states
    }

    #[test]
    fn test_rejects_degenerate_input() {
        let model = model();

        assert!(matches!(
            ConsolidatedPath::consolidate(&[], &model, CREEP),
            Err(FollowCtrlError::PathTooShort(0))
        ));

        let single = [State2D::new(0.0, 0.0, 0.0, 1.0, Gear::Forward)];
        assert!(matches!(
            ConsolidatedPath::consolidate(&single, &model, CREEP),
            Err(FollowCtrlError::PathTooShort(1))
        ));

        let mut bad = straight_input(3, 1.0, 1.0);
        bad[1].position.x = f64::NAN;
        assert!(matches!(
            ConsolidatedPath::consolidate(&bad, &model, CREEP),
            Err(FollowCtrlError::NonFiniteState(1))
        ));
    }

    #[test]
    fn test_two_point_path() {
        let model = model();
        let input = straight_input(2, 1.0, 1.0);
        let path = ConsolidatedPath::consolidate(&input, &model, CREEP).unwrap();

        assert_eq!(path.len(), 2);
        assert_eq!(path.forward.len(), 2);
        assert_eq!(path.reverse.len(), 2);
        assert_eq!(path.stopping, vec![1]);

        // Endpoints preserved
        assert_eq!(path.raw[0].position, input[0].position);
        assert_eq!(path.raw[1].v, 0.0);
        // Left neighbour of the goal stop is clamped to creep speed
        assert!((path.raw[0].v - CREEP).abs() < 1e-9);
        assert!(path.raw[0].coming_to_stop);
    }

    #[test]
    fn test_straight_path_consolidation() {
        let model = model();
        let input = straight_input(3, 1.0, 1.0);
        let path = ConsolidatedPath::consolidate(&input, &model, CREEP).unwrap();

        assert_eq!(path.stopping, vec![2]);
        assert!((path.raw[1].v - CREEP).abs() < 1e-9);
        assert!(path.raw[1].coming_to_stop);
        assert!(!path.raw[0].coming_to_stop);

        // Endpoints preserved
        assert_eq!(path.raw[0].position, input[0].position);
        assert_eq!(path.raw[0].v, 1.0);
        assert_eq!(path.raw[2].position, input[2].position);
        assert_eq!(path.raw[2].v, 0.0);
    }

    #[test]
    fn test_triple_alignment() {
        let model = model();
        let wheelbase = model.params.axle_dist_m;
        let input = straight_input(4, 0.5, 1.0);
        let path = ConsolidatedPath::consolidate(&input, &model, CREEP).unwrap();

        for i in 0..path.len() {
            let along = wheelbase
                * nalgebra::Vector2::new(
                    path.raw[i].orientation.cos(),
                    path.raw[i].orientation.sin(),
                );
            assert!((path.forward[i].position - path.raw[i].position - along).norm() < 1e-9);
            assert!((path.reverse[i].position - path.raw[i].position + along).norm() < 1e-9);
            assert_eq!(path.forward[i].v, path.raw[i].v);
            assert_eq!(path.reverse[i].coming_to_stop, path.raw[i].coming_to_stop);
        }
    }

    #[test]
    fn test_single_cusp_path() {
        let model = model();
        let input = vec![
            State2D::new(0.0, 0.0, 0.0, 1.0, Gear::Forward),
            State2D::new(2.0, 0.0, 0.0, 1.0, Gear::Forward),
            State2D::new(2.0, 0.0, std::f64::consts::PI, 1.0, Gear::Backward),
            State2D::new(0.0, 0.0, std::f64::consts::PI, 0.0, Gear::Backward),
        ];
        let path = ConsolidatedPath::consolidate(&input, &model, CREEP).unwrap();

        assert_eq!(path.stopping, vec![2, 3]);
        // The cusp and the goal stay at rest, their neighbours slow down
        assert_eq!(path.raw[2].v, 0.0);
        assert_eq!(path.raw[3].v, 0.0);
        assert!(path.raw[1].v <= CREEP + 1e-9);
        assert!(path.raw[1].coming_to_stop);
        assert!(path.raw[2].coming_to_stop);
    }

    #[test]
    fn test_starts_stopped() {
        let model = model();
        let mut input = straight_input(3, 1.0, 1.0);
        input[0].v = 0.0;
        let path = ConsolidatedPath::consolidate(&input, &model, CREEP).unwrap();

        assert_eq!(path.stopping, vec![0, 2]);
    }

    #[test]
    fn test_speed_envelope_monotone() {
        let model = model();
        let mut input = straight_input(6, 0.5, 5.0);
        input[0].v = 1.0;
        let path = ConsolidatedPath::consolidate(&input, &model, CREEP).unwrap();

        assert_eq!(path.stopping, vec![5]);
        assert!((path.raw[4].v - CREEP).abs() < 1e-9);

        // Deceleration-limited walk away from the stop: sqrt(v^2 + 2 a d)
        assert!((path.raw[3].v - 1.04f64.sqrt()).abs() < 1e-9);
        assert!((path.raw[2].v - 2.04f64.sqrt()).abs() < 1e-9);

        // Scanning left from the stop the envelope never decreases while it
        // is biting (indices 1..=4)
        for i in 2..5 {
            assert!(path.raw[i - 1].v >= path.raw[i].v);
        }

        // The constraint stopped biting before the start state
        assert_eq!(path.raw[0].v, 1.0);
    }

    #[test]
    fn test_consolidation_fixed_point() {
        let model = model();
        let mut input = straight_input(6, 0.5, 5.0);
        input[0].v = 1.0;

        let once = ConsolidatedPath::consolidate(&input, &model, CREEP).unwrap();
        let twice = ConsolidatedPath::consolidate(&once.raw, &model, CREEP).unwrap();

        assert_eq!(once.stopping, twice.stopping);
        for i in 0..once.len() {
            assert!((once.raw[i].position - twice.raw[i].position).norm() < 1e-9);
            assert!((once.raw[i].orientation - twice.raw[i].orientation).abs() < 1e-9);
            assert!((once.raw[i].v - twice.raw[i].v).abs() < 1e-9);
            assert_eq!(once.raw[i].gear, twice.raw[i].gear);
            assert_eq!(once.raw[i].coming_to_stop, twice.raw[i].coming_to_stop);
        }
    }
}
