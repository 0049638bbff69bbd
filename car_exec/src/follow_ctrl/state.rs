//! # Follow control state
//!
//! The [`FollowCtrl`] struct ties the module together: it owns the
//! consolidated path, the waypoint cursor, the controllers and the simulated
//! vehicle state, and steps a small control state machine per tick:
//!
//! - `Standby`: nothing consolidated yet, first tick moves to `Stopped`.
//! - `Stopped`: held at rest, pre-positioning the steering for the next
//!   segment, releasing into a drive mode (or `Complete` at the goal).
//! - `ForwardDrive` / `ReverseDrive`: Stanley tracking of the current
//!   bracket; reaching a stopping point hands back to `Stopped`.
//! - `Complete`: absorbing, all further ticks are no-ops.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace};
use serde::Serialize;

// Internal
use super::controllers::{how_far_along, FollowControllers};
use super::localize::{localize, Cursor};
use super::path::ConsolidatedPath;
use super::{FollowCtrlError, Params};
use crate::pose::{Gear, State2D};
use crate::vehicle_model::VehicleModel;
use util::maths;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Path following control module state
#[derive(Debug, Clone, Serialize)]
pub struct FollowCtrl {
    #[serde(skip)]
    params: Params,

    #[serde(skip)]
    model: VehicleModel,

    /// Executing mode
    mode: FollowCtrlMode,

    /// The consolidated reference path being followed.
    path: Option<ConsolidatedPath>,

    /// Waypoint cursor into the consolidated path.
    cursor: Cursor,

    /// Controller objects used to calculate the commands
    controllers: FollowControllers,

    /// The simulated vehicle state.
    car: State2D,

    report: StatusReport,
}

/// The status report containing monitoring quantities for the current tick.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct StatusReport {
    /// Mode at the end of the tick.
    pub mode: FollowCtrlMode,

    /// The waypoint bracket being tracked.
    pub prev_waypoint: usize,
    pub next_waypoint: usize,

    /// Index of the most recently executed stopping point.
    pub last_cusp: usize,

    /// Cross-track distance of the axle reference point.
    pub cross_track_m: f64,

    /// The last commanded steering angle.
    pub steer_rad: f64,

    /// Commands emitted since the last consolidation.
    pub commands_emitted: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The possible modes of execution of FollowCtrl.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum FollowCtrlMode {
    Standby,
    Stopped,
    ForwardDrive,
    ReverseDrive,
    Complete,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FollowCtrl {
    /// Initialise the FollowCtrl module.
    ///
    /// Expected init data are the paths to the controller and vehicle model
    /// parameter files.
    pub fn init(params_path: &str, model_params_path: &str) -> Result<Self, FollowCtrlError> {
        let params = util::params::load(params_path)?;
        let model = VehicleModel::init(model_params_path)?;

        Ok(Self::new(params, model))
    }

    pub fn new(params: Params, model: VehicleModel) -> Self {
        Self {
            params,
            model,
            mode: FollowCtrlMode::Standby,
            path: None,
            cursor: Cursor::new(),
            controllers: FollowControllers::new(),
            car: State2D::default(),
            report: StatusReport::default(),
        }
    }

    /// Consolidate a raw reference path and install it.
    ///
    /// On success the cursor, the controller memory and the report are reset
    /// and the mode is set from the first path state (at rest, or driving in
    /// its gear). On failure the previously installed path and the current
    /// mode are left untouched.
    pub fn consolidate(&mut self, input: &[State2D]) -> Result<(), FollowCtrlError> {
        let path = ConsolidatedPath::consolidate(input, &self.model, self.params.creep_speed_ms)?;

        self.mode = if path.raw[0].v == 0.0 {
            FollowCtrlMode::Stopped
        } else {
            match path.raw[0].gear {
                Gear::Forward => FollowCtrlMode::ForwardDrive,
                Gear::Backward => FollowCtrlMode::ReverseDrive,
            }
        };

        self.path = Some(path);
        self.cursor = Cursor::new();
        self.controllers.reset();
        self.report = StatusReport::default();
        self.report.mode = self.mode;

        Ok(())
    }

    /// Consolidate a raw path, then follow it to completion from its first
    /// state, returning the full command list.
    pub fn build_and_follow(&mut self, input: &[State2D]) -> Result<Vec<State2D>, FollowCtrlError> {
        self.consolidate(input)?;
        self.follow(input[0])
    }

    /// Consolidate a raw path, then emit the next command from `start`.
    pub fn rebuild_and_step(
        &mut self,
        start: State2D,
        input: &[State2D],
    ) -> Result<Vec<State2D>, FollowCtrlError> {
        self.consolidate(input)?;
        self.step(start)
    }

    /// Follow the installed path to completion from `start`, returning every
    /// emitted command. The vehicle state is advanced internally with the
    /// kinematic model after each command.
    pub fn follow(&mut self, start: State2D) -> Result<Vec<State2D>, FollowCtrlError> {
        if self.path.is_none() {
            return Err(FollowCtrlError::NoPath);
        }

        self.car = start;
        let mut commands = Vec::new();

        while self.mode != FollowCtrlMode::Complete {
            if let Some(cmd) = self.tick() {
                commands.push(cmd);
            }
        }

        info!("Path complete after {} commands", commands.len());

        Ok(commands)
    }

    /// Emit a single command from `start`, for closed-loop operation against
    /// an external plant. Returns an empty list once the path is complete.
    pub fn step(&mut self, start: State2D) -> Result<Vec<State2D>, FollowCtrlError> {
        if self.path.is_none() {
            return Err(FollowCtrlError::NoPath);
        }

        self.car = start;
        let mut commands = Vec::new();

        while self.mode != FollowCtrlMode::Complete && commands.is_empty() {
            if let Some(cmd) = self.tick() {
                commands.push(cmd);
            }
        }

        Ok(commands)
    }

    /// Current executing mode.
    pub fn mode(&self) -> FollowCtrlMode {
        self.mode
    }

    /// The simulated vehicle state after the last emitted command.
    pub fn car(&self) -> &State2D {
        &self.car
    }

    /// The installed consolidated path, if any.
    pub fn path(&self) -> Option<&ConsolidatedPath> {
        self.path.as_ref()
    }

    /// Monitoring snapshot of the last tick.
    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    /// Run one tick of the state machine, returning the emitted command if
    /// the current mode produces one.
    fn tick(&mut self) -> Option<State2D> {
        let cmd = match self.mode {
            FollowCtrlMode::Standby => {
                debug!("First tick, moving to Stopped");
                self.mode = FollowCtrlMode::Stopped;
                None
            }
            FollowCtrlMode::Stopped => self.mode_stopped(),
            FollowCtrlMode::ForwardDrive | FollowCtrlMode::ReverseDrive => Some(self.mode_drive()),
            FollowCtrlMode::Complete => None,
        };

        self.report.mode = self.mode;
        self.report.prev_waypoint = self.cursor.prev_waypoint;
        self.report.next_waypoint = self.cursor.next_waypoint;
        self.report.last_cusp = self.cursor.last_cusp;

        if let Some(cmd) = cmd {
            self.report.steer_rad = cmd.phi;
            self.report.commands_emitted += 1;

            // Advance the simulated vehicle through the kinematic model
            self.car = self.model.next_state(&cmd);

            Some(cmd)
        } else {
            None
        }
    }

    /// Mode stopped.
    ///
    /// The vehicle is held at rest while the steering pre-positions for the
    /// segment about to be entered. Once the wheel angle error is inside
    /// tolerance, or the steering has saturated, the hold is released into
    /// the drive mode matching the new segment's gear. At the goal the mode
    /// becomes `Complete` instead and nothing further is emitted.
    fn mode_stopped(&mut self) -> Option<State2D> {
        let Self {
            params,
            model,
            mode,
            path,
            cursor,
            controllers,
            car,
            report,
        } = self;

        // Presence is checked by the public entry points
        let path = path.as_mut().unwrap();
        let last = path.last_index();

        if cursor.next_waypoint == last && cursor.prev_waypoint == last {
            info!("Goal stop reached, path complete");
            *mode = FollowCtrlMode::Complete;
            return None;
        }

        let reverse_mode = path.raw[cursor.prev_waypoint].gear == Gear::Backward;
        let the_path = if reverse_mode {
            &mut path.reverse
        } else {
            &mut path.forward
        };

        let heading = the_path[cursor.next_waypoint].position
            - the_path[cursor.prev_waypoint].position;
        let desired_heading = heading.y.atan2(heading.x);

        let (steer, phi_error) = controllers.hold_steering(params, model, car, desired_heading);

        let phi_max = model.params.max_wheel_deflection_rad;
        let saturated =
            maths::wrap_to_pi(car.phi.abs() - phi_max).abs() < params.saturation_margin_rad;

        if phi_error.abs() < params.wheel_angle_tolerance_rad || saturated {
            *mode = if reverse_mode {
                FollowCtrlMode::ReverseDrive
            } else {
                FollowCtrlMode::ForwardDrive
            };
            debug!("Hold released into {:?}", mode);

            // Re-prime the longitudinal reference for the segment being
            // entered
            the_path[cursor.prev_waypoint].v = the_path[cursor.next_waypoint].v;

            controllers.reset_wheel_angle_error();
        }

        report.cross_track_m = 0.0;

        let mut cmd = *car;
        cmd.v = 0.0;
        cmd.phi = steer;
        cmd.t = params.cmd_timestep_s;
        cmd.gear = path.raw[cursor.prev_waypoint].gear;

        Some(cmd)
    }

    /// Mode forward or reverse drive.
    ///
    /// Localises the vehicle against the consolidated path, runs the Stanley
    /// steering and PI speed laws on the bracket, and hands back to
    /// `Stopped` once the vehicle has covered the release fraction of the
    /// final segment before a stopping point.
    fn mode_drive(&mut self) -> State2D {
        let Self {
            params,
            model,
            mode,
            path,
            cursor,
            controllers,
            car,
            report,
        } = self;

        // Presence is checked by the public entry points
        let path = path.as_ref().unwrap();

        let (prev_index, next_index) = localize(path, car, cursor);
        cursor.prev_waypoint = prev_index;
        cursor.next_waypoint = next_index;

        let reverse_mode = path.raw[prev_index].gear == Gear::Backward;
        let the_path = if reverse_mode {
            &path.reverse
        } else {
            &path.forward
        };

        let coming_to_stop = the_path[next_index].v == 0.0;

        let front = if reverse_mode {
            model.fake_front_axle_state(car)
        } else {
            model.front_axle_state(car)
        };

        let how_far = how_far_along(
            &front.position,
            &the_path[prev_index].position,
            &the_path[next_index].position,
        );

        let (steer, cross_track) = controllers.drive_steering(
            params,
            model,
            the_path,
            prev_index,
            next_index,
            car,
            &front,
            reverse_mode,
            coming_to_stop,
            how_far,
        );

        trace!(
            "bracket ({}, {}), steer {:.3} rad, cross-track {:.3} m",
            prev_index,
            next_index,
            steer,
            cross_track
        );

        report.cross_track_m = cross_track;

        let mut cmd = *car;
        cmd.phi = steer;
        cmd.t = params.cmd_timestep_s;
        cmd.gear = path.raw[prev_index].gear;

        // Stop trigger: the bracket ends at a stopping point and the vehicle
        // has covered enough of it
        if coming_to_stop && how_far >= params.segment_release_fraction {
            cursor.last_cusp = next_index;

            if next_index < path.last_index() {
                cursor.prev_waypoint += 1;
                cursor.next_waypoint += 1;
            } else {
                cursor.prev_waypoint = path.last_index();
                cursor.next_waypoint = path.last_index();
            }

            debug!("Stopping point {} reached", next_index);
            *mode = FollowCtrlMode::Stopped;

            cmd.v = 0.0;
            return cmd;
        }

        let dv = controllers.speed_delta(
            params,
            car,
            the_path[prev_index].v,
            the_path[next_index].v,
            how_far,
            reverse_mode,
        );
        cmd.v = car.v + dv;

        cmd
    }
}

impl Default for StatusReport {
    fn default() -> Self {
        Self {
            mode: FollowCtrlMode::Standby,
            prev_waypoint: 0,
            next_waypoint: 1,
            last_cusp: 0,
            cross_track_m: 0.0,
            steer_rad: 0.0,
            commands_emitted: 0,
        }
    }
}
