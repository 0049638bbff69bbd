//! # Path follower test
//!
//! This binary runs the path-following controller offline, without the rest
//! of the autonomy stack: it consolidates a demonstration path containing a
//! gear reversal, simulates the vehicle through the kinematic model, and
//! logs a summary of the resulting command stream.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::env;

use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::info;

use car_lib::follow_ctrl::FollowCtrl;
use car_lib::pose::{Gear, State2D};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new("follow_test", "sessions").wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Path Follower Test\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- PARAMETERS ----

    let args: Vec<String> = env::args().collect();

    let (params_path, model_params_path) = match args.len() {
        1 => (
            String::from("car_exec/params/follow_ctrl.toml"),
            String::from("car_exec/params/vehicle_model.toml"),
        ),
        3 => (args[1].clone(), args[2].clone()),
        _ => {
            return Err(eyre!(
                "Expected no arguments or <follow_ctrl params> <vehicle_model params>"
            ))
        }
    };

    // ---- MODULE INIT ----

    let mut follow_ctrl = FollowCtrl::init(&params_path, &model_params_path)
        .wrap_err("Failed to initialise FollowCtrl")?;
    info!("FollowCtrl init complete");

    // ---- DEMONSTRATION PATH ----

    // Drive 4 m forward, then reverse back to the 2 m mark. Each state
    // carries the gear of the motion leaving it, so the gear flips on the
    // turning point itself.
    let mut path: Vec<State2D> = (0..8)
        .map(|i| State2D::new(i as f64 * 0.5, 0.0, 0.0, 1.0, Gear::Forward))
        .collect();
    for i in 0..=4 {
        path.push(State2D::new(
            4.0 - i as f64 * 0.5,
            0.0,
            0.0,
            1.0,
            Gear::Backward,
        ));
    }
    path.last_mut().unwrap().v = 0.0;

    info!("Demonstration path: {} states\n", path.len());

    // ---- FOLLOW ----

    let commands = follow_ctrl
        .build_and_follow(&path)
        .wrap_err("Path following failed")?;

    info!("Emitted {} commands, final mode {:?}", commands.len(), follow_ctrl.mode());

    if let Some(last) = commands.last() {
        info!(
            "Final command: v {:.3} m/s, phi {:.3} rad at ({:.3}, {:.3})",
            last.v, last.phi, last.position.x, last.position.y
        );
    }
    info!(
        "Final vehicle position: ({:.3}, {:.3}), heading {:.3} rad",
        follow_ctrl.car().position.x,
        follow_ctrl.car().position.y,
        follow_ctrl.car().orientation
    );

    Ok(())
}
