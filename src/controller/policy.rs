//! Controller variants and their per-step control laws.
//!
//! A compiled controller is immutable for the whole episode. Everything that
//! changes between steps lives in [`ControllerState`], which the executor
//! creates fresh for every execution so nothing leaks across episodes.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::interface::RobotInterface;
use crate::env::{Observations, RobotAction, Vec3};
use crate::task::TaskParameters;
use crate::trajectory::distance;

/// Outcome of a single controller step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerStatus {
    Success,
    Failure,
    Running,
}

/// Snapshot handed to the controller on each step.
#[derive(Debug, Clone, Copy)]
pub struct WorldState<'a> {
    pub observations: &'a Observations,
    pub task: &'a TaskParameters,
    pub step_count: usize,
}

/// The control law of a compiled controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Controller {
    /// Move toward the target with `gain * error`.
    Proportional { gain: f64, tolerance: f64 },
    /// `gain * error - damping * velocity`.
    ProportionalDerivative {
        gain: f64,
        damping: f64,
        tolerance: f64,
    },
    /// Approach, grasp, lift, carry and release a named scene object.
    Waypoint {
        object: String,
        gain: f64,
        tolerance: f64,
        timeout: usize,
    },
}

impl Controller {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Proportional { .. } => "proportional",
            Self::ProportionalDerivative { .. } => "proportional_derivative",
            Self::Waypoint { .. } => "waypoint",
        }
    }
}

/// A controller artifact after compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledController {
    pub task_id: String,
    pub description: String,
    pub target: Vec3,
    pub controller: Controller,
}

// ---------------------------------------------------------------------------
// Per-episode state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaypointPhase {
    #[default]
    Init,
    Executing,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaypointAction {
    Move,
    Grasp,
    Release,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub position: Vec3,
    pub action: WaypointAction,
}

/// Mutable controller state scoped to a single episode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerState {
    pub phase: WaypointPhase,
    pub waypoints: Vec<Waypoint>,
    pub current_waypoint: usize,
    pub timeout_counter: usize,
}

// Height above an object used for approach and lift waypoints.
const APPROACH_HEIGHT: f64 = 0.1;

fn error_to(target: Vec3, current: Vec3) -> Vec3 {
    [
        target[0] - current[0],
        target[1] - current[1],
        target[2] - current[2],
    ]
}

fn scaled(v: Vec3, k: f64) -> Vec3 {
    [v[0] * k, v[1] * k, v[2] * k]
}

impl CompiledController {
    /// Run one decision step.
    ///
    /// Returns `Err` for a controller fault (e.g. a scene object the
    /// controller depends on is missing); the caller treats that as fatal
    /// to the episode.
    pub fn step(
        &self,
        state: &mut ControllerState,
        robot: &mut RobotInterface,
        world: &WorldState<'_>,
    ) -> Result<ControllerStatus> {
        let current = robot.get_end_effector_position();
        match &self.controller {
            Controller::Proportional { gain, tolerance } => {
                let error = error_to(self.target, current);
                if distance(self.target, current) < *tolerance {
                    return Ok(ControllerStatus::Success);
                }
                robot.apply_action(RobotAction::displacement(scaled(error, *gain)));
                Ok(ControllerStatus::Running)
            }
            Controller::ProportionalDerivative {
                gain,
                damping,
                tolerance,
            } => {
                if distance(self.target, current) < *tolerance {
                    return Ok(ControllerStatus::Success);
                }
                let p = scaled(error_to(self.target, current), *gain);
                let d = scaled(robot.get_end_effector_velocity(), -*damping);
                robot.apply_action(RobotAction::displacement([
                    p[0] + d[0],
                    p[1] + d[1],
                    p[2] + d[2],
                ]));
                Ok(ControllerStatus::Running)
            }
            Controller::Waypoint {
                object,
                gain,
                tolerance,
                timeout,
            } => self.waypoint_step(state, robot, world, object, *gain, *tolerance, *timeout),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn waypoint_step(
        &self,
        state: &mut ControllerState,
        robot: &mut RobotInterface,
        world: &WorldState<'_>,
        object: &str,
        gain: f64,
        tolerance: f64,
        timeout: usize,
    ) -> Result<ControllerStatus> {
        match state.phase {
            WaypointPhase::Init => {
                let Some(found) = world.task.scene_config.object(object) else {
                    bail!(
                        "scene for task {} has no object named {object:?}",
                        world.task.task_id
                    );
                };
                let p = found.position;
                let above = [p[0], p[1], p[2] + APPROACH_HEIGHT];
                state.waypoints = vec![
                    Waypoint {
                        position: above,
                        action: WaypointAction::Move,
                    },
                    Waypoint {
                        position: p,
                        action: WaypointAction::Grasp,
                    },
                    Waypoint {
                        position: above,
                        action: WaypointAction::Move,
                    },
                    Waypoint {
                        position: self.target,
                        action: WaypointAction::Move,
                    },
                    Waypoint {
                        position: self.target,
                        action: WaypointAction::Release,
                    },
                ];
                state.current_waypoint = 0;
                state.timeout_counter = 0;
                state.phase = WaypointPhase::Executing;
                Ok(ControllerStatus::Running)
            }
            WaypointPhase::Executing => {
                let Some(waypoint) = state.waypoints.get(state.current_waypoint).cloned() else {
                    state.phase = WaypointPhase::Done;
                    return Ok(ControllerStatus::Success);
                };

                match waypoint.action {
                    WaypointAction::Move => {
                        let current = robot.get_end_effector_position();
                        if distance(waypoint.position, current) < tolerance {
                            state.current_waypoint += 1;
                            state.timeout_counter = 0;
                            return Ok(ControllerStatus::Running);
                        }
                        let error = error_to(waypoint.position, current);
                        robot.apply_action(RobotAction::displacement(scaled(error, gain)));
                    }
                    WaypointAction::Grasp => {
                        robot.grasp();
                        state.current_waypoint += 1;
                    }
                    WaypointAction::Release => {
                        robot.release();
                        state.current_waypoint += 1;
                    }
                }

                state.timeout_counter += 1;
                if state.timeout_counter > timeout {
                    state.phase = WaypointPhase::Failed;
                    return Ok(ControllerStatus::Failure);
                }
                Ok(ControllerStatus::Running)
            }
            WaypointPhase::Done => Ok(ControllerStatus::Success),
            WaypointPhase::Failed => Ok(ControllerStatus::Failure),
        }
    }
}
