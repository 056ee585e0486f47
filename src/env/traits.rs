//! Core simulator trait and shared observation types.
//!
//! Every simulation backend implements the [`Simulator`] trait so that the
//! controller executor and the learning loop can drive it uniformly. Setup
//! calls report failure through `Err` rather than panicking; the loop decides
//! whether a failure degrades the episode or aborts the run.

use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::task::RandomizationSettings;

/// A Cartesian position or velocity `[x, y, z]`.
pub type Vec3 = [f64; 3];

/// Per-robot observation produced by the simulator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotObservation {
    /// End-effector position, when the backend reports one.
    #[serde(default)]
    pub end_effector_position: Option<Vec3>,
    /// End-effector velocity, when the backend reports one.
    #[serde(default)]
    pub end_effector_velocity: Option<Vec3>,
    #[serde(default)]
    pub joint_positions: Vec<f64>,
    #[serde(default)]
    pub joint_velocities: Vec<f64>,
}

/// Observations keyed by robot id.
pub type Observations = HashMap<String, RobotObservation>;

/// Gripper command staged alongside a motion command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GripperCommand {
    Grasp,
    Release,
}

/// The action a controller stages for one robot during a single step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotAction {
    /// Requested end-effector displacement for this step.
    #[serde(default)]
    pub displacement: Option<Vec3>,
    #[serde(default)]
    pub gripper: Option<GripperCommand>,
}

impl RobotAction {
    /// A pure motion command.
    pub fn displacement(delta: Vec3) -> Self {
        Self {
            displacement: Some(delta),
            gripper: None,
        }
    }

    /// True when the action would not change anything.
    pub fn is_noop(&self) -> bool {
        self.displacement.is_none() && self.gripper.is_none()
    }
}

/// The result of advancing the simulation by one step.
#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    pub observations: Observations,
    /// Scalar reward per robot id.
    pub rewards: HashMap<String, f64>,
    /// Episode-termination flag per robot id.
    pub dones: HashMap<String, bool>,
    /// Backend-specific extra information.
    pub info: serde_json::Value,
}

impl StepOutcome {
    /// Whether the simulator reported the episode finished for `robot_id`.
    pub fn is_done(&self, robot_id: &str) -> bool {
        self.dones.get(robot_id).copied().unwrap_or(false)
    }

    /// The reward reported for `robot_id` (0.0 when absent).
    pub fn reward(&self, robot_id: &str) -> f64 {
        self.rewards.get(robot_id).copied().unwrap_or(0.0)
    }
}

/// The stepping service the learning loop drives.
///
/// Calls are strictly sequential: the loop never issues a new call before the
/// previous one returned.
#[allow(async_fn_in_trait)]
pub trait Simulator: Send + Sync {
    /// Bring the backend up. Must be called before any other method.
    async fn initialize(&mut self) -> Result<()>;

    /// Load a scene. `None` selects the configured default scene.
    async fn load_environment(&mut self, path: Option<&str>) -> Result<()>;

    /// Spawn a robot and return its id.
    async fn create_robot(&mut self, name: &str, robot_type: &str, position: Vec3)
        -> Result<String>;

    /// Randomize physics parameters, optionally overriding configured ranges.
    async fn apply_domain_randomization(
        &mut self,
        settings: Option<&RandomizationSettings>,
    ) -> Result<()>;

    /// Reset the scene and return the initial observations.
    async fn reset(&mut self) -> Result<Observations>;

    /// Apply the given per-robot actions and advance the physics by one step.
    async fn step(&mut self, actions: &HashMap<String, RobotAction>) -> Result<StepOutcome>;

    /// The current observations without advancing the simulation.
    async fn get_observations(&self) -> Result<Observations>;

    /// Release backend resources.
    async fn close(&mut self);
}
