//! Runs a controller artifact against the simulator for one episode.

use std::collections::HashMap;
use std::time::Instant;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::artifact::{compile, ControllerArtifact};
use super::interface::{MetricSource, RobotInterface};
use super::policy::{ControllerState, ControllerStatus, WorldState};
use crate::env::Simulator;
use crate::task::TaskParameters;

/// Measurements taken while a controller ran.
///
/// A metric is `None` when the execution never reached the point where it is
/// measured (e.g. the artifact failed to compile).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    /// Wall-clock seconds spent in the control loop.
    pub time_to_completion: Option<f64>,
    pub steps_to_completion: Option<usize>,
    pub path_efficiency: Option<f64>,
    pub energy_efficiency: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub metrics: ExecutionMetrics,
}

impl ExecutionResult {
    /// A failed execution with no metrics.
    pub fn failed() -> Self {
        Self::default()
    }
}

/// Drives a compiled controller step by step until it finishes, the
/// simulator reports the episode done, or the step budget runs out.
#[derive(Debug, Clone)]
pub struct ControllerExecutor {
    max_steps: usize,
}

impl ControllerExecutor {
    pub fn new(max_steps: usize) -> Self {
        Self { max_steps }
    }

    /// Execute `artifact` for `robot_id`.
    ///
    /// Compilation failures and controller faults produce a failed result.
    /// Simulator errors propagate to the caller.
    pub async fn execute<S: Simulator>(
        &self,
        sim: &mut S,
        artifact: &ControllerArtifact,
        task: &TaskParameters,
        robot_id: &str,
    ) -> Result<ExecutionResult> {
        let compiled = match compile(artifact) {
            Ok(c) => c,
            Err(e) => {
                warn!(task_id = %task.task_id, error = %e, "Controller artifact failed to compile");
                return Ok(ExecutionResult::failed());
            }
        };
        debug!(
            task_id = %task.task_id,
            kind = compiled.controller.kind(),
            "Executing controller"
        );

        let start = Instant::now();
        let mut robot = RobotInterface::new(robot_id, sim.get_observations().await?);
        let mut state = ControllerState::default();
        let mut success = false;
        let mut steps = 0usize;

        while steps < self.max_steps {
            let observations = sim.get_observations().await?;
            robot.observe(observations.clone());
            let world = WorldState {
                observations: &observations,
                task,
                step_count: steps,
            };

            match compiled.step(&mut state, &mut robot, &world) {
                Ok(ControllerStatus::Success) => {
                    success = true;
                    break;
                }
                Ok(ControllerStatus::Failure) => break,
                Ok(ControllerStatus::Running) => {}
                Err(e) => {
                    error!(task_id = %task.task_id, step = steps, error = %e, "Controller fault");
                    break;
                }
            }

            let mut actions = HashMap::new();
            actions.insert(robot_id.to_string(), robot.get_actions().clone());
            let outcome = sim.step(&actions).await?;

            if outcome.is_done(robot_id) {
                success = outcome.reward(robot_id) > 0.0;
                break;
            }
            steps += 1;
        }

        let metrics = ExecutionMetrics {
            time_to_completion: Some(start.elapsed().as_secs_f64()),
            steps_to_completion: Some(steps),
            path_efficiency: Some(robot.path_efficiency().unwrap_or(0.0)),
            energy_efficiency: Some(robot.energy_efficiency().unwrap_or(0.0)),
        };
        debug!(
            task_id = %task.task_id,
            success,
            steps,
            "Controller execution finished"
        );
        Ok(ExecutionResult { success, metrics })
    }
}
