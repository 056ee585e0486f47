//! The robot façade handed to a controller on every step.
//!
//! A controller never talks to the simulator directly. It reads observations
//! and stages actions through [`RobotInterface`]; the executor submits the
//! staged action after the controller returns.

use crate::env::{GripperCommand, Observations, RobotAction, Vec3};
use crate::trajectory::PositionTrace;

/// Energy efficiency reported while no energy model backs the metric.
pub const PLACEHOLDER_ENERGY_EFFICIENCY: f64 = 0.8;

/// Efficiency metrics an execution surface can report.
///
/// Both default to `None`; the executor records 0.0 for a metric its surface
/// does not provide.
pub trait MetricSource {
    fn path_efficiency(&self) -> Option<f64> {
        None
    }

    fn energy_efficiency(&self) -> Option<f64> {
        None
    }
}

/// Read/stage access to a single robot for the duration of one episode.
#[derive(Debug, Clone)]
pub struct RobotInterface {
    robot_id: String,
    observations: Observations,
    staged: RobotAction,
    trace: PositionTrace,
}

impl RobotInterface {
    /// Bind to `robot_id` and record its current position as the first
    /// trajectory point.
    pub fn new(robot_id: impl Into<String>, observations: Observations) -> Self {
        let mut interface = Self {
            robot_id: robot_id.into(),
            observations,
            staged: RobotAction::default(),
            trace: PositionTrace::new(),
        };
        let start = interface.get_end_effector_position();
        interface.trace.push(start);
        interface
    }

    /// Refresh the observation snapshot the getters read from.
    pub fn observe(&mut self, observations: Observations) {
        self.observations = observations;
    }

    /// Current end-effector position, `[0, 0, 0]` when unavailable.
    pub fn get_end_effector_position(&self) -> Vec3 {
        self.observations
            .get(&self.robot_id)
            .and_then(|o| o.end_effector_position)
            .unwrap_or([0.0; 3])
    }

    /// Current end-effector velocity, `[0, 0, 0]` when unavailable.
    pub fn get_end_effector_velocity(&self) -> Vec3 {
        self.observations
            .get(&self.robot_id)
            .and_then(|o| o.end_effector_velocity)
            .unwrap_or([0.0; 3])
    }

    pub fn get_joint_positions(&self) -> &[f64] {
        self.observations
            .get(&self.robot_id)
            .map(|o| o.joint_positions.as_slice())
            .unwrap_or(&[])
    }

    /// Replace the staged action and record the decision-time position.
    pub fn apply_action(&mut self, action: RobotAction) {
        self.staged = action;
        let here = self.get_end_effector_position();
        self.trace.push(here);
    }

    /// Stage a gripper close, keeping any staged motion.
    pub fn grasp(&mut self) {
        self.staged.gripper = Some(GripperCommand::Grasp);
    }

    /// Stage a gripper open, keeping any staged motion.
    pub fn release(&mut self) {
        self.staged.gripper = Some(GripperCommand::Release);
    }

    /// The action that will be submitted on the next simulator step.
    pub fn get_actions(&self) -> &RobotAction {
        &self.staged
    }

    pub fn trajectory(&self) -> &PositionTrace {
        &self.trace
    }

    pub fn get_path_efficiency(&self) -> f64 {
        self.trace.path_efficiency()
    }

    pub fn get_energy_efficiency(&self) -> f64 {
        PLACEHOLDER_ENERGY_EFFICIENCY
    }
}

impl MetricSource for RobotInterface {
    fn path_efficiency(&self) -> Option<f64> {
        Some(self.get_path_efficiency())
    }

    fn energy_efficiency(&self) -> Option<f64> {
        Some(self.get_energy_efficiency())
    }
}
