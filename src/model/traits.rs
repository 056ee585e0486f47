//! The task-proposal and controller-generation contract.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::controller::{ControllerArtifact, ExecutionResult};
use crate::task::TaskParameters;
use crate::training::context::SessionContext;

/// A generator's judgement of one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub success: bool,
    /// Performance score in `[0, 1]`.
    pub score: f64,
    pub feedback: String,
    #[serde(default)]
    pub improvement_suggestions: Vec<String>,
}

/// Proposes tasks, writes controllers for them and learns from the outcome.
///
/// The learning loop calls these in a fixed order per episode:
/// `propose_task`, `generate_controller_code`, `evaluate_controller`,
/// `apply_reinforcement_feedback`, `update_learning`.
#[allow(async_fn_in_trait)]
pub trait FoundationModel: Send + Sync {
    async fn propose_task(&mut self, context: &SessionContext) -> Result<TaskParameters>;

    async fn generate_controller_code(&mut self, task: &TaskParameters)
        -> Result<ControllerArtifact>;

    async fn evaluate_controller(
        &self,
        task: &TaskParameters,
        artifact: &ControllerArtifact,
        result: &ExecutionResult,
    ) -> Result<EvaluationResult>;

    /// Record the evaluated outcome in the generator's own history.
    async fn update_learning(
        &mut self,
        task: &TaskParameters,
        artifact: &ControllerArtifact,
        evaluation: &EvaluationResult,
    ) -> Result<()>;

    /// Credit `reward` to whatever produced `artifact` for `task`.
    async fn apply_reinforcement_feedback(
        &mut self,
        task: &TaskParameters,
        artifact: &ControllerArtifact,
        reward: f64,
        context: Option<&SessionContext>,
    ) -> Result<()>;
}
