//! In-process generator that selects from the built-in libraries.
//!
//! [`MockFoundationModel`] stands in for a real task/controller generator. It
//! delegates every choice to a [`SelectionEngine`], so the learning behaviour
//! is real even though nothing is generated.

use anyhow::{bail, Result};
use chrono::Utc;
use tracing::{debug, info};

use super::traits::{EvaluationResult, FoundationModel};
use crate::config::SelfPlayConfig;
use crate::controller::{ControllerArtifact, ExecutionResult};
use crate::selection::SelectionEngine;
use crate::task::{default_controllers, default_tasks, TaskParameters};
use crate::training::context::{LearningEvent, SessionContext};

#[derive(Debug, Clone)]
pub struct MockFoundationModel {
    engine: SelectionEngine,
    history: Vec<LearningEvent>,
    proposals: usize,
    proposal_limit: Option<usize>,
}

impl MockFoundationModel {
    pub fn new(engine: SelectionEngine) -> Self {
        Self {
            engine,
            history: Vec::new(),
            proposals: 0,
            proposal_limit: None,
        }
    }

    /// Build over the default libraries with modes, seed and learning rate
    /// taken from `config`.
    pub fn from_config(config: &SelfPlayConfig) -> Result<Self> {
        let generator = &config.groot_n1;
        let engine = SelectionEngine::new(
            default_tasks(),
            default_controllers(),
            generator.task_selection_mode,
            generator.controller_selection_mode,
            config.learning.learning_rate,
            generator.seed,
        )?;
        Ok(Self::new(engine))
    }

    /// Make `propose_task` fail once `limit` proposals have been served.
    pub fn fail_proposals_after(mut self, limit: usize) -> Self {
        self.proposal_limit = Some(limit);
        self
    }

    pub fn engine(&self) -> &SelectionEngine {
        &self.engine
    }

    /// Outcomes recorded through `update_learning`.
    pub fn history(&self) -> &[LearningEvent] {
        &self.history
    }

    /// Score an execution in `[0, 1]`.
    ///
    /// Success starts at 1 and failure at 0; a measured completion time
    /// blends in a speed factor at 30%, then a measured path efficiency
    /// blends in at 20%.
    pub fn score(result: &ExecutionResult) -> f64 {
        let mut score = if result.success { 1.0 } else { 0.0 };
        if let Some(t) = result.metrics.time_to_completion {
            let time_factor = (10.0 / t.max(1.0)).min(1.0);
            score = score * 0.7 + time_factor * 0.3;
        }
        if let Some(path) = result.metrics.path_efficiency {
            score = score * 0.8 + path * 0.2;
        }
        score
    }
}

impl FoundationModel for MockFoundationModel {
    async fn propose_task(&mut self, context: &SessionContext) -> Result<TaskParameters> {
        if let Some(limit) = self.proposal_limit {
            if self.proposals >= limit {
                bail!("mock generator refused proposal {} (limit {limit})", self.proposals + 1);
            }
        }
        self.proposals += 1;

        let task = self.engine.select_task(context.difficulty_level);
        info!(
            task_id = %task.task_id,
            task_type = %task.task_type,
            difficulty = %context.difficulty_level,
            "Proposed task"
        );
        Ok(task)
    }

    async fn generate_controller_code(
        &mut self,
        task: &TaskParameters,
    ) -> Result<ControllerArtifact> {
        let (idx, artifact) = self.engine.select_controller(task);
        info!(task_id = %task.task_id, controller = idx, "Generated controller");
        Ok(artifact)
    }

    async fn evaluate_controller(
        &self,
        task: &TaskParameters,
        _artifact: &ControllerArtifact,
        result: &ExecutionResult,
    ) -> Result<EvaluationResult> {
        let score = Self::score(result);
        let feedback = if result.success {
            "The controller successfully completed the task."
        } else {
            "The controller failed to complete the task."
        };

        let mut improvement_suggestions = Vec::new();
        if !result.success {
            improvement_suggestions.push("Consider implementing error recovery strategies.".into());
            improvement_suggestions.push("Try using a more robust control algorithm.".into());
        } else if score < 0.8 {
            improvement_suggestions
                .push("The controller could be optimized for better efficiency.".into());
            improvement_suggestions.push("Consider adding smoothing to the trajectory.".into());
        }

        info!(task_id = %task.task_id, success = result.success, score, "Evaluated controller");
        Ok(EvaluationResult {
            success: result.success,
            score,
            feedback: feedback.to_string(),
            improvement_suggestions,
        })
    }

    async fn update_learning(
        &mut self,
        task: &TaskParameters,
        _artifact: &ControllerArtifact,
        evaluation: &EvaluationResult,
    ) -> Result<()> {
        self.history.push(LearningEvent {
            task_id: task.task_id.clone(),
            task_description: task.task_description.clone(),
            success: evaluation.success,
            score: evaluation.score,
            timestamp: Utc::now(),
            reward: None,
        });
        debug!(entries = self.history.len(), "Generator history updated");
        Ok(())
    }

    async fn apply_reinforcement_feedback(
        &mut self,
        task: &TaskParameters,
        _artifact: &ControllerArtifact,
        reward: f64,
        _context: Option<&SessionContext>,
    ) -> Result<()> {
        // Unknown task ids are logged by the engine and otherwise ignored.
        self.engine.apply_feedback(task, reward);
        Ok(())
    }
}
