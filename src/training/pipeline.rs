//! The self-play learning loop.
//!
//! Each episode runs one pass of:
//!
//! ```text
//! PROPOSE -> GENERATE -> LOAD_ENV -> CREATE_ROBOT -> RANDOMIZE -> RESET
//!   -> COMPILE -> STEP_LOOP -> EVALUATE -> REWARD -> FEEDBACK
//!   -> RECORD_HISTORY -> ADJUST_DIFFICULTY
//! ```
//!
//! Setup failures (load, robot creation, randomization, compilation) degrade
//! the episode to a failed execution that is still evaluated and rewarded.
//! Any other error aborts the episode, and [`LearningLoop::run`] stops there
//! and returns what it has collected.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::context::{LearningEvent, SessionContext};
use super::curriculum::DifficultyLadder;
use super::reward::{calculate_normalized_reward, calculate_reward};
use crate::config::SelfPlayConfig;
use crate::controller::{ControllerArtifact, ControllerExecutor, ExecutionResult};
use crate::env::Simulator;
use crate::model::{EvaluationResult, FoundationModel};
use crate::task::{Difficulty, TaskParameters};

// ---------------------------------------------------------------------------
// Episode result
// ---------------------------------------------------------------------------

/// Everything produced by one episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeResult {
    /// 1-based episode number within the session.
    pub episode: usize,
    pub task: TaskParameters,
    pub controller_artifact: ControllerArtifact,
    pub execution: ExecutionResult,
    pub evaluation: EvaluationResult,
    /// Raw reward, as fed back to the generator.
    pub reward: f64,
    /// `tanh(reward)`.
    pub normalized_reward: f64,
    /// Difficulty in effect for the next episode.
    pub difficulty_after: Difficulty,
}

// ---------------------------------------------------------------------------
// Learning loop
// ---------------------------------------------------------------------------

/// Owns the simulator, the generator and the session context, and drives
/// episodes one at a time.
pub struct LearningLoop<S: Simulator, M: FoundationModel> {
    sim: S,
    model: M,
    context: SessionContext,
    executor: ControllerExecutor,
    ladder: DifficultyLadder,
    episode_count: usize,
    max_episodes: usize,
    initialized: bool,
}

impl<S: Simulator, M: FoundationModel> LearningLoop<S, M> {
    pub fn new(config: &SelfPlayConfig, sim: S, model: M) -> Self {
        let episode = &config.episode;
        info!(
            max_episodes = episode.max_episodes,
            initial_difficulty = %episode.initial_difficulty,
            "Learning loop created"
        );
        Self {
            sim,
            model,
            context: SessionContext::new(episode.initial_difficulty),
            executor: ControllerExecutor::new(episode.max_steps_per_episode),
            ladder: DifficultyLadder::from(&config.learning),
            episode_count: 0,
            max_episodes: episode.max_episodes,
            initialized: false,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn history(&self) -> &[LearningEvent] {
        &self.context.learning_history
    }

    pub fn difficulty(&self) -> Difficulty {
        self.context.difficulty_level
    }

    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    pub fn max_episodes(&self) -> usize {
        self.max_episodes
    }

    pub fn simulator(&self) -> &S {
        &self.sim
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Bring up the simulator. Idempotent.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.sim
            .initialize()
            .await
            .context("Failed to initialize simulator")?;
        self.initialized = true;
        info!("Learning loop initialized");
        Ok(())
    }

    /// Run up to `num_episodes` episodes (the configured ceiling when `None`).
    ///
    /// Stops early at the episode ceiling or at the first episode error; the
    /// results collected so far are returned either way. If the simulator
    /// cannot be initialized, nothing runs.
    pub async fn run(&mut self, num_episodes: Option<usize>) -> Vec<EpisodeResult> {
        let requested = num_episodes.unwrap_or(self.max_episodes);
        info!(requested, "Running learning loop");

        if let Err(e) = self.initialize().await {
            error!(error = %e, "Failed to initialize learning loop");
            return Vec::new();
        }

        let mut results = Vec::with_capacity(requested.min(self.max_episodes));
        for _ in 0..requested {
            if self.episode_count >= self.max_episodes {
                info!(max_episodes = self.max_episodes, "Reached maximum number of episodes");
                break;
            }
            match self.run_episode().await {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!(
                        episode = self.episode_count + 1,
                        error = %format!("{e:#}"),
                        "Episode failed; stopping run"
                    );
                    break;
                }
            }
        }

        let successes = results.iter().filter(|r| r.execution.success).count();
        info!(
            completed = results.len(),
            successes,
            difficulty = %self.context.difficulty_level,
            "Learning loop finished"
        );
        results
    }

    /// Run one full episode.
    pub async fn run_episode(&mut self) -> Result<EpisodeResult> {
        let episode = self.episode_count + 1;
        info!(episode, max = self.max_episodes, "Starting episode");

        // PROPOSE
        let task = self
            .model
            .propose_task(&self.context)
            .await
            .context("Task proposal failed")?;
        info!(
            episode,
            task_id = %task.task_id,
            description = %task.task_description,
            "Task proposed"
        );

        // GENERATE
        let artifact = self
            .model
            .generate_controller_code(&task)
            .await
            .context("Controller generation failed")?;
        debug!(episode, artifact_len = artifact.as_str().len(), "Controller generated");

        // LOAD_ENV .. STEP_LOOP
        let execution = self.execute_in_simulation(&task, &artifact).await?;
        info!(episode, success = execution.success, "Execution finished");

        // EVALUATE
        let evaluation = self
            .model
            .evaluate_controller(&task, &artifact, &execution)
            .await
            .context("Controller evaluation failed")?;
        info!(episode, score = evaluation.score, "Controller evaluated");

        // REWARD
        let reward = calculate_reward(&execution, Some(&task));
        let normalized_reward = calculate_normalized_reward(&execution, Some(&task));
        info!(episode, reward, normalized_reward, "Reward calculated");

        // FEEDBACK
        self.model
            .apply_reinforcement_feedback(&task, &artifact, reward, Some(&self.context))
            .await
            .context("Reinforcement feedback failed")?;
        self.model
            .update_learning(&task, &artifact, &evaluation)
            .await
            .context("Learning update failed")?;

        // RECORD_HISTORY
        self.context.record_task(&task.task_id);
        self.context.record_event(LearningEvent {
            task_id: task.task_id.clone(),
            task_description: task.task_description.clone(),
            success: evaluation.success,
            score: evaluation.score,
            timestamp: Utc::now(),
            reward: Some(reward),
        });

        // ADJUST_DIFFICULTY
        self.adjust_difficulty();
        self.episode_count += 1;

        Ok(EpisodeResult {
            episode,
            task,
            controller_artifact: artifact,
            execution,
            evaluation,
            reward,
            normalized_reward,
            difficulty_after: self.context.difficulty_level,
        })
    }

    /// Release the simulator.
    pub async fn close(&mut self) {
        info!("Closing learning loop");
        self.sim.close().await;
        self.initialized = false;
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn execute_in_simulation(
        &mut self,
        task: &TaskParameters,
        artifact: &ControllerArtifact,
    ) -> Result<ExecutionResult> {
        if let Err(e) = self.sim.load_environment(None).await {
            warn!(task_id = %task.task_id, error = %e, "Failed to load environment");
            return Ok(ExecutionResult::failed());
        }

        let robot = &task.robot_config;
        info!(name = %robot.name, robot_type = %robot.robot_type, "Creating robot");
        let robot_id = match self
            .sim
            .create_robot(&robot.name, &robot.robot_type, robot.position)
            .await
        {
            Ok(id) if !id.is_empty() => id,
            Ok(_) => {
                warn!(task_id = %task.task_id, "Simulator returned an empty robot id");
                return Ok(ExecutionResult::failed());
            }
            Err(e) => {
                warn!(task_id = %task.task_id, error = %e, "Failed to create robot");
                return Ok(ExecutionResult::failed());
            }
        };

        debug!(settings = ?task.domain_randomization_settings, "Applying domain randomization");
        if let Err(e) = self
            .sim
            .apply_domain_randomization(Some(&task.domain_randomization_settings))
            .await
        {
            warn!(task_id = %task.task_id, error = %e, "Failed to apply domain randomization");
            return Ok(ExecutionResult::failed());
        }

        self.sim.reset().await.context("Simulator reset failed")?;

        // COMPILE and STEP_LOOP; compile failures degrade inside the executor.
        self.executor
            .execute(&mut self.sim, artifact, task, &robot_id)
            .await
    }

    fn adjust_difficulty(&mut self) {
        let current = self.context.difficulty_level;
        let recent = self.context.recent_events(self.ladder.window());
        let next = self.ladder.next(current, recent);
        if next != current {
            let rate = self.ladder.success_rate(recent);
            info!(from = %current, to = %next, success_rate = ?rate, "Adjusted difficulty");
            self.context.difficulty_level = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::env::MockSimulator;
    use crate::model::MockFoundationModel;

    fn config() -> SelfPlayConfig {
        let mut config = SelfPlayConfig::default();
        config.groot_n1.seed = Some(11);
        config.episode.max_episodes = 10;
        config.episode.max_steps_per_episode = 200;
        config
    }

    fn sim(config: &SelfPlayConfig) -> MockSimulator {
        MockSimulator::with_seed(config.simulation.clone(), 5)
    }

    #[tokio::test]
    async fn test_single_episode_records_everything() {
        let config = config();
        let model = MockFoundationModel::from_config(&config).unwrap();
        let mut lp = LearningLoop::new(&config, sim(&config), model);
        lp.initialize().await.unwrap();

        let result = lp.run_episode().await.unwrap();
        assert_eq!(result.episode, 1);
        // Sequential modes: pick_and_place with the P-controller.
        assert_eq!(result.task.task_type, "pick_and_place");
        assert!(result.execution.success);
        assert!(result.reward > 1.0);
        assert!((result.normalized_reward - result.reward.tanh()).abs() < 1e-12);

        assert_eq!(lp.episode_count(), 1);
        assert_eq!(lp.context().previous_task_ids, vec![result.task.task_id.clone()]);
        assert_eq!(lp.history().len(), 1);
        assert_eq!(lp.history()[0].reward, Some(result.reward));
        assert_eq!(lp.model().history().len(), 1);
        assert!(lp.model().engine().weights()[0] > 1.0);
    }

    #[tokio::test]
    async fn test_load_failure_degrades_episode() {
        let config = config();
        let model = MockFoundationModel::from_config(&config).unwrap();
        let mut lp = LearningLoop::new(&config, sim(&config).fail_load(true), model);

        let results = lp.run(Some(2)).await;
        assert_eq!(results.len(), 2);
        for r in &results {
            assert_eq!(r.execution, ExecutionResult::failed());
            assert!(!r.evaluation.success);
            assert!(r.reward < 0.0);
        }
        // Failed feedback still floors rather than removes weight.
        assert!(lp.model().engine().weights().iter().all(|w| *w >= 0.1));
    }

    #[tokio::test]
    async fn test_robot_and_randomization_failures_degrade() {
        let config = config();
        for sim in [
            sim(&config).fail_create_robot(true),
            sim(&config).fail_randomization(true),
        ] {
            let model = MockFoundationModel::from_config(&config).unwrap();
            let mut lp = LearningLoop::new(&config, sim, model);
            let results = lp.run(Some(1)).await;
            assert_eq!(results.len(), 1);
            assert!(!results[0].execution.success);
            assert_eq!(results[0].execution.metrics.steps_to_completion, None);
        }
    }

    #[tokio::test]
    async fn test_run_respects_episode_ceiling_across_calls() {
        let mut config = config();
        config.episode.max_episodes = 4;
        let model = MockFoundationModel::from_config(&config).unwrap();
        let mut lp = LearningLoop::new(&config, sim(&config), model);

        assert_eq!(lp.run(Some(3)).await.len(), 3);
        assert_eq!(lp.run(Some(3)).await.len(), 1);
        assert!(lp.run(None).await.is_empty());
        assert_eq!(lp.episode_count(), 4);
    }

    #[tokio::test]
    async fn test_episode_error_stops_run_with_partial_results() {
        let config = config();
        let model = MockFoundationModel::from_config(&config)
            .unwrap()
            .fail_proposals_after(2);
        let mut lp = LearningLoop::new(&config, sim(&config), model);

        let results = lp.run(Some(5)).await;
        assert_eq!(results.len(), 2);
        assert_eq!(lp.episode_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_episode_leaves_no_task_record() {
        let config = config();
        let model = MockFoundationModel::from_config(&config).unwrap();
        let mut lp = LearningLoop::new(&config, sim(&config).fail_reset(true), model);
        lp.initialize().await.unwrap();

        assert!(lp.run_episode().await.is_err());
        assert!(lp.context().previous_task_ids.is_empty());
        assert!(lp.history().is_empty());
        assert_eq!(lp.episode_count(), 0);
    }

    #[tokio::test]
    async fn test_close_releases_simulator() {
        let config = config();
        let model = MockFoundationModel::from_config(&config).unwrap();
        let mut lp = LearningLoop::new(
            &config,
            MockSimulator::with_seed(SimulationConfig::default(), 1),
            model,
        );
        lp.initialize().await.unwrap();
        assert!(lp.simulator().is_initialized());
        lp.close().await;
        assert!(!lp.simulator().is_initialized());
    }
}
