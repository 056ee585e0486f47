//! Task and controller selection with a reinforcement-updated preference.
//!
//! The [`SelectionEngine`] owns every piece of learning state that survives
//! across episodes:
//!
//! 1. **Selection weights** -- one positive float per controller template,
//!    floored at [`MIN_WEIGHT`], used by the `random` controller mode.
//! 2. **Task-type affinity map** -- task type to the controller indices that
//!    have ever earned a positive reward on it (append-only, no duplicates).
//! 3. **Performance ledger** -- cumulative reward statistics per controller.
//!
//! All mutation goes through `&mut self` methods, so the single control loop
//! that owns the engine is its only writer.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use anyhow::{bail, Result};
use ordered_float::OrderedFloat;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::ledger::ControllerPerformanceRecord;
use crate::controller::ControllerArtifact;
use crate::task::{Difficulty, TaskParameters};

/// Lower bound every selection weight is clamped to.
pub const MIN_WEIGHT: f64 = 0.1;

/// Probability that `match_task` exploits the learned affinity set.
pub const AFFINITY_EXPLOIT_PROBABILITY: f64 = 0.7;

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

/// How the next task template is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSelectionMode {
    /// Round-robin over the library.
    #[default]
    Sequential,
    /// Uniform over the library.
    Random,
    /// Uniform over tasks at the current difficulty, or all tasks if none match.
    Difficulty,
}

impl TaskSelectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Random => "random",
            Self::Difficulty => "difficulty",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Some(Self::Sequential),
            "random" => Some(Self::Random),
            "difficulty" => Some(Self::Difficulty),
            _ => None,
        }
    }
}

impl fmt::Display for TaskSelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the controller template for a task is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerSelectionMode {
    /// Round-robin over the templates.
    #[default]
    Sequential,
    /// Weighted sample proportional to the selection weights.
    Random,
    /// Prefer controllers that already succeeded on this task type.
    MatchTask,
}

impl ControllerSelectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Random => "random",
            Self::MatchTask => "match_task",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "sequential" => Some(Self::Sequential),
            "random" => Some(Self::Random),
            "match_task" => Some(Self::MatchTask),
            _ => None,
        }
    }
}

impl fmt::Display for ControllerSelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Snapshot of the engine's learned state, for logs and results files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionSummary {
    pub task_mode: TaskSelectionMode,
    pub controller_mode: ControllerSelectionMode,
    pub weights: Vec<f64>,
    pub task_type_controllers: BTreeMap<String, Vec<usize>>,
    pub selections_made: usize,
    pub feedback_applied: usize,
}

#[derive(Debug, Clone)]
pub struct SelectionEngine {
    tasks: Vec<TaskParameters>,
    controllers: Vec<String>,
    task_mode: TaskSelectionMode,
    controller_mode: ControllerSelectionMode,
    learning_rate: f64,

    weights: Vec<f64>,
    task_type_controllers: HashMap<String, Vec<usize>>,
    performance: Vec<ControllerPerformanceRecord>,
    /// Controller index chosen for each task id, for feedback attribution.
    selections: HashMap<String, usize>,

    task_cursor: usize,
    controller_cursor: usize,
    feedback_applied: usize,
    rng: StdRng,
}

impl SelectionEngine {
    /// Build an engine over the given libraries.
    ///
    /// Fails if either library is empty. A `seed` makes every random choice
    /// reproducible.
    pub fn new(
        tasks: Vec<TaskParameters>,
        controllers: Vec<String>,
        task_mode: TaskSelectionMode,
        controller_mode: ControllerSelectionMode,
        learning_rate: f64,
        seed: Option<u64>,
    ) -> Result<Self> {
        if tasks.is_empty() {
            bail!("selection engine needs at least one task template");
        }
        if controllers.is_empty() {
            bail!("selection engine needs at least one controller template");
        }
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let n = controllers.len();
        Ok(Self {
            tasks,
            controllers,
            task_mode,
            controller_mode,
            learning_rate,
            weights: vec![1.0; n],
            task_type_controllers: HashMap::new(),
            performance: vec![ControllerPerformanceRecord::default(); n],
            selections: HashMap::new(),
            task_cursor: 0,
            controller_cursor: 0,
            feedback_applied: 0,
            rng,
        })
    }

    pub fn task_mode(&self) -> TaskSelectionMode {
        self.task_mode
    }

    pub fn controller_mode(&self) -> ControllerSelectionMode {
        self.controller_mode
    }

    pub fn tasks(&self) -> &[TaskParameters] {
        &self.tasks
    }

    pub fn controllers(&self) -> &[String] {
        &self.controllers
    }

    // ------------------------------------------------------------------
    // Task selection
    // ------------------------------------------------------------------

    /// Index of the next task template under the current mode.
    fn next_task_index(&mut self, difficulty: Difficulty) -> usize {
        match self.task_mode {
            TaskSelectionMode::Sequential => {
                let idx = self.task_cursor % self.tasks.len();
                self.task_cursor += 1;
                idx
            }
            TaskSelectionMode::Random => self.rng.gen_range(0..self.tasks.len()),
            TaskSelectionMode::Difficulty => {
                let matching: Vec<usize> = self
                    .tasks
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.difficulty_or_medium() == difficulty)
                    .map(|(i, _)| i)
                    .collect();
                match matching.choose(&mut self.rng) {
                    Some(&idx) => idx,
                    None => self.rng.gen_range(0..self.tasks.len()),
                }
            }
        }
    }

    /// Produce a fresh task for an episode at `difficulty`.
    ///
    /// The template is cloned, given a new unique id, and its numeric
    /// randomization ranges are scaled for the difficulty level.
    pub fn select_task(&mut self, difficulty: Difficulty) -> TaskParameters {
        let idx = self.next_task_index(difficulty);
        let mut task = self.tasks[idx].clone();
        let uuid = Uuid::new_v4().simple().to_string();
        task.task_id = format!("mock_task_{}", &uuid[..8]);
        task.domain_randomization_settings
            .scale_ranges(difficulty.range_factor());
        debug!(
            template = idx,
            task_id = %task.task_id,
            task_type = %task.task_type,
            %difficulty,
            "Selected task"
        );
        task
    }

    // ------------------------------------------------------------------
    // Controller selection
    // ------------------------------------------------------------------

    fn weighted_index(&mut self) -> usize {
        match WeightedIndex::new(&self.weights) {
            Ok(dist) => dist.sample(&mut self.rng),
            // Only reachable if every weight is zero, which the floor prevents.
            Err(_) => self.rng.gen_range(0..self.controllers.len()),
        }
    }

    fn matching_index(&mut self, task_type: &str) -> usize {
        let learned = self
            .task_type_controllers
            .get(task_type)
            .filter(|set| !set.is_empty())
            .cloned();
        if let Some(set) = learned {
            if self.rng.gen_bool(AFFINITY_EXPLOIT_PROBABILITY) {
                if let Some(&idx) = set.choose(&mut self.rng) {
                    return idx;
                }
            }
        }

        let needle = task_type.to_lowercase();
        let textual: Vec<usize> = self
            .controllers
            .iter()
            .enumerate()
            .filter(|(_, src)| !needle.is_empty() && src.to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect();
        match textual.choose(&mut self.rng) {
            Some(&idx) => idx,
            None => self.rng.gen_range(0..self.controllers.len()),
        }
    }

    /// Choose a controller template for `task` and render it.
    ///
    /// The choice is remembered under the task id so later feedback can be
    /// attributed to it.
    pub fn select_controller(&mut self, task: &TaskParameters) -> (usize, ControllerArtifact) {
        let idx = match self.controller_mode {
            ControllerSelectionMode::Sequential => {
                let idx = self.controller_cursor % self.controllers.len();
                self.controller_cursor += 1;
                idx
            }
            ControllerSelectionMode::Random => self.weighted_index(),
            ControllerSelectionMode::MatchTask => self.matching_index(&task.task_type),
        };
        self.selections.insert(task.task_id.clone(), idx);
        debug!(
            task_id = %task.task_id,
            controller = idx,
            mode = %self.controller_mode,
            "Selected controller"
        );
        (idx, ControllerArtifact::render(&self.controllers[idx], task))
    }

    /// The controller index previously chosen for `task_id`.
    pub fn selected_controller(&self, task_id: &str) -> Option<usize> {
        self.selections.get(task_id).copied()
    }

    // ------------------------------------------------------------------
    // Reinforcement update
    // ------------------------------------------------------------------

    /// Credit `reward` to the controller chosen for `task`.
    ///
    /// Returns the updated controller index, or `None` (with a warning and
    /// no state change) when no selection was recorded for the task id.
    pub fn apply_feedback(&mut self, task: &TaskParameters, reward: f64) -> Option<usize> {
        let Some(idx) = self.selected_controller(&task.task_id) else {
            warn!(
                task_id = %task.task_id,
                "No controller selection recorded for task; feedback ignored"
            );
            return None;
        };

        self.performance[idx].record(&task.task_type, reward);

        if reward > 0.0 {
            let set = self
                .task_type_controllers
                .entry(task.task_type.clone())
                .or_default();
            if !set.contains(&idx) {
                set.push(idx);
            }
        }

        let before = self.weights[idx];
        self.weights[idx] = (before + self.learning_rate * reward).max(MIN_WEIGHT);
        self.feedback_applied += 1;

        debug!(
            task_id = %task.task_id,
            controller = idx,
            reward,
            weight_before = before,
            weight_after = self.weights[idx],
            success_rate = ?self.performance[idx].overall.success_rate(),
            "Applied reinforcement feedback"
        );
        Some(idx)
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn performance(&self, idx: usize) -> Option<&ControllerPerformanceRecord> {
        self.performance.get(idx)
    }

    /// Controllers that have earned a positive reward on `task_type`, in the
    /// order they first did so.
    pub fn task_type_controllers(&self, task_type: &str) -> &[usize] {
        self.task_type_controllers
            .get(task_type)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// The controller with the highest mean reward on `task_type`.
    pub fn best_controller_for(&self, task_type: &str) -> Option<usize> {
        self.performance
            .iter()
            .enumerate()
            .filter_map(|(i, rec)| {
                rec.for_task_type(task_type)
                    .and_then(|s| s.mean_reward())
                    .map(|mean| (OrderedFloat(mean), i))
            })
            .max_by_key(|(mean, _)| *mean)
            .map(|(_, i)| i)
    }

    pub fn summary(&self) -> SelectionSummary {
        SelectionSummary {
            task_mode: self.task_mode,
            controller_mode: self.controller_mode,
            weights: self.weights.clone(),
            task_type_controllers: self
                .task_type_controllers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            selections_made: self.selections.len(),
            feedback_applied: self.feedback_applied,
        }
    }
}
