use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::selection::{ControllerSelectionMode, TaskSelectionMode};
use crate::task::Difficulty;
use crate::training::MIN_DIFFICULTY_WINDOW;

/// Complete configuration for a self-play run.
///
/// Every section carries `#[serde(default)]` so a config file only needs to
/// mention the values it overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfPlayConfig {
    pub simulation: SimulationConfig,
    pub learning: LearningConfig,
    pub groot_n1: GeneratorConfig,
    pub episode: EpisodeConfig,
}

/// Simulator backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Scene loaded when the loop does not name one (default: "default_environment").
    pub environment_path: String,
    /// Physics timestep in seconds (default: 0.01).
    pub physics_dt: f64,
    pub render_enabled: bool,
    /// Simulator-side horizon after which every robot reports done (default: 1000).
    pub max_steps: usize,
    pub domain_randomization: DomainRandomizationConfig,
}

/// Backend-level domain randomization ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainRandomizationConfig {
    pub enabled: bool,
    pub gravity_range: (f64, f64),
    pub friction_range: (f64, f64),
    pub mass_range_factor: (f64, f64),
}

/// Reinforcement feedback and curriculum configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Step size of the bandit weight update (default: 0.1).
    pub learning_rate: f64,
    /// Number of recent episodes inspected by the difficulty ladder (default and minimum: 5).
    pub difficulty_window: usize,
    /// Success rate above which difficulty goes up (default: 0.8).
    pub promote_threshold: f64,
    /// Success rate below which difficulty goes down (default: 0.2).
    pub demote_threshold: f64,
}

/// Task/controller generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Which generator backend to use. Only "mock" is available.
    pub api_type: String,
    pub mock_enabled: bool,
    pub task_selection_mode: TaskSelectionMode,
    pub controller_selection_mode: ControllerSelectionMode,
    /// Seed for the selection RNG; `None` draws one from the OS.
    pub seed: Option<u64>,
}

/// Episode loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeConfig {
    /// Ceiling on episodes over the lifetime of one loop (default: 100).
    pub max_episodes: usize,
    /// Bound on controller steps within one episode (default: 1000).
    pub max_steps_per_episode: usize,
    pub initial_difficulty: Difficulty,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            environment_path: "default_environment".into(),
            physics_dt: 0.01,
            render_enabled: true,
            max_steps: 1000,
            domain_randomization: DomainRandomizationConfig::default(),
        }
    }
}

impl Default for DomainRandomizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            gravity_range: (-10.0, -9.8),
            friction_range: (0.5, 1.0),
            mass_range_factor: (0.8, 1.2),
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            difficulty_window: 5,
            promote_threshold: 0.8,
            demote_threshold: 0.2,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_type: "mock".into(),
            mock_enabled: true,
            task_selection_mode: TaskSelectionMode::Sequential,
            controller_selection_mode: ControllerSelectionMode::Sequential,
            seed: None,
        }
    }
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            max_episodes: 100,
            max_steps_per_episode: 1000,
            initial_difficulty: Difficulty::Easy,
        }
    }
}

impl SelfPlayConfig {
    /// Read and validate a JSON config file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(config)
    }

    /// Write the config as pretty JSON.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    /// Reject values the loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        if !(sim.physics_dt > 0.0) {
            bail!("simulation.physics_dt must be positive, got {}", sim.physics_dt);
        }
        if sim.max_steps == 0 {
            bail!("simulation.max_steps must be at least 1");
        }
        let dr = &sim.domain_randomization;
        for (name, (lo, hi)) in [
            ("gravity_range", dr.gravity_range),
            ("friction_range", dr.friction_range),
            ("mass_range_factor", dr.mass_range_factor),
        ] {
            if !(lo <= hi) {
                bail!("simulation.domain_randomization.{name} must satisfy min <= max");
            }
        }

        let learning = &self.learning;
        if !learning.learning_rate.is_finite() || learning.learning_rate < 0.0 {
            bail!(
                "learning.learning_rate must be finite and non-negative, got {}",
                learning.learning_rate
            );
        }
        if learning.difficulty_window < MIN_DIFFICULTY_WINDOW {
            bail!(
                "learning.difficulty_window must be at least {MIN_DIFFICULTY_WINDOW}, got {}",
                learning.difficulty_window
            );
        }
        if !(0.0 <= learning.demote_threshold
            && learning.demote_threshold <= learning.promote_threshold
            && learning.promote_threshold <= 1.0)
        {
            bail!("learning thresholds must satisfy 0 <= demote <= promote <= 1");
        }

        if self.groot_n1.api_type != "mock" || !self.groot_n1.mock_enabled {
            bail!(
                "groot_n1.api_type {:?} is not available; only the mock generator is implemented",
                self.groot_n1.api_type
            );
        }

        if self.episode.max_steps_per_episode == 0 {
            bail!("episode.max_steps_per_episode must be at least 1");
        }
        Ok(())
    }
}
