//! In-process mock of the physics backend.
//!
//! [`MockSimulator`] keeps just enough state to exercise the learning loop
//! end to end: a scene with randomized physics parameters, a set of robots
//! whose end effector integrates the commanded displacement, and a step
//! horizon after which every robot reports done. No rigid-body dynamics are
//! modelled.

use std::collections::{BTreeMap, HashMap};

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use super::traits::{
    GripperCommand, Observations, RobotAction, RobotObservation, Simulator, StepOutcome, Vec3,
};
use crate::config::SimulationConfig;
use crate::task::RandomizationSettings;

const JOINT_COUNT: usize = 6;

/// Physics parameters of the loaded scene.
#[derive(Debug, Clone)]
pub struct MockScene {
    pub environment_path: String,
    pub gravity: Vec3,
    pub friction: f64,
    pub mass_scaling: f64,
    /// Values sampled for task-specific randomization entries.
    pub parameters: BTreeMap<String, f64>,
}

impl MockScene {
    fn new(environment_path: String) -> Self {
        Self {
            environment_path,
            gravity: [0.0, 0.0, -9.81],
            friction: 0.7,
            mass_scaling: 1.0,
            parameters: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct MockRobot {
    name: String,
    robot_type: String,
    base_position: Vec3,
    end_effector: Vec3,
    velocity: Vec3,
    joints: [f64; JOINT_COUNT],
    gripper: Option<GripperCommand>,
}

impl MockRobot {
    fn observation(&self) -> RobotObservation {
        RobotObservation {
            end_effector_position: Some(self.end_effector),
            end_effector_velocity: Some(self.velocity),
            joint_positions: self.joints.to_vec(),
            joint_velocities: vec![0.0; JOINT_COUNT],
        }
    }

    fn reset(&mut self) {
        self.end_effector = self.base_position;
        self.velocity = [0.0; 3];
        self.joints = [0.0; JOINT_COUNT];
        self.gripper = None;
    }
}

/// A scripted stand-in for the physics simulator.
#[derive(Debug)]
pub struct MockSimulator {
    config: SimulationConfig,
    initialized: bool,
    scene: Option<MockScene>,
    robots: BTreeMap<String, MockRobot>,
    robot_counter: usize,
    current_step: usize,
    rng: StdRng,
    fail_initialize: bool,
    fail_load: bool,
    fail_create_robot: bool,
    fail_randomization: bool,
    fail_reset: bool,
}

impl MockSimulator {
    pub fn new(config: SimulationConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// A mock whose randomization draws are reproducible.
    pub fn with_seed(config: SimulationConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: SimulationConfig, rng: StdRng) -> Self {
        info!(
            physics_dt = config.physics_dt,
            max_steps = config.max_steps,
            "Mock simulator created"
        );
        Self {
            config,
            initialized: false,
            scene: None,
            robots: BTreeMap::new(),
            robot_counter: 0,
            current_step: 0,
            rng,
            fail_initialize: false,
            fail_load: false,
            fail_create_robot: false,
            fail_randomization: false,
            fail_reset: false,
        }
    }

    /// Make `initialize` fail.
    pub fn fail_initialize(mut self, fail: bool) -> Self {
        self.fail_initialize = fail;
        self
    }

    /// Make every `load_environment` call fail.
    pub fn fail_load(mut self, fail: bool) -> Self {
        self.fail_load = fail;
        self
    }

    /// Make every `create_robot` call fail.
    pub fn fail_create_robot(mut self, fail: bool) -> Self {
        self.fail_create_robot = fail;
        self
    }

    /// Make every `apply_domain_randomization` call fail.
    pub fn fail_randomization(mut self, fail: bool) -> Self {
        self.fail_randomization = fail;
        self
    }

    /// Make every `reset` call fail.
    pub fn fail_reset(mut self, fail: bool) -> Self {
        self.fail_reset = fail;
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn scene(&self) -> Option<&MockScene> {
        self.scene.as_ref()
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn robot_count(&self) -> usize {
        self.robots.len()
    }

    /// Name and type of a spawned robot.
    pub fn robot_info(&self, robot_id: &str) -> Option<(&str, &str)> {
        self.robots
            .get(robot_id)
            .map(|r| (r.name.as_str(), r.robot_type.as_str()))
    }

    fn ensure_initialized(&self, operation: &str) -> Result<()> {
        if !self.initialized {
            bail!("cannot {operation}: simulation not initialized");
        }
        Ok(())
    }

    fn sample(&mut self, (lo, hi): (f64, f64)) -> f64 {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        self.rng.gen_range(lo..=hi)
    }

    fn observations(&self) -> Observations {
        self.robots
            .iter()
            .map(|(id, robot)| (id.clone(), robot.observation()))
            .collect()
    }

    fn randomize(&mut self, settings: Option<&RandomizationSettings>) -> Result<()> {
        let dr = self.config.domain_randomization.clone();
        let gravity_range = settings
            .and_then(|s| s.range("gravity"))
            .unwrap_or(dr.gravity_range);
        let friction_range = settings
            .and_then(|s| s.range("friction"))
            .unwrap_or(dr.friction_range);

        let gravity = self.sample(gravity_range);
        let friction = self.sample(friction_range);
        let mass_scaling = self.sample(dr.mass_range_factor);

        let mut parameters = BTreeMap::new();
        if let Some(settings) = settings {
            for (key, value) in settings.iter() {
                if key == "gravity" || key == "friction" {
                    continue;
                }
                if let Some(range) = value.as_range() {
                    parameters.insert(key.clone(), self.sample(range));
                }
            }
        }

        let Some(scene) = self.scene.as_mut() else {
            bail!("cannot apply domain randomization: no scene loaded");
        };
        scene.gravity = [0.0, 0.0, gravity];
        scene.friction = friction;
        scene.mass_scaling = mass_scaling;
        scene.parameters = parameters;

        info!(gravity, friction, mass_scaling, "Applied domain randomization");
        Ok(())
    }
}

impl Simulator for MockSimulator {
    async fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            debug!("Mock simulator already initialized");
            return Ok(());
        }
        if self.fail_initialize {
            bail!("mock simulator refused to initialize");
        }
        self.scene = Some(MockScene::new(self.config.environment_path.clone()));
        self.initialized = true;
        info!(render = self.config.render_enabled, "Mock simulator initialized");
        Ok(())
    }

    async fn load_environment(&mut self, path: Option<&str>) -> Result<()> {
        self.ensure_initialized("load environment")?;
        let path = path.unwrap_or(&self.config.environment_path).to_string();
        if self.fail_load {
            bail!("failed to load environment {path}");
        }
        info!(path = %path, "Loaded mock environment");
        // A fresh scene starts without robots.
        self.robots.clear();
        self.scene = Some(MockScene::new(path));
        Ok(())
    }

    async fn create_robot(
        &mut self,
        name: &str,
        robot_type: &str,
        position: Vec3,
    ) -> Result<String> {
        self.ensure_initialized("create robot")?;
        if self.fail_create_robot {
            bail!("failed to create robot {name} ({robot_type})");
        }
        let robot_id = format!("robot_{}", self.robot_counter);
        self.robot_counter += 1;
        self.robots.insert(
            robot_id.clone(),
            MockRobot {
                name: name.to_string(),
                robot_type: robot_type.to_string(),
                base_position: position,
                end_effector: position,
                velocity: [0.0; 3],
                joints: [0.0; JOINT_COUNT],
                gripper: None,
            },
        );
        info!(robot_id = %robot_id, name, robot_type, "Created mock robot");
        Ok(robot_id)
    }

    async fn apply_domain_randomization(
        &mut self,
        settings: Option<&RandomizationSettings>,
    ) -> Result<()> {
        self.ensure_initialized("apply domain randomization")?;
        if self.fail_randomization {
            bail!("domain randomization rejected by backend");
        }
        if !self.config.domain_randomization.enabled {
            info!("Domain randomization is disabled in configuration");
            return Ok(());
        }
        self.randomize(settings)
    }

    async fn reset(&mut self) -> Result<Observations> {
        self.ensure_initialized("reset")?;
        if self.fail_reset {
            bail!("failed to reset simulation");
        }
        self.current_step = 0;
        for robot in self.robots.values_mut() {
            robot.reset();
        }
        debug!(robots = self.robots.len(), "Mock simulation reset");
        Ok(self.observations())
    }

    async fn step(&mut self, actions: &HashMap<String, RobotAction>) -> Result<StepOutcome> {
        self.ensure_initialized("step")?;

        for (robot_id, action) in actions {
            let Some(robot) = self.robots.get_mut(robot_id) else {
                debug!(robot_id = %robot_id, "Ignoring action for unknown robot");
                continue;
            };
            match action.displacement {
                Some(delta) => {
                    for axis in 0..3 {
                        robot.end_effector[axis] += delta[axis];
                    }
                    robot.velocity = delta;
                }
                None => robot.velocity = [0.0; 3],
            }
            if action.gripper.is_some() {
                robot.gripper = action.gripper;
            }
        }

        self.current_step += 1;
        let horizon_reached = self.current_step >= self.config.max_steps;

        let mut rewards = HashMap::new();
        let mut dones = HashMap::new();
        for robot_id in self.robots.keys() {
            rewards.insert(robot_id.clone(), 0.0);
            dones.insert(robot_id.clone(), horizon_reached);
        }

        Ok(StepOutcome {
            observations: self.observations(),
            rewards,
            dones,
            info: serde_json::json!({ "step": self.current_step }),
        })
    }

    async fn get_observations(&self) -> Result<Observations> {
        self.ensure_initialized("read observations")?;
        Ok(self.observations())
    }

    async fn close(&mut self) {
        if !self.initialized {
            return;
        }
        self.scene = None;
        self.robots.clear();
        self.initialized = false;
        info!("Mock simulator closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimulationConfig {
        SimulationConfig {
            max_steps: 3,
            ..SimulationConfig::default()
        }
    }

    #[tokio::test]
    async fn calls_before_initialize_fail() {
        let mut sim = MockSimulator::with_seed(config(), 1);
        assert!(sim.load_environment(None).await.is_err());
        assert!(sim.create_robot("r", "ur10", [0.0; 3]).await.is_err());
        assert!(sim.reset().await.is_err());
        assert!(sim.get_observations().await.is_err());
    }

    #[tokio::test]
    async fn robots_get_sequential_ids() {
        let mut sim = MockSimulator::with_seed(config(), 1);
        sim.initialize().await.unwrap();
        let a = sim.create_robot("a", "ur10", [0.0; 3]).await.unwrap();
        let b = sim.create_robot("b", "franka", [1.0, 0.0, 0.0]).await.unwrap();
        assert_eq!(a, "robot_0");
        assert_eq!(b, "robot_1");
        assert_eq!(sim.robot_info(&b), Some(("b", "franka")));
    }

    #[tokio::test]
    async fn step_integrates_displacement_and_reports_done_at_horizon() {
        let mut sim = MockSimulator::with_seed(config(), 1);
        sim.initialize().await.unwrap();
        let id = sim.create_robot("r", "ur10", [0.0; 3]).await.unwrap();
        sim.reset().await.unwrap();

        let mut actions = HashMap::new();
        actions.insert(id.clone(), RobotAction::displacement([0.1, 0.0, -0.2]));

        let out = sim.step(&actions).await.unwrap();
        let obs = &out.observations[&id];
        assert_eq!(obs.end_effector_position, Some([0.1, 0.0, -0.2]));
        assert_eq!(obs.end_effector_velocity, Some([0.1, 0.0, -0.2]));
        assert!(!out.is_done(&id));

        sim.step(&actions).await.unwrap();
        let out = sim.step(&actions).await.unwrap();
        assert!(out.is_done(&id));
        assert_eq!(out.reward(&id), 0.0);
    }

    #[tokio::test]
    async fn reset_restores_base_position() {
        let mut sim = MockSimulator::with_seed(config(), 1);
        sim.initialize().await.unwrap();
        let id = sim.create_robot("r", "ur10", [0.5, 0.5, 0.0]).await.unwrap();
        let mut actions = HashMap::new();
        actions.insert(id.clone(), RobotAction::displacement([1.0, 1.0, 1.0]));
        sim.step(&actions).await.unwrap();

        let obs = sim.reset().await.unwrap();
        assert_eq!(obs[&id].end_effector_position, Some([0.5, 0.5, 0.0]));
        assert_eq!(sim.current_step(), 0);
    }

    #[tokio::test]
    async fn randomization_samples_within_ranges() {
        let mut sim = MockSimulator::with_seed(config(), 7);
        sim.initialize().await.unwrap();
        sim.load_environment(Some("kitchen")).await.unwrap();

        let mut settings = RandomizationSettings::new();
        settings.insert_range("gravity", -9.9, -9.85);
        settings.insert_range("cube_mass", 0.1, 0.2);
        sim.apply_domain_randomization(Some(&settings)).await.unwrap();

        let scene = sim.scene().unwrap();
        assert_eq!(scene.environment_path, "kitchen");
        assert!((-9.9..=-9.85).contains(&scene.gravity[2]));
        assert!((0.5..=1.0).contains(&scene.friction));
        let mass = scene.parameters["cube_mass"];
        assert!((0.1..=0.2).contains(&mass));
    }

    #[tokio::test]
    async fn failure_switches_surface_as_errors() {
        let mut sim = MockSimulator::with_seed(config(), 1)
            .fail_load(true)
            .fail_create_robot(true)
            .fail_randomization(true)
            .fail_reset(true);
        sim.initialize().await.unwrap();
        assert!(sim.load_environment(None).await.is_err());
        assert!(sim.create_robot("r", "ur10", [0.0; 3]).await.is_err());
        assert!(sim.apply_domain_randomization(None).await.is_err());
        assert!(sim.reset().await.is_err());
    }

    #[tokio::test]
    async fn close_releases_state() {
        let mut sim = MockSimulator::with_seed(config(), 1);
        sim.initialize().await.unwrap();
        sim.create_robot("r", "ur10", [0.0; 3]).await.unwrap();
        sim.close().await;
        assert!(!sim.is_initialized());
        assert_eq!(sim.robot_count(), 0);
    }
}
