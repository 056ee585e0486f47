//! Task definitions and the built-in task/controller libraries.
//!
//! - [`types`] -- [`TaskParameters`], the [`Difficulty`] ladder and
//!   domain-randomization settings.
//! - [`library`] -- the predefined tasks and controller templates the
//!   selection engine chooses from.

pub mod library;
pub mod types;

pub use library::{default_controllers, default_tasks};
pub use types::{
    Difficulty, ObjectPlacement, RandomizationSettings, RandomizationValue, RobotConfig,
    RobotGoal, SceneConfig, SceneObject, TaskParameters,
};
