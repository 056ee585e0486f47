//! Controller artifacts and their sandboxed execution.
//!
//! - [`artifact`] -- rendering templates for a task and compiling them.
//! - [`policy`] -- the controller variants and per-episode state.
//! - [`interface`] -- the robot façade a controller reads and stages through.
//! - [`executor`] -- the step loop against a [`crate::env::Simulator`].

pub mod artifact;
pub mod executor;
pub mod interface;
pub mod policy;

pub use artifact::{compile, ControllerArtifact};
pub use executor::{ControllerExecutor, ExecutionMetrics, ExecutionResult};
pub use interface::{MetricSource, RobotInterface, PLACEHOLDER_ENERGY_EFFICIENCY};
pub use policy::{
    CompiledController, Controller, ControllerState, ControllerStatus, WorldState,
};
