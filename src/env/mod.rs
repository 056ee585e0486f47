//! Simulator abstractions and the in-process mock backend.
//!
//! Every backend implements the [`Simulator`] trait so that the controller
//! executor and the learning loop can drive it uniformly. The real physics
//! backend lives outside this crate; [`mock::MockSimulator`] stands in for it
//! in tests and in the CLI.

pub mod mock;
pub mod traits;

pub use mock::{MockScene, MockSimulator};
pub use traits::{
    GripperCommand, Observations, RobotAction, RobotObservation, Simulator, StepOutcome, Vec3,
};
