//! Task-proposal and controller-generation backends.
//!
//! - [`traits::FoundationModel`] -- the contract the learning loop drives.
//! - [`mock::MockFoundationModel`] -- selection-engine backed implementation
//!   used by the CLI and tests.

pub mod mock;
pub mod traits;

pub use mock::MockFoundationModel;
pub use traits::{EvaluationResult, FoundationModel};
