//! End-effector trajectory tracking.
//!
//! [`tracker::PositionTrace`] accumulates the positions a controller observed
//! at each decision and derives the path-efficiency metric used by the reward
//! engine and the evaluator.

pub mod tracker;

pub use tracker::{distance, PositionTrace};
