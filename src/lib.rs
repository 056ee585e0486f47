//! Self-play robot learning: an agent proposes manipulation tasks, writes
//! controllers for them, runs them in simulation, and learns which controller
//! strategies to favour from the rewards they earn.
//!
//! - [`training`] -- the episode loop, reward shaping and difficulty ladder.
//! - [`selection`] -- bandit weights and the task-type affinity map.
//! - [`controller`] -- controller artifacts and their bounded execution.
//! - [`model`] -- the proposal/generation contract and its mock.
//! - [`env`] -- the simulator contract and its mock.
//! - [`task`] / [`trajectory`] / [`config`] -- shared data.

pub mod config;
pub mod controller;
pub mod env;
pub mod model;
pub mod selection;
pub mod task;
pub mod training;
pub mod trajectory;
