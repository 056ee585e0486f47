//! Adaptive task and controller selection.
//!
//! - [`engine`] -- the [`SelectionEngine`] with its selection modes, bandit
//!   weights and task-type affinity map.
//! - [`ledger`] -- cumulative reward statistics per controller.

pub mod engine;
pub mod ledger;

pub use engine::{
    ControllerSelectionMode, SelectionEngine, SelectionSummary, TaskSelectionMode,
    AFFINITY_EXPLOIT_PROBABILITY, MIN_WEIGHT,
};
pub use ledger::{ControllerPerformanceRecord, PerformanceStats};
