//! The self-play learning loop and the pieces it is built from.
//!
//! - [`pipeline`] -- [`LearningLoop`], which sequences every episode.
//! - [`reward`] -- raw and normalized reward shaping.
//! - [`curriculum`] -- the success-rate driven difficulty ladder.
//! - [`context`] -- session state and learning events.

pub mod context;
pub mod curriculum;
pub mod pipeline;
pub mod reward;

pub use context::{LearningEvent, SessionContext};
pub use curriculum::{DifficultyLadder, MIN_DIFFICULTY_WINDOW};
pub use pipeline::{EpisodeResult, LearningLoop};
pub use reward::{calculate_normalized_reward, calculate_reward, difficulty_multiplier};
