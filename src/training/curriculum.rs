//! The difficulty ladder driven by the rolling success rate.

use serde::{Deserialize, Serialize};

use super::context::LearningEvent;
use crate::config::LearningConfig;
use crate::task::Difficulty;

/// Fewest episodes of history before difficulty may change.
pub const MIN_DIFFICULTY_WINDOW: usize = 5;

/// Promotes or demotes difficulty from the success rate of the last
/// `window` episodes. No transition happens before `window` episodes exist,
/// and the window never drops below [`MIN_DIFFICULTY_WINDOW`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyLadder {
    pub window: usize,
    pub promote_threshold: f64,
    pub demote_threshold: f64,
}

impl Default for DifficultyLadder {
    fn default() -> Self {
        Self {
            window: MIN_DIFFICULTY_WINDOW,
            promote_threshold: 0.8,
            demote_threshold: 0.2,
        }
    }
}

impl From<&LearningConfig> for DifficultyLadder {
    fn from(config: &LearningConfig) -> Self {
        Self {
            window: config.difficulty_window,
            promote_threshold: config.promote_threshold,
            demote_threshold: config.demote_threshold,
        }
    }
}

impl DifficultyLadder {
    /// The effective window length.
    pub fn window(&self) -> usize {
        self.window.max(MIN_DIFFICULTY_WINDOW)
    }

    /// Success rate over the trailing window, or `None` below the floor.
    pub fn success_rate(&self, history: &[LearningEvent]) -> Option<f64> {
        let window = self.window();
        if history.len() < window {
            return None;
        }
        let recent = &history[history.len() - window..];
        let successes = recent.iter().filter(|e| e.success).count();
        Some(successes as f64 / window as f64)
    }

    /// The difficulty to use after `history`, starting from `current`.
    pub fn next(&self, current: Difficulty, history: &[LearningEvent]) -> Difficulty {
        match self.success_rate(history) {
            Some(rate) if rate > self.promote_threshold => current.harder(),
            Some(rate) if rate < self.demote_threshold => current.easier(),
            _ => current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn history(outcomes: &[bool]) -> Vec<LearningEvent> {
        outcomes
            .iter()
            .map(|&success| LearningEvent {
                task_id: "t".into(),
                task_description: String::new(),
                success,
                score: 0.0,
                timestamp: Utc::now(),
                reward: None,
            })
            .collect()
    }

    #[test]
    fn test_no_transition_below_window() {
        let ladder = DifficultyLadder::default();
        let h = history(&[true; 4]);
        assert_eq!(ladder.success_rate(&h), None);
        assert_eq!(ladder.next(Difficulty::Easy, &h), Difficulty::Easy);
    }

    #[test]
    fn test_short_window_is_raised_to_floor() {
        let ladder = DifficultyLadder {
            window: 1,
            ..DifficultyLadder::default()
        };
        assert_eq!(ladder.window(), MIN_DIFFICULTY_WINDOW);
        let h = history(&[true; 4]);
        assert_eq!(ladder.next(Difficulty::Easy, &h), Difficulty::Easy);
        let h = history(&[true; 5]);
        assert_eq!(ladder.next(Difficulty::Easy, &h), Difficulty::Medium);
    }

    #[test]
    fn test_promotes_on_perfect_window() {
        let ladder = DifficultyLadder::default();
        let h = history(&[true; 5]);
        assert_eq!(ladder.next(Difficulty::Easy, &h), Difficulty::Medium);
        assert_eq!(ladder.next(Difficulty::Medium, &h), Difficulty::Hard);
        assert_eq!(ladder.next(Difficulty::Hard, &h), Difficulty::Hard);
    }

    #[test]
    fn test_exactly_threshold_does_not_promote() {
        let ladder = DifficultyLadder::default();
        // 4/5 = 0.8 is not strictly above the promote threshold.
        let h = history(&[true, true, false, true, true]);
        assert_eq!(ladder.next(Difficulty::Easy, &h), Difficulty::Easy);
    }

    #[test]
    fn test_demotes_on_failures() {
        let ladder = DifficultyLadder::default();
        let h = history(&[false; 5]);
        assert_eq!(ladder.next(Difficulty::Hard, &h), Difficulty::Medium);
        assert_eq!(ladder.next(Difficulty::Easy, &h), Difficulty::Easy);
        // 1/5 = 0.2 sits inside the hysteresis band.
        let h = history(&[false, false, true, false, false]);
        assert_eq!(ladder.next(Difficulty::Hard, &h), Difficulty::Hard);
    }

    #[test]
    fn test_only_trailing_window_counts() {
        let ladder = DifficultyLadder::default();
        let mut outcomes = vec![false; 10];
        outcomes.extend([true; 5]);
        assert_eq!(ladder.next(Difficulty::Medium, &history(&outcomes)), Difficulty::Hard);
    }
}
