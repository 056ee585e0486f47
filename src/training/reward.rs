//! Reward shaping for executed controllers.
//!
//! The raw reward is a success/failure base of ±1 plus efficiency bonuses
//! earned only on success:
//!
//!   r = (base + time_bonus + path_bonus + energy_bonus) * difficulty_multiplier
//!
//! where `time_bonus = min(0.5, 5 / max(1, t))`, `path_bonus = 0.3 * path`
//! and `energy_bonus = 0.2 * energy`. A bonus is skipped when its metric was
//! not measured. The multiplier scales the whole sum, base included.

use tracing::debug;

use crate::controller::ExecutionResult;
use crate::task::{Difficulty, TaskParameters};

/// Reward multiplier for a task's difficulty.
pub fn difficulty_multiplier(difficulty: Difficulty) -> f64 {
    match difficulty {
        Difficulty::Easy => 0.8,
        Difficulty::Medium => 1.0,
        Difficulty::Hard => 1.2,
    }
}

/// Raw (unbounded) reward for one execution.
pub fn calculate_reward(result: &ExecutionResult, task: Option<&TaskParameters>) -> f64 {
    let base = if result.success { 1.0 } else { -1.0 };
    let mut total = base;

    if result.success {
        let m = &result.metrics;
        if let Some(t) = m.time_to_completion {
            total += (5.0 / t.max(1.0)).min(0.5);
        }
        if let Some(path) = m.path_efficiency {
            total += path * 0.3;
        }
        if let Some(energy) = m.energy_efficiency {
            total += energy * 0.2;
        }
    }

    if let Some(difficulty) = task.and_then(|t| t.difficulty) {
        total *= difficulty_multiplier(difficulty);
    }

    debug!(reward = total, base, "Calculated reward");
    total
}

/// `tanh` of the raw reward: bounded to (-1, 1), sign and order preserved.
pub fn calculate_normalized_reward(result: &ExecutionResult, task: Option<&TaskParameters>) -> f64 {
    calculate_reward(result, task).tanh()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ExecutionMetrics;
    use crate::task::default_tasks;

    fn success(time: f64, path: f64, energy: f64) -> ExecutionResult {
        ExecutionResult {
            success: true,
            metrics: ExecutionMetrics {
                time_to_completion: Some(time),
                steps_to_completion: Some(10),
                path_efficiency: Some(path),
                energy_efficiency: Some(energy),
            },
        }
    }

    fn task_at(difficulty: Option<Difficulty>) -> TaskParameters {
        let mut task = default_tasks().remove(0);
        task.difficulty = difficulty;
        task
    }

    #[test]
    fn test_failure_is_minus_one_regardless_of_metrics() {
        let mut result = success(0.5, 1.0, 1.0);
        result.success = false;
        assert!((calculate_reward(&result, None) + 1.0).abs() < 1e-9);
        assert!((calculate_reward(&ExecutionResult::failed(), None) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_success_bonuses() {
        // 1 + min(0.5, 5/10) + 0.9*0.3 + 0.8*0.2
        let r = calculate_reward(&success(10.0, 0.9, 0.8), None);
        assert!((r - 1.93).abs() < 1e-9);

        // Slow runs get a smaller time bonus: 5/20 = 0.25.
        let r = calculate_reward(&success(20.0, 1.0, 0.8), None);
        assert!((r - 1.71).abs() < 1e-9);

        // Fast runs hit the 0.5 time cap: 1 + 0.5 + 0.8*0.3 + 0.7*0.2
        let r = calculate_reward(&success(2.5, 0.8, 0.7), None);
        assert!((r - 1.88).abs() < 1e-9);
    }

    #[test]
    fn test_missing_metrics_earn_no_bonus() {
        let result = ExecutionResult {
            success: true,
            metrics: ExecutionMetrics::default(),
        };
        assert!((calculate_reward(&result, None) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_difficulty_scales_whole_sum() {
        let result = success(0.1, 1.0, 0.8);
        // 1 + 0.5 + 0.3 + 0.16 = 1.96
        let easy = calculate_reward(&result, Some(&task_at(Some(Difficulty::Easy))));
        let medium = calculate_reward(&result, Some(&task_at(Some(Difficulty::Medium))));
        let hard = calculate_reward(&result, Some(&task_at(Some(Difficulty::Hard))));
        let none = calculate_reward(&result, Some(&task_at(None)));
        assert!((easy - 1.96 * 0.8).abs() < 1e-9);
        assert!((medium - 1.96).abs() < 1e-9);
        assert!((hard - 1.96 * 1.2).abs() < 1e-9);
        assert!((none - 1.96).abs() < 1e-9);
        assert!(easy < medium && medium < hard);

        // The base penalty is scaled too.
        let fail = calculate_reward(&ExecutionResult::failed(), Some(&task_at(Some(Difficulty::Hard))));
        assert!((fail + 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_normalized_reward_is_bounded_and_monotonic() {
        let results = [
            ExecutionResult::failed(),
            success(100.0, 0.0, 0.0),
            success(20.0, 0.5, 0.5),
            success(1.0, 1.0, 1.0),
        ];
        let task = task_at(Some(Difficulty::Hard));
        let mut previous = f64::NEG_INFINITY;
        for r in &results {
            let n = calculate_normalized_reward(r, Some(&task));
            assert!(n > -1.0 && n < 1.0);
            assert!(n > previous);
            assert!((n - calculate_reward(r, Some(&task)).tanh()).abs() < 1e-12);
            previous = n;
        }
    }
}
