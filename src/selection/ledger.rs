//! Cumulative performance bookkeeping per controller.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Running totals for one controller (or one controller on one task type).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub total_reward: f64,
    pub count: usize,
    pub success_count: usize,
}

impl PerformanceStats {
    pub fn record(&mut self, reward: f64) {
        self.total_reward += reward;
        self.count += 1;
        if reward > 0.0 {
            self.success_count += 1;
        }
    }

    /// Mean reward, or `None` before the first record.
    pub fn mean_reward(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total_reward / self.count as f64)
    }

    pub fn success_rate(&self) -> Option<f64> {
        (self.count > 0).then(|| self.success_count as f64 / self.count as f64)
    }
}

/// Overall and per-task-type performance of a single controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerPerformanceRecord {
    pub overall: PerformanceStats,
    pub by_task_type: HashMap<String, PerformanceStats>,
}

impl ControllerPerformanceRecord {
    pub fn record(&mut self, task_type: &str, reward: f64) {
        self.overall.record(reward);
        self.by_task_type
            .entry(task_type.to_string())
            .or_default()
            .record(reward);
    }

    pub fn for_task_type(&self, task_type: &str) -> Option<&PerformanceStats> {
        self.by_task_type.get(task_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_updates_overall_and_task_type() {
        let mut rec = ControllerPerformanceRecord::default();
        rec.record("stacking", 1.5);
        rec.record("stacking", -1.0);
        rec.record("navigation", 0.5);

        assert_eq!(rec.overall.count, 3);
        assert_eq!(rec.overall.success_count, 2);
        assert!((rec.overall.total_reward - 1.0).abs() < 1e-9);

        let stacking = rec.for_task_type("stacking").unwrap();
        assert_eq!(stacking.count, 2);
        assert_eq!(stacking.success_count, 1);
        assert!((stacking.mean_reward().unwrap() - 0.25).abs() < 1e-9);
        assert!(rec.for_task_type("pick_and_place").is_none());
    }

    #[test]
    fn test_empty_stats_have_no_mean() {
        let stats = PerformanceStats::default();
        assert!(stats.mean_reward().is_none());
        assert!(stats.success_rate().is_none());
    }
}
