//! Mutable session state carried across episodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::Difficulty;

/// One completed episode as remembered by the learning loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningEvent {
    pub task_id: String,
    pub task_description: String,
    pub success: bool,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
    /// Raw reward, absent for events recorded before reward computation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<f64>,
}

/// The context the proposer sees and the loop mutates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionContext {
    pub difficulty_level: Difficulty,
    /// Task ids of every completed episode, in order.
    pub previous_task_ids: Vec<String>,
    pub learning_history: Vec<LearningEvent>,
}

impl SessionContext {
    pub fn new(difficulty_level: Difficulty) -> Self {
        Self {
            difficulty_level,
            ..Self::default()
        }
    }

    pub fn record_task(&mut self, task_id: &str) {
        self.previous_task_ids.push(task_id.to_string());
    }

    pub fn record_event(&mut self, event: LearningEvent) {
        self.learning_history.push(event);
    }

    /// The last `n` events (fewer if the history is shorter).
    pub fn recent_events(&self, n: usize) -> &[LearningEvent] {
        let start = self.learning_history.len().saturating_sub(n);
        &self.learning_history[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(success: bool) -> LearningEvent {
        LearningEvent {
            task_id: "t".into(),
            task_description: "d".into(),
            success,
            score: if success { 1.0 } else { 0.0 },
            timestamp: Utc::now(),
            reward: None,
        }
    }

    #[test]
    fn test_recent_events_window() {
        let mut ctx = SessionContext::new(Difficulty::Easy);
        assert!(ctx.recent_events(5).is_empty());
        for i in 0..7 {
            ctx.record_event(event(i % 2 == 0));
        }
        let recent = ctx.recent_events(5);
        assert_eq!(recent.len(), 5);
        assert!(recent[0].success);
        assert!(!recent[1].success);
        assert_eq!(ctx.recent_events(50).len(), 7);
    }

    #[test]
    fn test_event_omits_missing_reward() {
        let json = serde_json::to_value(event(true)).unwrap();
        assert!(json.get("reward").is_none());
        let mut with_reward = event(true);
        with_reward.reward = Some(1.5);
        let json = serde_json::to_value(&with_reward).unwrap();
        assert_eq!(json["reward"], 1.5);
    }
}
