//! End-to-end runs of the learning loop against the mock simulator and
//! generator.

use selfplay::config::SelfPlayConfig;
use selfplay::env::MockSimulator;
use selfplay::model::MockFoundationModel;
use selfplay::selection::{ControllerSelectionMode, TaskSelectionMode, MIN_WEIGHT};
use selfplay::task::Difficulty;
use selfplay::training::LearningLoop;

fn config(
    task_mode: TaskSelectionMode,
    controller_mode: ControllerSelectionMode,
    initial: Difficulty,
) -> SelfPlayConfig {
    let mut config = SelfPlayConfig::default();
    config.groot_n1.seed = Some(2024);
    config.groot_n1.task_selection_mode = task_mode;
    config.groot_n1.controller_selection_mode = controller_mode;
    config.episode.initial_difficulty = initial;
    config.episode.max_episodes = 50;
    config
}

fn build(config: &SelfPlayConfig) -> LearningLoop<MockSimulator, MockFoundationModel> {
    let sim = MockSimulator::with_seed(config.simulation.clone(), 9);
    let model = MockFoundationModel::from_config(config).unwrap();
    LearningLoop::new(config, sim, model)
}

#[tokio::test]
async fn five_successes_promote_easy_to_medium() {
    let config = config(
        TaskSelectionMode::Difficulty,
        ControllerSelectionMode::Sequential,
        Difficulty::Easy,
    );
    let mut lp = build(&config);

    let results = lp.run(Some(4)).await;
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r.execution.success));
    assert!(results.iter().all(|r| r.task.task_type == "pick_and_place"));
    // Below the five-episode floor nothing changes.
    assert_eq!(lp.difficulty(), Difficulty::Easy);

    let results = lp.run(Some(1)).await;
    assert!(results[0].execution.success);
    assert_eq!(results[0].difficulty_after, Difficulty::Medium);
    assert_eq!(lp.difficulty(), Difficulty::Medium);

    let next = lp.run(Some(1)).await;
    assert_eq!(next[0].task.difficulty, Some(Difficulty::Medium));
}

#[tokio::test]
async fn five_failures_demote_hard_to_medium() {
    let mut config = config(
        TaskSelectionMode::Difficulty,
        ControllerSelectionMode::Sequential,
        Difficulty::Hard,
    );
    // Too few steps for any controller to reach the navigation goal.
    config.episode.max_steps_per_episode = 3;
    let mut lp = build(&config);

    let results = lp.run(Some(5)).await;
    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|r| !r.execution.success));
    assert!(results.iter().all(|r| (r.reward + 1.2).abs() < 1e-9));
    assert_eq!(lp.difficulty(), Difficulty::Medium);

    let weights = lp.model().engine().weights();
    assert!(weights.iter().all(|w| *w >= MIN_WEIGHT));
    assert!(lp.model().engine().task_type_controllers("navigation").is_empty());
}

#[tokio::test]
async fn match_task_learns_affinities() {
    let config = config(
        TaskSelectionMode::Sequential,
        ControllerSelectionMode::MatchTask,
        Difficulty::Medium,
    );
    let mut lp = build(&config);

    let results = lp.run(Some(12)).await;
    assert_eq!(results.len(), 12);

    let engine = lp.model().engine();
    // The P-controller template names pick_and_place and always reaches the goal.
    assert!(engine.task_type_controllers("pick_and_place").contains(&0));
    for task_type in ["pick_and_place", "stacking", "navigation"] {
        let set = engine.task_type_controllers(task_type);
        let mut deduped = set.to_vec();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), set.len());
    }
    assert_eq!(engine.summary().feedback_applied, 12);
}

#[tokio::test]
async fn task_ids_are_unique_across_a_run() {
    let config = config(
        TaskSelectionMode::Random,
        ControllerSelectionMode::Random,
        Difficulty::Easy,
    );
    let mut lp = build(&config);
    let results = lp.run(Some(20)).await;
    assert_eq!(results.len(), 20);

    let mut ids = lp.context().previous_task_ids.clone();
    assert_eq!(ids.len(), 20);
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);
}

#[tokio::test]
async fn failed_initialization_runs_nothing() {
    let config = config(
        TaskSelectionMode::Sequential,
        ControllerSelectionMode::Sequential,
        Difficulty::Easy,
    );
    let sim = MockSimulator::with_seed(config.simulation.clone(), 1).fail_initialize(true);
    let model = MockFoundationModel::from_config(&config).unwrap();
    let mut lp = LearningLoop::new(&config, sim, model);

    assert!(lp.run(Some(3)).await.is_empty());
    assert_eq!(lp.episode_count(), 0);
}

#[tokio::test]
async fn results_round_trip_through_json() {
    let config = config(
        TaskSelectionMode::Sequential,
        ControllerSelectionMode::Sequential,
        Difficulty::Easy,
    );
    let mut lp = build(&config);
    let results = lp.run(Some(3)).await;

    let json = serde_json::to_string(&results).unwrap();
    let parsed: Vec<selfplay::training::EpisodeResult> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.len(), 3);
    assert_eq!(parsed[2].task.task_id, results[2].task.task_id);
    assert_eq!(parsed[0].controller_artifact, results[0].controller_artifact);
}
