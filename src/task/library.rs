//! Built-in task and controller template libraries.
//!
//! These are the predefined choices the selection engine picks from when no
//! custom library is supplied. Templates are never mutated: every proposal
//! works on a clone.

use crate::env::Vec3;

use super::types::{
    Difficulty, ObjectPlacement, RandomizationSettings, RandomizationValue, RobotConfig,
    RobotGoal, SceneConfig, SceneObject, TaskParameters,
};

/// Placeholder replaced by the task's `[x, y, z]` target position.
pub const TARGET_POSITION_PLACEHOLDER: &str = "TARGET_POSITION_PLACEHOLDER";
/// Placeholder replaced by the task id.
pub const TASK_ID_PLACEHOLDER: &str = "TASK_ID_PLACEHOLDER";
/// Placeholder replaced by the task description.
pub const TASK_DESCRIPTION_PLACEHOLDER: &str = "TASK_DESCRIPTION_PLACEHOLDER";

fn object(name: &str, kind: &str, position: Vec3, size: Vec3) -> SceneObject {
    SceneObject {
        name: name.into(),
        kind: kind.into(),
        position,
        size: Some(size),
        color: None,
    }
}

fn zone(name: &str, position: Vec3, color: [f64; 4]) -> SceneObject {
    SceneObject {
        name: name.into(),
        kind: "zone".into(),
        position,
        size: Some([0.1, 0.1, 0.001]),
        color: Some(color.to_vec()),
    }
}

/// The default task library: one task per difficulty rung.
pub fn default_tasks() -> Vec<TaskParameters> {
    let mut pick_rand = RandomizationSettings::new();
    pick_rand.insert_range("gravity", -10.0, -9.8);
    pick_rand.insert("friction_level", RandomizationValue::Label("medium".into()));
    pick_rand.insert_range("cube_mass", 0.1, 0.2);

    let mut stack_rand = RandomizationSettings::new();
    stack_rand.insert_range("gravity", -10.0, -9.5);
    stack_rand.insert("friction_level", RandomizationValue::Label("high".into()));
    stack_rand.insert_range("block_mass", 0.05, 0.15);

    let mut nav_rand = RandomizationSettings::new();
    nav_rand.insert_range("gravity", -10.0, -9.0);
    nav_rand.insert("friction_level", RandomizationValue::Label("random".into()));
    nav_rand.insert_range("obstacle_positions", 0.05, 0.1);

    vec![
        TaskParameters {
            task_id: "mock_task_001".into(),
            task_description: "Move the cube to the green zone.".into(),
            task_type: "pick_and_place".into(),
            difficulty: Some(Difficulty::Easy),
            scene_config: SceneConfig {
                objects_to_spawn: vec![
                    object("cube", "box", [0.0, 0.0, 0.0], [0.05, 0.05, 0.05]),
                    zone("green_zone", [0.3, 0.3, 0.0], [0.0, 1.0, 0.0, 0.5]),
                ],
            },
            robot_goal: RobotGoal {
                target_position: [0.3, 0.3, 0.05],
                target_object: Some("cube".into()),
                target_configuration: Vec::new(),
            },
            robot_config: RobotConfig::default(),
            domain_randomization_settings: pick_rand,
            success_criteria_description:
                "Cube is within 0.05m of the center of the green zone.".into(),
        },
        TaskParameters {
            task_id: "mock_task_002".into(),
            task_description: "Stack three blocks in a tower.".into(),
            task_type: "stacking".into(),
            difficulty: Some(Difficulty::Medium),
            scene_config: SceneConfig {
                objects_to_spawn: vec![
                    object("block_1", "box", [0.1, 0.1, 0.0], [0.05, 0.05, 0.05]),
                    object("block_2", "box", [-0.1, 0.1, 0.0], [0.05, 0.05, 0.05]),
                    object("block_3", "box", [0.0, -0.1, 0.0], [0.05, 0.05, 0.05]),
                    zone("target_zone", [0.0, 0.0, 0.0], [1.0, 0.0, 0.0, 0.5]),
                ],
            },
            robot_goal: RobotGoal {
                target_position: [0.0, 0.0, 0.15],
                target_object: None,
                target_configuration: vec![
                    ObjectPlacement {
                        name: "block_1".into(),
                        position: [0.0, 0.0, 0.0],
                    },
                    ObjectPlacement {
                        name: "block_2".into(),
                        position: [0.0, 0.0, 0.05],
                    },
                    ObjectPlacement {
                        name: "block_3".into(),
                        position: [0.0, 0.0, 0.1],
                    },
                ],
            },
            robot_config: RobotConfig::default(),
            domain_randomization_settings: stack_rand,
            success_criteria_description:
                "All three blocks are stacked on top of each other within the target zone."
                    .into(),
        },
        TaskParameters {
            task_id: "mock_task_003".into(),
            task_description: "Navigate through an obstacle course to reach the goal.".into(),
            task_type: "navigation".into(),
            difficulty: Some(Difficulty::Hard),
            scene_config: SceneConfig {
                objects_to_spawn: vec![
                    object("obstacle_1", "box", [0.2, 0.2, 0.0], [0.1, 0.1, 0.2]),
                    object("obstacle_2", "box", [0.4, 0.0, 0.0], [0.1, 0.3, 0.2]),
                    object("obstacle_3", "box", [0.6, 0.3, 0.0], [0.1, 0.1, 0.2]),
                    zone("goal_zone", [0.8, 0.0, 0.0], [0.0, 0.0, 1.0, 0.5]),
                ],
            },
            robot_goal: RobotGoal {
                target_position: [0.8, 0.0, 0.0],
                target_object: None,
                target_configuration: Vec::new(),
            },
            robot_config: RobotConfig::default(),
            domain_randomization_settings: nav_rand,
            success_criteria_description:
                "Robot reaches the goal zone without colliding with obstacles.".into(),
        },
    ]
}

/// The default controller templates, indexed by position.
///
/// Comment lines double as the text the `match_task` selection mode searches
/// for a task type.
pub fn default_controllers() -> Vec<String> {
    vec![
        "\
controller proportional
# Simple P-controller for reaching and pick_and_place tasks.
task TASK_ID_PLACEHOLDER
description TASK_DESCRIPTION_PLACEHOLDER
target TARGET_POSITION_PLACEHOLDER
gain 0.1
tolerance 0.05
"
        .to_string(),
        "\
controller proportional_derivative
# PD-controller for manipulation and stacking tasks.
task TASK_ID_PLACEHOLDER
description TASK_DESCRIPTION_PLACEHOLDER
target TARGET_POSITION_PLACEHOLDER
gain 0.2
damping 0.05
tolerance 0.03
"
        .to_string(),
        "\
controller waypoint
# State machine controller for multi-stage grasp and place tasks.
task TASK_ID_PLACEHOLDER
description TASK_DESCRIPTION_PLACEHOLDER
target TARGET_POSITION_PLACEHOLDER
object cube
gain 0.15
tolerance 0.02
timeout 1000
"
        .to_string(),
    ]
}
