//! Task data types shared by the selection engine, the executor and the loop.
//!
//! A [`TaskParameters`] value is produced once per episode by the task
//! proposer and treated as immutable afterwards. The only mutation it ever
//! sees is the difficulty-driven range scaling applied at creation time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::env::Vec3;

// ---------------------------------------------------------------------------
// Difficulty ladder
// ---------------------------------------------------------------------------

/// The three rungs of the difficulty ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    /// Parse from a string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }

    /// One rung up, saturating at `Hard`.
    pub fn harder(self) -> Self {
        match self {
            Self::Easy => Self::Medium,
            Self::Medium | Self::Hard => Self::Hard,
        }
    }

    /// One rung down, saturating at `Easy`.
    pub fn easier(self) -> Self {
        match self {
            Self::Easy | Self::Medium => Self::Easy,
            Self::Hard => Self::Medium,
        }
    }

    /// Factor applied to the half-width of every randomization range.
    pub fn range_factor(self) -> f64 {
        match self {
            Self::Easy => 0.5,
            Self::Medium => 1.0,
            Self::Hard => 1.5,
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Easy
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Domain randomization
// ---------------------------------------------------------------------------

/// A single domain-randomization entry: either numeric bounds or a label
/// understood by the backend (e.g. `"friction_level": "high"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RandomizationValue {
    Numeric(Vec<f64>),
    Label(String),
}

impl RandomizationValue {
    /// The `[min, max]` pair when this entry is a two-element numeric range.
    pub fn as_range(&self) -> Option<(f64, f64)> {
        match self {
            Self::Numeric(v) if v.len() == 2 => Some((v[0], v[1])),
            _ => None,
        }
    }
}

/// Mapping of physics parameter name to its randomization entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RandomizationSettings(BTreeMap<String, RandomizationValue>);

impl RandomizationSettings {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: RandomizationValue) {
        self.0.insert(key.into(), value);
    }

    /// Convenience insert for a numeric `[min, max]` range.
    pub fn insert_range(&mut self, key: impl Into<String>, min: f64, max: f64) {
        self.insert(key, RandomizationValue::Numeric(vec![min, max]));
    }

    pub fn get(&self, key: &str) -> Option<&RandomizationValue> {
        self.0.get(key)
    }

    /// The `[min, max]` pair for `key`, if it is a two-element range.
    pub fn range(&self, key: &str) -> Option<(f64, f64)> {
        self.0.get(key).and_then(RandomizationValue::as_range)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RandomizationValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rescale every two-element range around its midpoint.
    ///
    /// `factor < 1` contracts, `factor > 1` expands. Labels and numeric
    /// entries of any other length are left untouched.
    pub fn scale_ranges(&mut self, factor: f64) {
        if factor == 1.0 {
            return;
        }
        for value in self.0.values_mut() {
            if let RandomizationValue::Numeric(bounds) = value {
                if bounds.len() != 2 {
                    continue;
                }
                let (min, max) = (bounds[0], bounds[1]);
                let mid = (min + max) / 2.0;
                bounds[0] = mid - (mid - min) * factor;
                bounds[1] = mid + (max - mid) * factor;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Scene and goal
// ---------------------------------------------------------------------------

/// An object spawned into the scene for a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub position: Vec3,
    #[serde(default)]
    pub size: Option<Vec3>,
    #[serde(default)]
    pub color: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub objects_to_spawn: Vec<SceneObject>,
}

impl SceneConfig {
    /// Look up a spawned object by name.
    pub fn object(&self, name: &str) -> Option<&SceneObject> {
        self.objects_to_spawn.iter().find(|o| o.name == name)
    }
}

/// Desired final placement of a named object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPlacement {
    pub name: String,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotGoal {
    pub target_position: Vec3,
    #[serde(default)]
    pub target_object: Option<String>,
    #[serde(default)]
    pub target_configuration: Vec<ObjectPlacement>,
}

/// How the robot for a task should be spawned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotConfig {
    #[serde(default = "default_robot_name")]
    pub name: String,
    #[serde(rename = "type", default = "default_robot_type")]
    pub robot_type: String,
    #[serde(default)]
    pub position: Vec3,
}

fn default_robot_name() -> String {
    "default_robot".into()
}

fn default_robot_type() -> String {
    "ur10".into()
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            name: default_robot_name(),
            robot_type: default_robot_type(),
            position: [0.0, 0.0, 0.0],
        }
    }
}

// ---------------------------------------------------------------------------
// Task parameters
// ---------------------------------------------------------------------------

/// Everything the loop needs to know about the task of one episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskParameters {
    pub task_id: String,
    pub task_description: String,
    pub task_type: String,
    /// Absent difficulty disables the reward multiplier.
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub scene_config: SceneConfig,
    pub robot_goal: RobotGoal,
    #[serde(default)]
    pub robot_config: RobotConfig,
    #[serde(default)]
    pub domain_randomization_settings: RandomizationSettings,
    #[serde(default)]
    pub success_criteria_description: String,
}

impl TaskParameters {
    /// Difficulty used for library matching; unlabeled tasks count as medium.
    pub fn difficulty_or_medium(&self) -> Difficulty {
        self.difficulty.unwrap_or(Difficulty::Medium)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_ladder_saturates() {
        assert_eq!(Difficulty::Easy.harder(), Difficulty::Medium);
        assert_eq!(Difficulty::Medium.harder(), Difficulty::Hard);
        assert_eq!(Difficulty::Hard.harder(), Difficulty::Hard);
        assert_eq!(Difficulty::Hard.easier(), Difficulty::Medium);
        assert_eq!(Difficulty::Medium.easier(), Difficulty::Easy);
        assert_eq!(Difficulty::Easy.easier(), Difficulty::Easy);
    }

    #[test]
    fn test_difficulty_parse() {
        assert_eq!(Difficulty::from_str_loose(" HARD "), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_str_loose("extreme"), None);
        assert_eq!(Difficulty::Medium.to_string(), "medium");
    }

    #[test]
    fn test_scale_ranges_contracts_and_expands() {
        let mut settings = RandomizationSettings::new();
        settings.insert_range("gravity", -10.0, -9.0);
        settings.insert("friction_level", RandomizationValue::Label("high".into()));
        settings.insert("offsets", RandomizationValue::Numeric(vec![1.0, 2.0, 3.0]));

        let mut easy = settings.clone();
        easy.scale_ranges(Difficulty::Easy.range_factor());
        let (lo, hi) = easy.range("gravity").unwrap();
        assert!((lo - (-9.75)).abs() < 1e-9);
        assert!((hi - (-9.25)).abs() < 1e-9);

        let mut hard = settings.clone();
        hard.scale_ranges(Difficulty::Hard.range_factor());
        let (lo, hi) = hard.range("gravity").unwrap();
        assert!((lo - (-10.25)).abs() < 1e-9);
        assert!((hi - (-8.75)).abs() < 1e-9);

        // Non-range entries are untouched.
        assert_eq!(hard.get("friction_level"), settings.get("friction_level"));
        assert_eq!(hard.get("offsets"), settings.get("offsets"));
    }

    #[test]
    fn test_randomization_settings_json_shape() {
        let json = r#"{"gravity": [-10.0, -9.8], "friction_level": "medium"}"#;
        let settings: RandomizationSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.range("gravity"), Some((-10.0, -9.8)));
        assert_eq!(
            settings.get("friction_level"),
            Some(&RandomizationValue::Label("medium".into()))
        );
    }

    #[test]
    fn test_robot_config_defaults() {
        let cfg: RobotConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.name, "default_robot");
        assert_eq!(cfg.robot_type, "ur10");
        assert_eq!(cfg.position, [0.0, 0.0, 0.0]);
    }
}
