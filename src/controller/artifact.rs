//! Controller artifacts: rendering templates for a task and compiling the
//! result into a [`CompiledController`].
//!
//! An artifact is a line-oriented `key value` text. Lines starting with `#`
//! are comments and compilation ignores them.

use std::fmt;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::policy::{CompiledController, Controller};
use crate::env::Vec3;
use crate::task::library::{
    TARGET_POSITION_PLACEHOLDER, TASK_DESCRIPTION_PLACEHOLDER, TASK_ID_PLACEHOLDER,
};
use crate::task::TaskParameters;

/// Opaque controller text produced for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControllerArtifact(String);

impl ControllerArtifact {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    /// Substitute the task's target position, id and description into a
    /// template.
    pub fn render(template: &str, task: &TaskParameters) -> Self {
        let [x, y, z] = task.robot_goal.target_position;
        // Keep the artifact line-oriented even if the description is not.
        let description = task.task_description.replace(['\n', '\r'], " ");
        let source = template
            .replace(TARGET_POSITION_PLACEHOLDER, &format!("[{x}, {y}, {z}]"))
            .replace(TASK_ID_PLACEHOLDER, &task.task_id)
            .replace(TASK_DESCRIPTION_PLACEHOLDER, &description);
        Self(source)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ControllerArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

const PLACEHOLDERS: [&str; 3] = [
    TARGET_POSITION_PLACEHOLDER,
    TASK_ID_PLACEHOLDER,
    TASK_DESCRIPTION_PLACEHOLDER,
];

#[derive(Debug, Default)]
struct Fields {
    kind: Option<String>,
    task_id: Option<String>,
    description: Option<String>,
    target: Option<Vec3>,
    gain: Option<f64>,
    damping: Option<f64>,
    tolerance: Option<f64>,
    object: Option<String>,
    timeout: Option<usize>,
}

fn parse_f64(key: &str, value: &str, line_no: usize) -> Result<f64> {
    value
        .parse::<f64>()
        .with_context(|| format!("line {line_no}: invalid number for {key}: {value:?}"))
}

fn parse_vec3(value: &str, line_no: usize) -> Result<Vec3> {
    let inner = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .ok_or_else(|| anyhow!("line {line_no}: target must look like [x, y, z], got {value:?}"))?;
    let parts: Vec<f64> = inner
        .split(',')
        .map(|p| parse_f64("target", p.trim(), line_no))
        .collect::<Result<_>>()?;
    match parts.as_slice() {
        [x, y, z] => Ok([*x, *y, *z]),
        _ => bail!(
            "line {line_no}: target needs 3 components, got {}",
            parts.len()
        ),
    }
}

fn required<T>(field: Option<T>, key: &str, kind: &str) -> Result<T> {
    field.ok_or_else(|| anyhow!("{kind} controller is missing `{key}`"))
}

/// Parse an artifact into a ready-to-run controller.
///
/// Fails with "missing entry symbol" when no `controller` line is present,
/// and with a malformed-artifact error for unknown kinds, unparsable values,
/// unknown keys or a placeholder that was never substituted.
pub fn compile(artifact: &ControllerArtifact) -> Result<CompiledController> {
    let source = artifact.as_str();
    if let Some(p) = PLACEHOLDERS.iter().find(|p| source.contains(**p)) {
        bail!("malformed controller artifact: unsubstituted placeholder {p}");
    }

    let mut fields = Fields::default();
    for (idx, raw) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        // Free-text keys keep their whole value; the rest allow trailing comments.
        let value = match key {
            "task" | "description" => rest,
            _ => rest.split('#').next().unwrap_or("").trim(),
        };

        match key {
            "controller" => fields.kind = Some(value.to_string()),
            "task" => fields.task_id = Some(value.to_string()),
            "description" => fields.description = Some(value.to_string()),
            "target" => fields.target = Some(parse_vec3(value, line_no)?),
            "gain" => fields.gain = Some(parse_f64(key, value, line_no)?),
            "damping" => fields.damping = Some(parse_f64(key, value, line_no)?),
            "tolerance" => fields.tolerance = Some(parse_f64(key, value, line_no)?),
            "object" => fields.object = Some(value.to_string()),
            "timeout" => {
                let t = value.parse::<usize>().with_context(|| {
                    format!("line {line_no}: invalid timeout: {value:?}")
                })?;
                fields.timeout = Some(t);
            }
            other => bail!("malformed controller artifact: line {line_no}: unknown key {other:?}"),
        }
    }

    let kind = fields
        .kind
        .ok_or_else(|| anyhow!("missing entry symbol: artifact has no `controller` line"))?;

    let controller = match kind.as_str() {
        "proportional" => Controller::Proportional {
            gain: required(fields.gain, "gain", &kind)?,
            tolerance: required(fields.tolerance, "tolerance", &kind)?,
        },
        "proportional_derivative" => Controller::ProportionalDerivative {
            gain: required(fields.gain, "gain", &kind)?,
            damping: required(fields.damping, "damping", &kind)?,
            tolerance: required(fields.tolerance, "tolerance", &kind)?,
        },
        "waypoint" => Controller::Waypoint {
            object: required(fields.object, "object", &kind)?,
            gain: required(fields.gain, "gain", &kind)?,
            tolerance: required(fields.tolerance, "tolerance", &kind)?,
            timeout: required(fields.timeout, "timeout", &kind)?,
        },
        other => bail!("malformed controller artifact: unknown controller kind {other:?}"),
    };

    Ok(CompiledController {
        task_id: fields.task_id.unwrap_or_default(),
        description: fields.description.unwrap_or_default(),
        target: required(fields.target, "target", &kind)?,
        controller,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{default_controllers, default_tasks};

    #[test]
    fn test_render_substitutes_placeholders() {
        let task = &default_tasks()[0];
        let artifact = ControllerArtifact::render(&default_controllers()[0], task);
        let text = artifact.as_str();
        assert!(text.contains("target [0.3, 0.3, 0.05]"));
        assert!(text.contains("task mock_task_001"));
        assert!(text.contains("description Move the cube to the green zone."));
        assert!(!text.contains(TASK_ID_PLACEHOLDER));
    }

    #[test]
    fn test_every_default_template_compiles() {
        let task = &default_tasks()[0];
        let kinds: Vec<&str> = default_controllers()
            .iter()
            .map(|t| {
                let compiled = compile(&ControllerArtifact::render(t, task)).unwrap();
                assert_eq!(compiled.target, [0.3, 0.3, 0.05]);
                assert_eq!(compiled.task_id, "mock_task_001");
                compiled.controller.kind()
            })
            .collect();
        assert_eq!(kinds, vec!["proportional", "proportional_derivative", "waypoint"]);
    }

    #[test]
    fn test_compile_reads_parameters() {
        let artifact = ControllerArtifact::new(
            "controller proportional_derivative\n\
             target [1, 2, 3]\n\
             gain 0.5   # kp\n\
             damping 0.1\n\
             tolerance 0.01\n",
        );
        let compiled = compile(&artifact).unwrap();
        assert_eq!(compiled.target, [1.0, 2.0, 3.0]);
        assert_eq!(
            compiled.controller,
            Controller::ProportionalDerivative {
                gain: 0.5,
                damping: 0.1,
                tolerance: 0.01
            }
        );
    }

    #[test]
    fn test_missing_controller_line_is_missing_entry_symbol() {
        let artifact = ControllerArtifact::new("# nothing here\ntarget [0, 0, 0]\n");
        let err = compile(&artifact).unwrap_err();
        assert!(err.to_string().contains("missing entry symbol"));
    }

    #[test]
    fn test_malformed_artifacts_are_rejected() {
        let cases = [
            "controller teleport\ntarget [0, 0, 0]\n",
            "controller proportional\ntarget [0, 0]\ngain 0.1\ntolerance 0.1\n",
            "controller proportional\ntarget [0, 0, 0]\ngain fast\ntolerance 0.1\n",
            "controller proportional\ntarget TARGET_POSITION_PLACEHOLDER\ngain 0.1\ntolerance 0.1\n",
            "controller proportional\ntarget [0, 0, 0]\ngain 0.1\n",
            "controller proportional\ntarget [0, 0, 0]\ngain 0.1\ntolerance 0.1\nspeed 3\n",
        ];
        for case in cases {
            assert!(compile(&ControllerArtifact::new(case)).is_err(), "{case}");
        }
    }
}
