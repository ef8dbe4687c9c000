//! Step (tagged union by `tool`) — spec §3.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// The closed set of tool types a step's `tool` field may name (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolType {
    Template,
    Action,
    Codemod,
    Recipe,
    Shell,
    Prompt,
    Sequence,
    Parallel,
    Ai,
    Install,
    Query,
    Patch,
    EnsureDirs,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Action => "action",
            Self::Codemod => "codemod",
            Self::Recipe => "recipe",
            Self::Shell => "shell",
            Self::Prompt => "prompt",
            Self::Sequence => "sequence",
            Self::Parallel => "parallel",
            Self::Ai => "ai",
            Self::Install => "install",
            Self::Query => "query",
            Self::Patch => "patch",
            Self::EnsureDirs => "ensure-dirs",
        }
    }
}

impl std::fmt::Display for ToolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Exponential-backoff retry budget for a step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default)]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

fn default_backoff_factor() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            backoff_factor: default_backoff_factor(),
        }
    }
}

fn default_parallel() -> bool {
    true
}

/// Tool-specific payload, tagged by the `tool` field (data-enum pattern —
/// a fixed, closed set of tool types, not open-world subclassing).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "kebab-case")]
pub enum StepPayload {
    Template {
        source: String,
        destination: String,
        #[serde(default)]
        vars: Map<String, Value>,
    },
    Action {
        name: String,
        #[serde(default)]
        args: Map<String, Value>,
    },
    Codemod {
        transform: String,
        target: String,
        #[serde(default)]
        args: Map<String, Value>,
    },
    Recipe {
        name: String,
        #[serde(default)]
        variable_overrides: Map<String, Value>,
    },
    Shell {
        command: String,
        #[serde(default)]
        cwd: Option<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
    Prompt {
        message: String,
        #[serde(default)]
        prompt_type: Option<String>,
        #[serde(default)]
        choices: Vec<String>,
    },
    Sequence {
        steps: Vec<Step>,
    },
    Parallel {
        steps: Vec<Step>,
    },
    Ai {
        key: String,
        prompt: String,
        #[serde(default)]
        contexts: Vec<String>,
        #[serde(default)]
        examples: Vec<String>,
        #[serde(default)]
        output_description: Option<String>,
    },
    Install {
        packages: Vec<String>,
        #[serde(default)]
        manager: Option<String>,
    },
    Query {
        expression: String,
    },
    Patch {
        target: String,
        #[serde(default)]
        find: Option<String>,
        #[serde(default)]
        replace: Option<String>,
        #[serde(default)]
        diff: Option<String>,
    },
    EnsureDirs {
        paths: Vec<String>,
    },
}

impl StepPayload {
    pub fn tool_type(&self) -> ToolType {
        match self {
            Self::Template { .. } => ToolType::Template,
            Self::Action { .. } => ToolType::Action,
            Self::Codemod { .. } => ToolType::Codemod,
            Self::Recipe { .. } => ToolType::Recipe,
            Self::Shell { .. } => ToolType::Shell,
            Self::Prompt { .. } => ToolType::Prompt,
            Self::Sequence { .. } => ToolType::Sequence,
            Self::Parallel { .. } => ToolType::Parallel,
            Self::Ai { .. } => ToolType::Ai,
            Self::Install { .. } => ToolType::Install,
            Self::Query { .. } => ToolType::Query,
            Self::Patch { .. } => ToolType::Patch,
            Self::EnsureDirs { .. } => ToolType::EnsureDirs,
        }
    }

    /// `sequence`/`parallel` are container steps — the single source of
    /// truth the nested-step-counting rule (spec §9) hangs off of.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Sequence { .. } | Self::Parallel { .. })
    }

    pub fn nested_steps(&self) -> Option<&[Step]> {
        match self {
            Self::Sequence { steps } | Self::Parallel { steps } => Some(steps),
            _ => None,
        }
    }
}

/// A single unit of work in a recipe (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default)]
    pub skip_if: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub retries: Option<RetryPolicy>,
    #[serde(default)]
    pub continue_on_error: Option<bool>,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default)]
    pub variable_overrides: Map<String, Value>,
    #[serde(default)]
    pub output: HashMap<String, String>,
    #[serde(flatten)]
    pub payload: StepPayload,
}

impl Step {
    pub fn tool_type(&self) -> ToolType {
        self.payload.tool_type()
    }

    pub fn is_container(&self) -> bool {
        self.payload.is_container()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell_step(name: &str, depends_on: &[&str]) -> Step {
        Step {
            name: name.into(),
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            when: None,
            skip_if: None,
            timeout_ms: None,
            retries: None,
            continue_on_error: None,
            parallel: true,
            variable_overrides: Map::new(),
            output: HashMap::new(),
            payload: StepPayload::Shell {
                command: "true".into(),
                cwd: None,
                env: HashMap::new(),
            },
        }
    }

    #[test]
    fn tool_type_matches_payload_variant() {
        let step = shell_step("s1", &[]);
        assert_eq!(step.tool_type(), ToolType::Shell);
        assert!(!step.is_container());
    }

    #[test]
    fn sequence_is_container_with_nested_steps() {
        let nested = vec![shell_step("inner", &[])];
        let payload = StepPayload::Sequence {
            steps: nested.clone(),
        };
        assert!(payload.is_container());
        assert_eq!(payload.nested_steps().unwrap().len(), 1);
    }

    #[test]
    fn tool_type_round_trips_through_tagged_json() {
        let value = serde_json::json!({
            "tool": "ensure-dirs",
            "paths": ["a", "b"],
        });
        let payload: StepPayload = serde_json::from_value(value).expect("payload parses");
        assert_eq!(payload.tool_type(), ToolType::EnsureDirs);
    }
}
