//! Recipe (spec §3) — the parsed, normalized YAML document.

use crate::step::Step;
use crate::variable::VariableDecl;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_category() -> String {
    "general".to_string()
}

/// One entry of the recipe-level `dependencies` list — another recipe to
/// pre-load before this one runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDependency {
    pub name: String,
    #[serde(default)]
    pub optional: bool,
}

/// Recipe-level hook scripts (ambient addition, spec §4.5 / SPEC_FULL §4.5
/// — the host's prompt-guard pattern: a named command run at a lifecycle
/// point, best-effort, never blocking).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hook {
    pub name: String,
    pub command: String,
    #[serde(default = "default_hook_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_hook_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hooks {
    #[serde(default)]
    pub before_recipe: Vec<Hook>,
    #[serde(default)]
    pub after_recipe: Vec<Hook>,
}

/// A fully-parsed, normalized recipe document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub variables: HashMap<String, VariableDecl>,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub provides: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<RecipeDependency>,
    #[serde(default)]
    pub on_success: Option<String>,
    #[serde(default)]
    pub on_error: Option<String>,
    #[serde(default)]
    pub outputs: HashMap<String, String>,
    #[serde(default)]
    pub hooks: Hooks,
    #[serde(default)]
    pub settings: HashMap<String, serde_json::Value>,
}

/// A single structural validation problem (spec §4.5 `validateRecipe`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub message: String,
}

impl Recipe {
    /// Pure, IO-free structural checks: duplicate step names, unknown
    /// `dependsOn` targets, empty `steps`, missing `name`. Deeper checks
    /// that require the project filesystem or the tool registry live in
    /// `recipe-engine::validate`.
    pub fn structural_errors(&self) -> Vec<ValidationIssue> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(ValidationIssue {
                message: "recipe name is required".into(),
            });
        }

        if self.steps.is_empty() {
            errors.push(ValidationIssue {
                message: "recipe must declare at least one step".into(),
            });
        }

        let mut seen = HashSet::new();
        collect_name_duplicates(&self.steps, &mut seen, &mut errors);

        let all_names = collect_all_names(&self.steps);
        check_depends_on_targets(&self.steps, &all_names, &mut errors);

        errors
    }
}

fn collect_name_duplicates(
    steps: &[Step],
    seen: &mut HashSet<String>,
    errors: &mut Vec<ValidationIssue>,
) {
    for step in steps {
        if !seen.insert(step.name.clone()) {
            errors.push(ValidationIssue {
                message: format!("duplicate step name '{}'", step.name),
            });
        }
        if let Some(nested) = step.payload.nested_steps() {
            collect_name_duplicates(nested, seen, errors);
        }
    }
}

fn collect_all_names(steps: &[Step]) -> HashSet<String> {
    let mut names = HashSet::new();
    fn walk(steps: &[Step], names: &mut HashSet<String>) {
        for step in steps {
            names.insert(step.name.clone());
            if let Some(nested) = step.payload.nested_steps() {
                walk(nested, names);
            }
        }
    }
    walk(steps, &mut names);
    names
}

fn check_depends_on_targets(
    steps: &[Step],
    all_names: &HashSet<String>,
    errors: &mut Vec<ValidationIssue>,
) {
    for step in steps {
        for target in &step.depends_on {
            if !all_names.contains(target) {
                errors.push(ValidationIssue {
                    message: format!(
                        "step '{}' depends on unknown step '{}'",
                        step.name, target
                    ),
                });
            }
        }
        if let Some(nested) = step.payload.nested_steps() {
            check_depends_on_targets(nested, all_names, errors);
        }
    }
}
