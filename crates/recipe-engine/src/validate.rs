//! `validateRecipe` (spec §4.5): structural checks plus the deeper checks
//! that need the project filesystem or a way to pre-load declared
//! recipe-level dependencies — the two concerns `Recipe::structural_errors`
//! explicitly leaves to this crate.

use recipe_core::{EngineError, EngineResult, Recipe, VariableType};

/// Pre-loads a named recipe dependency (spec §3 `dependencies` list) ahead
/// of validating/running the recipe that declares it. Left as a trait
/// rather than hard-wiring a filesystem lookup here, the same way the host
/// keeps its scheduler's failover policy decoupled from how a session is
/// actually relaunched.
pub trait DependencyLoader: Send + Sync {
    fn load(&self, name: &str) -> EngineResult<Recipe>;
}

/// Outcome of `validate_recipe`: a recipe with a non-empty `errors` list
/// must not be executed; `warnings` are surfaced to the caller but never
/// block a run.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Structural checks (duplicate names, unknown `dependsOn` targets, empty
/// `steps`) plus variable-declaration and dependency-loading checks. A
/// required dependency that fails to load aborts validation; an optional
/// one only warns (spec §4.5, grounded on the host's required-vs-optional
/// MCP server loading in `build_and_validate_executor`).
pub fn validate_recipe(recipe: &Recipe, dependency_loader: Option<&dyn DependencyLoader>) -> ValidationReport {
    let mut report = ValidationReport::default();
    report
        .errors
        .extend(recipe.structural_errors().into_iter().map(|issue| issue.message));

    for (name, decl) in &recipe.variables {
        if decl.var_type == VariableType::Enum && decl.values.is_empty() {
            report
                .errors
                .push(format!("variable '{name}': enum type requires a non-empty 'values' list"));
        }
    }

    for dep in &recipe.dependencies {
        match dependency_loader {
            Some(loader) => match loader.load(&dep.name) {
                Ok(_) => {}
                Err(err) if dep.optional => {
                    report
                        .warnings
                        .push(format!("optional dependency '{}' failed to load: {err}", dep.name));
                }
                Err(err) => {
                    report
                        .errors
                        .push(format!("required dependency '{}' failed to load: {err}", dep.name));
                }
            },
            None if !dep.optional => {
                // No loader configured at all (e.g. a `recipe validate` call
                // with no project context) — the recipe itself may still be
                // fine, so this is a warning rather than a hard error.
                report.warnings.push(format!(
                    "required dependency '{}' declared but no dependency loader was configured",
                    dep.name
                ));
            }
            None => {}
        }
    }

    report
}

/// Convenience wrapper returning `Err(EngineError::ValidationError)` when
/// the report is not valid, for callers that want the closed error type
/// directly rather than inspecting a report.
pub fn validate_recipe_or_error(
    recipe: &Recipe,
    dependency_loader: Option<&dyn DependencyLoader>,
) -> EngineResult<ValidationReport> {
    let report = validate_recipe(recipe, dependency_loader);
    if report.is_valid() {
        Ok(report)
    } else {
        Err(EngineError::ValidationError(report.errors.join("; ")))
    }
}
