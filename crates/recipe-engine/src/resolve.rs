//! `resolveVariables` (spec §4.5): apply caller-supplied values and
//! defaults, validate against declarations, then dispatch still-missing
//! required variables by `askMode` (spec §4.1/§4.5).

use recipe_config::AskMode;
use recipe_core::{EngineError, EngineResult, Recipe, VariableDecl};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

/// Interactively resolve one declared variable (`askMode: me`). Out of
/// scope for this crate (spec §1) — a host wires in its own prompt UI.
pub trait VariablePrompter: Send + Sync {
    fn prompt(&self, name: &str, decl: &VariableDecl) -> EngineResult<Value>;
}

/// Resolve a whole batch of missing variables through an AI backend
/// (`askMode: ai`). Out of scope for this crate (spec §1) — a host wires in
/// its own model call. Returning a partial map (only the keys it managed to
/// answer) is fine; anything still missing falls through to the prompter.
pub trait VariableAiTransport: Send + Sync {
    fn resolve_batch(
        &self,
        pending: &HashMap<String, VariableDecl>,
        scope: &Map<String, Value>,
    ) -> EngineResult<HashMap<String, Value>>;
}

pub struct ResolveOptions<'a> {
    pub ask_mode: AskMode,
    pub no_defaults: bool,
    pub prompter: Option<&'a dyn VariablePrompter>,
    pub ai_transport: Option<&'a dyn VariableAiTransport>,
}

/// Resolve `recipe`'s declared variables against `provided`, per spec §4.5:
/// defaults fill gaps (unless `noDefaults`), every present value is
/// type-checked against its declaration, and whatever required variables
/// remain unset are dispatched per `askMode` before being reported back as
/// one aggregated `MissingRequiredVariables` error.
pub fn resolve_variables(
    recipe: &Recipe,
    provided: Map<String, Value>,
    project_root: &Path,
    options: &ResolveOptions,
) -> EngineResult<Map<String, Value>> {
    let mut scope = provided;

    if !options.no_defaults {
        for (name, decl) in &recipe.variables {
            if !scope.contains_key(name) {
                if let Some(default) = &decl.default {
                    scope.insert(name.clone(), default.clone());
                }
            }
        }
    }

    let mut type_errors = Vec::new();
    for (name, decl) in &recipe.variables {
        if let Some(value) = scope.get(name) {
            if let Err(message) = decl.validate(value, project_root) {
                type_errors.push(format!("variable '{name}': {message}"));
            }
        }
    }
    if !type_errors.is_empty() {
        return Err(EngineError::ValidationError(type_errors.join("; ")));
    }

    let mut unresolved: HashMap<String, VariableDecl> = recipe
        .variables
        .iter()
        .filter(|(name, decl)| decl.required && !scope.contains_key(*name))
        .map(|(name, decl)| (name.clone(), decl.clone()))
        .collect();

    if unresolved.is_empty() {
        return Ok(scope);
    }

    let mut missing: Vec<String> = Vec::new();

    match options.ask_mode {
        AskMode::Nobody => {
            missing.extend(unresolved.keys().cloned());
        }
        AskMode::Me => {
            resolve_via_prompter(&unresolved, options.prompter, &mut scope, &mut missing, project_root);
        }
        AskMode::Ai => {
            resolve_via_ai_then_prompter(&unresolved, options, &mut scope, &mut missing, project_root);
        }
    }

    if !missing.is_empty() {
        missing.sort();
        return Err(EngineError::MissingRequiredVariables(missing));
    }

    Ok(scope)
}

fn resolve_via_ai_then_prompter(
    unresolved: &HashMap<String, VariableDecl>,
    options: &ResolveOptions,
    scope: &mut Map<String, Value>,
    missing: &mut Vec<String>,
    project_root: &Path,
) {
    let Some(transport) = options.ai_transport else {
        tracing::warn!("ask_mode=ai but no AI transport configured, falling back to interactive resolution");
        resolve_via_prompter(unresolved, options.prompter, scope, missing, project_root);
        return;
    };

    match transport.resolve_batch(unresolved, scope) {
        Ok(answers) => {
            let mut still_unresolved = unresolved.clone();
            for (name, value) in answers {
                let Some(decl) = unresolved.get(&name) else { continue };
                if decl.validate(&value, project_root).is_ok() {
                    scope.insert(name.clone(), value);
                    still_unresolved.remove(&name);
                }
            }
            if !still_unresolved.is_empty() {
                resolve_via_prompter(&still_unresolved, options.prompter, scope, missing, project_root);
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "AI variable transport failed, falling back to interactive resolution");
            resolve_via_prompter(unresolved, options.prompter, scope, missing, project_root);
        }
    }
}

fn resolve_via_prompter(
    unresolved: &HashMap<String, VariableDecl>,
    prompter: Option<&dyn VariablePrompter>,
    scope: &mut Map<String, Value>,
    missing: &mut Vec<String>,
    project_root: &Path,
) {
    let Some(prompter) = prompter else {
        missing.extend(unresolved.keys().cloned());
        return;
    };
    for (name, decl) in unresolved {
        let resolved = prompter
            .prompt(name, decl)
            .map_err(|err| err.to_string())
            .and_then(|value| decl.validate(&value, project_root).map(|_| value));
        match resolved {
            Ok(value) => {
                scope.insert(name.clone(), value);
            }
            Err(err) => {
                tracing::debug!(variable = %name, error = %err, "failed to resolve variable interactively");
                missing.push(name.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipe_core::{Hooks, Step, StepPayload, VariableType};
    use serde_json::{Map as JsonMap, json};
    use std::collections::HashMap as StdMap;

    fn decl(var_type: VariableType, required: bool, default: Option<Value>) -> VariableDecl {
        VariableDecl {
            var_type,
            required,
            default,
            description: None,
            suggestion: None,
            values: Vec::new(),
            allow_missing: false,
        }
    }

    fn step(name: &str) -> Step {
        Step {
            name: name.into(),
            depends_on: Vec::new(),
            when: None,
            skip_if: None,
            timeout_ms: None,
            retries: None,
            continue_on_error: None,
            parallel: true,
            variable_overrides: JsonMap::new(),
            output: StdMap::new(),
            payload: StepPayload::EnsureDirs { paths: vec!["out".into()] },
        }
    }

    fn recipe_with(variables: StdMap<String, VariableDecl>) -> Recipe {
        Recipe {
            name: "r".into(),
            version: "1.0.0".into(),
            description: None,
            category: "general".into(),
            tags: Vec::new(),
            variables,
            steps: vec![step("a")],
            provides: Vec::new(),
            dependencies: Vec::new(),
            on_success: None,
            on_error: None,
            outputs: StdMap::new(),
            hooks: Hooks::default(),
            settings: StdMap::new(),
        }
    }

    fn no_ask_options() -> ResolveOptions<'static> {
        ResolveOptions { ask_mode: AskMode::Nobody, no_defaults: false, prompter: None, ai_transport: None }
    }

    #[test]
    fn default_value_fills_an_unset_variable() {
        let mut vars = StdMap::new();
        vars.insert("name".into(), decl(VariableType::String, true, Some(json!("world"))));
        let recipe = recipe_with(vars);
        let scope = resolve_variables(&recipe, JsonMap::new(), Path::new("."), &no_ask_options()).unwrap();
        assert_eq!(scope.get("name"), Some(&json!("world")));
    }

    #[test]
    fn no_defaults_flag_suppresses_default_application() {
        let mut vars = StdMap::new();
        vars.insert("name".into(), decl(VariableType::String, true, Some(json!("world"))));
        let recipe = recipe_with(vars);
        let options = ResolveOptions { no_defaults: true, ..no_ask_options() };
        let err = resolve_variables(&recipe, JsonMap::new(), Path::new("."), &options).unwrap_err();
        assert!(matches!(err, EngineError::MissingRequiredVariables(names) if names == vec!["name".to_string()]));
    }

    #[test]
    fn provided_value_failing_type_check_is_a_validation_error() {
        let mut vars = StdMap::new();
        vars.insert("count".into(), decl(VariableType::Number, true, None));
        let recipe = recipe_with(vars);
        let mut provided = JsonMap::new();
        provided.insert("count".into(), json!("not a number"));
        let err = resolve_variables(&recipe, provided, Path::new("."), &no_ask_options()).unwrap_err();
        assert_eq!(err.kind(), "VALIDATION_ERROR");
    }

    #[test]
    fn nobody_mode_reports_missing_required_variables() {
        let mut vars = StdMap::new();
        vars.insert("name".into(), decl(VariableType::String, true, None));
        let recipe = recipe_with(vars);
        let err = resolve_variables(&recipe, JsonMap::new(), Path::new("."), &no_ask_options()).unwrap_err();
        match err {
            EngineError::MissingRequiredVariables(names) => assert_eq!(names, vec!["name".to_string()]),
            other => panic!("expected MissingRequiredVariables, got {other:?}"),
        }
    }

    struct StubPrompter;
    impl VariablePrompter for StubPrompter {
        fn prompt(&self, _name: &str, _decl: &VariableDecl) -> EngineResult<Value> {
            Ok(json!("prompted"))
        }
    }

    #[test]
    fn me_mode_resolves_through_the_prompter() {
        let mut vars = StdMap::new();
        vars.insert("name".into(), decl(VariableType::String, true, None));
        let recipe = recipe_with(vars);
        let prompter = StubPrompter;
        let options = ResolveOptions { ask_mode: AskMode::Me, no_defaults: false, prompter: Some(&prompter), ai_transport: None };
        let scope = resolve_variables(&recipe, JsonMap::new(), Path::new("."), &options).unwrap();
        assert_eq!(scope.get("name"), Some(&json!("prompted")));
    }

    struct StubAiTransport;
    impl VariableAiTransport for StubAiTransport {
        fn resolve_batch(
            &self,
            pending: &HashMap<String, VariableDecl>,
            _scope: &JsonMap<String, Value>,
        ) -> EngineResult<HashMap<String, Value>> {
            Ok(pending.keys().map(|k| (k.clone(), json!("from-ai"))).collect())
        }
    }

    #[test]
    fn ai_mode_resolves_through_the_transport() {
        let mut vars = StdMap::new();
        vars.insert("name".into(), decl(VariableType::String, true, None));
        let recipe = recipe_with(vars);
        let transport = StubAiTransport;
        let options = ResolveOptions { ask_mode: AskMode::Ai, no_defaults: false, prompter: None, ai_transport: Some(&transport) };
        let scope = resolve_variables(&recipe, JsonMap::new(), Path::new("."), &options).unwrap();
        assert_eq!(scope.get("name"), Some(&json!("from-ai")));
    }

    #[test]
    fn ai_mode_without_transport_falls_back_to_prompter() {
        let mut vars = StdMap::new();
        vars.insert("name".into(), decl(VariableType::String, true, None));
        let recipe = recipe_with(vars);
        let prompter = StubPrompter;
        let options = ResolveOptions { ask_mode: AskMode::Ai, no_defaults: false, prompter: Some(&prompter), ai_transport: None };
        let scope = resolve_variables(&recipe, JsonMap::new(), Path::new("."), &options).unwrap();
        assert_eq!(scope.get("name"), Some(&json!("prompted")));
    }

    #[test]
    fn ai_mode_with_no_transport_and_no_prompter_reports_missing() {
        let mut vars = StdMap::new();
        vars.insert("name".into(), decl(VariableType::String, true, None));
        let recipe = recipe_with(vars);
        let options = ResolveOptions { ask_mode: AskMode::Ai, no_defaults: false, prompter: None, ai_transport: None };
        let err = resolve_variables(&recipe, JsonMap::new(), Path::new("."), &options).unwrap_err();
        assert!(matches!(err, EngineError::MissingRequiredVariables(_)));
    }
}
