//! `loadRecipe` (spec §4.5): read a recipe's YAML from its `RecipeSource`,
//! normalize convenience shorthand step forms, and parse into a `Recipe`,
//! fronted by the process-wide Recipe Cache (spec §4.5 "recipe cache only").

use recipe_config::RecipeSource;
use recipe_core::{EngineError, EngineResult, Recipe};
use serde_yaml::Value;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

static RECIPE_CACHE: OnceLock<Mutex<HashMap<String, Recipe>>> = OnceLock::new();

fn recipe_cache() -> &'static Mutex<HashMap<String, Recipe>> {
    RECIPE_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// `cleanup()` (spec §4.5): drop every cached recipe. The cache is
/// otherwise never invalidated on its own — a `File` source that changes
/// on disk between loads keeps serving its first-seen parse until this is
/// called, mirroring the tool registry's explicit `reset()` (spec §9).
pub fn cleanup_recipe_cache() {
    recipe_cache().lock().unwrap().clear();
}

/// Load and parse `source` into a `Recipe`, serving a cached parse when
/// `source.cache_key()` has been seen before. Shorthand step forms are
/// normalized into their canonical tagged shape before `serde_yaml` ever
/// sees the typed `Recipe`/`Step`/`StepPayload` definitions, so the data
/// model itself stays a plain closed tagged union (spec §9 design note).
pub fn load_recipe(source: &RecipeSource) -> EngineResult<Recipe> {
    let key = source.cache_key();
    if let Some(cached) = recipe_cache().lock().unwrap().get(&key) {
        return Ok(cached.clone());
    }

    let recipe = load_recipe_uncached(source)?;
    recipe_cache().lock().unwrap().insert(key, recipe.clone());
    Ok(recipe)
}

fn load_recipe_uncached(source: &RecipeSource) -> EngineResult<Recipe> {
    let raw = read_source(source)?;
    let mut doc: Value = serde_yaml::from_str(&raw)
        .map_err(|e| EngineError::ValidationError(format!("{}: invalid YAML: {e}", source.display_name())))?;

    if let Some(steps) = doc.get_mut("steps").and_then(Value::as_sequence_mut) {
        normalize_steps(steps);
    }

    serde_yaml::from_value(doc)
        .map_err(|e| EngineError::ValidationError(format!("{}: {e}", source.display_name())))
}

fn read_source(source: &RecipeSource) -> EngineResult<String> {
    match source {
        RecipeSource::File { path } => std::fs::read_to_string(path)
            .map_err(|_| EngineError::FileNotFound(path.display().to_string())),
        RecipeSource::Content { content, .. } => Ok(content.clone()),
    }
}

/// Rewrite every shorthand step in `steps` (recursing into nested
/// `sequence`/`parallel` children) to the canonical `tool`-tagged shape.
fn normalize_steps(steps: &mut [Value]) {
    for step in steps.iter_mut() {
        normalize_step(step);
    }
}

fn normalize_step(step: &mut Value) {
    let Some(map) = step.as_mapping_mut() else { return };

    if map.contains_key("tool") {
        // Already canonical; still recurse in case it's a sequence/parallel
        // container holding further shorthand children.
        if let Some(nested) = map.get_mut("steps").and_then(Value::as_sequence_mut) {
            normalize_steps(nested);
        }
        return;
    }

    // `command → shell` (spec §4.5); `run` is kept as an alias for recipes
    // written against the older shorthand name.
    if let Some(command) = map.remove("command").or_else(|| map.remove("run")) {
        map.insert(Value::from("tool"), Value::from("shell"));
        map.insert(Value::from("command"), command);
        return;
    }

    if let Some(dirs) = map.remove("ensureDirs") {
        map.insert(Value::from("tool"), Value::from("ensure-dirs"));
        map.insert(Value::from("paths"), dirs);
        return;
    }

    if let Some(tmpl) = map.remove("template") {
        if let Some(tmpl_map) = tmpl.as_mapping() {
            map.insert(Value::from("tool"), Value::from("template"));
            if let Some(from) = tmpl_map.get("from").or_else(|| tmpl_map.get("source")) {
                map.insert(Value::from("source"), from.clone());
            }
            if let Some(to) = tmpl_map.get("to").or_else(|| tmpl_map.get("destination")) {
                map.insert(Value::from("destination"), to.clone());
            }
            if let Some(vars) = tmpl_map.get("vars") {
                map.insert(Value::from("vars"), vars.clone());
            }
            return;
        }
        // Not a recognized shape; put it back untouched and let typed
        // parsing report the resulting missing-`tool` error.
        map.insert(Value::from("template"), tmpl);
        return;
    }

    // `recipe → recipe` (spec §4.5): the shorthand's value is the
    // sub-recipe's name; `args` becomes `variableOverrides` on the step.
    if let Some(name) = map.remove("recipe") {
        map.insert(Value::from("tool"), Value::from("recipe"));
        map.insert(Value::from("name"), name);
        if let Some(args) = map.remove("args") {
            map.insert(Value::from("variable_overrides"), args);
        }
        return;
    }

    // `promptType → prompt` (spec §4.5).
    if let Some(prompt_type) = map.remove("promptType") {
        map.insert(Value::from("tool"), Value::from("prompt"));
        map.insert(Value::from("prompt_type"), prompt_type);
        return;
    }

    // `action → action` (spec §4.5): the shorthand's value is the action's
    // registered name.
    if let Some(name) = map.remove("action") {
        map.insert(Value::from("tool"), Value::from("action"));
        map.insert(Value::from("name"), name);
        return;
    }

    // `codemod → codemod` (spec §4.5): the shorthand's value is the
    // transform's registered name.
    if let Some(transform) = map.remove("codemod") {
        map.insert(Value::from("tool"), Value::from("codemod"));
        map.insert(Value::from("transform"), transform);
        return;
    }

    // `packages → install` (spec §4.5).
    if let Some(packages) = map.remove("packages") {
        map.insert(Value::from("tool"), Value::from("install"));
        map.insert(Value::from("packages"), packages);
        return;
    }

    // `sequence`/`parallel` shorthand only applies when the value is a
    // list of nested steps — `parallel: true/false` (the per-step
    // concurrency flag) must pass through untouched.
    if let Some(nested) = map.get("sequence").filter(|v| v.is_sequence()).cloned() {
        map.remove("sequence");
        map.insert(Value::from("tool"), Value::from("sequence"));
        let mut nested_steps = nested.as_sequence().cloned().unwrap_or_default();
        normalize_steps(&mut nested_steps);
        map.insert(Value::from("steps"), Value::Sequence(nested_steps));
        return;
    }
    if let Some(nested) = map.get("parallel").filter(|v| v.is_sequence()).cloned() {
        map.remove("parallel");
        map.insert(Value::from("tool"), Value::from("parallel"));
        let mut nested_steps = nested.as_sequence().cloned().unwrap_or_default();
        normalize_steps(&mut nested_steps);
        map.insert(Value::from("steps"), Value::Sequence(nested_steps));
        return;
    }

    // Bare `steps → sequence` (spec §4.5): a step with a nested `steps`
    // list and no other tool marker is shorthand for a sequence container.
    if let Some(nested) = map.get("steps").and_then(Value::as_sequence).cloned() {
        map.insert(Value::from("tool"), Value::from("sequence"));
        let mut nested_steps = nested;
        normalize_steps(&mut nested_steps);
        map.insert(Value::from("steps"), Value::Sequence(nested_steps));
    }
}
