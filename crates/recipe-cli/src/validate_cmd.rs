//! `recipe validate <file>` (spec SPEC_FULL §6.1).

use crate::{dependency::FsDependencyLoader, source};
use anyhow::Result;
use recipe_engine::{load_recipe, validate::validate_recipe};
use std::path::Path;

/// Returns the process exit code: 0 when the recipe is valid, 2 otherwise
/// (load/validate failures never run a step, so they share the "never ran"
/// exit code with `run`'s early-abort path).
pub fn handle(file: &str) -> Result<i32> {
    let project_root = crate::dependency::project_root_for(Some(Path::new(file)));
    let recipe = match load_recipe(&source::resolve(file)?) {
        Ok(recipe) => recipe,
        Err(err) => {
            eprintln!("error: {err}");
            return Ok(2);
        }
    };

    let loader = FsDependencyLoader::new(&project_root);
    let report = validate_recipe(&recipe, Some(&loader));

    for warning in &report.warnings {
        println!("warning: {warning}");
    }
    for error in &report.errors {
        println!("error: {error}");
    }

    if report.is_valid() {
        println!("{} is valid ({} step(s))", recipe.name, recipe.steps.len());
        Ok(0)
    } else {
        Ok(2)
    }
}
