//! `recipe plan <file> [--var K=V]...` (spec SPEC_FULL §6.1): load, validate,
//! resolve variables, compile the phase plan, print it — no execution.

use crate::{dependency::FsDependencyLoader, display, source, vars};
use anyhow::Result;
use recipe_config::AskMode;
use recipe_engine::{load_recipe, resolve::ResolveOptions, resolve_variables, validate::validate_recipe};
use recipe_exec::dag::build_plan;
use std::path::Path;

pub fn handle(file: &str, raw_vars: &[String]) -> Result<i32> {
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
    if !report.is_valid() {
        for error in &report.errors {
            eprintln!("error: {error}");
        }
        return Ok(2);
    }

    let provided = vars::parse_variables(raw_vars)?;
    let resolved = match resolve_variables(
        &recipe,
        provided,
        &project_root,
        &ResolveOptions { ask_mode: AskMode::Nobody, no_defaults: false, prompter: None, ai_transport: None },
    ) {
        Ok(scope) => scope,
        Err(err) => {
            eprintln!("error: {err}");
            return Ok(2);
        }
    };

    let plan = match build_plan(&recipe.steps) {
        Ok(plan) => plan,
        Err(err) => {
            eprintln!("error: {err}");
            return Ok(2);
        }
    };

    display::print_plan(&recipe, &plan, &resolved);
    Ok(0)
}
