//! Human-readable plan/summary printing, grounded on the host's
//! `plan_display.rs::print_plan`/`print_summary`.

use recipe_core::{Recipe, StepResult, StepStatus};
use recipe_engine::RecipeExecutionResult;
use recipe_exec::dag::ExecutionPlan;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Print a recipe's name/description/variables followed by its phase plan,
/// one step per line with its tool type and container/leaf marker.
pub fn print_plan(recipe: &Recipe, plan: &ExecutionPlan, variables: &Map<String, Value>) {
    println!("recipe: {} (v{})", recipe.name, recipe.version);
    if let Some(description) = &recipe.description {
        println!("  {description}");
    }
    if !variables.is_empty() {
        println!("variables:");
        for (name, value) in variables {
            println!("  {name} = {value}");
        }
    }

    let steps_by_name: HashMap<&str, &recipe_core::Step> =
        recipe.steps.iter().map(|s| (s.name.as_str(), s)).collect();

    println!("phases: {}", plan.phases.len());
    for (index, phase) in plan.phases.iter().enumerate() {
        println!("  phase {index} ({} step(s)):", phase.len());
        for step_name in phase {
            let Some(step) = steps_by_name.get(step_name.as_str()) else { continue };
            let kind = if step.is_container() { "container" } else { "leaf" };
            print!("    - {step_name} [{kind}:{}]", step.tool_type());
            if !step.depends_on.is_empty() {
                print!(" depends_on={}", step.depends_on.join(","));
            }
            if step.when.is_some() || step.skip_if.is_some() {
                print!(" conditional");
            }
            if !step.parallel {
                print!(" serial");
            }
            println!();
        }
    }
}

/// Print a run's aggregate PASS/FAIL/SKIP counts and one line per step.
pub fn print_summary(result: &RecipeExecutionResult) {
    println!(
        "{} ({} total, {} completed, {} failed, {} skipped)",
        if result.success { "PASS" } else { "FAIL" },
        result.total_steps,
        result.completed_steps,
        result.failed_steps,
        result.skipped_steps,
    );
    for step in &result.step_results {
        println!("  {} {}", status_marker(step.status), describe(step));
    }
    if let Some(message) = &result.rendered_message {
        println!("{message}");
    }
    for warning in &result.warnings {
        println!("warning: {warning}");
    }
    for error in &result.errors {
        println!("error: {error}");
    }
}

fn status_marker(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Completed => "[PASS]",
        StepStatus::Failed | StepStatus::TimedOut => "[FAIL]",
        StepStatus::Skipped => "[SKIP]",
        StepStatus::Cancelled => "[STOP]",
    }
}

fn describe(step: &StepResult) -> String {
    let mut line = format!("{} ({}, {}ms", step.step_name, step.tool_type, step.duration.as_millis());
    if step.retry_count > 0 {
        line.push_str(&format!(", {} retr{}", step.retry_count, if step.retry_count == 1 { "y" } else { "ies" }));
    }
    line.push(')');
    if let Some(error) = &step.error {
        line.push_str(&format!(" — {}", error.message));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipe_core::{Hooks, Step, StepPayload};
    use std::collections::HashMap as StdMap;

    fn recipe() -> Recipe {
        Recipe {
            name: "demo".into(),
            version: "1.0.0".into(),
            description: Some("a demo recipe".into()),
            category: "general".into(),
            tags: Vec::new(),
            variables: StdMap::new(),
            steps: vec![Step {
                name: "a".into(),
                depends_on: Vec::new(),
                when: None,
                skip_if: None,
                timeout_ms: None,
                retries: None,
                continue_on_error: None,
                parallel: true,
                variable_overrides: Map::new(),
                output: StdMap::new(),
                payload: StepPayload::EnsureDirs { paths: vec!["out".into()] },
            }],
            provides: Vec::new(),
            dependencies: Vec::new(),
            on_success: None,
            on_error: None,
            outputs: StdMap::new(),
            hooks: Hooks::default(),
            settings: StdMap::new(),
        }
    }

    #[test]
    fn print_plan_does_not_panic_on_a_single_phase_recipe() {
        let r = recipe();
        let plan = ExecutionPlan { phases: vec![vec!["a".to_string()]] };
        print_plan(&r, &plan, &Map::new());
    }
}
