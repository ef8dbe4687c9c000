//! Output Evaluator (spec §4.3).

use crate::path;
use crate::template::{TemplateRenderer, contains_template_markers};
use recipe_core::ExecutionContext;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Walk a step's `output` mapping and evaluate each `(varName -> expression)`
/// entry against `ctx` + `step_overrides` + the step's own result. Errors
/// degrade the single export to "absent" (no key in the returned map) and
/// are logged at debug — the step itself never fails from this.
pub fn evaluate_outputs(
    output: &HashMap<String, String>,
    step_name: &str,
    tool_result: &Value,
    ctx: &ExecutionContext,
    step_overrides: &Map<String, Value>,
    renderer: &dyn TemplateRenderer,
) -> HashMap<String, Value> {
    let scope = build_output_scope(ctx, step_overrides, step_name, tool_result);
    let mut evaluated = HashMap::new();

    for (name, expr) in output {
        match evaluate_one(expr, &scope, renderer) {
            Some(value) => {
                evaluated.insert(name.clone(), value);
            }
            None => {
                tracing::debug!(
                    step = %step_name,
                    export = %name,
                    expr = %expr,
                    "output expression evaluation failed, export left undefined"
                );
            }
        }
    }

    evaluated
}

fn build_output_scope(
    ctx: &ExecutionContext,
    step_overrides: &Map<String, Value>,
    step_name: &str,
    tool_result: &Value,
) -> Value {
    let mut scope = crate::scope::build_scope(ctx, step_overrides);
    scope.insert("result".to_string(), tool_result.clone());
    scope.insert("step".to_string(), Value::String(step_name.to_string()));
    scope.insert("status".to_string(), Value::String("completed".to_string()));
    Value::Object(scope)
}

fn evaluate_one(expr: &str, scope: &Value, renderer: &dyn TemplateRenderer) -> Option<Value> {
    let trimmed = expr.trim();
    if contains_template_markers(trimmed) {
        return renderer
            .render(trimmed, scope)
            .ok()
            .map(|s| Value::String(s.trim().to_string()));
    }
    path::resolve(scope, trimmed).cloned()
}
