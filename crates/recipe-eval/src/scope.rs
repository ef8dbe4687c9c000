//! Scope construction shared by the Condition and Output Evaluators.

use recipe_core::ExecutionContext;
use serde_json::{Map, Value};

/// Reserved words that can never bind as scope identifiers, plus anything
/// that is not a valid identifier shape (spec §4.2: "Identifier names that
/// collide with reserved language keywords or contain invalid characters
/// must be filtered out of the scope before binding").
const RESERVED_WORDS: &[&str] = &["true", "false", "null", "if", "else", "result", "status"];

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Build the scope visible to a step's `when`/`skipIf`/`output` expressions:
/// context variables with the step's `variableOverrides` layered on top
/// (SPEC_FULL §9.2: overrides persist into the output-evaluator scope too),
/// with reserved/invalid names filtered out.
pub fn build_scope(ctx: &ExecutionContext, step_overrides: &Map<String, Value>) -> Map<String, Value> {
    let mut scope = ctx.variables.clone();
    for (key, value) in step_overrides {
        scope.insert(key.clone(), value.clone());
    }
    scope.retain(|key, _| is_valid_identifier(key) && !RESERVED_WORDS.contains(&key.as_str()));
    scope
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_words_are_filtered() {
        let mut ctx = ExecutionContext::new("/tmp", Map::new());
        ctx.variables.insert("true".to_string(), Value::Bool(true));
        ctx.variables.insert("name".to_string(), Value::String("ok".into()));
        let scope = build_scope(&ctx, &Map::new());
        assert!(!scope.contains_key("true"));
        assert!(scope.contains_key("name"));
    }

    #[test]
    fn step_overrides_win_over_context_variables() {
        let mut ctx = ExecutionContext::new("/tmp", Map::new());
        ctx.variables.insert("env".to_string(), Value::String("base".into()));
        let mut overrides = Map::new();
        overrides.insert("env".to_string(), Value::String("override".into()));
        let scope = build_scope(&ctx, &overrides);
        assert_eq!(scope.get("env"), Some(&Value::String("override".into())));
    }

    #[test]
    fn invalid_identifier_shapes_are_filtered() {
        let mut ctx = ExecutionContext::new("/tmp", Map::new());
        ctx.variables.insert("9lives".to_string(), Value::Bool(true));
        ctx.variables.insert("has-dash".to_string(), Value::Bool(true));
        let scope = build_scope(&ctx, &Map::new());
        assert!(scope.is_empty());
    }
}
