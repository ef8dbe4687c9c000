//! Condition Evaluator (spec §4.2).
//!
//! Grammar (deliberately minimal, spec §9): `${VAR}` truthiness,
//! `!(expr)` negation, `(a) && (b)` conjunction, `(a) || (b)` disjunction,
//! `${VAR} == "literal"` / `${VAR} != "literal"` string equality, and the
//! `fileExists(path)` / `dirExists(path)` predicates. Any evaluation
//! failure is treated as `false` and logged at debug level — never fatal.

use crate::path;
use recipe_core::ExecutionContext;
use serde_json::{Map, Value};

/// Evaluate `condition` against `scope`, with `ctx` supplying the
/// `fileExists`/`dirExists` predicates (resolved against `projectRoot`).
pub fn evaluate_condition(condition: &str, scope: &Map<String, Value>, ctx: &ExecutionContext) -> bool {
    let trimmed = condition.trim();

    if let Some(pos) = find_balanced_infix(trimmed, ") && (") {
        let left = &trimmed[1..pos];
        let right = &trimmed[pos + 6..trimmed.len() - 1];
        return evaluate_condition(left, scope, ctx) && evaluate_condition(right, scope, ctx);
    }

    if let Some(pos) = find_balanced_infix(trimmed, ") || (") {
        let left = &trimmed[1..pos];
        let right = &trimmed[pos + 6..trimmed.len() - 1];
        return evaluate_condition(left, scope, ctx) || evaluate_condition(right, scope, ctx);
    }

    if let Some(inner) = trimmed.strip_prefix("!(").and_then(|s| s.strip_suffix(')')) {
        return !evaluate_condition(inner, scope, ctx);
    }

    if trimmed.starts_with('(')
        && trimmed.ends_with(')')
        && !trimmed.contains(" && ")
        && !trimmed.contains(" || ")
    {
        return evaluate_condition(&trimmed[1..trimmed.len() - 1], scope, ctx);
    }

    if let Some(result) = try_predicate(trimmed, ctx) {
        return result;
    }

    if let Some((left, op, right)) = split_equality(trimmed) {
        let left_value = resolve_expr(left.trim(), scope);
        let right_literal = right.trim().trim_matches('"');
        let equal = left_value
            .as_ref()
            .map(|v| value_as_string(v) == right_literal)
            .unwrap_or(false);
        return if op == "==" { equal } else { !equal };
    }

    match resolve_expr(trimmed, scope) {
        Some(value) => is_truthy(&value),
        None => {
            tracing::debug!(expr = %trimmed, "condition expression unresolved, defaulting to false");
            false
        }
    }
}

/// Find `) op (` only when the whole trimmed string is itself wrapped in a
/// single outer pair of parens (mirrors the host's guard against
/// mis-splitting `"(a) && (b)"`).
fn find_balanced_infix(trimmed: &str, infix: &str) -> Option<usize> {
    if !(trimmed.starts_with('(') && trimmed.ends_with(')')) {
        return None;
    }
    trimmed.find(infix)
}

fn try_predicate(expr: &str, ctx: &ExecutionContext) -> Option<bool> {
    if let Some(arg) = expr.strip_prefix("fileExists(").and_then(|s| s.strip_suffix(')')) {
        return Some(ctx.file_exists(arg.trim().trim_matches('"')));
    }
    if let Some(arg) = expr.strip_prefix("dirExists(").and_then(|s| s.strip_suffix(')')) {
        return Some(ctx.dir_exists(arg.trim().trim_matches('"')));
    }
    None
}

fn split_equality(expr: &str) -> Option<(&str, &str, &str)> {
    if let Some(pos) = expr.find("==") {
        return Some((&expr[..pos], "==", &expr[pos + 2..]));
    }
    if let Some(pos) = expr.find("!=") {
        return Some((&expr[..pos], "!=", &expr[pos + 2..]));
    }
    None
}

/// Resolve a `${VAR}` or `${VAR.path[0]}` expression against the scope.
fn resolve_expr(expr: &str, scope: &Map<String, Value>) -> Option<Value> {
    let inner = expr.trim().strip_prefix("${")?.strip_suffix('}')?;
    let root = Value::Object(scope.clone());
    path::resolve(&root, inner).cloned()
}

fn value_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => {
            let lower = s.trim().to_lowercase();
            !lower.is_empty() && lower != "false" && lower != "0"
        }
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(".", Map::new())
    }

    fn scope(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn unset_var_is_false() {
        assert!(!evaluate_condition("${UNSET}", &Map::new(), &ctx()));
    }

    #[test]
    fn empty_string_is_false() {
        let s = scope(&[("EMPTY", Value::String(String::new()))]);
        assert!(!evaluate_condition("${EMPTY}", &s, &ctx()));
    }

    #[test]
    fn false_literal_and_zero_are_false() {
        let s = scope(&[
            ("FLAG", Value::String("false".into())),
            ("ZERO", Value::String("0".into())),
        ]);
        assert!(!evaluate_condition("${FLAG}", &s, &ctx()));
        assert!(!evaluate_condition("${ZERO}", &s, &ctx()));
    }

    #[test]
    fn nonempty_var_is_true() {
        let s = scope(&[("FLAG", Value::String("yes".into()))]);
        assert!(evaluate_condition("${FLAG}", &s, &ctx()));
    }

    #[test]
    fn negation_and_conjunction() {
        let s = scope(&[
            ("A", Value::String("yes".into())),
            ("B", Value::String("yes".into())),
        ]);
        assert!(evaluate_condition("(${A}) && (${B})", &s, &ctx()));
        assert!(!evaluate_condition("!(${A})", &s, &ctx()));

        let partial = scope(&[("A", Value::String("yes".into()))]);
        assert!(!evaluate_condition("(${A}) && (${B})", &partial, &ctx()));
    }

    #[test]
    fn disjunction() {
        let s = scope(&[("A", Value::String("yes".into()))]);
        assert!(evaluate_condition("(${A}) || (${B})", &s, &ctx()));

        let none = Map::new();
        assert!(!evaluate_condition("(${A}) || (${B})", &none, &ctx()));
    }

    #[test]
    fn string_equality() {
        let s = scope(&[("ENV", Value::String("prod".into()))]);
        assert!(evaluate_condition(r#"${ENV} == "prod""#, &s, &ctx()));
        assert!(evaluate_condition(r#"${ENV} != "dev""#, &s, &ctx()));
        assert!(!evaluate_condition(r#"${ENV} == "dev""#, &s, &ctx()));
    }

    #[test]
    fn nested_not_and_and_matches_real_world_pattern() {
        let s = scope(&[("BOT_HAS_ISSUES", Value::String("yes".into()))]);
        assert!(evaluate_condition(
            "(${BOT_HAS_ISSUES}) && (!(${COMMENT_IS_FALSE_POSITIVE}))",
            &s,
            &ctx()
        ));
    }

    #[test]
    fn file_exists_predicate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("present.txt"), "x").unwrap();
        let context = ExecutionContext::new(dir.path(), Map::new());
        assert!(evaluate_condition(
            r#"fileExists("present.txt")"#,
            &Map::new(),
            &context
        ));
        assert!(!evaluate_condition(
            r#"fileExists("absent.txt")"#,
            &Map::new(),
            &context
        ));
    }

    #[test]
    fn invalid_expression_defaults_to_false_not_panic() {
        assert!(!evaluate_condition("${", &Map::new(), &ctx()));
        assert!(!evaluate_condition("", &Map::new(), &ctx()));
    }
}
