//! `--var KEY=VALUE` parsing (spec §6.1), grounded on the host's
//! `plan_cmd.rs::parse_variables`/`validate_variable_name`.

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};

/// Parse `KEY=VALUE` pairs into a variable scope. Each value is parsed as
/// JSON first (so `--var count=5` yields a number and `--var on=true` a
/// boolean) and falls back to a plain string when it isn't valid JSON.
pub fn parse_variables(entries: &[String]) -> Result<Map<String, Value>> {
    let mut scope = Map::new();
    for entry in entries {
        let (key, raw_value) = entry
            .split_once('=')
            .with_context(|| format!("invalid --var format '{entry}': expected KEY=VALUE"))?;
        validate_variable_name(key)?;
        scope.insert(key.to_string(), coerce_cli_value(raw_value));
    }
    Ok(scope)
}

fn coerce_cli_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// `[A-Za-z_][A-Za-z0-9_]*`, matching the recipe variable-name grammar.
fn validate_variable_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        bail!("invalid variable name '': must match [A-Za-z_][A-Za-z0-9_]*");
    };
    if !(first == '_' || first.is_ascii_alphabetic()) {
        bail!("invalid variable name '{name}': must match [A-Za-z_][A-Za-z0-9_]*");
    }
    if !chars.clone().all(|c| c == '_' || c.is_ascii_alphanumeric()) {
        bail!("invalid variable name '{name}': must match [A-Za-z_][A-Za-z0-9_]*");
    }
    Ok(())
}
