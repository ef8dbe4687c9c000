//! Interactive `VariablePrompter` (`--ask me`), the CLI's wiring of the
//! engine's out-of-scope prompt UI (spec §1) onto a plain stdin/stdout
//! readline loop — no TUI dependency, matching the host's preference for a
//! small hand-rolled implementation over pulling in a crate for this.

use recipe_core::{EngineError, EngineResult, VariableDecl, VariableType};
use recipe_engine::VariablePrompter;
use serde_json::Value;
use std::io::Write;

pub struct StdinPrompter;

impl VariablePrompter for StdinPrompter {
    fn prompt(&self, name: &str, decl: &VariableDecl) -> EngineResult<Value> {
        let mut line = String::new();
        print!("{}", prompt_label(name, decl));
        std::io::stdout()
            .flush()
            .map_err(|e| EngineError::InternalError(e.to_string()))?;
        std::io::stdin()
            .read_line(&mut line)
            .map_err(|e| EngineError::InternalError(e.to_string()))?;
        parse_answer(line.trim(), decl)
    }
}

fn prompt_label(name: &str, decl: &VariableDecl) -> String {
    match &decl.description {
        Some(description) => format!("{name} ({description}): "),
        None => format!("{name}: "),
    }
}

fn parse_answer(raw: &str, decl: &VariableDecl) -> EngineResult<Value> {
    let value = match decl.var_type {
        VariableType::Number => raw
            .parse::<f64>()
            .map(Value::from)
            .map_err(|_| EngineError::ValidationError(format!("'{raw}' is not a number")))?,
        VariableType::Boolean => match raw.to_ascii_lowercase().as_str() {
            "y" | "yes" | "true" => Value::Bool(true),
            "n" | "no" | "false" => Value::Bool(false),
            other => return Err(EngineError::ValidationError(format!("'{other}' is not a yes/no answer"))),
        },
        VariableType::Array | VariableType::Object => serde_json::from_str(raw)
            .map_err(|e| EngineError::ValidationError(format!("expected JSON: {e}")))?,
        VariableType::String | VariableType::Enum | VariableType::File | VariableType::Directory => {
            Value::String(raw.to_string())
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(var_type: VariableType) -> VariableDecl {
        VariableDecl {
            var_type,
            required: true,
            default: None,
            description: None,
            suggestion: None,
            values: Vec::new(),
            allow_missing: false,
        }
    }

    #[test]
    fn parses_boolean_yes_no_answers() {
        assert_eq!(parse_answer("yes", &decl(VariableType::Boolean)).unwrap(), Value::Bool(true));
        assert_eq!(parse_answer("no", &decl(VariableType::Boolean)).unwrap(), Value::Bool(false));
        assert!(parse_answer("maybe", &decl(VariableType::Boolean)).is_err());
    }

    #[test]
    fn parses_number_answers() {
        assert_eq!(parse_answer("42", &decl(VariableType::Number)).unwrap(), Value::from(42.0));
        assert!(parse_answer("not-a-number", &decl(VariableType::Number)).is_err());
    }

    #[test]
    fn string_answers_pass_through_verbatim() {
        assert_eq!(parse_answer("hello", &decl(VariableType::String)).unwrap(), Value::String("hello".into()));
    }
}
