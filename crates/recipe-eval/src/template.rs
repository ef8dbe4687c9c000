//! The template rendering engine is out of scope (spec §1): it is
//! consumed through this trait, never implemented here. `NullTemplateRenderer`
//! is a test double only — it understands `{{ name }}` substitution and
//! nothing else.

use serde_json::Value;

pub trait TemplateRenderer: Send + Sync {
    /// Render `source` against `scope`. Errors are caller's to handle —
    /// the Output Evaluator degrades them to an undefined export rather
    /// than failing the step (spec §4.3).
    fn render(&self, source: &str, scope: &Value) -> Result<String, String>;
}

/// Test double only (SPEC_FULL §4.3) — not a production renderer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTemplateRenderer;

impl TemplateRenderer for NullTemplateRenderer {
    fn render(&self, source: &str, scope: &Value) -> Result<String, String> {
        let mut output = source.to_string();
        let Value::Object(map) = scope else {
            return Ok(output);
        };
        for (key, value) in map {
            let needle = format!("{{{{ {key} }}}}");
            let compact_needle = format!("{{{{{key}}}}}");
            let replacement = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            output = output.replace(&needle, &replacement);
            output = output.replace(&compact_needle, &replacement);
        }
        Ok(output)
    }
}

/// A string contains a template marker recognized by the Output Evaluator
/// (spec §4.3): `{{ ... }}` or an `@`-prefixed helper call.
pub fn contains_template_markers(expr: &str) -> bool {
    expr.contains("{{") || expr.trim_start().starts_with('@')
}
