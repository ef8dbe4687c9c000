//! Production `TemplateRenderer` (spec §1 out-of-scope interface):
//! `recipe-eval` only ships `NullTemplateRenderer` as a test double, so the
//! host binary wires in a real engine the way `cli-sub-agent` wires a real
//! AI tool behind its own trait objects.

use handlebars::Handlebars;
use recipe_eval::TemplateRenderer;
use serde_json::Value;

/// Renders templates through `handlebars`, registered with strict mode off
/// so a reference to an unset variable renders empty rather than erroring —
/// matching `NullTemplateRenderer`'s forgiving behavior for output/lifecycle
/// message expressions that may legitimately be unset.
pub struct HandlebarsRenderer(Handlebars<'static>);

impl HandlebarsRenderer {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        Self(registry)
    }
}

impl Default for HandlebarsRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer for HandlebarsRenderer {
    fn render(&self, source: &str, scope: &Value) -> Result<String, String> {
        self.0
            .render_template(source, scope)
            .map_err(|err| err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_a_simple_substitution() {
        let renderer = HandlebarsRenderer::new();
        let scope = json!({ "name": "world" });
        assert_eq!(renderer.render("hello {{name}}!", &scope).unwrap(), "hello world!");
    }

    #[test]
    fn unset_variable_renders_empty_in_non_strict_mode() {
        let renderer = HandlebarsRenderer::new();
        assert_eq!(renderer.render("[{{missing}}]", &json!({})).unwrap(), "[]");
    }
}
