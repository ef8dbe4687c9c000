//! Variable Declaration (spec §3).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The type tag of a declared variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    String,
    Number,
    Boolean,
    Enum,
    Array,
    Object,
    File,
    Directory,
}

/// A single `variables.<name>` entry from the recipe document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDecl {
    #[serde(rename = "type")]
    pub var_type: VariableType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub suggestion: Option<Value>,
    /// Valid values, only meaningful when `var_type == Enum`.
    #[serde(default)]
    pub values: Vec<Value>,
    /// For `File`/`Directory`: skip existence validation when true.
    #[serde(default)]
    pub allow_missing: bool,
}

impl VariableDecl {
    /// Validate `value` against this declaration's type and constraints.
    /// Existence checks for `file`/`directory` are resolved against
    /// `project_root` unless `allow_missing` is set.
    pub fn validate(&self, value: &Value, project_root: &std::path::Path) -> Result<(), String> {
        match self.var_type {
            VariableType::String => {
                if !value.is_string() {
                    return Err("expected a string".into());
                }
            }
            VariableType::Number => {
                if !value.is_number() {
                    return Err("expected a number".into());
                }
            }
            VariableType::Boolean => {
                if !value.is_boolean() {
                    return Err("expected a boolean".into());
                }
            }
            VariableType::Array => {
                if !value.is_array() {
                    return Err("expected an array".into());
                }
            }
            VariableType::Object => {
                if !value.is_object() {
                    return Err("expected an object".into());
                }
            }
            VariableType::Enum => {
                if !self.values.iter().any(|candidate| candidate == value) {
                    return Err(format!(
                        "value {value} is not one of the declared enum values"
                    ));
                }
            }
            VariableType::File | VariableType::Directory => {
                let Some(raw) = value.as_str() else {
                    return Err("expected a path string".into());
                };
                if self.allow_missing {
                    return Ok(());
                }
                let path = project_root.join(raw);
                let exists = if self.var_type == VariableType::File {
                    path.is_file()
                } else {
                    path.is_dir()
                };
                if !exists {
                    return Err(format!("path '{raw}' does not exist"));
                }
            }
        }
        Ok(())
    }
}
