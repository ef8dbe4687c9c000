//! Condition Evaluator and Output Evaluator (spec §4.2, §4.3).

pub mod condition;
pub mod output;
pub mod path;
pub mod scope;
pub mod template;

pub use condition::evaluate_condition;
pub use output::evaluate_outputs;
pub use scope::build_scope;
pub use template::{NullTemplateRenderer, TemplateRenderer, contains_template_markers};
