//! Recipe Engine (spec §4.5): ties `loadRecipe`, `validateRecipe`,
//! `resolveVariables`, the two-phase AI Collector, and the Step Executor
//! together into `executeRecipe`/`cancelExecution`, the crate's single
//! entry point for running a recipe end to end.

pub mod ai;
pub mod execute;
pub mod load;
pub mod resolve;
pub mod validate;

pub use ai::{AiCollector, AiCollectorEntry, AiCollectorSnapshot, AssembledPrompt, global_ai_collector};
pub use execute::{
    ExecuteRequest, RecipeExecutionResult, cancel_execution, create_execution_context, execute_recipe,
};
pub use load::{cleanup_recipe_cache, load_recipe};
pub use resolve::{ResolveOptions, VariableAiTransport, VariablePrompter, resolve_variables};
pub use validate::{DependencyLoader, ValidationReport, validate_recipe, validate_recipe_or_error};
