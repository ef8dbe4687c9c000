//! Data model for the Recipe Engine: recipes, steps, variables, results,
//! execution context, lifecycle events, and the closed error-kind set.

pub mod context;
pub mod error;
pub mod events;
pub mod recipe;
pub mod result;
pub mod step;
pub mod variable;

pub use context::{CancellationFlag, ExecutionContext, StepResults};
pub use error::{EngineError, EngineResult};
pub use events::{EventSink, LifecycleEvent, TracingEventSink, new_execution_id};
pub use recipe::{Hook, Hooks, Recipe, RecipeDependency, ValidationIssue};
pub use result::{FileEffects, SkipReason, StepResult, StepStatus, StructuredError};
pub use step::{RetryPolicy, Step, StepPayload, ToolType};
pub use variable::{VariableDecl, VariableType};
