//! The `Tool` trait a registered implementation must satisfy (spec §4.4).

use async_trait::async_trait;
use recipe_core::{EngineResult, ExecutionContext, Step};
use serde_json::Value;

/// One registered handler for a single `ToolType` (spec §4.4 Tool Registry).
///
/// Every built-in tool in this crate implements this trait; hosts may
/// register their own implementations under the same closed `ToolType` set
/// (e.g. swapping in a different `shell` sandbox) without touching the
/// Step Executor.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Reject a step before execution (missing fields, bad paths, etc.).
    /// Called once by `validateRecipe` (spec §4.1) and again defensively
    /// before the first attempt.
    fn validate(&self, step: &Step) -> EngineResult<()>;

    /// Run the step's payload against `ctx`, returning the tool result
    /// that becomes `result` in the step's output scope (spec §4.3).
    async fn execute(&self, step: &Step, ctx: &ExecutionContext) -> EngineResult<Value>;
}
