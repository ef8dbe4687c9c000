//! Closed set of error kinds for the Recipe Engine (spec §7).

use crate::ToolType;

/// Every error the engine can surface, as a closed `thiserror` enum rather
/// than string-typed errors — mirrors the host's `AppError` convention.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    ValidationError(String),

    #[error("missing required variable(s): {}", .0.join(", "))]
    MissingRequiredVariables(Vec<String>),

    #[error("step '{step}' depends on unknown step '{target}'")]
    DependencyError { step: String, target: String },

    #[error("circular dependency detected among steps: {}", .0.join(" -> "))]
    CircularDependencyError(Vec<String>),

    #[error("no tool registered for ({tool_type:?}, \"{name}\")")]
    ToolNotFound { tool_type: ToolType, name: String },

    #[error("tool execution failed in step '{step}' ({tool_type:?}): {source}")]
    ToolExecutionError {
        step: String,
        tool_type: ToolType,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("step '{step}' timed out after {elapsed_ms}ms (limit {limit_ms}ms)")]
    Timeout {
        step: String,
        elapsed_ms: u64,
        limit_ms: u64,
    },

    #[error("execution '{0}' was cancelled")]
    Cancelled(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("AI resolution failed: {0}")]
    AiResolutionError(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl EngineError {
    /// The §7 error-kind tag, for hosts that want a stable machine-readable
    /// discriminant independent of the Display message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ValidationError(_) | Self::MissingRequiredVariables(_) => "VALIDATION_ERROR",
            Self::DependencyError { .. } => "DEPENDENCY_ERROR",
            Self::CircularDependencyError(_) => "CIRCULAR_DEPENDENCY_ERROR",
            Self::ToolNotFound { .. } => "TOOL_NOT_FOUND",
            Self::ToolExecutionError { .. } => "TOOL_EXECUTION_ERROR",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Cancelled(_) => "CANCELLED",
            Self::FileNotFound(_) => "FILE_NOT_FOUND",
            Self::AiResolutionError(_) => "AI_RESOLUTION_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_match_spec_closed_set() {
        assert_eq!(
            EngineError::ValidationError("x".into()).kind(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            EngineError::CircularDependencyError(vec!["a".into(), "b".into()]).kind(),
            "CIRCULAR_DEPENDENCY_ERROR"
        );
        assert_eq!(
            EngineError::Cancelled("exec-1".into()).kind(),
            "CANCELLED"
        );
    }

    #[test]
    fn display_missing_required_variables_lists_all_names() {
        let err = EngineError::MissingRequiredVariables(vec!["name".into(), "target".into()]);
        assert_eq!(
            err.to_string(),
            "missing required variable(s): name, target"
        );
    }

    #[test]
    fn display_dependency_error_names_both_steps() {
        let err = EngineError::DependencyError {
            step: "b".into(),
            target: "a".into(),
        };
        assert_eq!(err.to_string(), "step 'b' depends on unknown step 'a'");
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EngineError>();
    }
}
