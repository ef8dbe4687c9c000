//! Step Result (spec §3) and the file/variable effects the executor
//! aggregates around it.

use crate::step::ToolType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Failed,
    Skipped,
    Cancelled,
    TimedOut,
}

impl StepStatus {
    /// Spec §4.4: a `skipped` upstream satisfies `dependsOn` the same as
    /// `completed` (decided open question, SPEC_FULL §9.1).
    pub fn satisfies_dependency(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }

    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::TimedOut | Self::Cancelled)
    }
}

/// A structured, serializable error attached to a failed/timed-out step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    pub kind: String,
    pub message: String,
    pub tool_type: ToolType,
    pub step_name: String,
}

/// Why a step was skipped (spec §4.4 lifecycle step 3, and the
/// `continueOnError` propagation rule).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    ConditionFalse,
    UpstreamFailure,
    Cancelled,
}

/// One completed (or terminated) step's outcome. Never mutated after
/// creation — the engine's single source of truth per step name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_name: String,
    pub tool_type: ToolType,
    pub status: StepStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    pub retry_count: u32,
    pub dependencies_satisfied: bool,
    /// Opaque to the executor: whatever the tool returned.
    pub tool_result: Value,
    pub error: Option<StructuredError>,
    pub skip_reason: Option<SkipReason>,
    pub files_created: Vec<String>,
    pub files_modified: Vec<String>,
    pub files_deleted: Vec<String>,
    /// Evaluated `output` exports (spec §4.3) — merged into the scope
    /// before later phases run.
    pub output: HashMap<String, Value>,
}

mod duration_millis {
    use serde::{Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u128(d.as_millis())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Aggregated file-system effects across a whole `executeSteps` run (spec
/// §4.5 `aggregateResults`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileEffects {
    pub created: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
}

impl FileEffects {
    pub fn extend_from(&mut self, result: &StepResult) {
        self.created
            .extend(result.files_created.iter().cloned());
        self.modified
            .extend(result.files_modified.iter().cloned());
        self.deleted
            .extend(result.files_deleted.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_satisfies_dependency_completed_satisfies_dependency() {
        assert!(StepStatus::Skipped.satisfies_dependency());
        assert!(StepStatus::Completed.satisfies_dependency());
        assert!(!StepStatus::Failed.satisfies_dependency());
        assert!(!StepStatus::Cancelled.satisfies_dependency());
    }

    #[test]
    fn failed_timed_out_cancelled_are_terminal_failures() {
        assert!(StepStatus::Failed.is_terminal_failure());
        assert!(StepStatus::TimedOut.is_terminal_failure());
        assert!(StepStatus::Cancelled.is_terminal_failure());
        assert!(!StepStatus::Completed.is_terminal_failure());
        assert!(!StepStatus::Skipped.is_terminal_failure());
    }
}
