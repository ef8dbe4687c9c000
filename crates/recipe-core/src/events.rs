//! Lifecycle events observable to a host (spec §6).

use crate::result::StepStatus;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use ulid::Ulid;

/// One observable lifecycle event. Structured, not a log string, so hosts
/// (CLIs, TUIs) can drive progress UIs without parsing (spec §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    RecipeStarted {
        execution_id: String,
        recipe_name: String,
    },
    RecipeCompleted {
        execution_id: String,
        recipe_name: String,
        #[serde(with = "duration_millis")]
        duration: Duration,
        success: bool,
    },
    RecipeFailed {
        execution_id: String,
        recipe_name: String,
        error: String,
    },
    RecipeCancelled {
        execution_id: String,
        recipe_name: String,
    },
    PhaseStarted {
        execution_id: String,
        phase_index: usize,
        step_count: usize,
    },
    PhaseCompleted {
        execution_id: String,
        phase_index: usize,
    },
    StepStarted {
        execution_id: String,
        step_name: String,
    },
    StepCompleted {
        execution_id: String,
        step_name: String,
        #[serde(with = "duration_millis")]
        duration: Duration,
        status: StepStatus,
    },
    StepFailed {
        execution_id: String,
        step_name: String,
        #[serde(with = "duration_millis")]
        duration: Duration,
        error: String,
    },
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

/// Sink a `LifecycleEvent` is emitted to. The default implementation logs
/// at `tracing::info!`/`debug!`; hosts wanting a TUI/progress bar swap this
/// out (spec §9 "prefer structured events over log strings").
pub trait EventSink: Send + Sync {
    fn emit(&self, event: LifecycleEvent);
}

/// Emits every event through `tracing`, matching the host's logging
/// conventions (`csa-*` crates log via `tracing::{info,warn,debug}!`).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: LifecycleEvent) {
        match &event {
            LifecycleEvent::RecipeStarted { recipe_name, .. } => {
                tracing::info!(recipe = %recipe_name, "recipe:started");
            }
            LifecycleEvent::RecipeCompleted {
                recipe_name,
                success,
                ..
            } => {
                tracing::info!(recipe = %recipe_name, success, "recipe:completed");
            }
            LifecycleEvent::RecipeFailed {
                recipe_name, error, ..
            } => {
                tracing::warn!(recipe = %recipe_name, error = %error, "recipe:failed");
            }
            LifecycleEvent::RecipeCancelled { recipe_name, .. } => {
                tracing::warn!(recipe = %recipe_name, "recipe:cancelled");
            }
            LifecycleEvent::PhaseStarted {
                phase_index,
                step_count,
                ..
            } => {
                tracing::debug!(phase_index, step_count, "phase:started");
            }
            LifecycleEvent::PhaseCompleted { phase_index, .. } => {
                tracing::debug!(phase_index, "phase:completed");
            }
            LifecycleEvent::StepStarted { step_name, .. } => {
                tracing::info!(step = %step_name, "step:started");
            }
            LifecycleEvent::StepCompleted {
                step_name, status, ..
            } => {
                tracing::info!(step = %step_name, ?status, "step:completed");
            }
            LifecycleEvent::StepFailed {
                step_name, error, ..
            } => {
                tracing::warn!(step = %step_name, error = %error, "step:failed");
            }
        }
    }
}

/// Generate a fresh execution identifier (spec SPEC_FULL §3.1).
pub fn new_execution_id() -> Ulid {
    Ulid::new()
}
