//! Execution Context (spec §3) passed to every tool.

use crate::result::StepResult;
use crate::step::Step;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag shared across an execution. Cheap to
/// clone, checked (never blocked on) by tools at their suspension points
/// (spec §5).
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Append-only, name-indexed record of completed steps. A `Vec` rather
/// than a map keeps declared-order iteration trivial (spec §4.4 "results
/// appear in the declared order") while `get` stays a simple linear scan —
/// recipes are small enough that this is not a bottleneck.
#[derive(Debug, Clone, Default)]
pub struct StepResults(Vec<StepResult>);

impl StepResults {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, result: StepResult) {
        debug_assert!(
            self.get(&result.step_name).is_none(),
            "at most one StepResult per step name (spec invariant)"
        );
        self.0.push(result);
    }

    pub fn get(&self, step_name: &str) -> Option<&StepResult> {
        self.0.iter().find(|r| r.step_name == step_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepResult> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<StepResult> {
        self.0
    }
}

/// Everything a Tool implementation sees (spec §3 "Execution Context").
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Current resolved variables, flattened to a JSON object. Mutated
    /// (by merging Output Evaluator exports) between phases only — never
    /// within a phase (spec §5 "atomic per step at completion").
    pub variables: Map<String, Value>,
    /// Immutable snapshot of the original resolved inputs.
    pub recipe_variables: Map<String, Value>,
    pub step_results: StepResults,
    pub project_root: PathBuf,
    pub template_path: Option<PathBuf>,
    pub dry_run: bool,
    pub force: bool,
    /// Pre-recorded AI answers (Pass 2 input). `None` during Pass 1.
    pub answers: Option<HashMap<String, Value>>,
    /// True during Pass 1 (collect) when `answers` is absent and AI
    /// collection is active (spec §4.5 two-phase AI generation).
    pub collect_mode: bool,
    pub cancelled: CancellationFlag,
    /// The step currently being executed, if any (tools read their own
    /// step from here rather than receiving it twice).
    pub current_step: Option<Step>,
}

impl ExecutionContext {
    pub fn new(project_root: impl Into<PathBuf>, recipe_variables: Map<String, Value>) -> Self {
        Self {
            variables: recipe_variables.clone(),
            recipe_variables,
            step_results: StepResults::new(),
            project_root: project_root.into(),
            template_path: None,
            dry_run: false,
            force: false,
            answers: None,
            collect_mode: false,
            cancelled: CancellationFlag::new(),
            current_step: None,
        }
    }

    /// File-exists predicate resolved against `project_root`, exposed to
    /// the Condition Evaluator (spec §4.2).
    pub fn file_exists(&self, relative: &str) -> bool {
        self.resolve_path(relative).is_file()
    }

    pub fn dir_exists(&self, relative: &str) -> bool {
        self.resolve_path(relative).is_dir()
    }

    fn resolve_path(&self, relative: &str) -> PathBuf {
        let candidate = Path::new(relative);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.project_root.join(candidate)
        }
    }

    /// Merge a step's evaluated `output` exports into the shared scope.
    /// Called by the executor between phases, never mid-phase.
    pub fn merge_outputs(&mut self, outputs: &HashMap<String, Value>) {
        for (name, value) in outputs {
            self.variables.insert(name.clone(), value.clone());
        }
    }
}
