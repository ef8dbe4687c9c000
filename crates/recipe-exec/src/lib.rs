//! Step Executor (spec §4.4): dependency-graph phase construction,
//! bounded concurrency, per-step timeout/retry/validation lifecycle,
//! cancellation, metrics, and the nested-step-counting rule that keeps
//! `sequence`/`parallel` containers out of leaf progress totals.

pub mod dag;
pub mod metrics;
pub mod retry;

use chrono::Utc;
use recipe_core::{
    EngineResult, EventSink, ExecutionContext, FileEffects, LifecycleEvent, SkipReason, Step,
    StepPayload, StepResult, StepStatus, StructuredError, ToolType,
};
use recipe_eval::TemplateRenderer;
use recipe_tools::ToolRegistry;
use retry::RetryDecision;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Tunables the executor needs from the engine's configuration surface
/// (spec §6). Kept independent of `recipe-config` so this crate has no
/// upward dependency on the engine layer — the `EngineOptions -> ExecutorOptions`
/// mapping lives with the engine instead.
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    pub max_concurrency: usize,
    pub default_timeout: Duration,
    pub default_retries: u32,
    pub continue_on_error: bool,
    pub enable_parallel_execution: bool,
    pub timeout_safety_factor: f64,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            default_timeout: Duration::from_secs(30),
            default_retries: 0,
            continue_on_error: false,
            enable_parallel_execution: true,
            timeout_safety_factor: 1.5,
        }
    }
}

/// Why the executor stopped starting new steps. Distinct from `SkipReason`
/// on a per-step basis so the phase loop can decide, once, whether to keep
/// going — every not-yet-started step then gets the matching skip reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AbortCause {
    UpstreamFailure,
    Cancelled,
}

impl From<AbortCause> for SkipReason {
    fn from(cause: AbortCause) -> Self {
        match cause {
            AbortCause::UpstreamFailure => SkipReason::UpstreamFailure,
            AbortCause::Cancelled => SkipReason::Cancelled,
        }
    }
}

/// The Step Executor (spec §4.4). Holds the tool registry and event sink
/// for a whole run; all per-run state (variables, step results,
/// cancellation) lives in the `ExecutionContext` passed to `execute_steps`.
pub struct StepExecutor {
    registry: Arc<ToolRegistry>,
    options: ExecutorOptions,
    event_sink: Arc<dyn EventSink>,
}

impl StepExecutor {
    pub fn new(registry: Arc<ToolRegistry>, options: ExecutorOptions, event_sink: Arc<dyn EventSink>) -> Self {
        Self {
            registry,
            options,
            event_sink,
        }
    }

    /// Run `steps` to completion against `ctx`, returning one result per
    /// top-level step in declared order (spec §4.4 contract). A dependency
    /// cycle or unknown `dependsOn` target aborts before any step's
    /// lifecycle events fire (spec §8 scenario 3).
    pub async fn execute_steps(
        &self,
        steps: &[Step],
        ctx: &mut ExecutionContext,
        execution_id: &str,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> EngineResult<Vec<StepResult>> {
        let plan = dag::build_plan(steps)?;
        let by_name: HashMap<&str, &Step> = steps.iter().map(|s| (s.name.as_str(), s)).collect();

        let mut results: HashMap<String, StepResult> = HashMap::new();
        let mut abort: Option<AbortCause> = None;

        for (phase_index, phase_names) in plan.phases.iter().enumerate() {
            self.event_sink.emit(LifecycleEvent::PhaseStarted {
                execution_id: execution_id.to_string(),
                phase_index,
                step_count: phase_names.len(),
            });

            if ctx.cancelled.is_cancelled() && abort.is_none() {
                abort = Some(AbortCause::Cancelled);
            }

            let (parallel_names, serial_names): (Vec<&String>, Vec<&String>) = phase_names
                .iter()
                .partition(|name| by_name[name.as_str()].parallel && !by_name[name.as_str()].is_container());
            let container_names: Vec<&String> = phase_names
                .iter()
                .filter(|name| by_name[name.as_str()].is_container())
                .collect();

            let mut phase_patch: HashMap<String, Value> = HashMap::new();

            let (batch_results, batch_patch) = self
                .run_concurrent_batch(&parallel_names, &by_name, ctx, execution_id, renderer.clone(), &mut abort, &results)
                .await;
            for result in batch_results {
                ctx.step_results.push(result.clone());
                results.insert(result.step_name.clone(), result);
            }
            phase_patch.extend(batch_patch);

            for name in serial_names {
                let step = by_name[name.as_str()];
                let (result, patch) = if !dependencies_satisfied(step, &results) {
                    dependency_skip(step)
                } else {
                    self.run_one(step, ctx, &phase_patch, execution_id, renderer.clone(), abort).await
                };
                if result.status.is_terminal_failure() && !self.effective_continue_on_error(step) {
                    abort = Some(AbortCause::UpstreamFailure);
                }
                phase_patch.extend(patch);
                ctx.step_results.push(result.clone());
                results.insert(result.step_name.clone(), result);
            }

            ctx.merge_outputs(&phase_patch);

            for name in container_names {
                let step = by_name[name.as_str()];
                let result = if !dependencies_satisfied(step, &results) {
                    dependency_skip(step).0
                } else {
                    self.run_container(step, ctx, execution_id, renderer.clone(), abort).await
                };
                if result.status.is_terminal_failure() && !self.effective_continue_on_error(step) {
                    abort = Some(AbortCause::UpstreamFailure);
                }
                ctx.step_results.push(result.clone());
                results.insert(result.step_name.clone(), result);
            }

            self.event_sink.emit(LifecycleEvent::PhaseCompleted {
                execution_id: execution_id.to_string(),
                phase_index,
            });
        }

        Ok(steps
            .iter()
            .map(|s| results.remove(&s.name).expect("every step produced a result"))
            .collect())
    }

    fn effective_continue_on_error(&self, step: &Step) -> bool {
        step.continue_on_error.unwrap_or(self.options.continue_on_error)
    }

    /// Run every `parallel: true` leaf step in `names` concurrently, bounded
    /// by `maxConcurrency` (spec §5), via cloned immutable context snapshots
    /// — their output exports are collected into a patch and merged into the
    /// real `ctx` only after the whole batch completes ("scope as immutable
    /// snapshot plus patch", spec §5).
    async fn run_concurrent_batch(
        &self,
        names: &[&String],
        by_name: &HashMap<&str, &Step>,
        ctx: &ExecutionContext,
        execution_id: &str,
        renderer: Arc<dyn TemplateRenderer>,
        abort: &mut Option<AbortCause>,
        results: &HashMap<String, StepResult>,
    ) -> (Vec<StepResult>, HashMap<String, Value>) {
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.options.max_concurrency.max(1)));
        let mut join_set: JoinSet<(StepResult, HashMap<String, Value>)> = JoinSet::new();

        for name in names {
            let step = (*by_name[name.as_str()]).clone();

            if !dependencies_satisfied(&step, results) {
                let (result, _) = dependency_skip(&step);
                join_set.spawn(async move { (result, HashMap::new()) });
                continue;
            }

            if let Some(cause) = *abort {
                let (result, _) = skipped_result(&step, cause);
                join_set.spawn(async move { (result, HashMap::new()) });
                continue;
            }
            if ctx.cancelled.is_cancelled() {
                let (result, _) = skipped_result(&step, AbortCause::Cancelled);
                join_set.spawn(async move { (result, HashMap::new()) });
                continue;
            }

            let ctx_snapshot = ctx.clone();
            let semaphore = semaphore.clone();
            let registry = self.registry.clone();
            let options = self.options.clone();
            let event_sink = self.event_sink.clone();
            let execution_id = execution_id.to_string();
            let renderer = renderer.clone();

            join_set.spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore not closed");
                run_leaf_step(&step, &ctx_snapshot, &registry, &options, &event_sink, &execution_id, renderer.as_ref()).await
            });
        }

        let mut batch_results = Vec::new();
        let mut patch = HashMap::new();
        while let Some(joined) = join_set.join_next().await {
            let (result, outputs) = match joined {
                Ok(pair) => pair,
                Err(join_err) => (panicked_result(join_err.to_string()), HashMap::new()),
            };
            if result.status.is_terminal_failure() {
                if let Some(step) = by_name.get(result.step_name.as_str()) {
                    if !self.effective_continue_on_error(step) {
                        *abort = Some(AbortCause::UpstreamFailure);
                    }
                }
            }
            patch.extend(outputs);
            batch_results.push(result);
        }

        (batch_results, patch)
    }

    /// Run a single `parallel: false` leaf step against `ctx`, with any
    /// exports already collected earlier in the same phase layered on top
    /// (siblings within a phase's serial tail see each other's outputs).
    async fn run_one(
        &self,
        step: &Step,
        ctx: &ExecutionContext,
        extra_scope: &HashMap<String, Value>,
        execution_id: &str,
        renderer: Arc<dyn TemplateRenderer>,
        abort: Option<AbortCause>,
    ) -> (StepResult, HashMap<String, Value>) {
        if let Some(cause) = abort {
            return skipped_result(step, cause);
        }
        if ctx.cancelled.is_cancelled() {
            return skipped_result(step, AbortCause::Cancelled);
        }
        let mut snapshot = ctx.clone();
        for (k, v) in extra_scope {
            snapshot.variables.insert(k.clone(), v.clone());
        }
        run_leaf_step(step, &snapshot, &self.registry, &self.options, &self.event_sink, execution_id, renderer.as_ref()).await
    }

    /// Execute a `sequence`/`parallel` container step by recursing into its
    /// nested steps through the same phase machinery, sharing `ctx` so
    /// nested exports are visible to later nested steps immediately. The
    /// container itself never counts toward leaf totals (spec §9).
    fn run_container<'a>(
        &'a self,
        step: &'a Step,
        ctx: &'a mut ExecutionContext,
        execution_id: &'a str,
        renderer: Arc<dyn TemplateRenderer>,
        abort: Option<AbortCause>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = StepResult> + Send + 'a>> {
        Box::pin(async move {
            let started_at = Utc::now();
            self.event_sink.emit(LifecycleEvent::StepStarted {
                execution_id: execution_id.to_string(),
                step_name: step.name.clone(),
            });

            if let Some(cause) = abort {
                let (result, _) = skipped_result(step, cause);
                return result;
            }

            let scope = recipe_eval::build_scope(ctx, &step.variable_overrides);
            if let Some(when) = &step.when {
                if !recipe_eval::evaluate_condition(when, &scope, ctx) {
                    return condition_skip(step, started_at);
                }
            }
            if let Some(skip_if) = &step.skip_if {
                if recipe_eval::evaluate_condition(skip_if, &scope, ctx) {
                    return condition_skip(step, started_at);
                }
            }

            let nested = match &step.payload {
                StepPayload::Sequence { steps } | StepPayload::Parallel { steps } => steps,
                _ => unreachable!("container dispatch only reaches sequence/parallel steps"),
            };
            // A `sequence` forces every child serial regardless of its own
            // `parallel` hint, matching what the tool's name promises; a
            // `parallel` container honors each child's own hint.
            let forced_serial: Vec<Step>;
            let nested_slice: &[Step] = if matches!(step.payload, StepPayload::Sequence { .. }) {
                forced_serial = nested
                    .iter()
                    .cloned()
                    .map(|mut s| {
                        s.parallel = false;
                        s
                    })
                    .collect();
                &forced_serial
            } else {
                nested
            };

            let inner_results = match self.execute_steps(nested_slice, ctx, execution_id, renderer.clone()).await {
                Ok(results) => results,
                Err(err) => return failed_result(step, started_at, "DEPENDENCY_ERROR", err.to_string()),
            };

            let mut file_effects = FileEffects::default();
            let mut any_failed = false;
            for r in &inner_results {
                file_effects.extend_from(r);
                if r.status.is_terminal_failure() {
                    any_failed = true;
                }
            }

            let tool_result = json!({ "steps": inner_results });
            let output = recipe_eval::evaluate_outputs(
                &step.output,
                &step.name,
                &tool_result,
                ctx,
                &step.variable_overrides,
                renderer.as_ref(),
            );
            ctx.merge_outputs(&output);

            let ended_at = Utc::now();
            let status = if any_failed { StepStatus::Failed } else { StepStatus::Completed };
            let duration = (ended_at - started_at).to_std().unwrap_or(Duration::ZERO);
            emit_terminal(self.event_sink.as_ref(), step, execution_id, status, duration);

            StepResult {
                step_name: step.name.clone(),
                tool_type: step.tool_type(),
                status,
                started_at,
                ended_at,
                duration,
                retry_count: 0,
                dependencies_satisfied: true,
                tool_result,
                error: any_failed.then(|| StructuredError {
                    kind: "TOOL_EXECUTION_ERROR".into(),
                    message: format!("nested step failed inside container '{}'", step.name),
                    tool_type: step.tool_type(),
                    step_name: step.name.clone(),
                }),
                skip_reason: None,
                files_created: file_effects.created,
                files_modified: file_effects.modified,
                files_deleted: file_effects.deleted,
                output,
            }
        })
    }
}

/// Spec §4.4 ordering guarantee: a step does not start until every step
/// named in its `dependsOn` has terminated with a status that
/// `satisfies_dependency` (`completed` or `skipped`). This is checked
/// per-step independent of the phase's `abort` cause — a step whose
/// `dependsOn` target failed stays skipped even when that target's own
/// `continueOnError` kept the rest of the phase running.
fn dependencies_satisfied(step: &Step, results: &HashMap<String, StepResult>) -> bool {
    step.depends_on.iter().all(|dep| {
        results.get(dep).map(|r| r.status.satisfies_dependency()).unwrap_or(false)
    })
}

fn dependency_skip(step: &Step) -> (StepResult, HashMap<String, Value>) {
    let now = Utc::now();
    (
        StepResult {
            step_name: step.name.clone(),
            tool_type: step.tool_type(),
            status: StepStatus::Skipped,
            started_at: now,
            ended_at: now,
            duration: Duration::ZERO,
            retry_count: 0,
            dependencies_satisfied: false,
            tool_result: Value::Null,
            error: None,
            skip_reason: Some(SkipReason::UpstreamFailure),
            files_created: vec![],
            files_modified: vec![],
            files_deleted: vec![],
            output: HashMap::new(),
        },
        HashMap::new(),
    )
}

fn skipped_result(step: &Step, cause: AbortCause) -> (StepResult, HashMap<String, Value>) {
    let now = Utc::now();
    (
        StepResult {
            step_name: step.name.clone(),
            tool_type: step.tool_type(),
            status: StepStatus::Skipped,
            started_at: now,
            ended_at: now,
            duration: Duration::ZERO,
            retry_count: 0,
            dependencies_satisfied: true,
            tool_result: Value::Null,
            error: None,
            skip_reason: Some(cause.into()),
            files_created: vec![],
            files_modified: vec![],
            files_deleted: vec![],
            output: HashMap::new(),
        },
        HashMap::new(),
    )
}

fn condition_skip(step: &Step, started_at: chrono::DateTime<Utc>) -> StepResult {
    let ended_at = Utc::now();
    StepResult {
        step_name: step.name.clone(),
        tool_type: step.tool_type(),
        status: StepStatus::Skipped,
        started_at,
        ended_at,
        duration: (ended_at - started_at).to_std().unwrap_or(Duration::ZERO),
        retry_count: 0,
        dependencies_satisfied: true,
        tool_result: Value::Null,
        error: None,
        skip_reason: Some(SkipReason::ConditionFalse),
        files_created: vec![],
        files_modified: vec![],
        files_deleted: vec![],
        output: HashMap::new(),
    }
}

fn failed_result(step: &Step, started_at: chrono::DateTime<Utc>, kind: &str, message: String) -> StepResult {
    let ended_at = Utc::now();
    StepResult {
        step_name: step.name.clone(),
        tool_type: step.tool_type(),
        status: StepStatus::Failed,
        started_at,
        ended_at,
        duration: (ended_at - started_at).to_std().unwrap_or(Duration::ZERO),
        retry_count: 0,
        dependencies_satisfied: true,
        tool_result: Value::Null,
        error: Some(StructuredError {
            kind: kind.to_string(),
            message,
            tool_type: step.tool_type(),
            step_name: step.name.clone(),
        }),
        skip_reason: None,
        files_created: vec![],
        files_modified: vec![],
        files_deleted: vec![],
        output: HashMap::new(),
    }
}

/// A task panic surfaces as a failed step rather than poisoning the whole
/// run — the rest of the batch still gets to finish.
fn panicked_result(message: String) -> StepResult {
    let now = Utc::now();
    StepResult {
        step_name: "<panicked>".to_string(),
        tool_type: ToolType::Shell,
        status: StepStatus::Failed,
        started_at: now,
        ended_at: now,
        duration: Duration::ZERO,
        retry_count: 0,
        dependencies_satisfied: true,
        tool_result: Value::Null,
        error: Some(StructuredError {
            kind: "INTERNAL_ERROR".into(),
            message: format!("step task panicked: {message}"),
            tool_type: ToolType::Shell,
            step_name: "<panicked>".into(),
        }),
        skip_reason: None,
        files_created: vec![],
        files_modified: vec![],
        files_deleted: vec![],
        output: HashMap::new(),
    }
}

fn emit_terminal(event_sink: &dyn EventSink, step: &Step, execution_id: &str, status: StepStatus, duration: Duration) {
    match status {
        StepStatus::Failed | StepStatus::TimedOut | StepStatus::Cancelled => {
            event_sink.emit(LifecycleEvent::StepFailed {
                execution_id: execution_id.to_string(),
                step_name: step.name.clone(),
                duration,
                error: format!("{status:?}"),
            });
        }
        _ => {
            event_sink.emit(LifecycleEvent::StepCompleted {
                execution_id: execution_id.to_string(),
                step_name: step.name.clone(),
                duration,
                status,
            });
        }
    }
}

/// Per-step lifecycle (spec §4.4 steps 1-8) for a single leaf tool
/// invocation: emit started, validate, evaluate `when`/`skipIf`, enforce
/// timeout, execute with retries, evaluate outputs, emit terminal event.
async fn run_leaf_step(
    step: &Step,
    ctx: &ExecutionContext,
    registry: &ToolRegistry,
    options: &ExecutorOptions,
    event_sink: &Arc<dyn EventSink>,
    execution_id: &str,
    renderer: &dyn TemplateRenderer,
) -> (StepResult, HashMap<String, Value>) {
    let started_at = Utc::now();
    event_sink.emit(LifecycleEvent::StepStarted {
        execution_id: execution_id.to_string(),
        step_name: step.name.clone(),
    });

    let tool = match registry.resolve(step.tool_type(), None) {
        Ok(tool) => tool,
        Err(err) => {
            return terminal_failure(step, started_at, event_sink, execution_id, "TOOL_NOT_FOUND", err.to_string());
        }
    };

    if let Err(err) = tool.validate(step) {
        return terminal_failure(step, started_at, event_sink, execution_id, "VALIDATION_ERROR", err.to_string());
    }

    let scope = recipe_eval::build_scope(ctx, &step.variable_overrides);
    if let Some(when) = &step.when {
        if !recipe_eval::evaluate_condition(when, &scope, ctx) {
            return skip_condition(step, started_at, event_sink, execution_id);
        }
    }
    if let Some(skip_if) = &step.skip_if {
        if recipe_eval::evaluate_condition(skip_if, &scope, ctx) {
            return skip_condition(step, started_at, event_sink, execution_id);
        }
    }

    let timeout_ms = step.timeout_ms.unwrap_or(options.default_timeout.as_millis() as u64);
    let hard_cap = Duration::from_secs_f64(timeout_ms as f64 / 1000.0 * options.timeout_safety_factor);

    let retry_policy = step.retries.unwrap_or(recipe_core::RetryPolicy {
        max_attempts: options.default_retries,
        backoff_factor: 2.0,
    });

    let affected_path = affected_path(&step.payload);
    let pre_exists = affected_path.map(|p| ctx.project_root.join(p).exists());

    let mut attempt = 0u32;
    let mut last_error: Option<recipe_core::EngineError> = None;
    let mut timed_out = false;
    let mut tool_result = None;

    loop {
        attempt += 1;
        match tokio::time::timeout(hard_cap, tool.execute(step, ctx)).await {
            Ok(Ok(value)) => {
                tool_result = Some(value);
                break;
            }
            Ok(Err(err)) => {
                last_error = Some(err);
            }
            Err(_) => {
                timed_out = true;
                break;
            }
        }
        match retry::decide_retry(attempt, &retry_policy) {
            RetryDecision::RetryAfter { delay } => {
                tokio::time::sleep(delay).await;
            }
            RetryDecision::GiveUp => break,
        }
    }

    let retry_count = attempt.saturating_sub(1);
    let ended_at = Utc::now();
    let duration = (ended_at - started_at).to_std().unwrap_or(Duration::ZERO);

    if timed_out {
        let result = StepResult {
            step_name: step.name.clone(),
            tool_type: step.tool_type(),
            status: StepStatus::TimedOut,
            started_at,
            ended_at,
            duration,
            retry_count,
            dependencies_satisfied: true,
            tool_result: Value::Null,
            error: Some(StructuredError {
                kind: "TIMEOUT".into(),
                message: format!("step '{}' exceeded {}ms", step.name, hard_cap.as_millis()),
                tool_type: step.tool_type(),
                step_name: step.name.clone(),
            }),
            skip_reason: None,
            files_created: vec![],
            files_modified: vec![],
            files_deleted: vec![],
            output: HashMap::new(),
        };
        event_sink.emit(LifecycleEvent::StepFailed {
            execution_id: execution_id.to_string(),
            step_name: step.name.clone(),
            duration,
            error: result.error.as_ref().unwrap().message.clone(),
        });
        return (result, HashMap::new());
    }

    let Some(tool_result) = tool_result else {
        let message = last_error.map(|e| e.to_string()).unwrap_or_else(|| "unknown tool failure".to_string());
        return terminal_failure(step, started_at, event_sink, execution_id, "TOOL_EXECUTION_ERROR", message);
    };

    let (created, modified) = file_effects_for(step, affected_path, pre_exists, ctx, &tool_result);
    let output = recipe_eval::evaluate_outputs(&step.output, &step.name, &tool_result, ctx, &step.variable_overrides, renderer);

    let result = StepResult {
        step_name: step.name.clone(),
        tool_type: step.tool_type(),
        status: StepStatus::Completed,
        started_at,
        ended_at,
        duration,
        retry_count,
        dependencies_satisfied: true,
        tool_result,
        error: None,
        skip_reason: None,
        files_created: created,
        files_modified: modified,
        files_deleted: vec![],
        output: output.clone(),
    };
    event_sink.emit(LifecycleEvent::StepCompleted {
        execution_id: execution_id.to_string(),
        step_name: step.name.clone(),
        duration,
        status: StepStatus::Completed,
    });
    (result, output)
}

fn skip_condition(
    step: &Step,
    started_at: chrono::DateTime<Utc>,
    event_sink: &Arc<dyn EventSink>,
    execution_id: &str,
) -> (StepResult, HashMap<String, Value>) {
    let ended_at = Utc::now();
    let duration = (ended_at - started_at).to_std().unwrap_or(Duration::ZERO);
    event_sink.emit(LifecycleEvent::StepCompleted {
        execution_id: execution_id.to_string(),
        step_name: step.name.clone(),
        duration,
        status: StepStatus::Skipped,
    });
    (
        StepResult {
            step_name: step.name.clone(),
            tool_type: step.tool_type(),
            status: StepStatus::Skipped,
            started_at,
            ended_at,
            duration,
            retry_count: 0,
            dependencies_satisfied: true,
            tool_result: Value::Null,
            error: None,
            skip_reason: Some(SkipReason::ConditionFalse),
            files_created: vec![],
            files_modified: vec![],
            files_deleted: vec![],
            output: HashMap::new(),
        },
        HashMap::new(),
    )
}

fn terminal_failure(
    step: &Step,
    started_at: chrono::DateTime<Utc>,
    event_sink: &Arc<dyn EventSink>,
    execution_id: &str,
    kind: &str,
    message: String,
) -> (StepResult, HashMap<String, Value>) {
    let ended_at = Utc::now();
    let duration = (ended_at - started_at).to_std().unwrap_or(Duration::ZERO);
    event_sink.emit(LifecycleEvent::StepFailed {
        execution_id: execution_id.to_string(),
        step_name: step.name.clone(),
        duration,
        error: message.clone(),
    });
    (
        StepResult {
            step_name: step.name.clone(),
            tool_type: step.tool_type(),
            status: StepStatus::Failed,
            started_at,
            ended_at,
            duration,
            retry_count: 0,
            dependencies_satisfied: true,
            tool_result: Value::Null,
            error: Some(StructuredError {
                kind: kind.to_string(),
                message,
                tool_type: step.tool_type(),
                step_name: step.name.clone(),
            }),
            skip_reason: None,
            files_created: vec![],
            files_modified: vec![],
            files_deleted: vec![],
            output: HashMap::new(),
        },
        HashMap::new(),
    )
}

/// The single path a leaf tool type writes to, if any — used to classify a
/// successful execution's effect as a create or a modify by comparing
/// existence before and after (spec §4.5 `aggregateResults` file effects).
fn affected_path(payload: &StepPayload) -> Option<&str> {
    match payload {
        StepPayload::Template { destination, .. } => Some(destination),
        StepPayload::Patch { target, .. } => Some(target),
        _ => None,
    }
}

fn file_effects_for(
    step: &Step,
    affected: Option<&str>,
    pre_exists: Option<bool>,
    ctx: &ExecutionContext,
    tool_result: &Value,
) -> (Vec<String>, Vec<String>) {
    let mut created = Vec::new();
    let mut modified = Vec::new();

    if let Some(path) = affected {
        if !ctx.dry_run {
            let post_exists = ctx.project_root.join(path).exists();
            match pre_exists {
                Some(false) if post_exists => created.push(path.to_string()),
                Some(true) => modified.push(path.to_string()),
                _ => {}
            }
        }
    }

    if step.tool_type() == ToolType::EnsureDirs {
        if let Some(list) = tool_result.get("created").and_then(Value::as_array) {
            created.extend(list.iter().filter_map(|v| v.as_str().map(String::from)));
        }
    }

    (created, modified)
}
