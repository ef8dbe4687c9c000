//! `createExecutionContext` / `executeRecipe` / `cancelExecution` (spec
//! §4.5, §5): the top-level orchestrator that ties loading, validation,
//! variable resolution and the Step Executor together into one recipe run.

use crate::ai::{self, AiCollector, AiCollectorSnapshot};
use crate::load::load_recipe;
use crate::resolve::{self, ResolveOptions};
use crate::validate::{self, DependencyLoader};
use recipe_config::{AskMode, EngineOptions, RecipeSource};
use recipe_core::{
    CancellationFlag, EngineError, EngineResult, EventSink, ExecutionContext, FileEffects,
    LifecycleEvent, Recipe, Step, StepResult, StepStatus, TracingEventSink, new_execution_id,
};
use recipe_eval::{NullTemplateRenderer, TemplateRenderer};
use recipe_exec::{ExecutorOptions, StepExecutor};
use recipe_exec::metrics::{ExecutionMetrics, MetricsCollector};
use recipe_tools::ToolRegistry;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

/// One `execute_recipe` call's inputs. A plain struct with a `new`
/// constructor rather than a long parameter list (mirrors
/// `recipe_exec::ExecutorOptions`).
pub struct ExecuteRequest {
    pub source: RecipeSource,
    pub project_root: PathBuf,
    pub variables: Map<String, Value>,
    pub ask_mode: AskMode,
    pub no_defaults: bool,
    pub dry_run: bool,
    pub force: bool,
    pub answers: Option<HashMap<String, Value>>,
    pub collect_ai: bool,
    pub options: EngineOptions,
    pub registry: Arc<ToolRegistry>,
    pub event_sink: Arc<dyn EventSink>,
    pub renderer: Arc<dyn TemplateRenderer>,
    pub prompter: Option<Arc<dyn resolve::VariablePrompter>>,
    pub ai_transport: Option<Arc<dyn resolve::VariableAiTransport>>,
    pub dependency_loader: Option<Arc<dyn DependencyLoader>>,
}

impl ExecuteRequest {
    pub fn new(source: RecipeSource, project_root: impl Into<PathBuf>) -> Self {
        Self {
            source,
            project_root: project_root.into(),
            variables: Map::new(),
            ask_mode: AskMode::default(),
            no_defaults: false,
            dry_run: false,
            force: false,
            answers: None,
            collect_ai: false,
            options: EngineOptions::default(),
            registry: Arc::new(recipe_tools::builtins::registry_with_builtins()),
            event_sink: Arc::new(TracingEventSink),
            renderer: Arc::new(NullTemplateRenderer),
            prompter: None,
            ai_transport: None,
            dependency_loader: None,
        }
    }
}

/// Aggregate result of one `execute_recipe` run (spec §4.5 `aggregateResults`).
pub struct RecipeExecutionResult {
    pub execution_id: String,
    pub recipe_name: String,
    pub success: bool,
    pub step_results: Vec<StepResult>,
    pub file_effects: FileEffects,
    pub provided_values: HashMap<String, Value>,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub failed_steps: usize,
    pub skipped_steps: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub metrics: ExecutionMetrics,
    pub rendered_message: Option<String>,
    /// Populated only for a Pass 1 (`collectMode`) run — the AI requests
    /// gathered for a host to turn into Pass 2's `answers`.
    pub ai_collection: Option<AiCollectorSnapshot>,
}

static CANCELLATION_REGISTRY: OnceLock<Mutex<HashMap<String, CancellationFlag>>> = OnceLock::new();

fn cancellation_registry() -> &'static Mutex<HashMap<String, CancellationFlag>> {
    CANCELLATION_REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// `cancelExecution` (spec §5): request cancellation of a specific
/// in-flight execution by id. Idempotent and a no-op for an id that never
/// started or already finished — calling it twice has the same effect as
/// calling it once (spec §8 cancellation scenario).
pub fn cancel_execution(execution_id: &str) {
    if let Some(flag) = cancellation_registry().lock().unwrap().get(execution_id) {
        flag.cancel();
    }
}

fn register_execution(execution_id: &str, flag: CancellationFlag) {
    cancellation_registry().lock().unwrap().insert(execution_id.to_string(), flag);
}

fn unregister_execution(execution_id: &str) {
    cancellation_registry().lock().unwrap().remove(execution_id);
}

/// `createExecutionContext` (spec §4.5): wires resolved variables, the
/// resolved-answers map, and the two-phase AI flags into a fresh
/// `ExecutionContext`. Pass 1 forces `dryRun` regardless of the caller's own
/// flag — `recipe-exec`'s `file_effects_for`/tool dry-run branches already
/// gate every filesystem write behind `ctx.dry_run`, so this single flag is
/// what gives Pass 1 its "zero files created" guarantee (spec §8 scenario 6).
pub fn create_execution_context(
    project_root: &Path,
    resolved_variables: Map<String, Value>,
    answers: Option<HashMap<String, Value>>,
    collect_mode: bool,
    dry_run: bool,
    force: bool,
) -> ExecutionContext {
    let mut ctx = ExecutionContext::new(project_root, resolved_variables);
    ctx.answers = answers;
    ctx.collect_mode = collect_mode;
    ctx.dry_run = dry_run || collect_mode;
    ctx.force = force;
    ctx
}

/// `executeRecipe` (spec §4.5): load, validate, resolve variables, build the
/// execution context, run the Step Executor, then aggregate results and
/// render the lifecycle message. Any failure before the Step Executor is
/// reached (load, validate, resolve) returns before a single
/// `StepStarted`/`RecipeStarted` event fires.
pub async fn execute_recipe(request: ExecuteRequest) -> EngineResult<RecipeExecutionResult> {
    let recipe = load_recipe(&request.source)?;

    let report = validate::validate_recipe(&recipe, request.dependency_loader.as_deref());
    if !report.is_valid() {
        return Err(EngineError::ValidationError(report.errors.join("; ")));
    }

    let resolved_variables = resolve::resolve_variables(
        &recipe,
        request.variables.clone(),
        &request.project_root,
        &ResolveOptions {
            ask_mode: request.ask_mode,
            no_defaults: request.no_defaults,
            prompter: request.prompter.as_deref(),
            ai_transport: request.ai_transport.as_deref(),
        },
    )?;

    let execution_id = new_execution_id().to_string();
    let cancel_flag = CancellationFlag::new();
    register_execution(&execution_id, cancel_flag.clone());

    let collect_mode = request.collect_ai && request.answers.is_none();
    let mut ctx = create_execution_context(
        &request.project_root,
        resolved_variables,
        request.answers,
        collect_mode,
        request.dry_run,
        request.force,
    );
    ctx.cancelled = cancel_flag;
    ctx.template_path = match &request.source {
        RecipeSource::File { path } => path.parent().map(Path::to_path_buf),
        RecipeSource::Content { .. } => None,
    };

    let ai_collection = collect_mode.then(|| {
        let collector = AiCollector::new();
        ai::collect_ai_entries(&recipe.steps, &collector);
        collector.snapshot()
    });

    request.event_sink.emit(LifecycleEvent::RecipeStarted {
        execution_id: execution_id.clone(),
        recipe_name: recipe.name.clone(),
    });

    let started_at = Instant::now();
    let executor_options = ExecutorOptions {
        max_concurrency: request.options.max_concurrency,
        default_timeout: Duration::from_millis(request.options.default_timeout),
        default_retries: request.options.default_retries,
        continue_on_error: request.options.continue_on_error,
        enable_parallel_execution: request.options.enable_parallel_execution,
        timeout_safety_factor: request.options.timeout_safety_factor,
    };
    let executor = StepExecutor::new(request.registry.clone(), executor_options, request.event_sink.clone());

    let step_results = match executor
        .execute_steps(&recipe.steps, &mut ctx, &execution_id, request.renderer.clone())
        .await
    {
        Ok(results) => results,
        Err(err) => {
            unregister_execution(&execution_id);
            request.event_sink.emit(LifecycleEvent::RecipeFailed {
                execution_id: execution_id.clone(),
                recipe_name: recipe.name.clone(),
                error: err.to_string(),
            });
            return Err(err);
        }
    };

    let metrics = MetricsCollector::new();
    for result in &step_results {
        metrics.record(result.status, result.retry_count, result.duration);
    }

    let (total_steps, completed_steps, failed_steps, skipped_steps) = aggregate_leaf_counts(&recipe.steps, &step_results);

    let mut file_effects = FileEffects::default();
    for result in &step_results {
        file_effects.extend_from(result);
    }

    let provided_values: HashMap<String, Value> = recipe
        .provides
        .iter()
        .filter_map(|name| ctx.variables.get(name).map(|value| (name.clone(), value.clone())))
        .collect();

    let errors: Vec<String> = step_results
        .iter()
        .filter_map(|r| r.error.as_ref().map(|e| format!("{}: {}", r.step_name, e.message)))
        .collect();

    let success = failed_steps == 0;
    let rendered_message = render_lifecycle_message(&recipe, success, &ctx, request.renderer.as_ref());

    if ctx.cancelled.is_cancelled() {
        request.event_sink.emit(LifecycleEvent::RecipeCancelled {
            execution_id: execution_id.clone(),
            recipe_name: recipe.name.clone(),
        });
    } else {
        request.event_sink.emit(LifecycleEvent::RecipeCompleted {
            execution_id: execution_id.clone(),
            recipe_name: recipe.name.clone(),
            duration: started_at.elapsed(),
            success,
        });
    }
    unregister_execution(&execution_id);

    Ok(RecipeExecutionResult {
        execution_id,
        recipe_name: recipe.name,
        success,
        step_results,
        file_effects,
        provided_values,
        total_steps,
        completed_steps,
        failed_steps,
        skipped_steps,
        errors,
        warnings: report.warnings,
        metrics: metrics.snapshot(),
        rendered_message,
        ai_collection,
    })
}

/// Nested-step counting rule (spec §9): only leaf (non-container) steps
/// count toward totals. A container's nested results live in its own
/// `tool_result.steps` array; recurse into that instead of counting the
/// container itself. A container that never got to recurse (skipped,
/// short-circuited before its nested plan ran) falls back to counting its
/// own status as a single unit so aborted runs still total correctly.
fn aggregate_leaf_counts(steps: &[Step], results: &[StepResult]) -> (usize, usize, usize, usize) {
    let mut total = 0;
    let mut completed = 0;
    let mut failed = 0;
    let mut skipped = 0;

    for (step, result) in steps.iter().zip(results) {
        if step.is_container() {
            if let Some(nested_steps) = step.payload.nested_steps() {
                let nested_results: Vec<StepResult> = result
                    .tool_result
                    .get("steps")
                    .and_then(|value| serde_json::from_value(value.clone()).ok())
                    .unwrap_or_default();
                if nested_results.len() == nested_steps.len() {
                    let (t, c, f, s) = aggregate_leaf_counts(nested_steps, &nested_results);
                    total += t;
                    completed += c;
                    failed += f;
                    skipped += s;
                    continue;
                }
            }
        }

        total += 1;
        match result.status {
            StepStatus::Completed => completed += 1,
            StepStatus::Failed | StepStatus::TimedOut | StepStatus::Cancelled => failed += 1,
            StepStatus::Skipped => skipped += 1,
        }
    }

    (total, completed, failed, skipped)
}

fn render_lifecycle_message(recipe: &Recipe, success: bool, ctx: &ExecutionContext, renderer: &dyn TemplateRenderer) -> Option<String> {
    let template = if success { recipe.on_success.as_ref() } else { recipe.on_error.as_ref() }?;
    let scope = Value::Object(ctx.variables.clone());
    match renderer.render(template, &scope) {
        Ok(message) => Some(message),
        Err(err) => {
            tracing::debug!(error = %err, "lifecycle message render failed, swallowed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipe_core::{Hooks, StepPayload, VariableDecl, VariableType};
    use std::collections::HashMap as StdMap;

    fn yaml_step(name: &str, depends_on: &[&str], tool_yaml: &str) -> String {
        let deps = if depends_on.is_empty() {
            String::new()
        } else {
            format!("    depends_on: [{}]\n", depends_on.join(", "))
        };
        format!("  - name: {name}\n{deps}{tool_yaml}")
    }

    fn request_for(yaml: String, project_root: &Path) -> ExecuteRequest {
        let name = yaml.clone();
        ExecuteRequest::new(RecipeSource::content(yaml, name), project_root)
    }

    #[tokio::test]
    async fn linear_template_then_patch_recipe_produces_the_patched_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tmpl.txt"), "world").unwrap();

        let yaml = format!(
            "name: greet\nsteps:\n{}\n{}",
            yaml_step("render", &[], "    tool: template\n    source: tmpl.txt\n    destination: hello.txt\n"),
            yaml_step(
                "exclaim",
                &["render"],
                "    tool: patch\n    target: hello.txt\n    find: world\n    replace: world!\n"
            ),
        );
        let result = execute_recipe(request_for(yaml, dir.path())).await.unwrap();

        assert!(result.success);
        assert_eq!(result.total_steps, 2);
        assert_eq!(result.completed_steps, 2);
        assert_eq!(std::fs::read_to_string(dir.path().join("hello.txt")).unwrap(), "world!");
        assert!(result.file_effects.created.contains(&"hello.txt".to_string()));
        assert!(result.file_effects.modified.contains(&"hello.txt".to_string()));
    }

    #[tokio::test]
    async fn sequence_container_is_excluded_from_leaf_counts() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = "name: fanout\nsteps:\n  - name: a\n    tool: ensure-dirs\n    paths: [a]\n  - name: b\n    tool: ensure-dirs\n    paths: [b]\n  - name: seq\n    depends_on: [a, b]\n    sequence:\n      - name: marker\n        tool: ensure-dirs\n        paths: [marker]\n".to_string();
        let result = execute_recipe(request_for(yaml, dir.path())).await.unwrap();
        assert!(result.success);
        assert_eq!(result.total_steps, 3);
        assert_eq!(result.completed_steps, 3);
    }

    #[tokio::test]
    async fn circular_dependency_fails_before_any_step_runs() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = "name: cycle\nsteps:\n  - name: a\n    depends_on: [b]\n    tool: ensure-dirs\n    paths: [a]\n  - name: b\n    depends_on: [a]\n    tool: ensure-dirs\n    paths: [b]\n".to_string();
        let err = execute_recipe(request_for(yaml, dir.path())).await.unwrap_err();
        assert_eq!(err.kind(), "CIRCULAR_DEPENDENCY_ERROR");
        assert!(!dir.path().join("a").exists());
        assert!(!dir.path().join("b").exists());
    }

    #[tokio::test]
    async fn missing_required_variable_under_ask_nobody_fails_before_any_step_runs() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = "name: needs-var\nvariables:\n  targetDir:\n    type: string\n    required: true\nsteps:\n  - name: a\n    tool: ensure-dirs\n    paths: [out]\n".to_string();
        let mut request = request_for(yaml, dir.path());
        request.ask_mode = AskMode::Nobody;
        let err = execute_recipe(request).await.unwrap_err();
        match err {
            EngineError::MissingRequiredVariables(names) => assert_eq!(names, vec!["targetDir".to_string()]),
            other => panic!("expected MissingRequiredVariables, got {other:?}"),
        }
        assert!(!dir.path().join("out").exists());
    }

    struct FlakyOnceTool {
        remaining_failures: std::sync::atomic::AtomicU32,
    }

    #[async_trait::async_trait]
    impl recipe_tools::Tool for FlakyOnceTool {
        fn validate(&self, _step: &Step) -> EngineResult<()> {
            Ok(())
        }

        async fn execute(&self, _step: &Step, _ctx: &ExecutionContext) -> EngineResult<Value> {
            if self.remaining_failures.fetch_update(std::sync::atomic::Ordering::SeqCst, std::sync::atomic::Ordering::SeqCst, |n| {
                (n > 0).then_some(n - 1)
            }).is_ok() {
                return Err(EngineError::ToolExecutionError {
                    step: "flaky".into(),
                    tool_type: recipe_core::ToolType::Shell,
                    source: Box::new(std::io::Error::other("not yet")),
                });
            }
            Ok(Value::Null)
        }
    }

    #[tokio::test]
    async fn retry_then_succeed_is_reflected_in_completed_steps() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = recipe_tools::builtins::registry_with_builtins();
        registry.register_default(
            recipe_core::ToolType::Shell,
            Arc::new(FlakyOnceTool { remaining_failures: std::sync::atomic::AtomicU32::new(1) }),
        );
        let yaml = "name: flaky\nsteps:\n  - name: flaky\n    retries:\n      max_attempts: 2\n      backoff_factor: 0.01\n    tool: shell\n    command: irrelevant\n".to_string();
        let mut request = request_for(yaml, dir.path());
        request.registry = Arc::new(registry);
        let result = execute_recipe(request).await.unwrap();
        assert!(result.success);
        assert_eq!(result.step_results[0].retry_count, 1);
    }

    #[tokio::test]
    async fn two_phase_ai_round_trip_creates_no_files_in_pass_one() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tmpl.txt"), "draft").unwrap();

        let yaml = format!(
            "name: ai-write\nsteps:\n{}\n{}",
            yaml_step("intro", &[], "    tool: ai\n    key: intro\n    prompt: write an intro\n"),
            yaml_step(
                "render",
                &["intro"],
                "    tool: template\n    source: tmpl.txt\n    destination: out.txt\n"
            ),
        );

        let mut pass_one = request_for(yaml.clone(), dir.path());
        pass_one.collect_ai = true;
        let collected = execute_recipe(pass_one).await.unwrap();
        assert!(collected.success);
        assert!(!dir.path().join("out.txt").exists());
        let snapshot = collected.ai_collection.expect("pass one collects ai requests");
        assert_eq!(snapshot.entries.len(), 1);
        assert_eq!(snapshot.entries[0].key, "intro");

        let mut answers = HashMap::new();
        answers.insert("intro".to_string(), Value::String("Hello there.".into()));
        let mut pass_two = request_for(yaml, dir.path());
        pass_two.answers = Some(answers);
        let resolved = execute_recipe(pass_two).await.unwrap();
        assert!(resolved.success);
        assert!(resolved.ai_collection.is_none());
        assert!(dir.path().join("out.txt").exists());
    }

    #[tokio::test]
    async fn on_success_message_is_rendered_through_the_injected_renderer() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = "name: greet\non_success: \"done: {{ project }}\"\nvariables:\n  project:\n    type: string\n    default: demo\nsteps:\n  - name: a\n    tool: ensure-dirs\n    paths: [out]\n".to_string();
        let result = execute_recipe(request_for(yaml, dir.path())).await.unwrap();
        assert_eq!(result.rendered_message.as_deref(), Some("done: demo"));
    }

    #[tokio::test]
    async fn cancel_execution_on_unknown_id_is_a_harmless_no_op() {
        cancel_execution("does-not-exist");
    }

    fn _silence_unused_decl_import(_: VariableDecl) {}
    fn _silence_unused_variable_type(_: VariableType) {}
    fn _silence_unused_hooks(_: Hooks) {}
    fn _silence_unused_step_payload(_: StepPayload) {}
    fn _silence_unused_std_map(_: StdMap<String, String>) {}

    use proptest::prelude::*;

    /// A leaf-or-container shape, built from a small seed so proptest can
    /// shrink failures to a minimal tree.
    #[derive(Debug, Clone, Copy)]
    enum NodeShape {
        Leaf(StepStatus),
        Container(usize),
    }

    fn arb_status() -> impl Strategy<Value = StepStatus> {
        prop_oneof![
            Just(StepStatus::Completed),
            Just(StepStatus::Failed),
            Just(StepStatus::Skipped),
        ]
    }

    fn arb_forest(max_depth: u32) -> impl Strategy<Value = Vec<NodeShape>> {
        let leaf = arb_status().prop_map(NodeShape::Leaf);
        if max_depth == 0 {
            prop::collection::vec(leaf, 1..4).boxed()
        } else {
            prop::collection::vec(
                prop_oneof![
                    3 => leaf,
                    1 => (1usize..4).prop_map(NodeShape::Container),
                ],
                1..4,
            )
            .boxed()
        }
    }

    fn leaf_step(name: &str, status: StepStatus) -> (Step, StepResult) {
        let step = Step {
            name: name.to_string(),
            depends_on: vec![],
            when: None,
            skip_if: None,
            timeout_ms: None,
            retries: None,
            continue_on_error: None,
            parallel: false,
            variable_overrides: Map::new(),
            output: StdMap::new(),
            payload: StepPayload::EnsureDirs { paths: vec!["x".into()] },
        };
        let now = chrono::Utc::now();
        let result = StepResult {
            step_name: name.to_string(),
            tool_type: recipe_core::ToolType::EnsureDirs,
            status,
            started_at: now,
            ended_at: now,
            duration: Duration::ZERO,
            retry_count: 0,
            dependencies_satisfied: true,
            tool_result: Value::Null,
            error: None,
            skip_reason: None,
            files_created: vec![],
            files_modified: vec![],
            files_deleted: vec![],
            output: HashMap::new(),
        };
        (step, result)
    }

    /// Build a (steps, results) pair from `shapes`, returning it alongside
    /// the (total, completed, failed, skipped) counts a correct leaf-only
    /// tally should produce.
    fn build_tree(shapes: &[NodeShape], prefix: &str) -> (Vec<Step>, Vec<StepResult>, (usize, usize, usize, usize)) {
        let mut steps = Vec::new();
        let mut results = Vec::new();
        let mut totals = (0, 0, 0, 0);

        for (i, shape) in shapes.iter().enumerate() {
            let name = format!("{prefix}n{i}");
            match shape {
                NodeShape::Leaf(status) => {
                    let (step, result) = leaf_step(&name, *status);
                    match status {
                        StepStatus::Completed => totals.1 += 1,
                        StepStatus::Failed | StepStatus::TimedOut | StepStatus::Cancelled => totals.2 += 1,
                        StepStatus::Skipped => totals.3 += 1,
                    }
                    totals.0 += 1;
                    steps.push(step);
                    results.push(result);
                }
                NodeShape::Container(child_count) => {
                    let children: Vec<NodeShape> = (0..*child_count)
                        .map(|i| NodeShape::Leaf(if i % 2 == 0 { StepStatus::Completed } else { StepStatus::Skipped }))
                        .collect();
                    let (nested_steps, nested_results, nested_totals) = build_tree(&children, &format!("{name}-"));
                    totals.0 += nested_totals.0;
                    totals.1 += nested_totals.1;
                    totals.2 += nested_totals.2;
                    totals.3 += nested_totals.3;

                    let container_step = Step {
                        name: name.clone(),
                        depends_on: vec![],
                        when: None,
                        skip_if: None,
                        timeout_ms: None,
                        retries: None,
                        continue_on_error: None,
                        parallel: false,
                        variable_overrides: Map::new(),
                        output: StdMap::new(),
                        payload: StepPayload::Sequence { steps: nested_steps },
                    };
                    let now = chrono::Utc::now();
                    let container_result = StepResult {
                        step_name: name,
                        tool_type: recipe_core::ToolType::Sequence,
                        status: StepStatus::Completed,
                        started_at: now,
                        ended_at: now,
                        duration: Duration::ZERO,
                        retry_count: 0,
                        dependencies_satisfied: true,
                        tool_result: serde_json::json!({ "steps": nested_results }),
                        error: None,
                        skip_reason: None,
                        files_created: vec![],
                        files_modified: vec![],
                        files_deleted: vec![],
                        output: HashMap::new(),
                    };
                    steps.push(container_step);
                    results.push(container_result);
                }
            }
        }

        (steps, results, totals)
    }

    proptest! {
        /// Containers never count toward leaf totals, however deeply nested
        /// (spec §9): the tally is always exactly the sum of leaf statuses.
        #[test]
        fn containers_never_count_toward_leaf_totals(shapes in arb_forest(2)) {
            let (steps, results, expected) = build_tree(&shapes, "");
            let actual = aggregate_leaf_counts(&steps, &results);
            prop_assert_eq!(actual, expected);
        }
    }
}
