//! `recipe run <file|-> [...]` (spec SPEC_FULL §6.1): the full
//! load/validate/resolve/execute pipeline, plus the two-phase AI Collector
//! flags (`--collect-ai`, `--answers`).

use crate::cli::RunArgs;
use crate::{dependency::FsDependencyLoader, display, prompt::StdinPrompter, renderer::HandlebarsRenderer, source, vars};
use anyhow::{Context, Result};
use recipe_config::{AskMode, EngineConfig, GlobalEngineConfig};
use recipe_core::TracingEventSink;
use recipe_engine::{ExecuteRequest, execute_recipe};
use std::collections::HashMap;
use std::sync::Arc;

pub async fn handle(args: &RunArgs) -> Result<i32> {
    let project_root = crate::dependency::project_root_for(Some(std::path::Path::new(&args.file)));
    let recipe_source = source::resolve(&args.file)?;
    let variables = vars::parse_variables(&args.vars)?;

    let global_config = GlobalEngineConfig::load().context("loading global config")?;
    let project_config = EngineConfig::load(&project_root).context("loading project config")?;
    let options = project_config.resolve_options(&global_config);
    let ask_mode: AskMode = args.ask.into();

    let answers = match &args.answers {
        Some(path) => {
            let raw = std::fs::read_to_string(path).with_context(|| format!("reading answers file '{path}'"))?;
            let parsed: HashMap<String, serde_json::Value> =
                serde_json::from_str(&raw).with_context(|| format!("parsing answers file '{path}' as JSON"))?;
            Some(parsed)
        }
        None => None,
    };

    let mut request = ExecuteRequest::new(recipe_source, &project_root);
    request.variables = variables;
    request.ask_mode = ask_mode;
    request.no_defaults = args.no_defaults;
    request.dry_run = args.dry_run;
    request.force = args.force;
    request.answers = answers;
    request.collect_ai = args.collect_ai;
    request.options = options;
    request.event_sink = Arc::new(TracingEventSink);
    request.renderer = Arc::new(HandlebarsRenderer::new());
    request.dependency_loader = Some(Arc::new(FsDependencyLoader::new(&project_root)));
    if matches!(ask_mode, AskMode::Me) {
        request.prompter = Some(Arc::new(StdinPrompter));
    }

    let result = match execute_recipe(request).await {
        Ok(result) => result,
        Err(err) => {
            eprintln!("error: {err}");
            return Ok(2);
        }
    };

    if let Some(snapshot) = &result.ai_collection {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
        return Ok(0);
    }

    display::print_summary(&result);
    Ok(if result.success { 0 } else { 1 })
}
