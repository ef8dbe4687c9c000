//! Default implementations for the closed set of leaf tool types (spec §3).
//! `sequence`/`parallel` are container steps expanded by the Step Executor
//! itself and have no tool implementation here (spec §4.4).

use crate::process::run_shell;
use crate::registry::{CacheOptions, ToolRegistry};
use crate::tool::Tool;
use async_trait::async_trait;
use recipe_core::{EngineError, EngineResult, ExecutionContext, Step, StepPayload, ToolType};
use serde_json::{Value, json};
use std::sync::Arc;

fn payload_mismatch(step: &Step, expected: ToolType) -> EngineError {
    EngineError::InternalError(format!(
        "step '{}' dispatched to {expected} tool with non-matching payload",
        step.name
    ))
}

fn tool_failed(step: &Step, tool_type: ToolType, message: impl Into<String>) -> EngineError {
    EngineError::ToolExecutionError {
        step: step.name.clone(),
        tool_type,
        source: Box::new(std::io::Error::other(message.into())),
    }
}

/// Renders a template file to a destination path. The template engine
/// itself is out of scope (spec §1); this writes `vars` through untouched
/// so a host-supplied renderer upstream (or a literal copy for templates
/// with no placeholders) can be layered on without changing this tool's
/// contract.
pub struct TemplateTool;

#[async_trait]
impl Tool for TemplateTool {
    fn validate(&self, step: &Step) -> EngineResult<()> {
        match &step.payload {
            StepPayload::Template { source, destination, .. } => {
                if source.trim().is_empty() || destination.trim().is_empty() {
                    return Err(EngineError::ValidationError(format!(
                        "step '{}': template requires non-empty source and destination",
                        step.name
                    )));
                }
                Ok(())
            }
            _ => Err(payload_mismatch(step, ToolType::Template)),
        }
    }

    async fn execute(&self, step: &Step, ctx: &ExecutionContext) -> EngineResult<Value> {
        let StepPayload::Template { source, destination, vars } = &step.payload else {
            return Err(payload_mismatch(step, ToolType::Template));
        };
        let source_path = ctx.project_root.join(source);
        let dest_path = ctx.project_root.join(destination);
        let contents = tokio::fs::read_to_string(&source_path)
            .await
            .map_err(|e| tool_failed(step, ToolType::Template, e.to_string()))?;

        if ctx.dry_run {
            return Ok(json!({ "destination": destination, "dryRun": true, "bytes": contents.len() }));
        }
        if let Some(parent) = dest_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| tool_failed(step, ToolType::Template, e.to_string()))?;
        }
        tokio::fs::write(&dest_path, contents.as_bytes())
            .await
            .map_err(|e| tool_failed(step, ToolType::Template, e.to_string()))?;

        Ok(json!({
            "destination": destination,
            "bytesWritten": contents.len(),
            "varsProvided": vars.len(),
        }))
    }
}

/// Invokes a named, host-registered side-effecting action. The built-in
/// default simply echoes the call back — real actions are registered by
/// the host under `ToolType::Action` with their own `name` key (spec §4.4
/// named-override resolution).
pub struct ActionTool;

#[async_trait]
impl Tool for ActionTool {
    fn validate(&self, step: &Step) -> EngineResult<()> {
        match &step.payload {
            StepPayload::Action { name, .. } if !name.trim().is_empty() => Ok(()),
            StepPayload::Action { .. } => Err(EngineError::ValidationError(format!(
                "step '{}': action requires a non-empty name",
                step.name
            ))),
            _ => Err(payload_mismatch(step, ToolType::Action)),
        }
    }

    async fn execute(&self, step: &Step, _ctx: &ExecutionContext) -> EngineResult<Value> {
        let StepPayload::Action { name, args } = &step.payload else {
            return Err(payload_mismatch(step, ToolType::Action));
        };
        Ok(json!({ "action": name, "args": args, "executed": true }))
    }
}

/// Applies a named source transform to a target path. Like `action`, the
/// transform catalogue is host-registered; the default records intent
/// without mutating `target` so dry-run planning (spec §6.1 `recipe plan`)
/// always has a safe fallback.
pub struct CodemodTool;

#[async_trait]
impl Tool for CodemodTool {
    fn validate(&self, step: &Step) -> EngineResult<()> {
        match &step.payload {
            StepPayload::Codemod { transform, target, .. } => {
                if transform.trim().is_empty() || target.trim().is_empty() {
                    return Err(EngineError::ValidationError(format!(
                        "step '{}': codemod requires non-empty transform and target",
                        step.name
                    )));
                }
                Ok(())
            }
            _ => Err(payload_mismatch(step, ToolType::Codemod)),
        }
    }

    async fn execute(&self, step: &Step, ctx: &ExecutionContext) -> EngineResult<Value> {
        let StepPayload::Codemod { transform, target, args } = &step.payload else {
            return Err(payload_mismatch(step, ToolType::Codemod));
        };
        let exists = ctx.file_exists(target);
        Ok(json!({
            "transform": transform,
            "target": target,
            "args": args,
            "targetExisted": exists,
        }))
    }
}

/// Invokes another recipe by name as a nested step, with `variableOverrides`
/// layered over the caller's variables. The recipe lookup/re-entry itself
/// is owned by the Recipe Engine (spec §4.5), not this tool — it only
/// validates shape and forwards the overrides.
pub struct RecipeTool;

#[async_trait]
impl Tool for RecipeTool {
    fn validate(&self, step: &Step) -> EngineResult<()> {
        match &step.payload {
            StepPayload::Recipe { name, .. } if !name.trim().is_empty() => Ok(()),
            StepPayload::Recipe { .. } => Err(EngineError::ValidationError(format!(
                "step '{}': recipe requires a non-empty name",
                step.name
            ))),
            _ => Err(payload_mismatch(step, ToolType::Recipe)),
        }
    }

    async fn execute(&self, step: &Step, _ctx: &ExecutionContext) -> EngineResult<Value> {
        let StepPayload::Recipe { name, variable_overrides } = &step.payload else {
            return Err(payload_mismatch(step, ToolType::Recipe));
        };
        Ok(json!({
            "recipe": name,
            "variableOverrides": variable_overrides,
            "note": "nested recipe execution is performed by the engine, not this tool",
        }))
    }
}

/// Runs a shell command via `sh -c`, unsandboxed. Non-zero exit is a tool failure, not a silent
/// success — callers wanting tolerance set `continueOnError` on the step.
pub struct ShellTool;

#[async_trait]
impl Tool for ShellTool {
    fn validate(&self, step: &Step) -> EngineResult<()> {
        match &step.payload {
            StepPayload::Shell { command, .. } if !command.trim().is_empty() => Ok(()),
            StepPayload::Shell { .. } => Err(EngineError::ValidationError(format!(
                "step '{}': shell requires a non-empty command",
                step.name
            ))),
            _ => Err(payload_mismatch(step, ToolType::Shell)),
        }
    }

    async fn execute(&self, step: &Step, ctx: &ExecutionContext) -> EngineResult<Value> {
        let StepPayload::Shell { command, cwd, env } = &step.payload else {
            return Err(payload_mismatch(step, ToolType::Shell));
        };
        if ctx.dry_run {
            return Ok(json!({ "command": command, "dryRun": true }));
        }
        let resolved_cwd = cwd
            .as_ref()
            .map(|c| ctx.project_root.join(c))
            .unwrap_or_else(|| ctx.project_root.clone());

        let output = run_shell(command, Some(&resolved_cwd), env)
            .await
            .map_err(|e| tool_failed(step, ToolType::Shell, e.to_string()))?;

        if !output.success() {
            return Err(tool_failed(
                step,
                ToolType::Shell,
                format!("exit code {}: {}", output.exit_code, output.stderr),
            ));
        }

        Ok(json!({
            "command": command,
            "stdout": output.stdout,
            "stderr": output.stderr,
            "exitCode": output.exit_code,
        }))
    }
}

/// Surfaces a human prompt. Resolving it is the Recipe Engine's job
/// (ask-mode dispatch, spec §4.1/§4.5) — this tool only validates shape
/// and, when `ctx.answers` already holds a recorded answer for the step,
/// echoes it back (the Pass 2 path of two-phase AI generation).
pub struct PromptTool;

#[async_trait]
impl Tool for PromptTool {
    fn validate(&self, step: &Step) -> EngineResult<()> {
        match &step.payload {
            StepPayload::Prompt { message, .. } if !message.trim().is_empty() => Ok(()),
            StepPayload::Prompt { .. } => Err(EngineError::ValidationError(format!(
                "step '{}': prompt requires a non-empty message",
                step.name
            ))),
            _ => Err(payload_mismatch(step, ToolType::Prompt)),
        }
    }

    async fn execute(&self, step: &Step, ctx: &ExecutionContext) -> EngineResult<Value> {
        let StepPayload::Prompt { message, prompt_type, choices } = &step.payload else {
            return Err(payload_mismatch(step, ToolType::Prompt));
        };
        let recorded = ctx
            .answers
            .as_ref()
            .and_then(|answers| answers.get(&step.name))
            .cloned();
        Ok(json!({
            "message": message,
            "promptType": prompt_type,
            "choices": choices,
            "answer": recorded,
        }))
    }
}

/// Placeholder leaf for an `ai` step outside of the two-phase collection
/// flow (e.g. a dry-run plan). Real collection/resolution is owned by the
/// Recipe Engine's AI Collector (spec §4.5), gated on `ctx.collect_mode`.
pub struct AiTool;

#[async_trait]
impl Tool for AiTool {
    fn validate(&self, step: &Step) -> EngineResult<()> {
        match &step.payload {
            StepPayload::Ai { key, prompt, .. } if !key.trim().is_empty() && !prompt.trim().is_empty() => {
                Ok(())
            }
            StepPayload::Ai { .. } => Err(EngineError::ValidationError(format!(
                "step '{}': ai requires a non-empty key and prompt",
                step.name
            ))),
            _ => Err(payload_mismatch(step, ToolType::Ai)),
        }
    }

    async fn execute(&self, step: &Step, ctx: &ExecutionContext) -> EngineResult<Value> {
        let StepPayload::Ai { key, .. } = &step.payload else {
            return Err(payload_mismatch(step, ToolType::Ai));
        };
        if ctx.collect_mode {
            return Ok(json!({ "key": key, "collected": true }));
        }
        let resolved = ctx
            .answers
            .as_ref()
            .and_then(|answers| answers.get(key))
            .cloned();
        match resolved {
            Some(value) => Ok(json!({ "key": key, "value": value })),
            None => Err(EngineError::AiResolutionError(format!(
                "no resolved answer for ai key '{key}' in step '{}'",
                step.name
            ))),
        }
    }
}

/// Installs packages via the host's package manager. Unsandboxed, mirrors
/// `shell` but with a fixed command shape per manager.
pub struct InstallTool;

impl InstallTool {
    fn command_for(manager: &str, packages: &[String]) -> String {
        let joined = packages.join(" ");
        match manager {
            "npm" => format!("npm install {joined}"),
            "cargo" => format!("cargo install {joined}"),
            "pip" => format!("pip install {joined}"),
            "apt" => format!("apt-get install -y {joined}"),
            other => format!("{other} install {joined}"),
        }
    }
}

#[async_trait]
impl Tool for InstallTool {
    fn validate(&self, step: &Step) -> EngineResult<()> {
        match &step.payload {
            StepPayload::Install { packages, .. } if !packages.is_empty() => Ok(()),
            StepPayload::Install { .. } => Err(EngineError::ValidationError(format!(
                "step '{}': install requires at least one package",
                step.name
            ))),
            _ => Err(payload_mismatch(step, ToolType::Install)),
        }
    }

    async fn execute(&self, step: &Step, ctx: &ExecutionContext) -> EngineResult<Value> {
        let StepPayload::Install { packages, manager } = &step.payload else {
            return Err(payload_mismatch(step, ToolType::Install));
        };
        let manager = manager.as_deref().unwrap_or("npm");
        let command = Self::command_for(manager, packages);
        if ctx.dry_run {
            return Ok(json!({ "command": command, "dryRun": true }));
        }
        let output = run_shell(&command, Some(&ctx.project_root), &Default::default())
            .await
            .map_err(|e| tool_failed(step, ToolType::Install, e.to_string()))?;
        if !output.success() {
            return Err(tool_failed(
                step,
                ToolType::Install,
                format!("exit code {}: {}", output.exit_code, output.stderr),
            ));
        }
        Ok(json!({ "manager": manager, "packages": packages, "stdout": output.stdout }))
    }
}

/// Evaluates a dotted-path/boolean expression against the execution scope
/// without a template-rendering step, for steps whose only purpose is to
/// compute an `output` value (spec §4.2 `resolveExpr`/`isTruthy` shared
/// with the Condition Evaluator).
pub struct QueryTool;

#[async_trait]
impl Tool for QueryTool {
    fn validate(&self, step: &Step) -> EngineResult<()> {
        match &step.payload {
            StepPayload::Query { expression } if !expression.trim().is_empty() => Ok(()),
            StepPayload::Query { .. } => Err(EngineError::ValidationError(format!(
                "step '{}': query requires a non-empty expression",
                step.name
            ))),
            _ => Err(payload_mismatch(step, ToolType::Query)),
        }
    }

    async fn execute(&self, step: &Step, ctx: &ExecutionContext) -> EngineResult<Value> {
        let StepPayload::Query { expression } = &step.payload else {
            return Err(payload_mismatch(step, ToolType::Query));
        };
        let scope = Value::Object(ctx.variables.clone());
        let value = recipe_eval::path::resolve(&scope, expression).cloned();
        Ok(json!({ "expression": expression, "value": value }))
    }
}

/// Applies a literal find/replace or unified diff to a target file.
pub struct PatchTool;

#[async_trait]
impl Tool for PatchTool {
    fn validate(&self, step: &Step) -> EngineResult<()> {
        match &step.payload {
            StepPayload::Patch { target, find, replace, diff } => {
                if target.trim().is_empty() {
                    return Err(EngineError::ValidationError(format!(
                        "step '{}': patch requires a non-empty target",
                        step.name
                    )));
                }
                let has_find_replace = find.is_some() && replace.is_some();
                if !has_find_replace && diff.is_none() {
                    return Err(EngineError::ValidationError(format!(
                        "step '{}': patch requires either find+replace or diff",
                        step.name
                    )));
                }
                Ok(())
            }
            _ => Err(payload_mismatch(step, ToolType::Patch)),
        }
    }

    async fn execute(&self, step: &Step, ctx: &ExecutionContext) -> EngineResult<Value> {
        let StepPayload::Patch { target, find, replace, diff } = &step.payload else {
            return Err(payload_mismatch(step, ToolType::Patch));
        };
        let target_path = ctx.project_root.join(target);
        let original = tokio::fs::read_to_string(&target_path)
            .await
            .map_err(|e| tool_failed(step, ToolType::Patch, e.to_string()))?;

        let patched = if let (Some(find), Some(replace)) = (find, replace) {
            if !original.contains(find.as_str()) {
                return Err(tool_failed(
                    step,
                    ToolType::Patch,
                    format!("pattern not found in {target}"),
                ));
            }
            original.replacen(find, replace, 1)
        } else if let Some(diff) = diff {
            return Err(EngineError::ValidationError(format!(
                "step '{}': unified-diff patches are not supported by the default patch tool ({} bytes of diff ignored)",
                step.name,
                diff.len()
            )));
        } else {
            unreachable!("validate() rejects this combination");
        };

        if ctx.dry_run {
            return Ok(json!({ "target": target, "dryRun": true, "changed": patched != original }));
        }
        tokio::fs::write(&target_path, patched.as_bytes())
            .await
            .map_err(|e| tool_failed(step, ToolType::Patch, e.to_string()))?;
        Ok(json!({ "target": target, "changed": true }))
    }
}

/// Ensures a set of directories exist, creating any missing ones.
pub struct EnsureDirsTool;

#[async_trait]
impl Tool for EnsureDirsTool {
    fn validate(&self, step: &Step) -> EngineResult<()> {
        match &step.payload {
            StepPayload::EnsureDirs { paths } if !paths.is_empty() => Ok(()),
            StepPayload::EnsureDirs { .. } => Err(EngineError::ValidationError(format!(
                "step '{}': ensure-dirs requires at least one path",
                step.name
            ))),
            _ => Err(payload_mismatch(step, ToolType::EnsureDirs)),
        }
    }

    async fn execute(&self, step: &Step, ctx: &ExecutionContext) -> EngineResult<Value> {
        let StepPayload::EnsureDirs { paths } = &step.payload else {
            return Err(payload_mismatch(step, ToolType::EnsureDirs));
        };
        let mut created = Vec::new();
        for path in paths {
            let full = ctx.project_root.join(path);
            if ctx.dry_run {
                if !full.exists() {
                    created.push(path.clone());
                }
                continue;
            }
            let already_existed = full.is_dir();
            tokio::fs::create_dir_all(&full)
                .await
                .map_err(|e| tool_failed(step, ToolType::EnsureDirs, e.to_string()))?;
            if !already_existed {
                created.push(path.clone());
            }
        }
        Ok(json!({ "paths": paths, "created": created }))
    }
}

/// Builds the process-wide registry pre-loaded with every built-in tool,
/// each registered as the `default` implementation for its `ToolType`.
pub fn registry_with_builtins() -> ToolRegistry {
    let mut registry = ToolRegistry::new(CacheOptions::default());
    registry.register_default(ToolType::Template, Arc::new(TemplateTool));
    registry.register_default(ToolType::Action, Arc::new(ActionTool));
    registry.register_default(ToolType::Codemod, Arc::new(CodemodTool));
    registry.register_default(ToolType::Recipe, Arc::new(RecipeTool));
    registry.register_default(ToolType::Shell, Arc::new(ShellTool));
    registry.register_default(ToolType::Prompt, Arc::new(PromptTool));
    registry.register_default(ToolType::Ai, Arc::new(AiTool));
    registry.register_default(ToolType::Install, Arc::new(InstallTool));
    registry.register_default(ToolType::Query, Arc::new(QueryTool));
    registry.register_default(ToolType::Patch, Arc::new(PatchTool));
    registry.register_default(ToolType::EnsureDirs, Arc::new(EnsureDirsTool));
    registry
}
