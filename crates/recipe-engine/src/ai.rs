//! AI Collector (spec §3, §4.5 two-phase AI generation): a process-scoped
//! mailbox that Pass 1 (`collectMode`) populates from every `ai` step in a
//! recipe, and that a host assembles into a single model prompt between
//! passes.

use recipe_core::{Step, StepPayload};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

/// One `ai` step's collected request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiCollectorEntry {
    pub key: String,
    #[serde(default)]
    pub contexts: Vec<String>,
    pub prompt: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub output_description: Option<String>,
    #[serde(default)]
    pub source_step: Option<String>,
}

/// A point-in-time view of everything collected during Pass 1, keyed
/// deterministically (sorted by `key`) so `assemble_prompt`'s output is
/// stable across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiCollectorSnapshot {
    pub entries: Vec<AiCollectorEntry>,
    pub global_contexts: Vec<String>,
}

/// The collector itself (spec §9: "guard it behind `collectMode`, treat the
/// global as a mailbox the template engine writes into, and never let a
/// production run depend on its contents surviving past the pass that filled
/// it"). One instance per Pass 1 run — see `global_ai_collector` for the
/// process-wide singleton used when the caller doesn't hold its own.
#[derive(Default)]
pub struct AiCollector {
    entries: Mutex<HashMap<String, AiCollectorEntry>>,
    global_contexts: Mutex<Vec<String>>,
}

impl AiCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: AiCollectorEntry) {
        self.entries.lock().unwrap().insert(entry.key.clone(), entry);
    }

    pub fn record_global_context(&self, context: String) {
        self.global_contexts.lock().unwrap().push(context);
    }

    pub fn snapshot(&self) -> AiCollectorSnapshot {
        let mut entries: Vec<_> = self.entries.lock().unwrap().values().cloned().collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        AiCollectorSnapshot { entries, global_contexts: self.global_contexts.lock().unwrap().clone() }
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
        self.global_contexts.lock().unwrap().clear();
    }
}

static GLOBAL_AI_COLLECTOR: OnceLock<AiCollector> = OnceLock::new();

/// Process-wide collector for callers that don't construct their own
/// per-run instance. Mirrors `recipe_tools::registry::global_registry`'s
/// `OnceLock` pattern.
pub fn global_ai_collector() -> &'static AiCollector {
    GLOBAL_AI_COLLECTOR.get_or_init(AiCollector::new)
}

/// Walk `steps` (recursing into `sequence`/`parallel` containers) and
/// record every `ai` step found into `collector`. Called once at the start
/// of Pass 1 — the `ai` tool itself (`recipe_tools::builtins::AiTool`) only
/// reports `{ collected: true }` back to the executor and has no reference
/// to this crate, so the static step-tree walk here is what actually fills
/// the mailbox.
pub fn collect_ai_entries(steps: &[Step], collector: &AiCollector) {
    for step in steps {
        if let StepPayload::Ai { key, prompt, contexts, examples, output_description } = &step.payload {
            collector.record(AiCollectorEntry {
                key: key.clone(),
                contexts: contexts.clone(),
                prompt: prompt.clone(),
                examples: examples.clone(),
                output_description: output_description.clone(),
                source_step: Some(step.name.clone()),
            });
        }
        if let Some(nested) = step.payload.nested_steps() {
            collect_ai_entries(nested, collector);
        }
    }
}

/// A model-ready prompt plus a JSON schema describing the object the model
/// must answer with — one property per collected key.
pub struct AssembledPrompt {
    pub prompt: String,
    pub schema: Value,
}

/// Turn a Pass 1 snapshot into a single prompt and response schema (spec §3
/// "AI Collector"). Every collected key becomes a required schema property
/// so Pass 2's `answers` map has something to look up by key.
pub fn assemble_prompt(snapshot: &AiCollectorSnapshot) -> AssembledPrompt {
    let mut sections = Vec::new();
    if !snapshot.global_contexts.is_empty() {
        sections.push(format!("Context:\n{}", snapshot.global_contexts.join("\n")));
    }
    for entry in &snapshot.entries {
        let mut section = format!("## {}\n{}", entry.key, entry.prompt);
        if !entry.contexts.is_empty() {
            section.push_str(&format!("\nContext: {}", entry.contexts.join(", ")));
        }
        if !entry.examples.is_empty() {
            section.push_str(&format!("\nExamples:\n- {}", entry.examples.join("\n- ")));
        }
        if let Some(description) = &entry.output_description {
            section.push_str(&format!("\nExpected output: {description}"));
        }
        sections.push(section);
    }

    let mut properties = Map::new();
    let mut required = Vec::new();
    for entry in &snapshot.entries {
        properties.insert(
            entry.key.clone(),
            json!({
                "type": "string",
                "description": entry.output_description.clone().unwrap_or_else(|| entry.prompt.clone()),
            }),
        );
        required.push(Value::String(entry.key.clone()));
    }

    AssembledPrompt {
        prompt: sections.join("\n\n"),
        schema: json!({ "type": "object", "properties": Value::Object(properties), "required": required }),
    }
}
