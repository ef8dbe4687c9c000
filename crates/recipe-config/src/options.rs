//! Engine-level options (spec §6) — the tunables that shape how a recipe
//! executes, independent of its own content.

use serde::{Deserialize, Serialize};

fn default_max_concurrency() -> usize {
    10
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_retries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_memory_warning_threshold() -> u64 {
    512 * 1024 * 1024
}

fn default_timeout_safety_factor() -> f64 {
    1.5
}

/// Recipe/process-wide knobs (spec §6 configuration options table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineOptions {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_timeout_ms")]
    pub default_timeout: u64,

    #[serde(default = "default_retries")]
    pub default_retries: u32,

    #[serde(default)]
    pub continue_on_error: bool,

    #[serde(default = "default_true")]
    pub enable_parallel_execution: bool,

    #[serde(default = "default_true")]
    pub collect_metrics: bool,

    #[serde(default = "default_true")]
    pub enable_progress_tracking: bool,

    #[serde(default = "default_memory_warning_threshold")]
    pub memory_warning_threshold: u64,

    #[serde(default = "default_timeout_safety_factor")]
    pub timeout_safety_factor: f64,

    #[serde(default)]
    pub working_dir: Option<String>,

    #[serde(default)]
    pub enable_debug_logging: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            default_timeout: default_timeout_ms(),
            default_retries: default_retries(),
            continue_on_error: false,
            enable_parallel_execution: true,
            collect_metrics: true,
            enable_progress_tracking: true,
            memory_warning_threshold: default_memory_warning_threshold(),
            timeout_safety_factor: default_timeout_safety_factor(),
            working_dir: None,
            enable_debug_logging: false,
        }
    }
}

impl EngineOptions {
    /// Overlay `other` onto `self`: any field `other` set away from its
    /// type's natural "unset" value wins. Used to merge global defaults
    /// underneath project-level options (project wins, spec §6.2).
    pub fn merged_over(mut self, base: EngineOptions) -> Self {
        if self.max_concurrency == default_max_concurrency() {
            self.max_concurrency = base.max_concurrency;
        }
        if self.default_timeout == default_timeout_ms() {
            self.default_timeout = base.default_timeout;
        }
        if self.default_retries == default_retries() {
            self.default_retries = base.default_retries;
        }
        if self.working_dir.is_none() {
            self.working_dir = base.working_dir;
        }
        self
    }
}

/// Who answers an `ask: true` variable prompt (spec §4.1/§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AskMode {
    /// Prompt the human operator interactively.
    Me,
    /// Route the prompt through the AI Collector (two-phase generation).
    Ai,
    /// Never prompt; unset required variables are a hard error.
    Nobody,
}

impl Default for AskMode {
    fn default() -> Self {
        AskMode::Nobody
    }
}
