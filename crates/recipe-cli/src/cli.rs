//! Clap derive CLI surface (spec SPEC_FULL §6.1), built the way the host's
//! `crates/cli-sub-agent/src/cli.rs` is built: a top-level `Cli` wrapping a
//! `Commands` enum, with nested enums for multi-level subcommands.

use clap::{Parser, Subcommand, ValueEnum};

fn build_version() -> &'static str {
    static VERSION: std::sync::OnceLock<String> = std::sync::OnceLock::new();
    VERSION.get_or_init(|| env!("CARGO_PKG_VERSION").to_string())
}

#[derive(Parser)]
#[command(name = "recipe", version = build_version())]
#[command(about = "Recipe Engine: load, validate, plan, and run declarative step recipes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load, validate, resolve variables, and execute a recipe
    Run(RunArgs),

    /// Load and validate a recipe without running it
    Validate {
        /// Path to the recipe YAML file, or `-` to read from stdin
        file: String,
    },

    /// Load, validate, resolve variables, and print the phase plan
    Plan {
        /// Path to the recipe YAML file, or `-` to read from stdin
        file: String,

        /// Set a recipe variable: `--var name=value`
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,
    },

    /// Tool Registry introspection
    Tools {
        #[command(subcommand)]
        cmd: ToolsCommands,
    },
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Path to the recipe YAML file, or `-` to read from stdin
    pub file: String,

    /// Set a recipe variable: `--var name=value`
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,

    /// Who answers an unset required variable
    #[arg(long, value_enum, default_value_t = AskModeArg::Nobody)]
    pub ask: AskModeArg,

    /// Evaluate the recipe without writing files or running shell commands
    #[arg(long)]
    pub dry_run: bool,

    /// Never apply declared variable defaults
    #[arg(long)]
    pub no_defaults: bool,

    /// Skip confirmation prompts a tool would otherwise require
    #[arg(long)]
    pub force: bool,

    /// Pass 2 input: a JSON file mapping AI Collector keys to resolved values
    #[arg(long, value_name = "PATH")]
    pub answers: Option<String>,

    /// Run Pass 1 only: collect AI requests and print them as JSON instead
    /// of executing file-producing tools
    #[arg(long)]
    pub collect_ai: bool,
}

#[derive(Subcommand)]
pub enum ToolsCommands {
    /// List every registered `(toolType, name)` key
    List,
    /// Print registry/cache occupancy counters
    Stats,
}

/// CLI-facing mirror of `recipe_config::AskMode` — kept separate so the
/// engine crate never depends on `clap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AskModeArg {
    Me,
    Ai,
    Nobody,
}

impl From<AskModeArg> for recipe_config::AskMode {
    fn from(value: AskModeArg) -> Self {
        match value {
            AskModeArg::Me => recipe_config::AskMode::Me,
            AskModeArg::Ai => recipe_config::AskMode::Ai,
            AskModeArg::Nobody => recipe_config::AskMode::Nobody,
        }
    }
}

impl std::fmt::Display for AskModeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AskModeArg::Me => "me",
            AskModeArg::Ai => "ai",
            AskModeArg::Nobody => "nobody",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ask_mode_arg_converts_to_engine_ask_mode() {
        assert_eq!(recipe_config::AskMode::from(AskModeArg::Me), recipe_config::AskMode::Me);
        assert_eq!(recipe_config::AskMode::from(AskModeArg::Nobody), recipe_config::AskMode::Nobody);
    }
}
