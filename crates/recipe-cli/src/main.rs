use anyhow::Result;
use clap::Parser;

mod cli;
mod dependency;
mod display;
mod plan_cmd;
mod prompt;
mod renderer;
mod run_cmd;
mod source;
mod tools_cmd;
mod validate_cmd;
mod vars;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();

    let exit_code = match &cli.command {
        Commands::Run(args) => run_cmd::handle(args).await?,
        Commands::Validate { file } => validate_cmd::handle(file)?,
        Commands::Plan { file, vars } => plan_cmd::handle(file, vars)?,
        Commands::Tools { cmd } => tools_cmd::handle(cmd)?,
    };

    std::process::exit(exit_code);
}
