//! `recipe tools list` / `recipe tools stats` (spec SPEC_FULL §4.1/§6.1).

use crate::cli::ToolsCommands;
use anyhow::Result;
use recipe_tools::global_registry;

pub fn handle(cmd: &ToolsCommands) -> Result<i32> {
    let registry = global_registry().lock().unwrap();
    match cmd {
        ToolsCommands::List => {
            for key in registry.registered_keys() {
                println!("{key}");
            }
        }
        ToolsCommands::Stats => {
            let stats = registry.stats();
            println!("registered: {}", stats.registered);
            println!("cached: {}", stats.cached);
        }
    }
    Ok(0)
}
