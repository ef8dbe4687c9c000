//! Turn a CLI `file` argument into a `RecipeSource` (spec SPEC_FULL §6.1):
//! a path on disk, or `-` for stdin content.

use anyhow::{Context, Result};
use recipe_config::RecipeSource;
use std::io::Read;

pub fn resolve(file: &str) -> Result<RecipeSource> {
    if file == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("reading recipe from stdin")?;
        return Ok(RecipeSource::content(content, "stdin"));
    }
    Ok(RecipeSource::file(file))
}
