//! Filesystem `DependencyLoader`: resolves a recipe-level `dependencies`
//! entry to a sibling recipe file under the project's recipe directory
//! (spec §4.5 "required aborts the outer load, optional logs and
//! continues").

use recipe_config::RecipeSource;
use recipe_core::{EngineError, EngineResult, Recipe};
use recipe_engine::{DependencyLoader, load_recipe};
use std::path::{Path, PathBuf};

pub struct FsDependencyLoader {
    project_root: PathBuf,
}

impl FsDependencyLoader {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self { project_root: project_root.into() }
    }

    fn candidate_paths(&self, name: &str) -> [PathBuf; 2] {
        [
            self.project_root.join(".recipe").join("recipes").join(format!("{name}.yaml")),
            self.project_root.join("recipes").join(format!("{name}.yaml")),
        ]
    }
}

impl DependencyLoader for FsDependencyLoader {
    fn load(&self, name: &str) -> EngineResult<Recipe> {
        for candidate in self.candidate_paths(name) {
            if candidate.is_file() {
                return load_recipe(&RecipeSource::file(candidate));
            }
        }
        Err(EngineError::FileNotFound(format!(
            "dependency recipe '{name}' not found under {}/.recipe/recipes or {}/recipes",
            self.project_root.display(),
            self.project_root.display()
        )))
    }
}

/// Resolve the project root a CLI invocation runs against: the directory
/// holding the recipe file when one was given, else the current directory.
pub fn project_root_for(recipe_path: Option<&Path>) -> PathBuf {
    recipe_path
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
