//! Recipe source loading (spec §4.5 `loadRecipe`) — a recipe arrives either
//! as a path on disk or as inline content already held in memory.

use std::path::PathBuf;

/// Where a recipe's YAML came from, mirroring the two shapes `loadRecipe`
/// accepts: `{ type: 'file', path }` and `{ type: 'content', content, name }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeSource {
    File { path: PathBuf },
    Content { content: String, name: String },
}

impl RecipeSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        RecipeSource::File { path: path.into() }
    }

    pub fn content(content: impl Into<String>, name: impl Into<String>) -> Self {
        RecipeSource::Content {
            content: content.into(),
            name: name.into(),
        }
    }

    /// A stable key used by the recipe cache (spec §4.5) to recognize
    /// repeated loads of the same source without re-parsing.
    pub fn cache_key(&self) -> String {
        match self {
            RecipeSource::File { path } => format!("file:{}", path.display()),
            RecipeSource::Content { name, .. } => format!("content:{name}"),
        }
    }

    /// A human-facing name for error messages and lifecycle events.
    pub fn display_name(&self) -> String {
        match self {
            RecipeSource::File { path } => path.display().to_string(),
            RecipeSource::Content { name, .. } => name.clone(),
        }
    }
}
