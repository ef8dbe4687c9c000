//! XDG-aware config path resolution, grounded in the host's
//! `directories::ProjectDirs`-based lookup for the process-wide config file.

use directories::ProjectDirs;
use std::path::PathBuf;

const QUALIFIER: &str = "";
const ORGANIZATION: &str = "";
const APPLICATION: &str = "recipe-engine";

/// `~/.config/recipe-engine/config.yaml` (or the platform equivalent).
pub fn global_config_path() -> Option<PathBuf> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
        .map(|dirs| dirs.config_dir().join("config.yaml"))
}

/// `<project_root>/.recipe/config.yaml`.
pub fn project_config_path(project_root: &std::path::Path) -> PathBuf {
    project_root.join(".recipe").join("config.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_config_path_is_dotfile_under_project_root() {
        let path = project_config_path(std::path::Path::new("/repo"));
        assert_eq!(path, PathBuf::from("/repo/.recipe/config.yaml"));
    }
}
