use std::fs;
use std::path::{Path, PathBuf};

use crate::io::store::{self, StoreDoc, StoreError};
use crate::model::config::ProjectConfig;
use crate::model::item::Tree;
use crate::model::project::Project;

/// Name of the data directory inside a project root
pub const TWIG_DIR: &str = "twig";
const CONFIG_FILE: &str = "twig.toml";

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("not a twig project: no twig/ directory found")]
    NotAProject,
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse twig.toml: {0}")]
    ConfigParseError(#[from] toml::de::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Walk up from `start` to the first directory holding `twig/twig.toml`.
pub fn discover_project(start: &Path) -> Result<PathBuf, ProjectError> {
    let mut current = start.to_path_buf();
    loop {
        let twig_dir = current.join(TWIG_DIR);
        if twig_dir.is_dir() && twig_dir.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(ProjectError::NotAProject);
        }
    }
}

pub fn read_config(twig_dir: &Path) -> Result<ProjectConfig, ProjectError> {
    let path = twig_dir.join(CONFIG_FILE);
    let text = fs::read_to_string(&path).map_err(|source| ProjectError::ReadError {
        path: path.clone(),
        source,
    })?;
    Ok(toml::from_str(&text)?)
}

/// Load config and store from the project rooted at `root`.
pub fn load_project(root: &Path) -> Result<Project, ProjectError> {
    let twig_dir = root.join(TWIG_DIR);
    if !twig_dir.is_dir() {
        return Err(ProjectError::NotAProject);
    }

    let config = read_config(&twig_dir)?;
    let doc = store::load_store(&twig_dir)?;

    Ok(Project {
        root: root.to_path_buf(),
        twig_dir,
        config,
        tree: doc.to_tree(),
        next_id: doc.next_id,
    })
}

/// Re-read only the tree, as after an external change.
pub fn reload_tree(twig_dir: &Path) -> Result<(Tree, u64), ProjectError> {
    let doc = store::load_store(twig_dir)?;
    Ok((doc.to_tree(), doc.next_id))
}

/// Persist the project's tree to the store.
pub fn save_project(project: &Project) -> Result<(), ProjectError> {
    save_tree(&project.twig_dir, &project.tree, project.next_id)
}

pub fn save_tree(twig_dir: &Path, tree: &Tree, next_id: u64) -> Result<(), ProjectError> {
    let doc = StoreDoc::from_tree(tree, next_id)?;
    store::save_store(twig_dir, &doc)?;
    Ok(())
}
