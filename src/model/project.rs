use std::path::PathBuf;

use super::config::ProjectConfig;
use super::item::Tree;

/// A fully loaded twig project
#[derive(Debug)]
pub struct Project {
    /// Root directory of the project (parent of `twig/`)
    pub root: PathBuf,
    /// Path to the `twig/` directory
    pub twig_dir: PathBuf,
    /// Parsed twig.toml
    pub config: ProjectConfig,
    /// The to-do tree assembled from the store
    pub tree: Tree,
    /// Next number of the store's shared id sequence
    pub next_id: u64,
}
