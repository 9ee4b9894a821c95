use std::ops::Range;

use regex::Regex;

use crate::model::item::{ItemKind, Tree};

/// A search hit on an item title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub kind: ItemKind,
    pub id: String,
    pub title: String,
    /// Titles from the folder down to the matching item
    pub path: Vec<String>,
    pub spans: Vec<Range<usize>>,
}

/// Compile a user pattern case-insensitively, falling back to a literal
/// match when it is not a valid regex.
pub fn build_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("(?i){}", pattern))
        .or_else(|_| Regex::new(&format!("(?i){}", regex::escape(pattern))))
}

/// Collect all non-overlapping match byte-ranges for a regex in the given text.
fn find_matches(re: &Regex, text: &str) -> Vec<Range<usize>> {
    re.find_iter(text).map(|m| m.start()..m.end()).collect()
}

/// Search every title in the tree, collapsed folders included, in tree order.
pub fn search_tree(tree: &Tree, re: &Regex) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    let mut push = |kind: ItemKind, id: &str, path: Vec<&str>| {
        let title = path.last().copied().unwrap_or_default();
        let spans = find_matches(re, title);
        if !spans.is_empty() {
            hits.push(SearchHit {
                kind,
                id: id.to_string(),
                title: title.to_string(),
                path: path.iter().map(|s| s.to_string()).collect(),
                spans,
            });
        }
    };

    for folder in &tree.folders {
        push(ItemKind::Folder, &folder.id, vec![folder.title.as_str()]);
        for task in &folder.tasks {
            push(ItemKind::Task, &task.id, vec![folder.title.as_str(), task.title.as_str()]);
            for sub in &task.subtasks {
                push(
                    ItemKind::Subtask,
                    &sub.id,
                    vec![
                        folder.title.as_str(),
                        task.title.as_str(),
                        sub.title.as_str(),
                    ],
                );
            }
        }
    }

    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::{Folder, Subtask, Task};
    use pretty_assertions::assert_eq;

    fn sample_tree() -> Tree {
        let mut task = Task::new("task_2", "Clean the house");
        task.subtasks.push(Subtask::new("subtask_3", "Clean phone"));
        let mut home = Folder::new("folder_1", "Home");
        home.tasks.push(task);
        let mut work = Folder::new("folder_4", "Work");
        work.is_expanded = false;
        work.tasks.push(Task::new("task_5", "Housekeeping report"));
        Tree::new(vec![home, work])
    }

    #[test]
    fn matches_case_insensitively_at_every_level() {
        let hits = search_tree(&sample_tree(), &build_pattern("CLEAN").unwrap());
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["task_2", "subtask_3"]);
        assert_eq!(hits[1].path, vec!["Home", "Clean the house", "Clean phone"]);
        assert_eq!(hits[1].spans, vec![0..5]);
    }

    #[test]
    fn collapsed_folders_are_searched() {
        let hits = search_tree(&sample_tree(), &build_pattern("house").unwrap());
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["task_2", "task_5"]);
        assert_eq!(hits[1].kind, ItemKind::Task);
    }

    #[test]
    fn invalid_regex_falls_back_to_literal() {
        let mut tree = sample_tree();
        tree.folders[0].title = "Home (old".into();
        let hits = search_tree(&tree, &build_pattern("(old").unwrap());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, ItemKind::Folder);
    }

    #[test]
    fn regex_alternation() {
        let hits = search_tree(&sample_tree(), &build_pattern("^(home|work)$").unwrap());
        assert_eq!(hits.len(), 2);
    }
}
