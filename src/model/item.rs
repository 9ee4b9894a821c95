use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A leaf item owned by a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub title: String,
    pub is_completed: bool,
}

impl Subtask {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Subtask {
            id: id.into(),
            title: title.into(),
            is_completed: false,
        }
    }
}

/// A task owned by a folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub is_completed: bool,
    /// Optional due instant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    /// Subtasks in display order
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Task {
            id: id.into(),
            title: title.into(),
            is_completed: false,
            due_date: None,
            subtasks: Vec::new(),
        }
    }
}

/// A top-level container of tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub title: String,
    /// Whether the folder's tasks are shown in the flattened list
    pub is_expanded: bool,
    /// Tasks in display order
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Folder {
    /// A new, expanded, empty folder
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Folder {
            id: id.into(),
            title: title.into(),
            is_expanded: true,
            tasks: Vec::new(),
        }
    }
}

/// Any node of the tree.
///
/// Folders never carry a completion flag; `is_completed()` is always
/// `false` for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Item {
    Folder(Folder),
    Task(Task),
    Subtask(Subtask),
}

impl Item {
    pub fn id(&self) -> &str {
        match self {
            Item::Folder(f) => &f.id,
            Item::Task(t) => &t.id,
            Item::Subtask(s) => &s.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Item::Folder(f) => &f.title,
            Item::Task(t) => &t.title,
            Item::Subtask(s) => &s.title,
        }
    }

    pub fn is_completed(&self) -> bool {
        match self {
            Item::Folder(_) => false,
            Item::Task(t) => t.is_completed,
            Item::Subtask(s) => s.is_completed,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            Item::Folder(_) => ItemKind::Folder,
            Item::Task(_) => ItemKind::Task,
            Item::Subtask(_) => ItemKind::Subtask,
        }
    }
}

/// The variant of an [`Item`], without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Folder,
    Task,
    Subtask,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemKind::Folder => write!(f, "folder"),
            ItemKind::Task => write!(f, "task"),
            ItemKind::Subtask => write!(f, "subtask"),
        }
    }
}

/// The whole to-do tree: one ordered sequence of folders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub folders: Vec<Folder>,
}

impl Tree {
    pub fn new(folders: Vec<Folder>) -> Self {
        Tree { folders }
    }

    pub fn folder(&self, folder_id: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.id == folder_id)
    }

    /// Find a task anywhere in the tree, with the id of its folder
    pub fn task(&self, task_id: &str) -> Option<(&Folder, &Task)> {
        self.folders.iter().find_map(|folder| {
            folder
                .tasks
                .iter()
                .find(|t| t.id == task_id)
                .map(|task| (folder, task))
        })
    }

    /// Find a subtask anywhere in the tree, with its folder and task
    pub fn subtask(&self, subtask_id: &str) -> Option<(&Folder, &Task, &Subtask)> {
        self.folders.iter().find_map(|folder| {
            folder.tasks.iter().find_map(|task| {
                task.subtasks
                    .iter()
                    .find(|s| s.id == subtask_id)
                    .map(|sub| (folder, task, sub))
            })
        })
    }

    /// Which kind of item carries `id`, if any
    pub fn kind_of(&self, id: &str) -> Option<ItemKind> {
        if self.folder(id).is_some() {
            Some(ItemKind::Folder)
        } else if self.task(id).is_some() {
            Some(ItemKind::Task)
        } else if self.subtask(id).is_some() {
            Some(ItemKind::Subtask)
        } else {
            None
        }
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.kind_of(id).is_some()
    }

    /// Visit every id in the tree (folders, tasks, subtasks)
    pub fn for_each_id(&self, f: &mut dyn FnMut(&str)) {
        for folder in &self.folders {
            f(&folder.id);
            for task in &folder.tasks {
                f(&task.id);
                for sub in &task.subtasks {
                    f(&sub.id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tree {
        let mut task = Task::new("t1", "Clean");
        task.subtasks.push(Subtask::new("s1", "Phone"));
        let mut folder = Folder::new("f1", "Home");
        folder.tasks.push(task);
        Tree::new(vec![folder, Folder::new("f2", "Work")])
    }

    #[test]
    fn lookups_find_each_level() {
        let tree = sample();
        assert_eq!(tree.folder("f2").map(|f| f.title.as_str()), Some("Work"));
        assert_eq!(tree.task("t1").map(|(f, _)| f.id.as_str()), Some("f1"));
        let (folder, task, sub) = tree.subtask("s1").unwrap();
        assert_eq!((folder.id.as_str(), task.id.as_str()), ("f1", "t1"));
        assert_eq!(sub.title, "Phone");
    }

    #[test]
    fn kind_of_covers_all_variants() {
        let tree = sample();
        assert_eq!(tree.kind_of("f1"), Some(ItemKind::Folder));
        assert_eq!(tree.kind_of("t1"), Some(ItemKind::Task));
        assert_eq!(tree.kind_of("s1"), Some(ItemKind::Subtask));
        assert_eq!(tree.kind_of("nope"), None);
    }

    #[test]
    fn folder_is_never_completed() {
        let item = Item::Folder(Folder::new("f", "F"));
        assert!(!item.is_completed());
        assert_eq!(item.kind(), ItemKind::Folder);
    }

    #[test]
    fn for_each_id_visits_in_tree_order() {
        let mut ids = Vec::new();
        sample().for_each_id(&mut |id| ids.push(id.to_string()));
        assert_eq!(ids, vec!["f1", "t1", "s1", "f2"]);
    }
}
