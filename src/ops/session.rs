use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::model::item::{ItemKind, Tree};
use crate::model::row::DisplayRow;
use crate::ops::flatten::flatten;
use crate::ops::ids::IdGenerator;
use crate::ops::insertion::{
    InsertionPlan, plan_folder_insertion, plan_subtask_insertion, plan_task_insertion,
};
use crate::ops::placeholder::{
    PlaceholderKey, PlaceholderRegistry, PutOutcome, new_folder_row, new_subtask_row,
    new_task_row,
};
use crate::ops::tree_ops::{self, AddressError, ItemAddress, edit};

/// The parent a new item is requested under
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddTarget {
    Folder,
    Task { folder_id: String },
    Subtask { folder_id: String, task_id: String },
}

impl AddTarget {
    fn folder_id(&self) -> Option<&str> {
        match self {
            AddTarget::Folder => None,
            AddTarget::Task { folder_id } | AddTarget::Subtask { folder_id, .. } => {
                Some(folder_id)
            }
        }
    }
}

/// Result of an add request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// A placeholder is pending and will render at `index` after refresh
    Inserted { key: PlaceholderKey, index: usize },
    /// The folder was collapsed and is being expanded; the placeholder is
    /// inserted by the refresh that shows it expanded
    AwaitingExpansion { folder_id: String },
    /// A placeholder for this parent is already pending
    AlreadyPending { key: PlaceholderKey },
    ParentNotFound,
}

/// Result of a placeholder commit or cancel event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderOutcome {
    /// The item was added to the tree under `id`
    Committed { id: String },
    /// The placeholder was dropped without touching the tree
    Cancelled,
    /// The key was unknown, no longer pending, or already settled
    Ignored,
}

/// Something worth writing to the recovery log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A delete arrived with parent ids that address nothing
    MalformedAddress { item_id: String, error: AddressError },
    /// An item (and its children) left the tree; `snapshot` is its JSON
    Deleted {
        kind: ItemKind,
        id: String,
        snapshot: String,
    },
    /// A commit/cancel event named a key that is not a placeholder key
    UnknownPlaceholder { key: String },
}

/// Owner of the current tree and its pending placeholders.
///
/// Every presentation event goes through one of the methods below. Events
/// change the tree or the registry and mark the rows stale; `refresh`
/// re-flattens. The row list seen by the planner is always the one most
/// recently returned by `refresh`.
#[derive(Debug)]
pub struct Session {
    tree: Tree,
    registry: PlaceholderRegistry,
    ids: IdGenerator,
    rows: Vec<DisplayRow>,
    placeholder_title: String,
    /// Add request waiting for its folder to show up expanded
    pending_add: Option<AddTarget>,
    /// Outcome of an add resumed by the last refresh
    resumed_add: Option<AddOutcome>,
    /// Keys whose commit or cancel has been dispatched but not yet flattened
    settled: HashSet<String>,
    diagnostics: Vec<Diagnostic>,
    stale: bool,
    dirty: bool,
}

impl Session {
    pub fn new(tree: Tree, placeholder_title: impl Into<String>) -> Self {
        let ids = IdGenerator::seeded_from(&tree);
        let mut session = Session {
            tree,
            registry: PlaceholderRegistry::new(),
            ids,
            rows: Vec::new(),
            placeholder_title: placeholder_title.into(),
            pending_add: None,
            resumed_add: None,
            settled: HashSet::new(),
            diagnostics: Vec::new(),
            stale: true,
            dirty: false,
        };
        session.refresh();
        session
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }

    /// Number the next generated id will carry
    pub fn next_id(&self) -> u64 {
        self.ids.peek()
    }

    /// Keep generated ids at or above `n`
    pub fn reserve_ids(&mut self, n: u64) {
        self.ids.reserve_below(n);
    }

    pub fn registry(&self) -> &PlaceholderRegistry {
        &self.registry
    }

    /// Rows as of the last refresh
    pub fn rows(&self) -> &[DisplayRow] {
        &self.rows
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Re-derive the row list from the tree and the registry.
    ///
    /// Also clears the double-submit guard for keys no longer shown and
    /// resumes an add that was waiting for its folder to expand.
    pub fn refresh(&mut self) -> &[DisplayRow] {
        self.reflatten();
        if let Some(target) = self.pending_add.take() {
            self.resume_add(target);
            if self.stale {
                self.reflatten();
            }
        }
        &self.rows
    }

    fn reflatten(&mut self) {
        self.rows = flatten(&self.tree.folders, &self.registry.snapshot());
        self.stale = false;
        let rows = &self.rows;
        self.settled
            .retain(|key| rows.iter().any(|r| r.is_placeholder() && r.id() == key));
    }

    fn resume_add(&mut self, target: AddTarget) {
        let Some(folder_id) = target.folder_id() else {
            return;
        };
        let expanded = self
            .rows
            .iter()
            .filter_map(|r| r.as_folder())
            .any(|f| f.id == folder_id && f.is_expanded);
        if expanded {
            self.resumed_add = Some(self.add_requested(target));
        }
    }

    /// Outcome of an add that was resumed by a refresh, if any
    pub fn take_resumed_add(&mut self) -> Option<AddOutcome> {
        self.resumed_add.take()
    }

    /// Drain diagnostics gathered since the last call
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Whether the tree changed since the last call (i.e. needs saving)
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Swap in a tree loaded from elsewhere, keeping pending placeholders
    /// whose parents still exist.
    pub fn replace_tree(&mut self, tree: Tree) {
        self.ids.observe_tree(&tree);
        self.registry.retain_parents(&tree);
        self.tree = tree;
        self.stale = true;
    }

    fn apply(&mut self, f: impl FnOnce(&mut Tree) -> bool) -> bool {
        let changed = f(&mut self.tree);
        if changed {
            self.dirty = true;
            self.stale = true;
        }
        changed
    }

    // -----------------------------------------------------------------------
    // Presentation events
    // -----------------------------------------------------------------------

    /// A task or subtask row was activated: flip its completion.
    pub fn item_activated(&mut self, id: &str) -> bool {
        self.apply(|tree| edit::toggle_completion(tree, id))
    }

    /// A folder row was activated: flip its expansion.
    pub fn folder_toggled(&mut self, folder_id: &str) -> bool {
        self.apply(|tree| edit::toggle_folder_expansion(tree, folder_id))
    }

    /// An inline rename was submitted for a committed item.
    pub fn rename_submitted(&mut self, id: &str, text: &str) -> bool {
        match self.tree.kind_of(id) {
            Some(ItemKind::Folder) => self.apply(|tree| edit::rename_folder(tree, id, text)),
            Some(ItemKind::Task | ItemKind::Subtask) => {
                self.apply(|tree| edit::rename_item(tree, id, text))
            }
            None => false,
        }
    }

    /// A due date was set or cleared on a task.
    pub fn due_submitted(&mut self, task_id: &str, due: Option<DateTime<Utc>>) -> bool {
        self.apply(|tree| edit::set_due_date(tree, task_id, due))
    }

    /// The user asked for a new item under `target`.
    pub fn add_requested(&mut self, target: AddTarget) -> AddOutcome {
        if self.stale {
            self.reflatten();
        }
        // A repeat of the waiting request replaces it
        if self.pending_add.as_ref() == Some(&target) {
            self.pending_add = None;
        }

        match &target {
            AddTarget::Folder => {
                let index = plan_folder_insertion(&self.rows);
                let row = new_folder_row(&self.placeholder_title);
                self.insert_placeholder(PlaceholderKey::Folder, row, index)
            }
            AddTarget::Task { folder_id } => match plan_task_insertion(&self.rows, folder_id) {
                InsertionPlan::At(index) => {
                    let row = new_task_row(folder_id, &self.placeholder_title);
                    self.insert_placeholder(PlaceholderKey::task(folder_id), row, index)
                }
                InsertionPlan::ExpandRequired => self.expand_then_add(target),
                InsertionPlan::NotFound => AddOutcome::ParentNotFound,
            },
            AddTarget::Subtask { folder_id, task_id } => {
                match plan_subtask_insertion(&self.rows, folder_id, task_id) {
                    InsertionPlan::At(index) => {
                        let row = new_subtask_row(folder_id, task_id, &self.placeholder_title);
                        self.insert_placeholder(PlaceholderKey::subtask(task_id), row, index)
                    }
                    InsertionPlan::ExpandRequired => self.expand_then_add(target),
                    InsertionPlan::NotFound => AddOutcome::ParentNotFound,
                }
            }
        }
    }

    fn expand_then_add(&mut self, target: AddTarget) -> AddOutcome {
        let folder_id = target.folder_id().unwrap_or_default().to_string();
        self.apply(|tree| edit::set_folder_expanded(tree, &folder_id, true));
        self.pending_add = Some(target);
        AddOutcome::AwaitingExpansion { folder_id }
    }

    fn insert_placeholder(
        &mut self,
        key: PlaceholderKey,
        row: DisplayRow,
        index: usize,
    ) -> AddOutcome {
        match self.registry.put(&key, row) {
            PutOutcome::Inserted => {
                self.settled.remove(&key.as_key());
                self.stale = true;
                AddOutcome::Inserted { key, index }
            }
            PutOutcome::AlreadyExists => AddOutcome::AlreadyPending { key },
        }
    }

    /// A delete was requested for `id` at the given parent address.
    pub fn delete_requested(
        &mut self,
        id: &str,
        parent_folder_id: Option<&str>,
        parent_task_id: Option<&str>,
    ) -> bool {
        let address = match ItemAddress::from_parents(parent_folder_id, parent_task_id) {
            Ok(address) => address,
            Err(error) => {
                self.diagnostics.push(Diagnostic::MalformedAddress {
                    item_id: id.to_string(),
                    error,
                });
                return false;
            }
        };

        let snapshot = self.snapshot_json(id, address.kind());
        let changed = self.apply(|tree| edit::delete_at(tree, id, address));
        if changed {
            self.registry.retain_parents(&self.tree);
            if let Some(snapshot) = snapshot {
                self.diagnostics.push(Diagnostic::Deleted {
                    kind: address.kind(),
                    id: id.to_string(),
                    snapshot,
                });
            }
        }
        changed
    }

    fn snapshot_json(&self, id: &str, kind: ItemKind) -> Option<String> {
        let json = match kind {
            ItemKind::Folder => serde_json::to_string_pretty(self.tree.folder(id)?),
            ItemKind::Task => serde_json::to_string_pretty(self.tree.task(id)?.1),
            ItemKind::Subtask => serde_json::to_string_pretty(self.tree.subtask(id)?.2),
        };
        json.ok()
    }

    /// The user submitted text in a placeholder row.
    ///
    /// Blank text cancels. Repeated submits for the same key are ignored
    /// until the next refresh no longer shows the row.
    pub fn placeholder_committed(&mut self, key: &str, text: &str) -> PlaceholderOutcome {
        let Some((parsed, row)) = self.settle(key) else {
            return PlaceholderOutcome::Ignored;
        };
        if text.trim().is_empty() {
            return PlaceholderOutcome::Cancelled;
        }

        let tree = std::mem::take(&mut self.tree);
        let (tree, new_id) = match parsed {
            PlaceholderKey::Folder => tree_ops::add_folder(tree, text, &mut self.ids),
            PlaceholderKey::Task { folder_id } => {
                tree_ops::add_task(tree, &folder_id, text, &mut self.ids)
            }
            PlaceholderKey::Subtask { task_id } => {
                let folder_id = row.parent_folder_id.unwrap_or_default();
                tree_ops::add_subtask(tree, &folder_id, &task_id, text, &mut self.ids)
            }
        };
        self.tree = tree;

        match new_id {
            Some(id) => {
                self.dirty = true;
                self.stale = true;
                PlaceholderOutcome::Committed { id }
            }
            None => PlaceholderOutcome::Cancelled,
        }
    }

    /// The user abandoned a placeholder row (escape or focus loss).
    pub fn placeholder_cancelled(&mut self, key: &str) -> PlaceholderOutcome {
        match self.settle(key) {
            Some(_) => PlaceholderOutcome::Cancelled,
            None => PlaceholderOutcome::Ignored,
        }
    }

    /// Remove a pending placeholder and guard its key against repeats.
    fn settle(&mut self, key: &str) -> Option<(PlaceholderKey, DisplayRow)> {
        let parsed: PlaceholderKey = match key.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                self.diagnostics.push(Diagnostic::UnknownPlaceholder {
                    key: key.to_string(),
                });
                return None;
            }
        };
        if self.settled.contains(key) {
            return None;
        }
        let row = self.registry.remove(&parsed)?;
        self.settled.insert(key.to_string());
        self.stale = true;
        Some((parsed, row))
    }
}
