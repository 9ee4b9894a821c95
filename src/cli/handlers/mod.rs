mod init;
pub use init::{cmd_init, sample_store};

use std::error::Error;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::lock::StoreLock;
use crate::io::project_io::{self, ProjectError, TWIG_DIR};
use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};
use crate::io::store::{self, FolderPatch, Resource, StoreDoc, SubtaskPatch, TaskPatch};
use crate::model::item::{ItemKind, Tree};
use crate::model::project::Project;
use crate::ops::flatten::flatten;
use crate::ops::ids::IdGenerator;
use crate::ops::placeholder::PlaceholderSnapshot;
use crate::ops::search;
use crate::ops::session::Session;
use crate::ops::tree_ops;
use crate::util::due::parse_due;

type CmdResult = Result<(), Box<dyn Error>>;

/// Where commands start looking for the project, and how they print
struct Context {
    start: PathBuf,
    json: bool,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let start = match cli.project_dir.as_deref() {
        Some(dir) => std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?,
        None => std::env::current_dir()?,
    };
    let ctx = Context {
        start,
        json: cli.json,
    };

    let Some(cmd) = cli.command else {
        return Ok(());
    };
    match cmd {
        // Init is handled in main.rs before project discovery
        Commands::Init(args) => cmd_init(args),

        // Tree commands
        Commands::List(args) => cmd_list(&ctx, args),
        Commands::AddFolder(args) => cmd_add_folder(&ctx, args),
        Commands::AddTask(args) => cmd_add_task(&ctx, args),
        Commands::AddSubtask(args) => cmd_add_subtask(&ctx, args),
        Commands::Toggle(args) => cmd_toggle(&ctx, args),
        Commands::Expand(args) => cmd_expand(&ctx, args),
        Commands::Rename(args) => cmd_rename(&ctx, args),
        Commands::Rm(args) => cmd_rm(&ctx, args),
        Commands::Search(args) => cmd_search(&ctx, args),

        // Records
        Commands::Folders(args) => cmd_folders(&ctx, args.action),
        Commands::Tasks(args) => cmd_tasks(&ctx, args.action),
        Commands::Subtasks(args) => cmd_subtasks(&ctx, args.action),

        Commands::Recovery(args) => cmd_recovery(&ctx, args),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_project_ctx(ctx: &Context) -> Result<Project, ProjectError> {
    let root = project_io::discover_project(&ctx.start)?;
    project_io::load_project(&root)
}

fn twig_dir_ctx(ctx: &Context) -> Result<PathBuf, ProjectError> {
    Ok(project_io::discover_project(&ctx.start)?.join(TWIG_DIR))
}

/// Load the tree under the write lock, let `f` change it, save it.
fn edit_tree<T>(
    ctx: &Context,
    f: impl FnOnce(&mut Project, &mut IdGenerator) -> Result<T, Box<dyn Error>>,
) -> Result<T, Box<dyn Error>> {
    let twig_dir = twig_dir_ctx(ctx)?;
    let _lock = StoreLock::acquire_default(&twig_dir)?;
    let mut project = load_project_ctx(ctx)?;

    let mut ids = IdGenerator::seeded_from(&project.tree);
    ids.reserve_below(project.next_id);
    let out = f(&mut project, &mut ids)?;

    project.next_id = project.next_id.max(ids.peek());
    project_io::save_project(&project)?;
    Ok(out)
}

/// Load the store under the write lock, let `f` change it, save it.
fn edit_store<T>(
    ctx: &Context,
    f: impl FnOnce(&mut StoreDoc) -> Result<T, Box<dyn Error>>,
) -> Result<T, Box<dyn Error>> {
    let twig_dir = twig_dir_ctx(ctx)?;
    let _lock = StoreLock::acquire_default(&twig_dir)?;
    let mut doc = store::load_store(&twig_dir)?;
    let out = f(&mut doc)?;
    store::save_store(&twig_dir, &doc)?;
    Ok(out)
}

fn require_kind(tree: &Tree, id: &str) -> Result<ItemKind, Box<dyn Error>> {
    tree.kind_of(id)
        .ok_or_else(|| format!("item not found: {}", id).into())
}

fn require_title(title: &str) -> Result<(), Box<dyn Error>> {
    if title.trim().is_empty() {
        return Err("title cannot be blank".into());
    }
    Ok(())
}

/// `none` clears; anything else must be YYYY-MM-DD
fn parse_due_arg(s: &str) -> Result<Option<DateTime<Utc>>, Box<dyn Error>> {
    if s.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    parse_due(s)
        .map(Some)
        .map_err(|e| format!("invalid due date '{}': {} (expected YYYY-MM-DD)", s, e).into())
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, Box<dyn Error>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    parse_due(s).map_err(|_| format!("invalid timestamp '{}'", s).into())
}

// ---------------------------------------------------------------------------
// Tree commands
// ---------------------------------------------------------------------------

fn cmd_list(ctx: &Context, args: ListArgs) -> CmdResult {
    let project = load_project_ctx(ctx)?;
    let mut tree = project.tree;
    if args.all {
        for folder in &mut tree.folders {
            folder.is_expanded = true;
        }
    }
    let rows = flatten(&tree.folders, &PlaceholderSnapshot::default());

    if ctx.json {
        let rows: Vec<RowJson> = rows.iter().map(row_to_json).collect();
        print_json(&rows)?;
        return Ok(());
    }

    if rows.is_empty() {
        println!("(no folders; add one with `tw add-folder <title>`)");
    }
    let today = chrono::Local::now().date_naive();
    for row in &rows {
        println!("{}", format_row(row, today));
    }
    Ok(())
}

fn cmd_add_folder(ctx: &Context, args: AddFolderArgs) -> CmdResult {
    require_title(&args.title)?;
    let id = edit_tree(ctx, |project, ids| {
        let (tree, id) = tree_ops::add_folder(std::mem::take(&mut project.tree), &args.title, ids);
        project.tree = tree;
        id.ok_or_else(|| "could not add folder".into())
    })?;
    println!("{}", id);
    Ok(())
}

fn cmd_add_task(ctx: &Context, args: AddTaskArgs) -> CmdResult {
    require_title(&args.title)?;
    let due = args.due.as_deref().map(parse_due_arg).transpose()?.flatten();
    let id = edit_tree(ctx, |project, ids| {
        if project.tree.folder(&args.folder).is_none() {
            return Err(format!("folder not found: {}", args.folder).into());
        }
        let tree = std::mem::take(&mut project.tree);
        let (tree, id) = tree_ops::add_task(tree, &args.folder, &args.title, ids);
        project.tree = tree;
        let id: String = id.ok_or("could not add task")?;
        if due.is_some() {
            project.tree = tree_ops::set_due_date(std::mem::take(&mut project.tree), &id, due);
        }
        Ok(id)
    })?;
    println!("{}", id);
    Ok(())
}

fn cmd_add_subtask(ctx: &Context, args: AddSubtaskArgs) -> CmdResult {
    require_title(&args.title)?;
    let id = edit_tree(ctx, |project, ids| {
        let folder_id = project
            .tree
            .task(&args.task)
            .map(|(folder, _)| folder.id.clone())
            .ok_or_else(|| format!("task not found: {}", args.task))?;
        let tree = std::mem::take(&mut project.tree);
        let (tree, id) = tree_ops::add_subtask(tree, &folder_id, &args.task, &args.title, ids);
        project.tree = tree;
        id.ok_or_else(|| "could not add subtask".into())
    })?;
    println!("{}", id);
    Ok(())
}

fn cmd_toggle(ctx: &Context, args: IdArg) -> CmdResult {
    let done = edit_tree(ctx, |project, _| {
        match require_kind(&project.tree, &args.id)? {
            ItemKind::Folder => {
                return Err(format!(
                    "{} is a folder; use `tw expand` to show or hide its tasks",
                    args.id
                )
                .into());
            }
            ItemKind::Task | ItemKind::Subtask => {}
        }
        project.tree = tree_ops::toggle_completion(std::mem::take(&mut project.tree), &args.id);
        let done = match (project.tree.task(&args.id), project.tree.subtask(&args.id)) {
            (Some((_, task)), _) => task.is_completed,
            (_, Some((_, _, sub))) => sub.is_completed,
            _ => false,
        };
        Ok(done)
    })?;
    println!("{} {}", if done { "[x]" } else { "[ ]" }, args.id);
    Ok(())
}

fn cmd_expand(ctx: &Context, args: ExpandArgs) -> CmdResult {
    edit_tree(ctx, |project, _| {
        if project.tree.folder(&args.id).is_none() {
            return Err(format!("folder not found: {}", args.id).into());
        }
        project.tree = tree_ops::set_folder_expanded(
            std::mem::take(&mut project.tree),
            &args.id,
            !args.collapse,
        );
        Ok(())
    })
}

fn cmd_rename(ctx: &Context, args: RenameArgs) -> CmdResult {
    require_title(&args.title)?;
    let due = args.due.as_deref().map(parse_due_arg).transpose()?;
    edit_tree(ctx, |project, _| {
        let kind = require_kind(&project.tree, &args.id)?;
        let tree = std::mem::take(&mut project.tree);
        project.tree = match kind {
            ItemKind::Folder => tree_ops::rename_folder(tree, &args.id, &args.title),
            ItemKind::Task | ItemKind::Subtask => tree_ops::rename_item(tree, &args.id, &args.title),
        };
        if let Some(due) = due {
            if kind != ItemKind::Task {
                return Err("only tasks have due dates".into());
            }
            project.tree = tree_ops::set_due_date(std::mem::take(&mut project.tree), &args.id, due);
        }
        Ok(())
    })
}

/// The parent ids of `id` as found in the tree
fn parents_of(tree: &Tree, id: &str) -> Option<(Option<String>, Option<String>)> {
    if tree.folder(id).is_some() {
        return Some((None, None));
    }
    if let Some((folder, _)) = tree.task(id) {
        return Some((Some(folder.id.clone()), None));
    }
    let (folder, task, _) = tree.subtask(id)?;
    Some((Some(folder.id.clone()), Some(task.id.clone())))
}

fn cmd_rm(ctx: &Context, args: RmArgs) -> CmdResult {
    let twig_dir = twig_dir_ctx(ctx)?;
    edit_tree(ctx, |project, _| {
        let (folder, task) = if args.folder.is_some() || args.task.is_some() {
            (args.folder.clone(), args.task.clone())
        } else {
            parents_of(&project.tree, &args.id)
                .ok_or_else(|| format!("item not found: {}", args.id))?
        };

        let mut session = Session::new(std::mem::take(&mut project.tree), "");
        let removed = session.delete_requested(&args.id, folder.as_deref(), task.as_deref());
        let diagnostics = session.take_diagnostics();
        let malformed = !removed && !diagnostics.is_empty();
        recovery::log_diagnostics(&twig_dir, diagnostics);
        project.tree = session.into_tree();

        if malformed {
            return Err("a parent task needs its parent folder (--folder)".into());
        }
        if !removed {
            return Err(format!("item not found at that address: {}", args.id).into());
        }
        Ok(())
    })
}

fn cmd_search(ctx: &Context, args: SearchArgs) -> CmdResult {
    let project = load_project_ctx(ctx)?;
    let re = search::build_pattern(&args.pattern)?;
    let hits = search::search_tree(&project.tree, &re);

    if ctx.json {
        let hits: Vec<SearchHitJson> = hits.iter().map(hit_to_json).collect();
        print_json(&hits)?;
        return Ok(());
    }
    for hit in &hits {
        println!("{}", format_search_hit(hit));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Record commands
// ---------------------------------------------------------------------------

fn print_created<T: serde::Serialize>(resource: Resource, id: u64, record: &T) -> CmdResult {
    eprintln!("created {}", resource.location(id));
    print_json(record)?;
    Ok(())
}

/// Deleted records go to the recovery log like tree deletions do.
fn log_record_deletion<T: serde::Serialize>(ctx: &Context, resource: Resource, id: u64, record: &T) {
    if let Ok(twig_dir) = twig_dir_ctx(ctx) {
        let body = serde_json::to_string_pretty(record).unwrap_or_default();
        recovery::log_recovery(
            &twig_dir,
            RecoveryEntry::new(
                RecoveryCategory::Delete,
                format!("{} {} deleted", resource, id),
            )
            .field("Location", resource.location(id))
            .body(body),
        );
    }
}

fn read_store_ctx(ctx: &Context) -> Result<StoreDoc, Box<dyn Error>> {
    Ok(store::load_store(&twig_dir_ctx(ctx)?)?)
}

fn cmd_folders(ctx: &Context, action: FolderAction) -> CmdResult {
    match action {
        FolderAction::List => print_json(&read_store_ctx(ctx)?.folders)?,
        FolderAction::Get(args) => print_json(read_store_ctx(ctx)?.folder(args.id)?)?,
        FolderAction::Create(args) => {
            require_title(&args.name)?;
            let record = edit_store(ctx, |doc| {
                Ok(doc.create_folder(&args.name, args.expanded)?)
            })?;
            print_created(Resource::Folders, record.id, &record)?;
        }
        FolderAction::Update(args) => {
            let patch = FolderPatch {
                name: args.name,
                expanded: args.expanded,
            };
            let record = edit_store(ctx, |doc| Ok(doc.update_folder(args.id, patch)?))?;
            print_json(&record)?;
        }
        FolderAction::Delete(args) => {
            let record = edit_store(ctx, |doc| Ok(doc.delete_folder(args.id)?))?;
            log_record_deletion(ctx, Resource::Folders, args.id, &record);
        }
    }
    Ok(())
}

fn cmd_tasks(ctx: &Context, action: TaskAction) -> CmdResult {
    match action {
        TaskAction::List => print_json(&read_store_ctx(ctx)?.tasks)?,
        TaskAction::Get(args) => print_json(read_store_ctx(ctx)?.task(args.id)?)?,
        TaskAction::Create(args) => {
            require_title(&args.name)?;
            let due = args.due.as_deref().map(parse_due_arg).transpose()?.flatten();
            let record = edit_store(ctx, |doc| {
                Ok(doc.create_task(args.folder_id, &args.name, args.checked, due)?)
            })?;
            print_created(Resource::Tasks, record.id, &record)?;
        }
        TaskAction::Update(args) => {
            let patch = TaskPatch {
                folder_id: args.folder_id,
                name: args.name,
                checked: args.checked,
                due: args.due.as_deref().map(parse_due_arg).transpose()?,
            };
            let record = edit_store(ctx, |doc| Ok(doc.update_task(args.id, patch)?))?;
            print_json(&record)?;
        }
        TaskAction::Delete(args) => {
            let record = edit_store(ctx, |doc| Ok(doc.delete_task(args.id)?))?;
            log_record_deletion(ctx, Resource::Tasks, args.id, &record);
        }
    }
    Ok(())
}

fn cmd_subtasks(ctx: &Context, action: SubtaskAction) -> CmdResult {
    match action {
        SubtaskAction::List => print_json(&read_store_ctx(ctx)?.subtasks)?,
        SubtaskAction::Get(args) => print_json(read_store_ctx(ctx)?.subtask(args.id)?)?,
        SubtaskAction::Create(args) => {
            require_title(&args.name)?;
            let record = edit_store(ctx, |doc| {
                Ok(doc.create_subtask(args.task_id, &args.name, args.checked)?)
            })?;
            print_created(Resource::Subtasks, record.id, &record)?;
        }
        SubtaskAction::Update(args) => {
            let patch = SubtaskPatch {
                task_id: args.task_id,
                name: args.name,
                checked: args.checked,
            };
            let record = edit_store(ctx, |doc| Ok(doc.update_subtask(args.id, patch)?))?;
            print_json(&record)?;
        }
        SubtaskAction::Delete(args) => {
            let record = edit_store(ctx, |doc| Ok(doc.delete_subtask(args.id)?))?;
            log_record_deletion(ctx, Resource::Subtasks, args.id, &record);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

fn cmd_recovery(ctx: &Context, args: RecoveryCmd) -> CmdResult {
    let twig_dir = twig_dir_ctx(ctx)?;
    match args.action {
        Some(RecoveryAction::Path) => {
            println!("{}", recovery::recovery_log_path(&twig_dir).display());
        }
        Some(RecoveryAction::Prune(prune)) => {
            let before = prune.before.as_deref().map(parse_timestamp).transpose()?;
            let removed = recovery::prune_recovery(&twig_dir, before, prune.all)?;
            println!("pruned {} entries", removed);
        }
        None => print_recovery_entries(ctx, &twig_dir, args.limit, args.since.as_deref())?,
    }
    Ok(())
}

fn print_recovery_entries(
    ctx: &Context,
    twig_dir: &Path,
    limit: Option<usize>,
    since: Option<&str>,
) -> CmdResult {
    let since = since.map(parse_timestamp).transpose()?;
    let entries = recovery::read_recovery_entries(twig_dir, Some(limit.unwrap_or(10)), since);

    if ctx.json {
        let values: Vec<serde_json::Value> = entries.iter().map(|e| e.to_json()).collect();
        print_json(&values)?;
        return Ok(());
    }
    if entries.is_empty() {
        println!("recovery log is empty");
    }
    for entry in &entries {
        print!("{}", entry.to_markdown());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::{Folder, Subtask, Task};

    #[test]
    fn due_argument_parsing() {
        assert_eq!(parse_due_arg("none").unwrap(), None);
        assert!(parse_due_arg("2026-02-30").is_err());
        let due = parse_due_arg("2026-02-03").unwrap().unwrap();
        assert_eq!(due.format("%Y-%m-%d").to_string(), "2026-02-03");
    }

    #[test]
    fn timestamps_accept_dates_and_rfc3339() {
        assert!(parse_timestamp("2026-01-01T10:00:00Z").is_ok());
        assert!(parse_timestamp("2026-01-01").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn parents_are_resolved_from_tree() {
        let mut task = Task::new("task_2", "Clean");
        task.subtasks.push(Subtask::new("subtask_3", "Phone"));
        let mut folder = Folder::new("folder_1", "Home");
        folder.tasks.push(task);
        let tree = Tree::new(vec![folder]);

        assert_eq!(parents_of(&tree, "folder_1"), Some((None, None)));
        assert_eq!(
            parents_of(&tree, "task_2"),
            Some((Some("folder_1".into()), None))
        );
        assert_eq!(
            parents_of(&tree, "subtask_3"),
            Some((Some("folder_1".into()), Some("task_2".into())))
        );
        assert_eq!(parents_of(&tree, "nope"), None);
    }
}
