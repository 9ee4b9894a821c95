use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tw", about = concat!("twig v", env!("CARGO_PKG_VERSION"), " - folders, tasks, subtasks"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different project directory
    #[arg(short = 'C', long = "project-dir", global = true)]
    pub project_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new twig project in the current directory
    Init(InitArgs),
    /// Print the tree
    List(ListArgs),
    /// Add a folder
    AddFolder(AddFolderArgs),
    /// Add a task to a folder
    AddTask(AddTaskArgs),
    /// Add a subtask to a task
    AddSubtask(AddSubtaskArgs),
    /// Flip completion of a task or subtask
    Toggle(IdArg),
    /// Expand or collapse a folder
    Expand(ExpandArgs),
    /// Rename a folder, task or subtask
    Rename(RenameArgs),
    /// Delete an item and everything under it
    Rm(RmArgs),
    /// Search titles by regex
    Search(SearchArgs),
    /// Folder records
    Folders(FoldersCmd),
    /// Task records
    Tasks(TasksCmd),
    /// Subtask records
    Subtasks(SubtasksCmd),
    /// View or manage the recovery log
    Recovery(RecoveryCmd),
}

// ---------------------------------------------------------------------------
// Tree commands
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Project name (default: inferred from directory name)
    #[arg(long)]
    pub name: Option<String>,
    /// Seed the store with sample folders and tasks
    #[arg(long)]
    pub sample: bool,
    /// Reinitialize even if twig/ already exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ListArgs {
    /// Show tasks of collapsed folders too
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct AddFolderArgs {
    pub title: String,
}

#[derive(Args)]
pub struct AddTaskArgs {
    /// Folder id (e.g. folder_1)
    pub folder: String,
    pub title: String,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args)]
pub struct AddSubtaskArgs {
    /// Task id (e.g. task_2)
    pub task: String,
    pub title: String,
}

#[derive(Args)]
pub struct IdArg {
    pub id: String,
}

#[derive(Args)]
pub struct ExpandArgs {
    /// Folder id
    pub id: String,
    /// Collapse instead of expanding
    #[arg(long)]
    pub collapse: bool,
}

#[derive(Args)]
pub struct RenameArgs {
    pub id: String,
    pub title: String,
    /// Set (YYYY-MM-DD) or clear ("none") the due date of a task
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args)]
pub struct RmArgs {
    pub id: String,
    /// Parent folder id (resolved from the tree when omitted)
    #[arg(long)]
    pub folder: Option<String>,
    /// Parent task id (resolved from the tree when omitted)
    #[arg(long)]
    pub task: Option<String>,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Regex pattern (case-insensitive)
    pub pattern: String,
}

// ---------------------------------------------------------------------------
// Record commands
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct FoldersCmd {
    #[command(subcommand)]
    pub action: FolderAction,
}

#[derive(Subcommand)]
pub enum FolderAction {
    /// List all folder records
    List,
    /// Show one folder record
    Get(RecordId),
    /// Create a folder record
    Create(FolderFields),
    /// Update a folder record
    Update(FolderUpdate),
    /// Delete a folder record with its tasks and subtasks
    Delete(RecordId),
}

#[derive(Args)]
pub struct RecordId {
    pub id: u64,
}

#[derive(Args)]
pub struct FolderFields {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub expanded: bool,
}

#[derive(Args)]
pub struct FolderUpdate {
    pub id: u64,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub expanded: Option<bool>,
}

#[derive(Args)]
pub struct TasksCmd {
    #[command(subcommand)]
    pub action: TaskAction,
}

#[derive(Subcommand)]
pub enum TaskAction {
    List,
    Get(RecordId),
    Create(TaskFields),
    Update(TaskUpdate),
    /// Delete a task record with its subtasks
    Delete(RecordId),
}

#[derive(Args)]
pub struct TaskFields {
    #[arg(long = "folder-id")]
    pub folder_id: u64,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub checked: bool,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args)]
pub struct TaskUpdate {
    pub id: u64,
    #[arg(long = "folder-id")]
    pub folder_id: Option<u64>,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub checked: Option<bool>,
    /// Due date (YYYY-MM-DD), or "none" to clear
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args)]
pub struct SubtasksCmd {
    #[command(subcommand)]
    pub action: SubtaskAction,
}

#[derive(Subcommand)]
pub enum SubtaskAction {
    List,
    Get(RecordId),
    Create(SubtaskFields),
    Update(SubtaskUpdate),
    Delete(RecordId),
}

#[derive(Args)]
pub struct SubtaskFields {
    #[arg(long = "task-id")]
    pub task_id: u64,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub checked: bool,
}

#[derive(Args)]
pub struct SubtaskUpdate {
    pub id: u64,
    #[arg(long = "task-id")]
    pub task_id: Option<u64>,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub checked: Option<bool>,
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RecoveryCmd {
    #[command(subcommand)]
    pub action: Option<RecoveryAction>,
    /// Maximum number of entries to show (default: 10)
    #[arg(long)]
    pub limit: Option<usize>,
    /// Show entries after this timestamp (RFC 3339)
    #[arg(long)]
    pub since: Option<String>,
}

#[derive(Subcommand)]
pub enum RecoveryAction {
    /// Remove old entries
    Prune(RecoveryPruneArgs),
    /// Print the absolute path to the recovery log
    Path,
}

#[derive(Args)]
pub struct RecoveryPruneArgs {
    /// Remove entries older than this timestamp (default: 30 days ago)
    #[arg(long)]
    pub before: Option<String>,
    /// Remove all entries
    #[arg(long)]
    pub all: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_nested_record_commands() {
        let cli = Cli::try_parse_from([
            "tw", "tasks", "update", "7", "--checked", "true", "--due", "none",
        ])
        .unwrap();
        let Some(Commands::Tasks(TasksCmd {
            action: TaskAction::Update(args),
        })) = cli.command
        else {
            panic!("expected tasks update");
        };
        assert_eq!(args.id, 7);
        assert_eq!(args.checked, Some(true));
        assert_eq!(args.due.as_deref(), Some("none"));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["tw", "list", "--all", "--json", "-C", "/tmp"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.project_dir.as_deref(), Some("/tmp"));
    }
}
