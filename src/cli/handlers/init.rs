use std::fs;

use chrono::{Duration, Utc};

use crate::cli::commands::InitArgs;
use crate::io::project_io::{self, TWIG_DIR};
use crate::io::store::{self, StoreDoc, StoreError};

const TWIG_TOML_TEMPLATE: &str = r##"[project]
name = "{name}"

# --- UI Customization ---
# Uncomment and edit to override defaults.

[ui]
# show_key_hints = false
# placeholder = "Enter a title"
#
# [ui.colors]
# background = "#0C001B"
# text = "#A09BFE"
# text_bright = "#FFFFFF"
# highlight = "#FB4196"
# dim = "#5A5580"
# red = "#FF4444"
# yellow = "#FFD700"
# green = "#44FF88"
"##;

/// Infer a project name from a directory name: hyphens become spaces, words are title-cased.
fn infer_name(dir_name: &str) -> String {
    dir_name
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_twig_toml(name: &str) -> String {
    TWIG_TOML_TEMPLATE.replace("{name}", &name.replace('"', "\\\""))
}

/// Three folders: an expanded one with a due date and subtasks, and two
/// collapsed ones with numbered tasks.
pub fn sample_store() -> Result<StoreDoc, StoreError> {
    let mut doc = StoreDoc::default();

    let productivity = doc.create_folder("Productivity", true)?.id;
    doc.create_task(productivity, "Work on the landing page", false, None)?;
    doc.create_task(productivity, "Buy food", false, None)?;
    doc.create_task(productivity, "Design a banner", true, None)?;
    let due = Utc::now() + Duration::days(2);
    let cleaning = doc
        .create_task(productivity, "Cleaning", false, Some(due))?
        .id;
    doc.create_subtask(cleaning, "Declutter phone, laptop", false)?;
    doc.create_subtask(cleaning, "Get a mattress", false)?;

    let assignments = doc.create_folder("Assignments", false)?.id;
    for n in 1..=8 {
        doc.create_task(assignments, &format!("Assignment {}", n), false, None)?;
    }

    let work = doc.create_folder("Work", false)?.id;
    for n in 1..=5 {
        doc.create_task(work, &format!("Work task {}", n), false, None)?;
    }

    Ok(doc)
}

pub fn cmd_init(args: InitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let twig_dir = cwd.join(TWIG_DIR);

    if twig_dir.is_dir() && !args.force {
        return Err("twig project already exists in ./twig/ (use --force to reinitialize)".into());
    }

    if let Some(parent) = cwd.parent()
        && let Ok(parent_root) = project_io::discover_project(parent)
    {
        eprintln!(
            "Note: parent project found at {}/",
            parent_root.join(TWIG_DIR).display()
        );
        eprintln!("Creating new project in ./twig/");
    }

    let name = args.name.unwrap_or_else(|| {
        cwd.file_name()
            .and_then(|n| n.to_str())
            .map(infer_name)
            .unwrap_or_else(|| "Untitled".to_string())
    });

    fs::create_dir_all(&twig_dir)?;
    fs::write(twig_dir.join("twig.toml"), render_twig_toml(&name))?;

    let doc = if args.sample {
        sample_store()?
    } else {
        StoreDoc::default()
    };
    store::save_store(&twig_dir, &doc)?;

    println!("Initialized twig project: {}", name);
    if args.sample {
        println!(
            "  {} folders, {} tasks, {} subtasks",
            doc.folders.len(),
            doc.tasks.len(),
            doc.subtasks.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::ProjectConfig;

    #[test]
    fn infer_name_title_cases() {
        assert_eq!(infer_name("my-todo-list"), "My Todo List");
        assert_eq!(infer_name("home"), "Home");
    }

    #[test]
    fn template_parses_as_config() {
        let config: ProjectConfig = toml::from_str(&render_twig_toml("Say \"hi\"")).unwrap();
        assert_eq!(config.project.name, "Say \"hi\"");
        assert!(config.ui.show_key_hints);
    }

    #[test]
    fn sample_store_shape() {
        let doc = sample_store().unwrap();
        let tree = doc.to_tree();
        let titles: Vec<&str> = tree.folders.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["Productivity", "Assignments", "Work"]);
        assert!(tree.folders[0].is_expanded);
        assert!(!tree.folders[1].is_expanded);
        assert_eq!(tree.folders[1].tasks.len(), 8);
        assert_eq!(tree.folders[2].tasks.len(), 5);

        let cleaning = &tree.folders[0].tasks[3];
        assert_eq!(cleaning.title, "Cleaning");
        assert!(cleaning.due_date.is_some());
        assert_eq!(cleaning.subtasks.len(), 2);
        assert!(tree.folders[0].tasks[2].is_completed);
    }
}
