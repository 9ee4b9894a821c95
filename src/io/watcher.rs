use std::path::{Path, PathBuf};
use std::sync::mpsc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Files under `twig/` whose changes mean the TUI must reload
const WATCHED_FILES: &[&str] = &["store.json", "twig.toml"];

#[derive(Debug)]
pub enum FileEvent {
    /// One or more watched files changed on disk
    Changed(Vec<PathBuf>),
}

/// Watches the `twig/` directory for changes made by other processes.
pub struct StoreWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<FileEvent>,
}

impl StoreWatcher {
    pub fn start(twig_dir: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let Ok(event) = result else {
                    return;
                };
                if !matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    return;
                }

                let relevant: Vec<PathBuf> =
                    event.paths.into_iter().filter(|p| is_watched(p)).collect();
                if !relevant.is_empty() {
                    let _ = tx.send(FileEvent::Changed(relevant));
                }
            },
            Config::default(),
        )?;

        watcher.watch(twig_dir, RecursiveMode::NonRecursive)?;
        Ok(StoreWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Drain queued events without blocking.
    pub fn poll(&self) -> Vec<FileEvent> {
        self.rx.try_iter().collect()
    }
}

fn is_watched(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| WATCHED_FILES.contains(&name))
}
