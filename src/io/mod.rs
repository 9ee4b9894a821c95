pub mod lock;
pub mod project_io;
pub mod recovery;
pub mod state;
pub mod store;
pub mod watcher;
