pub mod config;
pub mod item;
pub mod project;
pub mod row;

pub use config::*;
pub use item::*;
pub use project::*;
pub use row::*;
