pub mod flatten;
pub mod ids;
pub mod insertion;
pub mod placeholder;
pub mod search;
pub mod session;
pub mod tree_ops;
