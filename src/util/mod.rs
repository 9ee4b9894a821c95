pub mod due;
pub mod text;
