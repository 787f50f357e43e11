//! 核心编排层：错误类型、Brain 与其构建器

pub mod brain;
pub mod builder;
pub mod error;

pub use brain::Brain;
pub use builder::BrainBuilder;
pub use error::{BrainError, Result};
