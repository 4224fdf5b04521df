//! Execution Module - read-only query execution against the recipe database

pub mod engine;
pub mod result;
pub mod sqlite_engine;

pub use engine::ExecutionEngine;
pub use result::{total_count, ResultRow};
pub use sqlite_engine::SqliteEngine;
