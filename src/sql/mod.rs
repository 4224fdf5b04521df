//! SQL safety layer
//!
//! Model-generated SQL enters the crate as plain text and leaves only as one of two
//! types: `SafeQuery` (produced by the sanitizer) or `CountQuery` (derived from a
//! `SafeQuery`). The execution boundary accepts nothing else.

pub mod count_rewriter;
pub mod sanitizer;
mod scan;

pub use count_rewriter::{to_count_query, CountQuery};
pub use sanitizer::{sanitize, SafeQuery};

mod sealed {
    pub trait Sealed {}
}

/// SQL text that is allowed to reach an execution engine.
///
/// Sealed: only `SafeQuery` and `CountQuery` implement it.
pub trait ReadOnlySql: sealed::Sealed + Send + Sync {
    fn sql(&self) -> &str;
}
