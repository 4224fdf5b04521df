pub mod config;
pub mod display;
pub mod enricher;
pub mod error;
pub mod execution;
pub mod llm;
pub mod loader;
pub mod planner;
pub mod schema;
pub mod search;
pub mod server;
pub mod sql;

pub use config::{AppConfig, LlmConfig, PlannerConfig};
pub use error::{FinderError, Result};
pub use execution::{ExecutionEngine, ResultRow, SqliteEngine};
pub use llm::{LlmClient, Oracle};
pub use planner::QueryPlanner;
pub use search::{SearchRequest, SearchResponse, SearchService};
pub use sql::{sanitize, to_count_query, CountQuery, SafeQuery};
