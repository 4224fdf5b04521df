//! Execution Engine Trait - contract between the pipeline and the recipe database
//!
//! Engines only ever receive `ReadOnlySql` values, so model-generated text cannot
//! reach them without passing the sanitizer first.

use crate::error::Result;
use crate::execution::result::ResultRow;
use crate::sql::ReadOnlySql;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Engine name (e.g., "sqlite")
    fn name(&self) -> &'static str;

    /// Execute a sanitized query and return all rows.
    async fn execute(&self, query: &dyn ReadOnlySql) -> Result<Vec<ResultRow>>;

    /// Batched `id -> image` lookup used by the enricher. Ids without a row are absent
    /// from the returned map.
    async fn images_by_id(&self, ids: &[i64]) -> Result<HashMap<i64, Value>>;
}
