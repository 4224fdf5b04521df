//! Search pipeline
//!
//! question -> plan (oracle + sanitizer) -> execute -> enrich, plus the optional
//! total count through the count rewrite. Each request runs the chain sequentially.

use crate::config::AppConfig;
use crate::enricher::ResultEnricher;
use crate::error::{FinderError, Result};
use crate::execution::{total_count, ExecutionEngine, ResultRow, SqliteEngine};
use crate::llm::{LlmClient, Oracle};
use crate::planner::QueryPlanner;
use crate::sql::{CountQuery, SafeQuery};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Body of `POST /api/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Search payload returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub sql: String,
    pub count: usize,
    /// Size of the un-paginated result, `None` when it could not be computed.
    pub total: Option<i64>,
    pub results: Vec<ResultRow>,
}

pub struct SearchService {
    planner: QueryPlanner,
    engine: Arc<dyn ExecutionEngine>,
    enricher: ResultEnricher,
    count_totals: bool,
}

impl SearchService {
    pub fn new(planner: QueryPlanner, engine: Arc<dyn ExecutionEngine>) -> Self {
        Self {
            planner,
            enricher: ResultEnricher::new(engine.clone()),
            engine,
            count_totals: true,
        }
    }

    /// Wire the OpenAI client and SQLite engine described by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = LlmClient::new(config.require_llm()?)?;
        let sqlite = SqliteEngine::new(&config.db_path);
        info!(
            model = client.model(),
            db = %sqlite.db_path().display(),
            "Configured search service"
        );

        let oracle: Arc<dyn Oracle> = Arc::new(client);
        let engine: Arc<dyn ExecutionEngine> = Arc::new(sqlite);
        let planner = QueryPlanner::new(oracle, config.planner.clone());
        Ok(Self::new(planner, engine))
    }

    /// Toggle the extra `COUNT(*)` query per search.
    pub fn with_totals(mut self, enabled: bool) -> Self {
        self.count_totals = enabled;
        self
    }

    pub async fn search(&self, question: &str, limit: Option<i64>) -> Result<SearchResponse> {
        let question = question.trim();
        if question.is_empty() {
            return Err(FinderError::InvalidRequest("q (query) is required".to_string()));
        }

        let query = self.planner.plan(question, limit).await?;
        let mut rows = self.engine.execute(&query).await?;
        self.enricher.enrich(&mut rows).await;

        let total = if self.count_totals {
            self.total_for(&query).await
        } else {
            None
        };

        info!(
            engine = self.engine.name(),
            rows = rows.len(),
            total = ?total,
            "Search completed"
        );

        Ok(SearchResponse {
            sql: query.into_string(),
            count: rows.len(),
            total,
            results: rows,
        })
    }

    /// Total row count ignoring pagination. Failures are logged, never returned.
    async fn total_for(&self, query: &SafeQuery) -> Option<i64> {
        let count_query = match CountQuery::from_safe(query) {
            Ok(count_query) => count_query,
            Err(e) => {
                warn!(error = %e, "Skipping total count");
                return None;
            }
        };

        match self.engine.execute(&count_query).await {
            Ok(rows) => total_count(&rows),
            Err(e) => {
                warn!(error = %e, sql = %count_query, "Total count query failed");
                None
            }
        }
    }
}
