//! Query Planner
//!
//! Builds the oracle prompt for a question, calls the oracle under a deadline and
//! passes whatever comes back through the sanitizer. The prompt asks for a single
//! SELECT with a LIMIT, but nothing here relies on the model complying.

use crate::config::PlannerConfig;
use crate::error::{FinderError, Result};
use crate::llm::Oracle;
use crate::schema::{describe_table, TEXT_FILTER_COLUMNS};
use crate::sql::{sanitize, SafeQuery};
use std::sync::Arc;
use tracing::{info, warn};

pub struct QueryPlanner {
    oracle: Arc<dyn Oracle>,
    config: PlannerConfig,
}

impl QueryPlanner {
    pub fn new(oracle: Arc<dyn Oracle>, config: PlannerConfig) -> Self {
        Self { oracle, config }
    }

    /// Translate `question` into a sanitized SELECT.
    ///
    /// # Errors
    ///
    /// - `FinderError::Oracle` if the oracle fails, times out or returns blank text
    /// - `FinderError::UnsafeQuery` if the returned text is not a single SELECT
    pub async fn plan(&self, question: &str, limit_hint: Option<i64>) -> Result<SafeQuery> {
        let limit = self.effective_limit(limit_hint);
        let system_prompt = system_prompt();
        let user_prompt = user_prompt(question, limit);

        let raw = tokio::time::timeout(
            self.config.oracle_timeout,
            self.oracle.complete(&system_prompt, &user_prompt),
        )
        .await
        .map_err(|_| {
            FinderError::Oracle(format!(
                "LLM call timed out after {}s",
                self.config.oracle_timeout.as_secs_f64()
            ))
        })?
        .map_err(|e| match e {
            FinderError::Oracle(_) => e,
            other => FinderError::Oracle(other.to_string()),
        })?;

        if raw.trim().is_empty() {
            return Err(FinderError::Oracle("LLM returned an empty response".to_string()));
        }

        match sanitize(&raw) {
            Ok(query) => {
                info!(sql = %query, limit, "Planned query");
                Ok(query)
            }
            Err(e) => {
                warn!(raw = %raw, "Rejected generated SQL");
                Err(e)
            }
        }
    }

    /// Positive hints are used as given; anything else falls back to the default.
    pub fn effective_limit(&self, limit_hint: Option<i64>) -> u64 {
        match limit_hint {
            Some(hint) if hint > 0 => hint as u64,
            _ => u64::from(self.config.default_limit),
        }
    }
}

/// Fixed instructions plus the table contract.
pub fn system_prompt() -> String {
    format!(
        "You convert natural language to ONE SQLite SELECT statement for the table below.\n\
         Return ONLY SQL text. No markdown, backticks, or comments.\n\
         Add a LIMIT if the user doesn't provide one.\n\n\
         {}",
        describe_table()
    )
}

pub fn user_prompt(question: &str, limit: u64) -> String {
    format!(
        "Question: {}\n\
         If filtering text columns ({}), you may use COLLATE NOCASE.\n\
         If no LIMIT is present, append 'LIMIT {}'.",
        question.trim(),
        TEXT_FILTER_COLUMNS.join(", "),
        limit
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Oracle that returns a canned answer and remembers the prompts it saw.
    struct ScriptedOracle {
        answer: Result<String>,
        prompts: Mutex<Vec<(String, String)>>,
        delay: Option<Duration>,
    }

    impl ScriptedOracle {
        fn answering(answer: &str) -> Self {
            Self {
                answer: Ok(answer.to_string()),
                prompts: Mutex::new(Vec::new()),
                delay: None,
            }
        }
    }

    #[async_trait]
    impl Oracle for ScriptedOracle {
        async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
            self.prompts
                .lock()
                .unwrap()
                .push((system_prompt.to_string(), user_prompt.to_string()));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.answer {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(FinderError::Oracle(e.to_string())),
            }
        }
    }

    fn planner(oracle: Arc<ScriptedOracle>) -> QueryPlanner {
        QueryPlanner::new(oracle, PlannerConfig::default())
    }

    #[tokio::test]
    async fn test_plan_sanitizes_fenced_answer() {
        let oracle = Arc::new(ScriptedOracle::answering(
            "```sql\nSELECT title FROM recipes LIMIT 3\n```",
        ));
        let query = planner(oracle).plan("three recipes", None).await.unwrap();
        assert_eq!(query.as_str(), "SELECT title FROM recipes LIMIT 3;");
    }

    #[tokio::test]
    async fn test_plan_propagates_unsafe_query() {
        let oracle = Arc::new(ScriptedOracle::answering("Sure! DELETE FROM recipes;"));
        let err = planner(oracle).plan("delete everything", None).await.unwrap_err();
        assert!(matches!(err, FinderError::UnsafeQuery(_)));
    }

    #[tokio::test]
    async fn test_blank_answer_is_oracle_error() {
        let oracle = Arc::new(ScriptedOracle::answering("   \n"));
        let err = planner(oracle).plan("anything", None).await.unwrap_err();
        assert!(matches!(err, FinderError::Oracle(_)));
    }

    #[tokio::test]
    async fn test_oracle_failure_is_oracle_error() {
        let oracle = Arc::new(ScriptedOracle {
            answer: Err(FinderError::Oracle("quota exceeded".to_string())),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        });
        let err = planner(oracle).plan("anything", None).await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    /// Oracle whose transport fails with a non-oracle error.
    struct BrokenTransport;

    #[async_trait]
    impl Oracle for BrokenTransport {
        async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
            Err(FinderError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "socket closed",
            )))
        }
    }

    #[tokio::test]
    async fn test_any_oracle_failure_becomes_oracle_error() {
        let planner = QueryPlanner::new(Arc::new(BrokenTransport), PlannerConfig::default());
        let err = planner.plan("anything", None).await.unwrap_err();
        assert!(matches!(err, FinderError::Oracle(ref msg) if msg.contains("socket closed")));
        assert!(err.is_client_facing());
    }

    #[tokio::test]
    async fn test_timeout_is_oracle_error() {
        let oracle = Arc::new(ScriptedOracle {
            answer: Ok("SELECT 1".to_string()),
            prompts: Mutex::new(Vec::new()),
            delay: Some(Duration::from_millis(200)),
        });
        let config = PlannerConfig {
            oracle_timeout: Duration::from_millis(20),
            ..PlannerConfig::default()
        };
        let err = QueryPlanner::new(oracle, config)
            .plan("slow", None)
            .await
            .unwrap_err();
        assert!(matches!(err, FinderError::Oracle(msg) if msg.contains("timed out")));
    }

    #[tokio::test]
    async fn test_prompts_carry_schema_and_limit() {
        let oracle = Arc::new(ScriptedOracle::answering("SELECT 1"));
        let planner = planner(oracle.clone());

        planner.plan("  quick vegan dinners ", Some(7)).await.unwrap();
        planner.plan("anything", None).await.unwrap();

        let prompts = oracle.prompts.lock().unwrap();
        let (system, user) = &prompts[0];
        assert!(system.contains("ONE SQLite SELECT statement"));
        assert!(system.contains("ingredients_json TEXT NOT NULL"));
        assert!(user.starts_with("Question: quick vegan dinners\n"));
        assert!(user.contains("COLLATE NOCASE"));
        assert!(user.ends_with("append 'LIMIT 7'."));
        assert!(prompts[1].1.ends_with("append 'LIMIT 25'."));
    }

    #[test]
    fn test_effective_limit() {
        let planner = planner(Arc::new(ScriptedOracle::answering("SELECT 1")));
        assert_eq!(planner.effective_limit(None), 25);
        assert_eq!(planner.effective_limit(Some(0)), 25);
        assert_eq!(planner.effective_limit(Some(-4)), 25);
        assert_eq!(planner.effective_limit(Some(10)), 10);
        assert_eq!(planner.effective_limit(Some(1_000_000)), 1_000_000);
        assert!(user_prompt("q", planner.effective_limit(Some(1000))).ends_with("append 'LIMIT 1000'."));
    }
}
