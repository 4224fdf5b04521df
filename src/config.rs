//! Configuration
//!
//! Everything the pipeline needs from the environment is read once here and then
//! passed explicitly into constructors. Nothing else in the crate touches env vars.

use crate::error::{FinderError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Row limit used when neither the caller nor the model supplies one.
pub const DEFAULT_LIMIT: u32 = 25;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Credentials and endpoint for the chat-completion oracle.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Limits and deadlines for query planning.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub default_limit: u32,
    pub oracle_timeout: Duration,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            oracle_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` when `OPENAI_API_KEY` is unset; commands that need the oracle fail early.
    pub llm: Option<LlmConfig>,
    pub planner: PlannerConfig,
    pub db_path: PathBuf,
    pub frontend_dir: PathBuf,
}

impl AppConfig {
    /// Build the configuration from process environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs = match lookup("RECIPES_LLM_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                FinderError::Config(format!("RECIPES_LLM_TIMEOUT_SECS '{}': {}", raw, e))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        let timeout = Duration::from_secs(timeout_secs);

        let default_limit = match lookup("RECIPES_DEFAULT_LIMIT") {
            Some(raw) => {
                let limit = raw.trim().parse::<u32>().map_err(|e| {
                    FinderError::Config(format!("RECIPES_DEFAULT_LIMIT '{}': {}", raw, e))
                })?;
                if limit == 0 {
                    return Err(FinderError::Config(
                        "RECIPES_DEFAULT_LIMIT must be positive".to_string(),
                    ));
                }
                limit
            }
            None => DEFAULT_LIMIT,
        };

        let llm = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .map(|api_key| LlmConfig {
                api_key,
                base_url: lookup("OPENAI_BASE_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                model: lookup("RECIPES_LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                timeout,
            });

        Ok(Self {
            llm,
            planner: PlannerConfig {
                default_limit,
                oracle_timeout: timeout,
            },
            db_path: lookup("RECIPES_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/recipes.db")),
            frontend_dir: lookup("RECIPES_FRONTEND_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("frontend")),
        })
    }

    /// The oracle configuration, or a config error naming the missing key.
    pub fn require_llm(&self) -> Result<&LlmConfig> {
        self.llm.as_ref().ok_or_else(|| {
            FinderError::Config("OPENAI_API_KEY environment variable not set".to_string())
        })
    }
}
