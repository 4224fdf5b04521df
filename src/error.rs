use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinderError {
    #[error("Refusing to execute non-SELECT SQL: {0}")]
    UnsafeQuery(String),

    #[error("LLM error: {0}")]
    Oracle(String),

    #[error("SQL execution error: {0}")]
    Execution(String),

    #[error("Count query rewrite refused: {0}")]
    CountRewrite(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Loader error: {0}")]
    Loader(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FinderError {
    /// Whether the failure should be reported to the HTTP caller as a client error
    /// (400) rather than an internal one (500).
    pub fn is_client_facing(&self) -> bool {
        matches!(
            self,
            FinderError::UnsafeQuery(_)
                | FinderError::Oracle(_)
                | FinderError::Execution(_)
                | FinderError::InvalidRequest(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FinderError>;
