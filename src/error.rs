//! Error types for Coursemate.

use thiserror::Error;

/// Library-level error type for Coursemate operations.
#[derive(Error, Debug)]
pub enum CoursemateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Ingestion error: {0}")]
    Ingestion(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CoursemateError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoursemateError::Timeout { .. } | CoursemateError::Http(_) | CoursemateError::OpenAI(_)
        )
    }
}

/// Result type alias for Coursemate operations.
pub type Result<T> = std::result::Result<T, CoursemateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_retryable() {
        let err = CoursemateError::Timeout {
            operation: "LLM call".to_string(),
            seconds: 60,
        };
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "LLM call timed out after 60s");
    }

    #[test]
    fn test_config_error_is_not_retryable() {
        assert!(!CoursemateError::Config("bad".to_string()).is_retryable());
        assert!(!CoursemateError::Tool("boom".to_string()).is_retryable());
    }
}
