//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::error::{CoursemateError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Indexing embeds passages and needs an API key.
    Index,
    /// Asking questions needs an API key for the chat model.
    Ask,
    /// Search embeds the query and needs an API key.
    Search,
    /// Listing courses only reads the local index.
    List,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Index | Operation::Ask | Operation::Search => check_api_key(),
        Operation::List => Ok(()),
    }
}

fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(CoursemateError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(CoursemateError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_has_no_requirements() {
        assert!(check(Operation::List).is_ok());
    }
}
