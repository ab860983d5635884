//! OpenAI client construction shared by the chat model and the embedder.

use crate::error::{CoursemateError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default HTTP timeout for OpenAI API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Create an OpenAI client with the default HTTP timeout.
pub fn create_client() -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client whose underlying HTTP client gives up after `timeout`.
///
/// The API key is read from `OPENAI_API_KEY` by [`OpenAIConfig::default`].
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CoursemateError::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}
