//! Chat model boundary.
//!
//! The agent speaks a small provider-neutral message model: role-tagged
//! messages made of text, tool-use and tool-result blocks. Providers map it
//! to their own wire format.

mod openai;

pub use openai::OpenAIChatModel;

use crate::agent::ToolSchema;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One block of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }
}

/// A role-tagged conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// A user message with a single text block.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// An assistant message carrying the given blocks.
    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    /// A user message carrying tool results.
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content: results,
        }
    }
}

/// A single completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// System instructions.
    pub system: String,
    /// Conversation so far, oldest first.
    pub messages: Vec<Message>,
    /// Tools offered for this call. `None` withholds tool use.
    pub tools: Option<Vec<ToolSchema>>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    Other,
}

/// A completion response.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
}

impl ChatResponse {
    /// First text block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Tool-use blocks as `(id, name, input)`, in emitted order.
    pub fn tool_uses(&self) -> Vec<(&str, &str, &Value)> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => {
                    Some((id.as_str(), name.as_str(), input))
                }
                _ => None,
            })
            .collect()
    }

    /// Whether the model stopped to request tool execution and named at least one tool.
    pub fn requests_tools(&self) -> bool {
        self.stop_reason == StopReason::ToolUse
            && self
                .content
                .iter()
                .any(|block| matches!(block, ContentBlock::ToolUse { .. }))
    }
}

/// A chat completion provider.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}
