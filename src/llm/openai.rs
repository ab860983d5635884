//! OpenAI chat-completions implementation of [`ChatModel`].

use super::{ChatModel, ChatRequest, ChatResponse, ContentBlock, Message, Role, StopReason};
use crate::agent::ToolSchema;
use crate::error::{CoursemateError, Result};
use crate::openai::create_client_with_timeout;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolChoiceOption, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FinishReason, FunctionCall, FunctionObject,
};
use async_openai::Client;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

/// Chat model backed by the OpenAI API.
pub struct OpenAIChatModel {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIChatModel {
    /// Create a chat model for `model` whose HTTP client gives up after `timeout`.
    pub fn new(model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            model: model.to_string(),
        })
    }
}

fn llm_error(e: impl std::fmt::Display) -> CoursemateError {
    CoursemateError::Llm(e.to_string())
}

/// Concatenated text blocks of a message, if it has any.
fn joined_text(blocks: &[ContentBlock]) -> Option<String> {
    let texts: Vec<&str> = blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.join("\n"))
    }
}

/// Map one provider-neutral message to OpenAI messages.
///
/// A combined tool-result message becomes one `tool` message per result.
fn to_openai_messages(message: &Message) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut out = Vec::new();

    match message.role {
        Role::User => {
            for block in &message.content {
                if let ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    ..
                } = block
                {
                    out.push(
                        ChatCompletionRequestToolMessageArgs::default()
                            .tool_call_id(tool_use_id.clone())
                            .content(content.clone())
                            .build()
                            .map_err(llm_error)?
                            .into(),
                    );
                }
            }
            if let Some(text) = joined_text(&message.content) {
                out.push(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(text)
                        .build()
                        .map_err(llm_error)?
                        .into(),
                );
            }
        }
        Role::Assistant => {
            let tool_calls: Vec<ChatCompletionMessageToolCall> = message
                .content
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolUse { id, name, input } => {
                        Some(ChatCompletionMessageToolCall {
                            id: id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: name.clone(),
                                arguments: input.to_string(),
                            },
                        })
                    }
                    _ => None,
                })
                .collect();

            let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
            if let Some(text) = joined_text(&message.content) {
                builder.content(text);
            }
            if !tool_calls.is_empty() {
                builder.tool_calls(tool_calls);
            }
            out.push(builder.build().map_err(llm_error)?.into());
        }
    }

    Ok(out)
}

fn to_openai_tool(schema: &ToolSchema) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: schema.name.clone(),
            description: Some(schema.description.clone()),
            parameters: Some(schema.parameters.clone()),
            strict: None,
        },
    }
}

/// Parse tool-call arguments. Malformed JSON is passed through as a string
/// so the tool rejects it as invalid input.
fn parse_arguments(arguments: &str) -> Value {
    serde_json::from_str(arguments).unwrap_or_else(|_| Value::String(arguments.to_string()))
}

/// Map a finish reason; only actual tool calls count as a tool request.
fn stop_reason(reason: Option<FinishReason>, has_tool_calls: bool) -> StopReason {
    if has_tool_calls {
        return StopReason::ToolUse;
    }
    match reason {
        Some(FinishReason::Stop)
        | Some(FinishReason::ToolCalls)
        | Some(FinishReason::FunctionCall) => StopReason::EndTurn,
        Some(FinishReason::Length) => StopReason::MaxTokens,
        _ => StopReason::Other,
    }
}

fn chat_response(
    text: Option<String>,
    tool_calls: Vec<ChatCompletionMessageToolCall>,
    finish_reason: Option<FinishReason>,
) -> ChatResponse {
    let mut content = Vec::new();
    if let Some(text) = text.filter(|t| !t.is_empty()) {
        content.push(ContentBlock::Text { text });
    }
    for call in &tool_calls {
        content.push(ContentBlock::ToolUse {
            id: call.id.clone(),
            name: call.function.name.clone(),
            input: parse_arguments(&call.function.arguments),
        });
    }

    ChatResponse {
        content,
        stop_reason: stop_reason(finish_reason, !tool_calls.is_empty()),
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    #[instrument(skip(self, request), fields(model = %self.model, messages = request.messages.len()))]
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system.clone())
                .build()
                .map_err(llm_error)?
                .into(),
        ];
        for message in &request.messages {
            messages.extend(to_openai_messages(message)?);
        }

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(messages)
            .temperature(request.temperature)
            .max_completion_tokens(request.max_tokens);

        if let Some(tools) = request.tools.as_ref().filter(|t| !t.is_empty()) {
            builder
                .tools(tools.iter().map(to_openai_tool).collect::<Vec<_>>())
                .tool_choice(ChatCompletionToolChoiceOption::Auto);
        }

        let api_request = builder.build().map_err(llm_error)?;

        let response = self
            .client
            .chat()
            .create(api_request)
            .await
            .map_err(|e| CoursemateError::OpenAI(format!("Chat completion failed: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CoursemateError::Llm("No response from model".to_string()))?;

        let response = chat_response(
            choice.message.content,
            choice.message.tool_calls.unwrap_or_default(),
            choice.finish_reason,
        );

        debug!(
            "Model stopped with {:?}, {} tool call(s)",
            response.stop_reason,
            response.tool_uses().len()
        );

        Ok(response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_results_become_tool_messages() {
        let message = Message::tool_results(vec![
            ContentBlock::ToolResult {
                tool_use_id: "call_1".to_string(),
                content: "first".to_string(),
                is_error: false,
            },
            ContentBlock::ToolResult {
                tool_use_id: "call_2".to_string(),
                content: "second".to_string(),
                is_error: true,
            },
        ]);

        let mapped = to_openai_messages(&message).unwrap();
        assert_eq!(mapped.len(), 2);
        assert!(mapped
            .iter()
            .all(|m| matches!(m, ChatCompletionRequestMessage::Tool(_))));
    }

    #[test]
    fn test_assistant_tool_use_maps_to_tool_calls() {
        let message = Message::assistant(vec![ContentBlock::ToolUse {
            id: "call_1".to_string(),
            name: "search_course_content".to_string(),
            input: json!({"query": "MCP"}),
        }]);

        let mapped = to_openai_messages(&message).unwrap();
        assert_eq!(mapped.len(), 1);
        match &mapped[0] {
            ChatCompletionRequestMessage::Assistant(assistant) => {
                let calls = assistant.tool_calls.as_ref().unwrap();
                assert_eq!(calls[0].id, "call_1");
                assert_eq!(calls[0].function.name, "search_course_content");
                assert_eq!(calls[0].function.arguments, r#"{"query":"MCP"}"#);
            }
            other => panic!("Expected assistant message, got {:?}", other),
        }
    }

    #[test]
    fn test_user_text_maps_to_user_message() {
        let mapped = to_openai_messages(&Message::user("hello")).unwrap();
        assert_eq!(mapped.len(), 1);
        assert!(matches!(mapped[0], ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_malformed_arguments_pass_through() {
        assert_eq!(parse_arguments(r#"{"query": "x"}"#), json!({"query": "x"}));
        assert_eq!(parse_arguments("{not json"), Value::String("{not json".to_string()));
    }

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(stop_reason(Some(FinishReason::Stop), false), StopReason::EndTurn);
        assert_eq!(stop_reason(Some(FinishReason::ToolCalls), true), StopReason::ToolUse);
        assert_eq!(stop_reason(Some(FinishReason::Stop), true), StopReason::ToolUse);
        assert_eq!(stop_reason(Some(FinishReason::Length), false), StopReason::MaxTokens);
        assert_eq!(stop_reason(None, false), StopReason::Other);
    }

    #[test]
    fn test_tool_calls_finish_without_calls_is_not_a_tool_request() {
        let response = chat_response(
            Some("Here is what I found.".to_string()),
            Vec::new(),
            Some(FinishReason::ToolCalls),
        );

        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert!(!response.requests_tools());
        assert_eq!(response.first_text(), Some("Here is what I found."));
    }

    #[test]
    fn test_tool_calls_become_tool_use_blocks() {
        let call = ChatCompletionMessageToolCall {
            id: "call_1".to_string(),
            r#type: ChatCompletionToolType::Function,
            function: FunctionCall {
                name: "search_course_content".to_string(),
                arguments: r#"{"query": "agents"}"#.to_string(),
            },
        };
        let response = chat_response(Some(String::new()), vec![call], Some(FinishReason::ToolCalls));

        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert_eq!(response.content.len(), 1);
        assert_eq!(
            response.tool_uses(),
            vec![("call_1", "search_course_content", &json!({"query": "agents"}))]
        );
    }
}
