//! Agent runner with a bounded tool-calling loop.

use super::registry::{SourceLog, ToolRegistry};
use super::tools::Source;
use crate::config::{LlmSettings, Prompts};
use crate::error::{CoursemateError, Result};
use crate::llm::{ChatModel, ChatRequest, ChatResponse, ContentBlock, Message};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default number of tool rounds per query.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 2;

/// Agent that answers a query, calling tools for up to `max_tool_rounds` rounds.
pub struct Agent {
    model: Arc<dyn ChatModel>,
    registry: Arc<ToolRegistry>,
    prompts: Prompts,
    max_tool_rounds: usize,
    temperature: f32,
    max_tokens: u32,
    llm_timeout: Duration,
    tool_timeout: Duration,
}

impl Agent {
    /// Create an agent with default limits.
    pub fn new(model: Arc<dyn ChatModel>, registry: Arc<ToolRegistry>) -> Self {
        let defaults = LlmSettings::default();
        Self {
            model,
            registry,
            prompts: Prompts::default(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
            llm_timeout: defaults.timeout(),
            tool_timeout: defaults.tool_timeout(),
        }
    }

    /// Apply limits and timeouts from settings.
    pub fn with_settings(mut self, settings: &LlmSettings) -> Self {
        self.max_tool_rounds = settings.max_tool_rounds;
        self.temperature = settings.temperature;
        self.max_tokens = settings.max_tokens;
        self.llm_timeout = settings.timeout();
        self.tool_timeout = settings.tool_timeout();
        self
    }

    /// Use custom prompts.
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set the maximum number of tool rounds.
    pub fn with_max_tool_rounds(mut self, max: usize) -> Self {
        self.max_tool_rounds = max;
        self
    }

    pub fn with_timeouts(mut self, llm: Duration, tool: Duration) -> Self {
        self.llm_timeout = llm;
        self.tool_timeout = tool;
        self
    }

    pub fn prompts(&self) -> &Prompts {
        &self.prompts
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    fn system_prompt(&self, history: Option<&str>) -> String {
        let system = self.prompts.system();
        match history {
            Some(history) if !history.is_empty() => {
                format!("{}\n\nPrevious conversation:\n{}", system, history)
            }
            _ => system,
        }
    }

    /// Answer `query`, optionally in the context of a prior conversation transcript.
    ///
    /// LLM failures and timeouts are returned as errors. Tool failures are
    /// reported to the model and end the tool rounds.
    pub async fn run(&self, query: &str, history: Option<&str>) -> Result<AgentResponse> {
        let system = self.system_prompt(history);
        let tools = self.registry.definitions();
        let mut messages = vec![Message::user(query)];
        let mut log = SourceLog::new();
        let mut tool_calls = Vec::new();
        let mut llm_calls = 0;
        let mut rounds = 0;

        let mut offer_tools = !tools.is_empty() && self.max_tool_rounds > 0;
        let mut response = self
            .complete(&system, &messages, offer_tools.then(|| tools.clone()))
            .await?;
        llm_calls += 1;

        while offer_tools && response.requests_tools() {
            rounds += 1;
            debug!("Tool round {} of {}", rounds, self.max_tool_rounds);

            let mut results = Vec::new();
            let mut round_failed = false;

            for (id, name, input) in response.tool_uses() {
                let (content, is_error) = match self.execute_tool(name, input, &mut log).await {
                    Ok(content) => (content, false),
                    Err(e) => {
                        warn!("Tool '{}' failed: {}", name, e);
                        round_failed = true;
                        (format!("Tool execution error: {}", fault_message(&e)), true)
                    }
                };

                tool_calls.push(ToolCallRecord {
                    name: name.to_string(),
                    arguments: input.to_string(),
                    result: content.clone(),
                });
                results.push(ContentBlock::ToolResult {
                    tool_use_id: id.to_string(),
                    content,
                    is_error,
                });
            }

            messages.push(Message::assistant(response.content.clone()));
            messages.push(Message::tool_results(results));

            offer_tools = rounds < self.max_tool_rounds && !round_failed;
            response = self
                .complete(&system, &messages, offer_tools.then(|| tools.clone()))
                .await?;
            llm_calls += 1;
        }

        let sources = self.registry.collect_sources(&log);
        log.reset();

        let (answer, outcome) = match response.first_text() {
            Some(text) => (text.to_string(), Outcome::Answered),
            None => {
                warn!("Model returned no text after {} round(s)", rounds);
                (self.prompts.assistant.fallback_answer.clone(), Outcome::Degraded)
            }
        };

        info!(
            "Agent finished: {} LLM call(s), {} tool call(s), {} source(s)",
            llm_calls,
            tool_calls.len(),
            sources.len()
        );

        Ok(AgentResponse {
            answer,
            sources,
            tool_calls,
            llm_calls,
            outcome,
        })
    }

    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: Option<Vec<super::ToolSchema>>,
    ) -> Result<ChatResponse> {
        let request = ChatRequest {
            system: system.to_string(),
            messages: messages.to_vec(),
            tools,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        with_timeout("LLM call", self.llm_timeout, self.model.complete(&request)).await
    }

    async fn execute_tool(&self, name: &str, input: &Value, log: &mut SourceLog) -> Result<String> {
        info!("Agent calling tool: {} with args: {}", name, input);
        with_timeout(
            &format!("Tool '{}'", name),
            self.tool_timeout,
            self.registry.dispatch(name, input, log),
        )
        .await
    }
}

async fn with_timeout<T>(
    operation: &str,
    limit: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(CoursemateError::Timeout {
            operation: operation.to_string(),
            seconds: limit.as_secs(),
        }),
    }
}

/// Message shown to the model for a failed tool call.
fn fault_message(error: &CoursemateError) -> String {
    match error {
        CoursemateError::Tool(message) => message.clone(),
        other => other.to_string(),
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The model produced a text answer.
    Answered,
    /// No text came back; the answer is the fallback message.
    Degraded,
}

/// Response from an agent run.
#[derive(Debug)]
pub struct AgentResponse {
    /// Final answer text.
    pub answer: String,
    /// Citations gathered by tools during this run.
    pub sources: Vec<Source>,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of LLM calls used.
    pub llm_calls: usize,
    pub outcome: Outcome,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Text returned to the model.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}
