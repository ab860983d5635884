//! Deterministic test doubles shared by unit tests.

use crate::agent::{Source, Tool, ToolOutput, ToolSchema};
use crate::embedding::Embedder;
use crate::error::{CoursemateError, Result};
use crate::llm::{ChatModel, ChatRequest, ChatResponse, ContentBlock, StopReason};
use crate::search::PassageStore;
use crate::vector_store::{CourseRecord, Lesson, MemoryVectorStore, Passage, VectorStore};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const KEYWORD_DIMENSIONS: usize = 1024;

/// Bag-of-words embedder: every distinct lowercase word gets its own axis,
/// so texts sharing no words are orthogonal.
pub struct KeywordEmbedder {
    vocabulary: Mutex<HashMap<String, usize>>,
    fail: bool,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self {
            vocabulary: Mutex::new(HashMap::new()),
            fail: false,
        }
    }

    /// An embedder whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut vocabulary = self.vocabulary.lock().unwrap();
        let mut vector = vec![0.0; KEYWORD_DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let next = vocabulary.len();
            let axis = *vocabulary.entry(word.to_lowercase()).or_insert(next);
            vector[axis % KEYWORD_DIMENSIONS] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail {
            return Err(CoursemateError::Embedding("embedding service unavailable".to_string()));
        }
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        KEYWORD_DIMENSIONS
    }
}

pub const SAMPLE_COURSE: &str = "Intro to AI";

/// A one-course passage store with lessons 0, 1 and 2.
pub async fn sample_store() -> PassageStore {
    let embedder = Arc::new(KeywordEmbedder::new());
    let store = Arc::new(MemoryVectorStore::new());

    let lessons = (0..3)
        .map(|n| Lesson {
            number: n,
            title: format!("Lesson {}", n),
            link: Some(format!("https://example.com/lesson{}", n)),
        })
        .collect();
    let title_embedding = embedder.embed(SAMPLE_COURSE).await.unwrap();
    store
        .upsert_course(&CourseRecord::new(
            SAMPLE_COURSE.to_string(),
            Some("https://example.com/intro".to_string()),
            Some("Dr. Smith".to_string()),
            lessons,
            title_embedding,
        ))
        .await
        .unwrap();

    let texts = [
        (0, "Lesson 0 content: Welcome to the course on artificial intelligence."),
        (1, "Lesson 1 content: Artificial intelligence is the study of intelligent agents."),
        (1, "Neural networks are computing systems inspired by the brain."),
        (2, "Lesson 2 content: Deep networks stack many layers of neurons."),
        (2, "Training adjusts the weights of every layers with gradient descent."),
    ];
    let mut passages = Vec::new();
    for (index, (lesson, text)) in texts.iter().enumerate() {
        passages.push(Passage::new(
            SAMPLE_COURSE.to_string(),
            Some(*lesson),
            index as u32,
            text.to_string(),
            embedder.embed(text).await.unwrap(),
        ));
    }
    store.upsert_passages(&passages).await.unwrap();

    PassageStore::new(store, embedder)
}

/// Chat model that replays queued responses and records every request.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<ChatResponse>>,
    requests: Mutex<Vec<ChatRequest>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CoursemateError::Llm("script exhausted".to_string()))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub fn text_response(text: &str) -> ChatResponse {
    ChatResponse {
        content: vec![ContentBlock::text(text)],
        stop_reason: StopReason::EndTurn,
    }
}

pub fn tool_response(id: &str, name: &str, input: Value) -> ChatResponse {
    ChatResponse {
        content: vec![ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }],
        stop_reason: StopReason::ToolUse,
    }
}

fn stub_schema(name: &str) -> ToolSchema {
    ToolSchema {
        name: name.to_string(),
        description: "stub".to_string(),
        parameters: json!({"type": "object", "properties": {}}),
    }
}

/// Tool that always returns the same output.
pub struct StaticTool {
    name: String,
    content: String,
    sources: Vec<Source>,
    delay: Option<Duration>,
}

impl StaticTool {
    pub fn new(name: &str, content: &str) -> Self {
        Self {
            name: name.to_string(),
            content: content.to_string(),
            sources: Vec::new(),
            delay: None,
        }
    }

    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn schema(&self) -> ToolSchema {
        stub_schema(&self.name)
    }

    async fn execute(&self, _input: &Value) -> Result<ToolOutput> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(ToolOutput {
            content: self.content.clone(),
            sources: self.sources.clone(),
        })
    }
}

/// Tool whose every execution fails with the given message.
pub struct FailingTool {
    name: String,
    message: String,
}

impl FailingTool {
    pub fn new(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn schema(&self) -> ToolSchema {
        stub_schema(&self.name)
    }

    async fn execute(&self, _input: &Value) -> Result<ToolOutput> {
        Err(CoursemateError::Tool(self.message.clone()))
    }
}
