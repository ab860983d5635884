//! Name-indexed tool registry.

use super::tools::{Source, Tool, ToolSchema};
use crate::error::{CoursemateError, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Tools available to the agent, in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<(String, Arc<dyn Tool>)>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its schema name.
    ///
    /// A tool with the same name is replaced and keeps its position.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.schema().name;
        if name.trim().is_empty() {
            return Err(CoursemateError::Config(
                "Tool schema must have a non-empty name".to_string(),
            ));
        }

        match self.tools.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => {
                warn!("Replacing previously registered tool '{}'", name);
                entry.1 = tool;
            }
            None => {
                debug!("Registered tool '{}'", name);
                self.tools.push((name, tool));
            }
        }
        Ok(())
    }

    /// Schemas of every registered tool.
    pub fn definitions(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|(_, tool)| tool.schema()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Execute the named tool and record its sources in `log`.
    ///
    /// Unknown names are reported as content. Tool errors propagate.
    pub async fn dispatch(&self, name: &str, input: &Value, log: &mut SourceLog) -> Result<String> {
        let Some((_, tool)) = self.tools.iter().find(|(n, _)| n == name) else {
            warn!("Model requested unknown tool '{}'", name);
            return Ok(format!("Tool '{}' not found", name));
        };

        let output = tool.execute(input).await?;
        log.record(name, output.sources);
        Ok(output.content)
    }

    /// Order in which sources are collected.
    fn position(&self, name: &str) -> usize {
        self.tools
            .iter()
            .position(|(n, _)| n == name)
            .unwrap_or(usize::MAX)
    }

    /// Every tool's last recorded sources, concatenated in registration order.
    pub fn collect_sources(&self, log: &SourceLog) -> Vec<Source> {
        let mut entries: Vec<&(String, Vec<Source>)> = log.entries.iter().collect();
        entries.sort_by_key(|(name, _)| self.position(name));
        entries
            .into_iter()
            .flat_map(|(_, sources)| sources.iter().cloned())
            .collect()
    }
}

/// Sources recorded by tools during one request.
///
/// Each tool keeps only the sources of its latest execution.
#[derive(Debug, Default)]
pub struct SourceLog {
    entries: Vec<(String, Vec<Source>)>,
}

impl SourceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the sources recorded for `tool`.
    pub fn record(&mut self, tool: &str, sources: Vec<Source>) {
        match self.entries.iter_mut().find(|(name, _)| name == tool) {
            Some(entry) => entry.1 = sources,
            None => self.entries.push((tool.to_string(), sources)),
        }
    }

    /// All recorded sources, in the order tools first recorded.
    pub fn collect(&self) -> Vec<Source> {
        self.entries
            .iter()
            .flat_map(|(_, sources)| sources.iter().cloned())
            .collect()
    }

    /// Forget every recorded source.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Collect then reset.
    pub fn take(&mut self) -> Vec<Source> {
        let sources = self.collect();
        self.reset();
        sources
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|(_, sources)| sources.is_empty())
    }
}
