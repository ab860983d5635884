//! Tool-calling agent.
//!
//! The [`Agent`] sends the user's question to a chat model together with the
//! registered tool schemas, executes any tool calls the model makes through
//! the [`ToolRegistry`], and feeds the results back for a bounded number of
//! rounds before taking the final answer.

mod course_search;
mod registry;
mod runner;
mod tools;

pub use course_search::{CourseSearchTool, COURSE_SEARCH_TOOL};
pub use registry::{SourceLog, ToolRegistry};
pub use runner::{Agent, AgentResponse, Outcome, ToolCallRecord, DEFAULT_MAX_TOOL_ROUNDS};
pub use tools::{Source, Tool, ToolOutput, ToolSchema};
