//! Configuration module for Coursemate.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AssistantPrompts, Prompts};
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, LlmSettings, PromptSettings,
    SearchSettings, ServerSettings, SessionSettings, Settings, VectorStoreProvider,
    VectorStoreSettings,
};
