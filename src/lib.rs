//! Coursemate - question answering over course materials
//!
//! Indexes course transcripts into a vector store and answers questions with
//! a tool-calling assistant that searches the index and cites its sources.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `ingest` - Course document parsing and sentence chunking
//! - `embedding` - Embedding generation
//! - `vector_store` - Course catalog and passage storage
//! - `search` - Filtered passage search with fuzzy course resolution
//! - `llm` - Chat model abstraction with tool use
//! - `agent` - Tools, the tool registry and the bounded tool-calling loop
//! - `rag` - Query engine and conversation sessions
//! - `orchestrator` - Component wiring
//!
//! # Example
//!
//! ```rust,no_run
//! use coursemate::config::Settings;
//! use coursemate::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     orchestrator.index_path("docs".as_ref(), false).await?;
//!
//!     let engine = orchestrator.rag_engine()?;
//!     let response = engine.query("What is covered in lesson 1?", None).await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod search;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{CoursemateError, Result};
