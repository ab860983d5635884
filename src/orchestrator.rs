//! Component wiring for Coursemate.
//!
//! Builds the embedder, vector store, passage store, tool registry, agent
//! and RAG engine from [`Settings`].

use crate::agent::{Agent, CourseSearchTool, ToolRegistry};
use crate::config::{Prompts, Settings, VectorStoreProvider};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::Result;
use crate::ingest::{FolderReport, Ingestor};
use crate::llm::{ChatModel, OpenAIChatModel};
use crate::rag::{RagEngine, SessionManager};
use crate::search::PassageStore;
use crate::vector_store::{MemoryVectorStore, SqliteVectorStore, VectorStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// Owns the shared components and builds per-use services from them.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    passage_store: Arc<PassageStore>,
    sessions: Arc<SessionManager>,
}

impl Orchestrator {
    /// Create an orchestrator using the OpenAI embedder and the configured store.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        )?);

        let vector_store: Arc<dyn VectorStore> = match settings.vector_store.provider {
            VectorStoreProvider::Sqlite => {
                let path = settings.sqlite_path();
                info!("Using SQLite vector store at {}", path.display());
                Arc::new(SqliteVectorStore::new(&path)?)
            }
            VectorStoreProvider::Memory => {
                info!("Using in-memory vector store");
                Arc::new(MemoryVectorStore::new())
            }
        };

        Ok(Self::with_components(settings, prompts, embedder, vector_store))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        let passage_store = Arc::new(
            PassageStore::new(vector_store.clone(), embedder.clone())
                .with_max_results(settings.search.max_results)
                .with_course_match_max_distance(settings.search.course_match_max_distance),
        );
        let sessions = Arc::new(
            SessionManager::new(settings.session.max_history)
                .with_max_sessions(settings.session.max_sessions),
        );

        Self {
            settings,
            prompts,
            embedder,
            vector_store,
            passage_store,
            sessions,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn prompts(&self) -> &Prompts {
        &self.prompts
    }

    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    pub fn passage_store(&self) -> Arc<PassageStore> {
        self.passage_store.clone()
    }

    pub fn sessions(&self) -> Arc<SessionManager> {
        self.sessions.clone()
    }

    /// Ingestor configured with the chunking settings.
    pub fn ingestor(&self) -> Ingestor {
        Ingestor::new(
            self.vector_store.clone(),
            self.embedder.clone(),
            &self.settings.chunking,
        )
    }

    /// Index a course file or folder.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn index_path(&self, path: &Path, clear: bool) -> Result<FolderReport> {
        self.ingestor().ingest_path(path, clear).await
    }

    /// Registry holding the course search tool.
    pub fn tool_registry(&self) -> Result<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CourseSearchTool::new(self.passage_store.clone())))?;
        Ok(registry)
    }

    /// Agent over `model` with the configured limits and prompts.
    pub fn agent(&self, model: Arc<dyn ChatModel>) -> Result<Agent> {
        Ok(Agent::new(model, Arc::new(self.tool_registry()?))
            .with_settings(&self.settings.llm)
            .with_prompts(self.prompts.clone()))
    }

    /// RAG engine over the configured OpenAI chat model.
    pub fn rag_engine(&self) -> Result<RagEngine> {
        let model = Arc::new(OpenAIChatModel::new(
            &self.settings.llm.model,
            self.settings.llm.timeout(),
        )?);
        self.rag_engine_with_model(model)
    }

    /// RAG engine over a custom chat model.
    pub fn rag_engine_with_model(&self, model: Arc<dyn ChatModel>) -> Result<RagEngine> {
        Ok(RagEngine::new(
            self.agent(model)?,
            self.passage_store.clone(),
            self.sessions.clone(),
        ))
    }
}
