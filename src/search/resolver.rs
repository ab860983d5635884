//! Fuzzy course-name resolution against the course title index.

use crate::embedding::Embedder;
use crate::vector_store::VectorStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Maps an approximate course name to the closest indexed course title.
pub struct CourseResolver {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    max_distance: Option<f32>,
}

impl CourseResolver {
    /// Create a resolver that always accepts the nearest title.
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            vector_store,
            embedder,
            max_distance: None,
        }
    }

    /// Reject nearest titles farther than `max_distance` (cosine distance).
    pub fn with_max_distance(mut self, max_distance: Option<f32>) -> Self {
        self.max_distance = max_distance;
        self
    }

    /// Resolve `candidate` to a known course title.
    ///
    /// Returns `None` when the index is empty, the lookup fails, or the best
    /// match is beyond the distance threshold.
    pub async fn resolve(&self, candidate: &str) -> Option<String> {
        let embedding = match self.embedder.embed(candidate).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Failed to embed course name '{}': {}", candidate, e);
                return None;
            }
        };

        let best = match self.vector_store.nearest_courses(&embedding, 1).await {
            Ok(hits) => hits.into_iter().next()?,
            Err(e) => {
                warn!("Course lookup failed for '{}': {}", candidate, e);
                return None;
            }
        };

        if let Some(max) = self.max_distance {
            if best.distance > max {
                debug!(
                    "Rejected '{}' for '{}' (distance {:.3} > {:.3})",
                    best.title, candidate, best.distance, max
                );
                return None;
            }
        }

        debug!("Resolved '{}' to '{}' ({:.3})", candidate, best.title, best.distance);
        Some(best.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::KeywordEmbedder;
    use crate::vector_store::{CourseRecord, MemoryVectorStore};

    async fn store_with(titles: &[&str], embedder: &KeywordEmbedder) -> Arc<dyn VectorStore> {
        let store = MemoryVectorStore::new();
        for title in titles {
            let embedding = embedder.embed(title).await.unwrap();
            store
                .upsert_course(&CourseRecord::new(title.to_string(), None, None, vec![], embedding))
                .await
                .unwrap();
        }
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_resolves_partial_name() {
        let embedder = Arc::new(KeywordEmbedder::new());
        let store = store_with(
            &["MCP: Build Rich-Context AI Apps", "Building Towards Computer Use"],
            &embedder,
        )
        .await;
        let resolver = CourseResolver::new(store, embedder);

        assert_eq!(
            resolver.resolve("MCP apps").await.as_deref(),
            Some("MCP: Build Rich-Context AI Apps")
        );
        assert_eq!(
            resolver.resolve("computer use").await.as_deref(),
            Some("Building Towards Computer Use")
        );
    }

    #[tokio::test]
    async fn test_empty_index_resolves_to_none() {
        let embedder = Arc::new(KeywordEmbedder::new());
        let resolver = CourseResolver::new(Arc::new(MemoryVectorStore::new()), embedder);
        assert_eq!(resolver.resolve("anything").await, None);
    }

    #[tokio::test]
    async fn test_without_threshold_nonsense_still_matches() {
        let embedder = Arc::new(KeywordEmbedder::new());
        let store = store_with(&["Retrieval Basics"], &embedder).await;
        let resolver = CourseResolver::new(store, embedder);
        assert_eq!(
            resolver.resolve("zebra").await.as_deref(),
            Some("Retrieval Basics")
        );
    }

    #[tokio::test]
    async fn test_threshold_rejects_distant_titles() {
        let embedder = Arc::new(KeywordEmbedder::new());
        let store = store_with(&["Retrieval Basics"], &embedder).await;
        let resolver = CourseResolver::new(store, embedder).with_max_distance(Some(0.75));

        assert_eq!(resolver.resolve("zebra").await, None);
        assert_eq!(
            resolver.resolve("retrieval").await.as_deref(),
            Some("Retrieval Basics")
        );
    }

    #[tokio::test]
    async fn test_embedding_failure_resolves_to_none() {
        let embedder = Arc::new(KeywordEmbedder::new());
        let store = store_with(&["Retrieval Basics"], &embedder).await;
        let resolver = CourseResolver::new(store, Arc::new(KeywordEmbedder::failing()));
        assert_eq!(resolver.resolve("retrieval").await, None);
    }
}
