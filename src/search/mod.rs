//! Retrieval over the passage index.
//!
//! [`PassageStore`] is the boundary the search tool talks to: it resolves
//! fuzzy course names, builds structured filters, embeds the query, and
//! reports every failure as data inside [`SearchResults`].

mod resolver;
mod results;

pub use resolver::CourseResolver;
pub use results::SearchResults;

use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{SearchFilter, VectorStore};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Default number of passages per search.
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Filtered semantic search over course passages.
pub struct PassageStore {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    resolver: CourseResolver,
    max_results: usize,
}

impl PassageStore {
    /// Create a passage store over the given index and embedder.
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        let resolver = CourseResolver::new(vector_store.clone(), embedder.clone());
        Self {
            vector_store,
            embedder,
            resolver,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Set the maximum number of passages per search.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Set the course-name distance threshold (see [`CourseResolver::with_max_distance`]).
    pub fn with_course_match_max_distance(mut self, max_distance: Option<f32>) -> Self {
        self.resolver = self.resolver.with_max_distance(max_distance);
        self
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    /// Search passages semantically, optionally restricted to a course and/or lesson.
    ///
    /// Never fails: resolution misses and index errors come back as
    /// [`SearchResults::empty`] with a descriptive message.
    #[instrument(skip(self), fields(max_results = self.max_results))]
    pub async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> SearchResults {
        let course_title = match course_name {
            Some(name) => match self.resolver.resolve(name).await {
                Some(title) => Some(title),
                None => return SearchResults::empty(format!("No course found matching '{}'", name)),
            },
            None => None,
        };

        let filter = SearchFilter::build(course_title.as_deref(), lesson_number);
        debug!("Searching with filter {:?}", filter);

        match self.nearest(query, filter.as_ref()).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Search failed: {}", e);
                SearchResults::empty(format!("Search error: {}", e))
            }
        }
    }

    async fn nearest(&self, query: &str, filter: Option<&SearchFilter>) -> Result<SearchResults> {
        let embedding = self.embedder.embed(query).await?;
        let hits = self
            .vector_store
            .query_passages(&embedding, filter, self.max_results)
            .await?;
        Ok(SearchResults::from_hits(hits))
    }

    /// Resolve a fuzzy course name to an indexed title.
    pub async fn resolve_course_name(&self, name: &str) -> Option<String> {
        self.resolver.resolve(name).await
    }

    /// Stored link for a lesson. Lookup failures are logged and treated as absent.
    pub async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Option<String> {
        match self.vector_store.lesson_link(course_title, lesson_number).await {
            Ok(link) => link,
            Err(e) => {
                warn!(
                    "Lesson link lookup failed for {} lesson {}: {}",
                    course_title, lesson_number, e
                );
                None
            }
        }
    }

    /// Number of indexed courses.
    pub async fn course_count(&self) -> Result<usize> {
        self.vector_store.course_count().await
    }

    /// Titles of all indexed courses.
    pub async fn course_titles(&self) -> Result<Vec<String>> {
        self.vector_store.course_titles().await
    }
}
