//! Search result set returned by the passage store.

use crate::vector_store::{PassageHit, PassageMetadata};

/// Ranked passages from one search, or the error that ended it.
///
/// The parallel sequences always have equal length. A result carrying an
/// error has no passages; a result with no error and no passages means the
/// search ran and nothing matched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    documents: Vec<String>,
    metadata: Vec<PassageMetadata>,
    distances: Vec<f32>,
    error: Option<String>,
}

impl SearchResults {
    /// Build results from ranked hits, preserving their order.
    pub fn from_hits(hits: Vec<PassageHit>) -> Self {
        let mut results = Self::default();
        for hit in hits {
            results.metadata.push(hit.passage.metadata());
            results.documents.push(hit.passage.content);
            results.distances.push(hit.distance);
        }
        results
    }

    /// A failed search.
    pub fn empty(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// True when there are no passages, including every failed search.
    pub fn is_empty(&self) -> bool {
        self.error.is_some() || self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn metadata(&self) -> &[PassageMetadata] {
        &self.metadata
    }

    pub fn distances(&self) -> &[f32] {
        &self.distances
    }

    /// Iterate `(content, metadata, distance)` in rank order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PassageMetadata, f32)> {
        self.documents
            .iter()
            .zip(self.metadata.iter())
            .zip(self.distances.iter())
            .map(|((doc, meta), distance)| (doc.as_str(), meta, *distance))
    }
}
