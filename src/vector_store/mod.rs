//! Vector store abstraction for Coursemate.
//!
//! Provides a trait-based interface over the passage index and the course
//! title index, with in-memory and SQLite backends.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::{CoursemateError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An embedded chunk of course text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    /// Unique passage ID.
    pub id: Uuid,
    /// Title of the course this passage belongs to.
    pub course_title: String,
    /// Lesson number, if the passage came from a lesson. Zero is a real lesson.
    pub lesson_number: Option<u32>,
    /// Position of this passage within its course.
    pub chunk_index: u32,
    /// Text content.
    pub content: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
}

impl Passage {
    /// Create a new passage.
    pub fn new(
        course_title: String,
        lesson_number: Option<u32>,
        chunk_index: u32,
        content: String,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_title,
            lesson_number,
            chunk_index,
            content,
            embedding,
        }
    }

    /// Metadata carried alongside search hits.
    pub fn metadata(&self) -> PassageMetadata {
        PassageMetadata {
            course_title: self.course_title.clone(),
            lesson_number: self.lesson_number,
            chunk_index: self.chunk_index,
        }
    }
}

/// Course/lesson attributes of a passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageMetadata {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: u32,
}

impl PassageMetadata {
    /// Citation label: `"<course> - Lesson <n>"`, or the course title alone.
    pub fn label(&self) -> String {
        match self.lesson_number {
            Some(n) => format!("{} - Lesson {}", self.course_title, n),
            None => self.course_title.clone(),
        }
    }
}

/// A lesson within a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub number: u32,
    pub title: String,
    pub link: Option<String>,
}

/// A course entry in the title index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Unique course title.
    pub title: String,
    /// Course landing page.
    pub link: Option<String>,
    /// Instructor name.
    pub instructor: Option<String>,
    /// Lessons in document order.
    pub lessons: Vec<Lesson>,
    /// Embedding of the title, used for fuzzy name resolution.
    pub embedding: Vec<f32>,
    /// When this course was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl CourseRecord {
    /// Create a new course record.
    pub fn new(
        title: String,
        link: Option<String>,
        instructor: Option<String>,
        lessons: Vec<Lesson>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            title,
            link,
            instructor,
            lessons,
            embedding,
            indexed_at: Utc::now(),
        }
    }

    /// Link of the given lesson, if recorded.
    pub fn lesson_link(&self, lesson_number: u32) -> Option<String> {
        self.lessons
            .iter()
            .find(|l| l.number == lesson_number)
            .and_then(|l| l.link.clone())
    }
}

/// Structured restriction applied to a passage search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchFilter {
    /// Passages of exactly this course.
    CourseTitle(String),
    /// Passages of exactly this lesson number.
    LessonNumber(u32),
    /// Passages matching every inner filter.
    All(Vec<SearchFilter>),
}

impl SearchFilter {
    /// Build the filter for an optional course title and optional lesson number.
    ///
    /// Returns `None` when neither is given. `Some(0)` is a real lesson filter.
    pub fn build(course_title: Option<&str>, lesson_number: Option<u32>) -> Option<Self> {
        match (course_title, lesson_number) {
            (None, None) => None,
            (Some(title), None) => Some(SearchFilter::CourseTitle(title.to_string())),
            (None, Some(n)) => Some(SearchFilter::LessonNumber(n)),
            (Some(title), Some(n)) => Some(SearchFilter::All(vec![
                SearchFilter::CourseTitle(title.to_string()),
                SearchFilter::LessonNumber(n),
            ])),
        }
    }

    /// Whether a passage with this metadata passes the filter.
    pub fn matches(&self, course_title: &str, lesson_number: Option<u32>) -> bool {
        match self {
            SearchFilter::CourseTitle(title) => title == course_title,
            SearchFilter::LessonNumber(n) => lesson_number == Some(*n),
            SearchFilter::All(filters) => filters
                .iter()
                .all(|f| f.matches(course_title, lesson_number)),
        }
    }
}

/// A passage returned by a nearest-neighbor query.
#[derive(Debug, Clone)]
pub struct PassageHit {
    pub passage: Passage,
    /// Cosine distance to the query (lower is more similar).
    pub distance: f32,
}

/// A course title returned by a nearest-neighbor query.
#[derive(Debug, Clone)]
pub struct CourseHit {
    pub title: String,
    /// Cosine distance to the query (lower is more similar).
    pub distance: f32,
}

/// Summary information about an indexed course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedCourse {
    pub title: String,
    pub instructor: Option<String>,
    pub link: Option<String>,
    pub lesson_count: u32,
    pub passage_count: u32,
    pub indexed_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
///
/// Every listing and every tie between equal distances follows ingestion order.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert a course into the title index, replacing one with the same title.
    async fn upsert_course(&self, course: &CourseRecord) -> Result<()>;

    /// Bulk insert passages.
    async fn upsert_passages(&self, passages: &[Passage]) -> Result<usize>;

    /// Nearest passages to `query_embedding`, restricted by `filter`, best first.
    async fn query_passages(
        &self,
        query_embedding: &[f32],
        filter: Option<&SearchFilter>,
        limit: usize,
    ) -> Result<Vec<PassageHit>>;

    /// Nearest course titles to `query_embedding`, best first.
    async fn nearest_courses(&self, query_embedding: &[f32], limit: usize)
        -> Result<Vec<CourseHit>>;

    /// Stored link of a lesson.
    async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>>;

    /// All indexed course titles.
    async fn course_titles(&self) -> Result<Vec<String>>;

    /// Number of indexed courses.
    async fn course_count(&self) -> Result<usize>;

    /// Summaries of every indexed course.
    async fn list_courses(&self) -> Result<Vec<IndexedCourse>>;

    /// Total passage count.
    async fn passage_count(&self) -> Result<usize>;

    /// Remove a course and its passages. Returns the number of passages removed.
    async fn delete_course(&self, title: &str) -> Result<usize>;

    /// Replace a course and all of its passages in one step.
    ///
    /// Every passage must belong to `course`. On error the previously stored
    /// course is left as it was. Returns the number of passages written.
    async fn replace_course(&self, course: &CourseRecord, passages: &[Passage]) -> Result<usize>;

    /// Remove everything.
    async fn clear(&self) -> Result<()>;
}

/// Error for a passage filed under a different course than the one being replaced.
pub(crate) fn foreign_passage(course_title: &str, passage: &Passage) -> CoursemateError {
    CoursemateError::InvalidInput(format!(
        "Passage {} belongs to '{}', not '{}'",
        passage.chunk_index, passage.course_title, course_title
    ))
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Cosine distance: `1 - cosine_similarity`, in `[0, 2]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Order `(item, distance)` pairs by ascending distance and keep the first `limit`.
///
/// The sort is stable, so input order breaks ties.
pub(crate) fn rank_by_distance<T>(mut scored: Vec<(T, f32)>, limit: usize) -> Vec<(T, f32)> {
    scored.sort_by(|a, b| a.1.total_cmp(&b.1));
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_distance_lower_is_closer() {
        let q = [1.0, 0.0];
        assert!(cosine_distance(&q, &[1.0, 0.0]) < cosine_distance(&q, &[1.0, 1.0]));
        assert!((cosine_distance(&q, &[1.0, 0.0])).abs() < 0.001);
    }

    #[test]
    fn test_build_filter_no_filters() {
        assert_eq!(SearchFilter::build(None, None), None);
    }

    #[test]
    fn test_build_filter_course_only() {
        assert_eq!(
            SearchFilter::build(Some("My Course"), None),
            Some(SearchFilter::CourseTitle("My Course".to_string()))
        );
    }

    #[test]
    fn test_build_filter_lesson_only() {
        for n in [0, 1, 3, 42] {
            assert_eq!(
                SearchFilter::build(None, Some(n)),
                Some(SearchFilter::LessonNumber(n))
            );
        }
    }

    #[test]
    fn test_build_filter_both() {
        assert_eq!(
            SearchFilter::build(Some("My Course"), Some(1)),
            Some(SearchFilter::All(vec![
                SearchFilter::CourseTitle("My Course".to_string()),
                SearchFilter::LessonNumber(1),
            ]))
        );
    }

    #[test]
    fn test_lesson_zero_filter_only_matches_lesson_zero() {
        let filter = SearchFilter::build(None, Some(0)).unwrap();
        assert!(filter.matches("Any", Some(0)));
        assert!(!filter.matches("Any", None));
        assert!(!filter.matches("Any", Some(1)));
    }

    #[test]
    fn test_conjunction_requires_both() {
        let filter = SearchFilter::build(Some("A"), Some(2)).unwrap();
        assert!(filter.matches("A", Some(2)));
        assert!(!filter.matches("A", Some(1)));
        assert!(!filter.matches("B", Some(2)));
    }

    #[test]
    fn test_rank_by_distance_is_stable() {
        let ranked = rank_by_distance(vec![("a", 0.5), ("b", 0.1), ("c", 0.5), ("d", 0.1)], 3);
        let order: Vec<_> = ranked.iter().map(|(name, _)| *name).collect();
        assert_eq!(order, vec!["b", "d", "a"]);
    }

    #[test]
    fn test_metadata_label() {
        let with_lesson = PassageMetadata {
            course_title: "Intro to AI".to_string(),
            lesson_number: Some(0),
            chunk_index: 0,
        };
        assert_eq!(with_lesson.label(), "Intro to AI - Lesson 0");

        let without_lesson = PassageMetadata {
            lesson_number: None,
            ..with_lesson
        };
        assert_eq!(without_lesson.label(), "Intro to AI");
    }
}
