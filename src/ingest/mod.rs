//! Course document ingestion.
//!
//! Parses course documents, chunks lesson text into passages, embeds titles
//! and passages, and writes both into the vector store.

mod chunker;
mod parser;

pub use chunker::SentenceChunker;
pub use parser::{CourseDocument, CourseParser, LessonText};

use crate::config::ChunkingSettings;
use crate::embedding::Embedder;
use crate::error::{CoursemateError, Result};
use crate::vector_store::{CourseRecord, Lesson, Passage, VectorStore};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// File extensions treated as course documents.
const COURSE_EXTENSIONS: &[&str] = &["txt", "md"];

/// Number of documents read concurrently.
const MAX_CONCURRENT_READS: usize = 4;

/// Outcome of indexing one course.
#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub title: String,
    pub lessons: usize,
    pub passages: usize,
}

/// Outcome of indexing a folder.
#[derive(Debug, Clone, Default)]
pub struct FolderReport {
    pub indexed: Vec<IngestSummary>,
    /// Titles already present in the index.
    pub skipped: Vec<String>,
    /// Files that could not be read or indexed.
    pub failed: Vec<(PathBuf, String)>,
}

impl FolderReport {
    pub fn passages_added(&self) -> usize {
        self.indexed.iter().map(|s| s.passages).sum()
    }
}

/// Builds passages from course documents and indexes them.
pub struct Ingestor {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    parser: CourseParser,
    chunker: SentenceChunker,
}

impl Ingestor {
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        chunking: &ChunkingSettings,
    ) -> Self {
        Self {
            vector_store,
            embedder,
            parser: CourseParser::new(),
            chunker: SentenceChunker::new(chunking.chunk_size, chunking.chunk_overlap),
        }
    }

    /// Passage texts for a document as `(lesson_number, content)`, in order.
    ///
    /// The first chunk of each lesson is prefixed with its lesson number.
    pub fn passage_texts(&self, doc: &CourseDocument) -> Vec<(Option<u32>, String)> {
        if doc.lessons.is_empty() {
            return self
                .chunker
                .chunk(&doc.body)
                .into_iter()
                .map(|chunk| (None, chunk))
                .collect();
        }

        let mut texts = Vec::new();
        for lesson in &doc.lessons {
            for (i, chunk) in self.chunker.chunk(&lesson.body).into_iter().enumerate() {
                let content = if i == 0 {
                    format!("Lesson {} content: {}", lesson.number, chunk)
                } else {
                    chunk
                };
                texts.push((Some(lesson.number), content));
            }
        }
        texts
    }

    /// Embed and index one parsed course, replacing any course with the same title.
    #[instrument(skip(self, doc), fields(title = %doc.title))]
    pub async fn ingest_document(&self, doc: &CourseDocument) -> Result<IngestSummary> {
        let texts = self.passage_texts(doc);
        debug!("{} passages from {} lessons", texts.len(), doc.lessons.len());

        let title_embedding = self.embedder.embed(&doc.title).await?;

        let contents: Vec<String> = texts.iter().map(|(_, content)| content.clone()).collect();
        let embeddings = if contents.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed_batch(&contents).await?
        };
        if embeddings.len() != texts.len() {
            return Err(CoursemateError::Ingestion(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        let passages: Vec<Passage> = texts
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, ((lesson_number, content), embedding))| {
                Passage::new(doc.title.clone(), lesson_number, index as u32, content, embedding)
            })
            .collect();

        let lessons = doc
            .lessons
            .iter()
            .map(|l| Lesson {
                number: l.number,
                title: l.title.clone(),
                link: l.link.clone(),
            })
            .collect();

        let record = CourseRecord::new(
            doc.title.clone(),
            doc.link.clone(),
            doc.instructor.clone(),
            lessons,
            title_embedding,
        );
        let count = self.vector_store.replace_course(&record, &passages).await?;

        info!("Indexed '{}': {} passages", doc.title, count);

        Ok(IngestSummary {
            title: doc.title.clone(),
            lessons: doc.lessons.len(),
            passages: count,
        })
    }

    /// Read and parse one course file.
    pub async fn parse_file(&self, path: &Path) -> Result<CourseDocument> {
        let text = tokio::fs::read_to_string(path).await?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Untitled course".to_string());
        Ok(self.parser.parse(&text, &stem))
    }

    /// Index a single file, or every course document in a folder.
    ///
    /// Courses already in the index are skipped unless `clear` is set, which
    /// empties the index first.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn ingest_path(&self, path: &Path, clear: bool) -> Result<FolderReport> {
        if clear {
            info!("Clearing existing index");
            self.vector_store.clear().await?;
        }

        let files = if path.is_dir() {
            course_files(path)?
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            return Err(CoursemateError::InvalidInput(format!(
                "Path does not exist: {}",
                path.display()
            )));
        };

        let mut existing: HashSet<String> =
            self.vector_store.course_titles().await?.into_iter().collect();
        let mut report = FolderReport::default();

        let parsed: Vec<(PathBuf, Result<CourseDocument>)> = stream::iter(files)
            .map(|file| async move {
                let doc = self.parse_file(&file).await;
                (file, doc)
            })
            .buffered(MAX_CONCURRENT_READS)
            .collect()
            .await;

        for (file, doc) in parsed {
            let doc = match doc {
                Ok(doc) => doc,
                Err(e) => {
                    warn!("Failed to read {}: {}", file.display(), e);
                    report.failed.push((file, e.to_string()));
                    continue;
                }
            };

            if existing.contains(&doc.title) {
                info!("Course '{}' already indexed, skipping", doc.title);
                report.skipped.push(doc.title);
                continue;
            }

            match self.ingest_document(&doc).await {
                Ok(summary) => {
                    existing.insert(summary.title.clone());
                    report.indexed.push(summary);
                }
                Err(e) => {
                    warn!("Failed to index {}: {}", file.display(), e);
                    report.failed.push((file, e.to_string()));
                }
            }
        }

        Ok(report)
    }
}

/// Course documents directly inside `dir`, sorted by file name.
fn course_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| COURSE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::KeywordEmbedder;
    use crate::vector_store::{MemoryVectorStore, SqliteVectorStore};
    use tempfile::TempDir;

    const COURSE: &str = "Course Title: Retrieval Basics
Course Link: https://example.com/retrieval
Course Instructor: Ada

Lesson 0: Overview
Lesson Link: https://example.com/retrieval/0
Retrieval finds passages. Ranking orders them.

Lesson 1: Embeddings
Embeddings map text to vectors. Similar texts land close together.
";

    fn ingestor(store: Arc<dyn VectorStore>) -> Ingestor {
        Ingestor::new(
            store,
            Arc::new(KeywordEmbedder::new()),
            &ChunkingSettings::default(),
        )
    }

    #[test]
    fn test_first_chunk_of_each_lesson_is_prefixed() {
        let ingestor = ingestor(Arc::new(MemoryVectorStore::new()));
        let doc = CourseParser::new().parse(COURSE, "fallback");
        let texts = ingestor.passage_texts(&doc);

        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0].0, Some(0));
        assert!(texts[0].1.starts_with("Lesson 0 content: Retrieval finds passages."));
        assert_eq!(texts[1].0, Some(1));
        assert!(texts[1].1.starts_with("Lesson 1 content: "));
    }

    #[test]
    fn test_document_without_lessons_has_no_lesson_numbers() {
        let ingestor = ingestor(Arc::new(MemoryVectorStore::new()));
        let doc = CourseParser::new().parse("Course Title: Notes\n\nA note. Another note.", "x");
        let texts = ingestor.passage_texts(&doc);
        assert_eq!(texts, vec![(None, "A note. Another note.".to_string())]);
    }

    #[tokio::test]
    async fn test_ingest_document_writes_course_and_passages() {
        let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
        let ingestor = ingestor(store.clone());
        let doc = CourseParser::new().parse(COURSE, "fallback");

        let summary = ingestor.ingest_document(&doc).await.unwrap();
        assert_eq!(summary.passages, 2);
        assert_eq!(summary.lessons, 2);

        assert_eq!(store.course_titles().await.unwrap(), vec!["Retrieval Basics".to_string()]);
        assert_eq!(
            store.lesson_link("Retrieval Basics", 0).await.unwrap().as_deref(),
            Some("https://example.com/retrieval/0")
        );
        assert_eq!(store.passage_count().await.unwrap(), 2);

        // Re-ingesting replaces rather than duplicates.
        ingestor.ingest_document(&doc).await.unwrap();
        assert_eq!(store.passage_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_reingest_into_sqlite_replaces_course() {
        let store: Arc<dyn VectorStore> = Arc::new(SqliteVectorStore::in_memory().unwrap());
        let ingestor = ingestor(store.clone());

        let first = CourseParser::new().parse(COURSE, "fallback");
        ingestor.ingest_document(&first).await.unwrap();

        let shorter = CourseParser::new().parse(
            "Course Title: Retrieval Basics\n\nLesson 2: Recap\nEverything in one lesson.",
            "fallback",
        );
        let summary = ingestor.ingest_document(&shorter).await.unwrap();
        assert_eq!(summary.passages, 1);

        let courses = store.list_courses().await.unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].passage_count, 1);
        assert_eq!(courses[0].lesson_count, 1);
        assert_eq!(store.lesson_link("Retrieval Basics", 0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ingest_folder_skips_existing_and_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("retrieval.txt"), COURSE).unwrap();
        std::fs::write(dir.path().join("notes.md"), "Some notes. More notes.").unwrap();
        std::fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();

        let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
        let ingestor = ingestor(store.clone());

        let report = ingestor.ingest_path(dir.path(), false).await.unwrap();
        assert_eq!(report.indexed.len(), 2);
        assert!(report.failed.is_empty());
        assert_eq!(store.course_count().await.unwrap(), 2);
        assert!(store
            .course_titles()
            .await
            .unwrap()
            .contains(&"notes".to_string()));

        let again = ingestor.ingest_path(dir.path(), false).await.unwrap();
        assert!(again.indexed.is_empty());
        assert_eq!(again.skipped.len(), 2);

        let cleared = ingestor.ingest_path(dir.path(), true).await.unwrap();
        assert_eq!(cleared.indexed.len(), 2);
        assert_eq!(store.course_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_missing_path_is_an_error() {
        let ingestor = ingestor(Arc::new(MemoryVectorStore::new()));
        let err = ingestor
            .ingest_path(Path::new("/definitely/not/here"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, CoursemateError::InvalidInput(_)));
    }
}
