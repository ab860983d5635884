//! SQLite-based vector store implementation.
//!
//! Filters run in SQL; cosine distance is computed in Rust over the
//! filtered rows. For large corpora, consider the sqlite-vec extension
//! or a dedicated vector database.

use super::{
    cosine_distance, foreign_passage, rank_by_distance, CourseHit, CourseRecord, IndexedCourse, Passage,
    PassageHit, SearchFilter, VectorStore,
};
use crate::error::{CoursemateError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS courses (
    title TEXT PRIMARY KEY,
    link TEXT,
    instructor TEXT,
    embedding BLOB NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS lessons (
    course_title TEXT NOT NULL,
    lesson_number INTEGER NOT NULL,
    title TEXT NOT NULL,
    link TEXT,
    PRIMARY KEY (course_title, lesson_number)
);

CREATE TABLE IF NOT EXISTS passages (
    id TEXT PRIMARY KEY,
    course_title TEXT NOT NULL,
    lesson_number INTEGER,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_passages_course ON passages(course_title);
CREATE INDEX IF NOT EXISTS idx_passages_lesson ON passages(lesson_number);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a SQLite vector store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CoursemateError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn parse_timestamp(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn write_course(conn: &Connection, course: &CourseRecord) -> Result<()> {
        // ON CONFLICT keeps the original rowid, so listing order stays stable.
        conn.execute(
            r#"
            INSERT INTO courses (title, link, instructor, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(title) DO UPDATE SET
                link = excluded.link,
                instructor = excluded.instructor,
                embedding = excluded.embedding,
                indexed_at = excluded.indexed_at
            "#,
            params![
                course.title,
                course.link,
                course.instructor,
                Self::embedding_to_bytes(&course.embedding),
                course.indexed_at.to_rfc3339(),
            ],
        )?;

        conn.execute(
            "DELETE FROM lessons WHERE course_title = ?1",
            params![course.title],
        )?;
        for lesson in &course.lessons {
            conn.execute(
                "INSERT INTO lessons (course_title, lesson_number, title, link) VALUES (?1, ?2, ?3, ?4)",
                params![course.title, lesson.number, lesson.title, lesson.link],
            )?;
        }
        Ok(())
    }

    fn write_passage(conn: &Connection, passage: &Passage) -> Result<()> {
        conn.execute(
            r#"
            INSERT OR REPLACE INTO passages
            (id, course_title, lesson_number, chunk_index, content, embedding)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                passage.id.to_string(),
                passage.course_title,
                passage.lesson_number,
                passage.chunk_index,
                passage.content,
                Self::embedding_to_bytes(&passage.embedding),
            ],
        )?;
        Ok(())
    }

    /// Delete a course's rows. Returns the number of passages removed.
    fn delete_course_rows(conn: &Connection, title: &str) -> Result<usize> {
        let deleted = conn.execute("DELETE FROM passages WHERE course_title = ?1", params![title])?;
        conn.execute("DELETE FROM lessons WHERE course_title = ?1", params![title])?;
        conn.execute("DELETE FROM courses WHERE title = ?1", params![title])?;
        Ok(deleted)
    }
}

/// SQL `WHERE` body and bound values for a filter.
fn filter_clause(filter: &SearchFilter) -> (String, Vec<Value>) {
    match filter {
        SearchFilter::CourseTitle(title) => {
            ("course_title = ?".to_string(), vec![Value::Text(title.clone())])
        }
        SearchFilter::LessonNumber(n) => {
            ("lesson_number = ?".to_string(), vec![Value::Integer(i64::from(*n))])
        }
        SearchFilter::All(filters) if filters.is_empty() => ("1 = 1".to_string(), Vec::new()),
        SearchFilter::All(filters) => {
            let mut clauses = Vec::with_capacity(filters.len());
            let mut values = Vec::new();
            for f in filters {
                let (clause, mut bound) = filter_clause(f);
                clauses.push(format!("({})", clause));
                values.append(&mut bound);
            }
            (clauses.join(" AND "), values)
        }
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, course), fields(title = %course.title))]
    async fn upsert_course(&self, course: &CourseRecord) -> Result<()> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        Self::write_course(&tx, course)?;
        tx.commit()?;
        debug!("Upserted course with {} lessons", course.lessons.len());
        Ok(())
    }

    #[instrument(skip(self, passages), fields(count = passages.len()))]
    async fn upsert_passages(&self, passages: &[Passage]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for passage in passages {
            Self::write_passage(&tx, passage)?;
        }

        tx.commit()?;
        info!("Batch upserted {} passages", passages.len());
        Ok(passages.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn query_passages(
        &self,
        query_embedding: &[f32],
        filter: Option<&SearchFilter>,
        limit: usize,
    ) -> Result<Vec<PassageHit>> {
        let conn = self.lock()?;

        let (where_clause, values) = match filter {
            Some(f) => {
                let (clause, values) = filter_clause(f);
                (format!("WHERE {}", clause), values)
            }
            None => (String::new(), Vec::new()),
        };

        let sql = format!(
            r#"
            SELECT id, course_title, lesson_number, chunk_index, content, embedding
            FROM passages
            {}
            ORDER BY rowid
            "#,
            where_clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| {
            let id_str: String = row.get(0)?;
            let embedding_bytes: Vec<u8> = row.get(5)?;
            Ok(Passage {
                id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
                course_title: row.get(1)?,
                lesson_number: row.get(2)?,
                chunk_index: row.get(3)?,
                content: row.get(4)?,
                embedding: Self::bytes_to_embedding(&embedding_bytes),
            })
        })?;

        let passages = rows.collect::<rusqlite::Result<Vec<Passage>>>()?;
        let scored: Vec<(Passage, f32)> = passages
            .into_iter()
            .map(|p| {
                let distance = cosine_distance(query_embedding, &p.embedding);
                (p, distance)
            })
            .collect();

        let hits: Vec<PassageHit> = rank_by_distance(scored, limit)
            .into_iter()
            .map(|(passage, distance)| PassageHit { passage, distance })
            .collect();

        debug!("Found {} matching passages", hits.len());
        Ok(hits)
    }

    #[instrument(skip(self, query_embedding))]
    async fn nearest_courses(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<CourseHit>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare("SELECT title, embedding FROM courses ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            let title: String = row.get(0)?;
            let embedding_bytes: Vec<u8> = row.get(1)?;
            Ok((title, Self::bytes_to_embedding(&embedding_bytes)))
        })?;

        let scored: Vec<(String, f32)> = rows
            .collect::<rusqlite::Result<Vec<_>>>()?
            .into_iter()
            .map(|(title, embedding)| {
                let distance = cosine_distance(query_embedding, &embedding);
                (title, distance)
            })
            .collect();

        Ok(rank_by_distance(scored, limit)
            .into_iter()
            .map(|(title, distance)| CourseHit { title, distance })
            .collect())
    }

    async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>> {
        let conn = self.lock()?;
        let link: Option<Option<String>> = conn
            .query_row(
                "SELECT link FROM lessons WHERE course_title = ?1 AND lesson_number = ?2",
                params![course_title, lesson_number],
                |row| row.get(0),
            )
            .optional()?;
        Ok(link.flatten())
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT title FROM courses ORDER BY rowid")?;
        let titles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(titles)
    }

    async fn course_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM courses", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    #[instrument(skip(self))]
    async fn list_courses(&self) -> Result<Vec<IndexedCourse>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT c.title, c.instructor, c.link, c.indexed_at,
                   (SELECT COUNT(*) FROM lessons l WHERE l.course_title = c.title),
                   (SELECT COUNT(*) FROM passages p WHERE p.course_title = c.title)
            FROM courses c
            ORDER BY c.rowid
            "#,
        )?;

        let courses = stmt
            .query_map([], |row| {
                let indexed_at: String = row.get(3)?;
                Ok(IndexedCourse {
                    title: row.get(0)?,
                    instructor: row.get(1)?,
                    link: row.get(2)?,
                    indexed_at: Self::parse_timestamp(&indexed_at),
                    lesson_count: row.get(4)?,
                    passage_count: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(courses)
    }

    async fn passage_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM passages", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    #[instrument(skip(self))]
    async fn delete_course(&self, title: &str) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let deleted = Self::delete_course_rows(&tx, title)?;
        tx.commit()?;

        info!("Deleted course {} ({} passages)", title, deleted);
        Ok(deleted)
    }

    #[instrument(skip(self, course, passages), fields(title = %course.title, count = passages.len()))]
    async fn replace_course(&self, course: &CourseRecord, passages: &[Passage]) -> Result<usize> {
        let conn = self.lock()?;
        // Dropping the transaction on an early return rolls every statement back.
        let tx = conn.unchecked_transaction()?;

        Self::delete_course_rows(&tx, &course.title)?;
        Self::write_course(&tx, course)?;
        for passage in passages {
            if passage.course_title != course.title {
                return Err(foreign_passage(&course.title, passage));
            }
            Self::write_passage(&tx, passage)?;
        }

        tx.commit()?;
        info!("Replaced course with {} passages", passages.len());
        Ok(passages.len())
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch("DELETE FROM passages; DELETE FROM lessons; DELETE FROM courses;")?;
        info!("Cleared vector store");
        Ok(())
    }
}
