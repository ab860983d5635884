//! In-memory vector store implementation.
//!
//! Useful for testing and small course collections.

use super::{
    cosine_distance, foreign_passage, rank_by_distance, CourseHit, CourseRecord, IndexedCourse, Passage,
    PassageHit, SearchFilter, VectorStore,
};
use crate::error::{CoursemateError, Result};
use async_trait::async_trait;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Inner {
    // Both kept in ingestion order.
    courses: Vec<CourseRecord>,
    passages: Vec<Passage>,
}

/// In-memory vector store.
#[derive(Default)]
pub struct MemoryVectorStore {
    inner: RwLock<Inner>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|e| CoursemateError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|e| CoursemateError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert_course(&self, course: &CourseRecord) -> Result<()> {
        let mut inner = self.write()?;
        match inner.courses.iter_mut().find(|c| c.title == course.title) {
            Some(existing) => *existing = course.clone(),
            None => inner.courses.push(course.clone()),
        }
        Ok(())
    }

    async fn upsert_passages(&self, passages: &[Passage]) -> Result<usize> {
        let mut inner = self.write()?;
        for passage in passages {
            match inner.passages.iter_mut().find(|p| p.id == passage.id) {
                Some(existing) => *existing = passage.clone(),
                None => inner.passages.push(passage.clone()),
            }
        }
        Ok(passages.len())
    }

    async fn query_passages(
        &self,
        query_embedding: &[f32],
        filter: Option<&SearchFilter>,
        limit: usize,
    ) -> Result<Vec<PassageHit>> {
        let inner = self.read()?;

        let scored: Vec<(&Passage, f32)> = inner
            .passages
            .iter()
            .filter(|p| filter.map_or(true, |f| f.matches(&p.course_title, p.lesson_number)))
            .map(|p| (p, cosine_distance(query_embedding, &p.embedding)))
            .collect();

        Ok(rank_by_distance(scored, limit)
            .into_iter()
            .map(|(passage, distance)| PassageHit {
                passage: passage.clone(),
                distance,
            })
            .collect())
    }

    async fn nearest_courses(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<CourseHit>> {
        let inner = self.read()?;

        let scored: Vec<(&str, f32)> = inner
            .courses
            .iter()
            .map(|c| (c.title.as_str(), cosine_distance(query_embedding, &c.embedding)))
            .collect();

        Ok(rank_by_distance(scored, limit)
            .into_iter()
            .map(|(title, distance)| CourseHit {
                title: title.to_string(),
                distance,
            })
            .collect())
    }

    async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>> {
        let inner = self.read()?;
        Ok(inner
            .courses
            .iter()
            .find(|c| c.title == course_title)
            .and_then(|c| c.lesson_link(lesson_number)))
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        let inner = self.read()?;
        Ok(inner.courses.iter().map(|c| c.title.clone()).collect())
    }

    async fn course_count(&self) -> Result<usize> {
        Ok(self.read()?.courses.len())
    }

    async fn list_courses(&self) -> Result<Vec<IndexedCourse>> {
        let inner = self.read()?;
        Ok(inner
            .courses
            .iter()
            .map(|c| IndexedCourse {
                title: c.title.clone(),
                instructor: c.instructor.clone(),
                link: c.link.clone(),
                lesson_count: c.lessons.len() as u32,
                passage_count: inner
                    .passages
                    .iter()
                    .filter(|p| p.course_title == c.title)
                    .count() as u32,
                indexed_at: c.indexed_at,
            })
            .collect())
    }

    async fn passage_count(&self) -> Result<usize> {
        Ok(self.read()?.passages.len())
    }

    async fn delete_course(&self, title: &str) -> Result<usize> {
        let mut inner = self.write()?;
        inner.courses.retain(|c| c.title != title);
        let before = inner.passages.len();
        inner.passages.retain(|p| p.course_title != title);
        Ok(before - inner.passages.len())
    }

    async fn replace_course(&self, course: &CourseRecord, passages: &[Passage]) -> Result<usize> {
        if let Some(stray) = passages.iter().find(|p| p.course_title != course.title) {
            return Err(foreign_passage(&course.title, stray));
        }

        let mut inner = self.write()?;
        match inner.courses.iter_mut().find(|c| c.title == course.title) {
            Some(existing) => *existing = course.clone(),
            None => inner.courses.push(course.clone()),
        }
        inner.passages.retain(|p| p.course_title != course.title);
        inner.passages.extend_from_slice(passages);
        Ok(passages.len())
    }

    async fn clear(&self) -> Result<()> {
        let mut inner = self.write()?;
        inner.courses.clear();
        inner.passages.clear();
        Ok(())
    }
}
