//! Parser for plain-text course documents.
//!
//! ```text
//! Course Title: <title>
//! Course Link: <url>
//! Course Instructor: <name>
//!
//! Lesson <n>: <lesson title>
//! Lesson Link: <url>
//! <lesson body...>
//! ```

use regex::Regex;
use tracing::warn;
use url::Url;

/// A parsed course document.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseDocument {
    pub title: String,
    pub link: Option<String>,
    pub instructor: Option<String>,
    pub lessons: Vec<LessonText>,
    /// Body text outside any lesson, used only when there are no lessons.
    pub body: String,
}

/// One lesson section of a course document.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonText {
    pub number: u32,
    pub title: String,
    pub link: Option<String>,
    pub body: String,
}

/// Value of a `Key: value` header line, matched case-insensitively.
fn header_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let (name, value) = line.split_once(':')?;
    if name.trim().eq_ignore_ascii_case(key) {
        Some(value.trim())
    } else {
        None
    }
}

/// Keep `raw` only if it parses as an absolute URL.
fn valid_link(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    match Url::parse(raw) {
        Ok(_) => Some(raw.to_string()),
        Err(e) => {
            warn!("Dropping invalid link '{}': {}", raw, e);
            None
        }
    }
}

/// Course document parser.
pub struct CourseParser {
    lesson_marker: Regex,
}

impl Default for CourseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CourseParser {
    pub fn new() -> Self {
        let lesson_marker =
            Regex::new(r"(?i)^lesson\s+(\d+)\s*:\s*(.*)$").expect("Invalid regex");
        Self { lesson_marker }
    }

    /// Parse a course document. `fallback_title` is used when there is no title header.
    pub fn parse(&self, text: &str, fallback_title: &str) -> CourseDocument {
        let mut title = None;
        let mut link = None;
        let mut instructor = None;
        let mut lessons: Vec<LessonText> = Vec::new();
        let mut body = Vec::new();
        let mut in_header = true;

        for line in text.lines() {
            let trimmed = line.trim();

            if in_header {
                if let Some(value) = header_value(trimmed, "Course Title") {
                    title = Some(value.to_string()).filter(|t| !t.is_empty());
                    continue;
                }
                if let Some(value) = header_value(trimmed, "Course Link") {
                    link = valid_link(value);
                    continue;
                }
                if let Some(value) = header_value(trimmed, "Course Instructor") {
                    instructor = Some(value.to_string()).filter(|i| !i.is_empty());
                    continue;
                }
                if trimmed.is_empty() {
                    continue;
                }
                in_header = false;
            }

            if let Some(caps) = self.lesson_marker.captures(trimmed) {
                // Numbers too large for u32 are treated as body text.
                if let Ok(number) = caps[1].parse::<u32>() {
                    lessons.push(LessonText {
                        number,
                        title: caps[2].trim().to_string(),
                        link: None,
                        body: String::new(),
                    });
                    continue;
                }
            }

            match lessons.last_mut() {
                Some(lesson) => {
                    if lesson.body.is_empty() && lesson.link.is_none() {
                        if let Some(value) = header_value(trimmed, "Lesson Link") {
                            lesson.link = valid_link(value);
                            continue;
                        }
                    }
                    if !lesson.body.is_empty() {
                        lesson.body.push('\n');
                    }
                    lesson.body.push_str(line);
                }
                None => body.push(line),
            }
        }

        for lesson in &mut lessons {
            lesson.body = lesson.body.trim().to_string();
        }

        CourseDocument {
            title: title.unwrap_or_else(|| fallback_title.to_string()),
            link,
            instructor,
            lessons,
            body: body.join("\n").trim().to_string(),
        }
    }
}
