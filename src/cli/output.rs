//! CLI output formatting utilities.

use crate::agent::Source;
use crate::vector_store::IndexedCourse;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print course info.
    pub fn course_info(course: &IndexedCourse) {
        let mut details = format!("{} lessons, {} passages", course.lesson_count, course.passage_count);
        if let Some(instructor) = &course.instructor {
            details = format!("{}, {}", instructor, details);
        }
        println!(
            "  {} {} ({})",
            style("*").cyan(),
            style(&course.title).bold(),
            style(details).dim()
        );
        if let Some(link) = &course.link {
            println!("    {}", style(link).dim());
        }
    }

    /// Print one search hit.
    pub fn search_result(label: &str, distance: f32, content: &str) {
        println!(
            "\n{} {} (distance: {:.3})",
            style(">>").green(),
            style(label).bold(),
            distance
        );
        println!("   {}", content_preview(content, 200));
    }

    /// Print the sources backing an answer.
    pub fn sources(sources: &[Source]) {
        if sources.is_empty() {
            return;
        }
        println!("\n{}", style("Sources:").dim());
        for (i, source) in sources.iter().enumerate() {
            match &source.link {
                Some(link) => println!(
                    "  {}. {} {}",
                    i + 1,
                    style(&source.text).cyan(),
                    style(link).dim()
                ),
                None => println!("  {}. {}", i + 1, style(&source.text).cyan()),
            }
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Collapse newlines and truncate with an ellipsis on a char boundary.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview() {
        assert_eq!(content_preview("short\ntext", 20), "short text");
        assert_eq!(content_preview("abcdef", 3), "abc...");
        assert_eq!(content_preview("ééééé", 2), "éé...");
    }
}
