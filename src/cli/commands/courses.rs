//! Courses command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the courses command.
pub async fn run_courses(settings: Settings) -> Result<()> {
    preflight::check(Operation::List)?;

    let orchestrator = Orchestrator::new(settings)?;

    match orchestrator.vector_store().list_courses().await {
        Ok(courses) => {
            if courses.is_empty() {
                Output::info("No courses indexed yet. Use 'coursemate index <path>' to add some.");
            } else {
                Output::header(&format!("Indexed Courses ({})", courses.len()));
                println!();

                for course in &courses {
                    Output::course_info(course);
                }

                let total_passages: u32 = courses.iter().map(|c| c.passage_count).sum();
                println!();
                Output::kv("Total courses", &courses.len().to_string());
                Output::kv("Total passages", &total_passages.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list courses: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
