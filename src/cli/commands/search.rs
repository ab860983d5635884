//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    course: Option<&str>,
    lesson: Option<u32>,
    limit: Option<usize>,
    mut settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if let Some(limit) = limit {
        settings.search.max_results = limit;
    }

    let orchestrator = Orchestrator::new(settings)?;
    let store = orchestrator.passage_store();

    let spinner = Output::spinner("Searching...");
    let results = store.search(query, course, lesson).await;
    spinner.finish_and_clear();

    if let Some(error) = results.error() {
        Output::error(error);
        return Err(anyhow::anyhow!("{}", error));
    }

    if results.is_empty() {
        Output::warning("No results found matching your query.");
        return Ok(());
    }

    Output::success(&format!("Found {} results", results.len()));
    for (content, meta, distance) in results.iter() {
        Output::search_result(&meta.label(), distance, content);
    }

    Ok(())
}
