//! Index command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the index command.
pub async fn run_index(path: &str, clear: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let path = Settings::expand_path(path);
    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner(&format!("Indexing {}...", path.display()));
    let result = orchestrator.index_path(&path, clear).await;
    spinner.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            Output::error(&format!("Indexing failed: {}", e));
            return Err(e.into());
        }
    };

    for summary in &report.indexed {
        Output::success(&format!(
            "Indexed '{}' ({} lessons, {} passages)",
            summary.title, summary.lessons, summary.passages
        ));
    }
    for title in &report.skipped {
        Output::info(&format!("Skipped '{}' (already indexed)", title));
    }
    for (file, error) in &report.failed {
        Output::warning(&format!("Failed {}: {}", file.display(), error));
    }

    println!();
    Output::kv("Courses added", &report.indexed.len().to_string());
    Output::kv("Passages added", &report.passages_added().to_string());

    if report.indexed.is_empty() && !report.failed.is_empty() {
        anyhow::bail!("No courses were indexed");
    }

    Ok(())
}
