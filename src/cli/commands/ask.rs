//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, model: Option<String>, mut settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.llm.model = model;
    }

    let orchestrator = Orchestrator::new(settings)?;
    let engine = orchestrator.rag_engine()?;

    let spinner = Output::spinner("Searching course materials...");
    let result = engine.query(question, None).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            println!("\n{}", response.answer);
            Output::sources(&response.sources);
            println!();
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            if e.is_retryable() {
                Output::info("This may be temporary. Try again in a moment.");
            }
            return Err(e.into());
        }
    }

    Ok(())
}
