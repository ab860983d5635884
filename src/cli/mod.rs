//! CLI module for Coursemate.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Coursemate - ask questions about your course materials
///
/// Indexes course transcripts and answers questions with a tool-calling
/// assistant that searches the index and cites the lessons it used.
#[derive(Parser, Debug)]
#[command(name = "coursemate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "COURSEMATE_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a course document or a folder of course documents
    Index {
        /// File or folder path (.txt and .md files are indexed)
        path: String,

        /// Remove all indexed courses first
        #[arg(long)]
        clear: bool,
    },

    /// Ask a single question about the course materials
    Ask {
        /// The question to ask
        question: String,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Start an interactive chat session
    Chat {
        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Search course passages directly, without the assistant
    Search {
        /// Search query
        query: String,

        /// Restrict to a course (partial names work)
        #[arg(long)]
        course: Option<String>,

        /// Restrict to a lesson number
        #[arg(long)]
        lesson: Option<u32>,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List indexed courses
    Courses,

    /// Start the HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
