//! docsight - LLM-driven document analysis and insight pipeline.
//!
//! A tool for turning raw document text into structured analyses:
//! summaries, entities, relationships, signal scores, and
//! visualization recommendations.

mod analysis;
mod cli;
mod config;
mod llm;
mod models;
mod utils;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if cli::is_verbose() {
        "docsight=info"
    } else {
        "docsight=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Run CLI
    cli::run().await
}
