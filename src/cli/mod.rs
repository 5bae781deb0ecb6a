//! Command-line interface for docsight.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use crate::analysis::{AnalysisPipeline, ProgressUpdate};
use crate::config::Settings;
use crate::llm::HttpCompletionClient;
use crate::models::{Document, DocumentAnalysis};

#[derive(Parser)]
#[command(name = "docsight")]
#[command(about = "LLM-driven document analysis and insight pipeline")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a text or markdown document
    Analyze {
        /// Path to the document file
        file: PathBuf,
        /// Run the quick variant (summaries, signals, and sections only)
        #[arg(long)]
        quick: bool,
        /// Print the full analysis as JSON
        #[arg(long)]
        json: bool,
        /// Completion endpoint (overrides config)
        #[arg(long)]
        endpoint: Option<String>,
        /// Model to use (overrides config)
        #[arg(long)]
        model: Option<String>,
        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Check completion service availability and list models
    Check {
        /// Completion endpoint (overrides config)
        #[arg(long)]
        endpoint: Option<String>,
    },
}

/// Parse arguments and dispatch to the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            file,
            quick,
            json,
            endpoint,
            model,
            no_progress,
        } => {
            if let Some(endpoint) = endpoint {
                settings.llm.endpoint = endpoint;
            }
            if let Some(model) = model {
                settings.llm.model = model;
            }
            cmd_analyze(settings, &file, quick, json, no_progress).await
        }
        Commands::Check { endpoint } => {
            if let Some(endpoint) = endpoint {
                settings.llm.endpoint = endpoint;
            }
            cmd_check(settings).await
        }
    }
}

async fn cmd_analyze(
    settings: Settings,
    file: &PathBuf,
    quick: bool,
    json: bool,
    no_progress: bool,
) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", file.display(), e))?;
    let title = file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned());
    let document = Document::from_text(text, title);

    let backend = Arc::new(HttpCompletionClient::new(settings.llm.clone()));
    let pipeline = AnalysisPipeline::new(backend, settings.analysis.clone());

    let (progress_tx, progress_task) = if no_progress || json {
        (None, None)
    } else {
        let (tx, mut rx) = mpsc::channel::<ProgressUpdate>(32);
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos:>3}% {wide_msg}")
                .unwrap()
                .progress_chars("█▓░"),
        );
        let task = tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                bar.set_position(update.percent as u64);
                bar.set_message(update.message);
            }
            bar.finish_and_clear();
        });
        (Some(tx), Some(task))
    };

    let result = if quick {
        pipeline.analyze_quick(&document, progress_tx).await
    } else {
        pipeline.analyze(&document, progress_tx).await
    };

    if let Some(task) = progress_task {
        let _ = task.await;
    }

    let analysis = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print_analysis(&document, &analysis);
    }

    Ok(())
}

fn print_analysis(document: &Document, analysis: &DocumentAnalysis) {
    let title = document.metadata.title.as_deref().unwrap_or("document");
    println!(
        "{} Analyzed {} ({} words, {} sections)",
        style("✓").green(),
        style(title).bold(),
        analysis.metrics.word_count,
        analysis.metrics.section_count
    );
    println!();
    println!("{}", style("tl;dr").bold());
    println!("  {}", analysis.tldr);
    println!();
    println!("{}", style(&analysis.executive_summary.headline).bold());
    for idea in &analysis.executive_summary.key_ideas {
        println!("  {} {}", style("•").cyan(), idea);
    }
    for kpi in &analysis.executive_summary.kpis {
        println!("  {} {}: {} {}", style("#").cyan(), kpi.label, kpi.value, kpi.unit);
    }
    if !analysis.executive_summary.risks.is_empty() {
        println!("  Risks:");
        for risk in &analysis.executive_summary.risks {
            println!("    {} {}", style("!").red(), risk);
        }
    }
    if !analysis.executive_summary.opportunities.is_empty() {
        println!("  Opportunities:");
        for opp in &analysis.executive_summary.opportunities {
            println!("    {} {}", style("+").green(), opp);
        }
    }
    if !analysis.executive_summary.call_to_action.is_empty() {
        println!("  {} {}", style("→").cyan(), analysis.executive_summary.call_to_action);
    }
    println!();
    println!(
        "{} {} entities, {} relationships",
        style("→").cyan(),
        analysis.entities.len(),
        analysis.relationships.len()
    );
    let signals = &analysis.signals;
    println!(
        "{} signals: structural {:.2}, process {:.2}, quantitative {:.2}, technical {:.2}, argumentative {:.2}, temporal {:.2}",
        style("→").cyan(),
        signals.structural,
        signals.process,
        signals.quantitative,
        signals.technical,
        signals.argumentative,
        signals.temporal
    );
    println!("{} suggested visualizations:", style("→").cyan());
    for rec in &analysis.recommendations {
        println!("    {} ({:.2}) {}", style(&rec.kind).bold(), rec.score, rec.rationale);
    }
    println!();
    println!(
        "{} {} tokens across {}",
        style("→").cyan(),
        analysis.metadata.tokens_used,
        analysis.metadata.models.join(", ")
    );
}

async fn cmd_check(settings: Settings) -> anyhow::Result<()> {
    let client = HttpCompletionClient::new(settings.llm.clone());

    if !client.is_available().await {
        println!("{} {}", style("✗").red(), settings.llm.availability_hint());
        return Ok(());
    }

    println!(
        "{} Completion service reachable at {}",
        style("✓").green(),
        settings.llm.endpoint
    );

    match client.list_models().await {
        Ok(models) => {
            println!("  Available models:");
            for model in &models {
                let marker = if *model == settings.llm.model {
                    style("*").green()
                } else {
                    style(" ").dim()
                };
                println!("  {} {}", marker, model);
            }
            if !models.iter().any(|m| *m == settings.llm.model) {
                println!(
                    "  {} configured model {} not in list",
                    style("!").yellow(),
                    settings.llm.model
                );
            }
        }
        Err(e) => println!("  {} Could not list models: {}", style("!").yellow(), e),
    }

    Ok(())
}
