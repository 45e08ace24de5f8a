use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use quizmatch::config::Config;
use quizmatch::output::terminal;

/// Quizmatch: near-duplicate detection for exam question banks.
///
/// Checks whether a new question already exists in the bank, predicts its
/// topic, and suggests marks and weightage from similar past questions.
#[derive(Parser)]
#[command(name = "quizmatch", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the ONNX sentence embedding model (~90 MB)
    DownloadModel,

    /// Check a single question against the question bank
    Check {
        /// The question text
        question: String,

        /// Expected topic; reports whether the model agrees
        #[arg(long)]
        topic: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check every question in a .csv, .txt, .xlsx, .xls or .docx file
    Batch {
        /// Path to the batch file
        file: PathBuf,

        /// Print the results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the topics in the question bank
    Topics,

    /// Show corpus counts and hold-out accuracies
    Metrics,

    /// Show configuration, dataset and model status
    Status,

    /// Serve the JSON API
    #[cfg(feature = "web")]
    Serve {
        /// Port to listen on (default: 5000)
        #[arg(long, default_value = "5000")]
        port: u16,

        /// Address to bind (default: 127.0.0.1)
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("quizmatch=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::DownloadModel => {
            let config = Config::load()?;
            let model_dir = &config.model_dir;

            println!("Downloading ONNX embedding model...");
            println!("  Destination: {}", model_dir.display());

            quizmatch::embedding::download::download_model(model_dir).await?;

            println!("\n{}", "Model downloaded successfully.".bold());
            println!("You can now run `quizmatch check \"<question>\"`.");
        }

        Commands::Check {
            question,
            topic,
            json,
        } => {
            let config = Config::load()?;
            let context = load_context(config).await?;

            let check = tokio::task::spawn_blocking(move || {
                context.check_question(&question, topic.as_deref())
            })
            .await??;

            if json {
                println!("{}", serde_json::to_string_pretty(&check)?);
            } else {
                terminal::display_check(&check);
            }
        }

        Commands::Batch { file, json } => {
            let questions = quizmatch::intake::read_questions_from_path(&file)?;
            info!(file = %file.display(), questions = questions.len(), "Read batch file");

            let config = Config::load()?;
            let context = load_context(config).await?;

            let records =
                tokio::task::spawn_blocking(move || context.analyze_batch(&questions)).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                terminal::display_batch(&records);
            }
        }

        Commands::Topics => {
            let config = Config::load()?;
            let context = load_context(config).await?;
            terminal::display_topics(&context.list_topics());
        }

        Commands::Metrics => {
            let config = Config::load()?;
            let context = load_context(config).await?;
            terminal::display_metrics(context.model_metrics());
            println!(
                "{}",
                format!(
                    "Models fit at {}",
                    context.initialized_at().format("%Y-%m-%d %H:%M:%S UTC")
                )
                .dimmed()
            );
        }

        Commands::Status => {
            let config = Config::load()?;
            quizmatch::status::show(&config)?;
        }

        #[cfg(feature = "web")]
        Commands::Serve { port, bind } => {
            let config = Config::load()?;
            // Fail before binding if the embedder cannot possibly load.
            config.require_embedder()?;
            quizmatch::web::run_server(config, port, &bind).await?;
        }
    }

    Ok(())
}

/// Build the inference context off the async runtime. Embedding the whole
/// question bank can take a while on first run.
async fn load_context(config: Config) -> Result<quizmatch::context::InferenceContext> {
    println!("{}", "Loading question bank and fitting models...".dimmed());
    tokio::task::spawn_blocking(move || quizmatch::context::initialize(&config)).await?
}
