mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use duel_common::config::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "duel-cli")]
#[command(about = "Duel CLI - Inspect harnesses and grade submissions locally", long_about = None)]
struct Cli {
    /// Language templates file (defaults to LANGUAGES_CONFIG or the built-in set)
    #[arg(long, global = true)]
    languages: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List runtimes the execution service offers for configured languages
    Runtimes,

    /// Print the harness that would be sent for a submission
    Harness {
        /// Problem file (name, tests, expectExact, returnType)
        #[arg(short, long)]
        problem: PathBuf,

        /// Submission language (e.g., python, javascript, java)
        #[arg(short, long)]
        language: String,

        /// Submission source file
        #[arg(short, long)]
        source: PathBuf,
    },

    /// Run a submission through the execution service and grade it
    Grade {
        /// Problem file (name, tests, expectExact, returnType)
        #[arg(short, long)]
        problem: PathBuf,

        /// Submission language (e.g., python, javascript, java)
        #[arg(short, long)]
        language: String,

        /// Language version understood by the execution service
        #[arg(short, long, default_value = "*")]
        version: String,

        /// Submission source file
        #[arg(short, long)]
        source: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries command output; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let languages = commands::load_languages(cli.languages.as_deref(), &config)?;

    match cli.command {
        Commands::Runtimes => {
            commands::list_runtimes(languages, &config).await?;
        }
        Commands::Harness {
            problem,
            language,
            source,
        } => {
            commands::print_harness(languages, &problem, &language, &source)?;
        }
        Commands::Grade {
            problem,
            language,
            version,
            source,
        } => {
            commands::grade(languages, &config, &problem, &language, &version, &source).await?;
        }
    }

    Ok(())
}
