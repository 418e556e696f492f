//! ragsmith CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Write the default config file
//! - `chat`: Interactive or single-message turns against a repository
//! - `index`: Build the chunk index and optionally query it

use std::path::PathBuf;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "ragsmith",
    about = "ragsmith: retrieval-augmented code-modification agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Chat with the agent about a repository; edits are applied in place
    Chat {
        /// Repository root
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Build the chunk index for a repository and print its stats
    Index {
        /// Repository root
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,

        /// Show the chunks nearest to this query
        #[arg(short, long)]
        query: Option<String>,

        /// Number of chunks to show (defaults to indexing.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat { repo, message } => commands::chat::run(repo, message).await?,
        Commands::Index { repo, query, top_k } => commands::index::run(repo, query, top_k).await?,
    }

    Ok(())
}
