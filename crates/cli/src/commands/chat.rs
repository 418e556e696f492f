//! `ragsmith chat`: Interactive or single-message turns against a repository.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use ragsmith_agent::AgentLoop;
use ragsmith_core::event::EventBus;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

pub async fn run(repo: PathBuf, message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    super::require_api_key(&config)?;
    let (provider, embedder) = super::provider_and_embedder(&config)?;

    let event_bus = Arc::new(EventBus::default());
    let mut agent = AgentLoop::from_config(&config, &repo, provider, embedder, event_bus)?;

    eprint!("  Indexing...");
    let stats = agent.build_index().await?;
    eprint!("\r             \r");
    info!(
        repo = %agent.guard().root().display(),
        files = stats.files,
        chunks = stats.added,
        "Session started"
    );

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let response = agent.process_turn(&msg).await;
        eprint!("\r              \r");
        agent.end_session();
        println!("{}", response?);
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  ragsmith: Interactive Mode");
    println!();
    println!("  Repository: {}", agent.guard().root().display());
    println!("  Provider:   {}", config.default_provider);
    println!("  Model:      {}", config.default_model);
    println!(
        "  Index:      {} chunks from {} files ({} rejected)",
        stats.added, stats.files, stats.rejected
    );
    println!();
    println!("  The agent can modify files inside the repository.");
    println!("  Type 'exit' or 'quit' to end the session.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }
        if input.is_empty() {
            print!("  You > ");
            std::io::stdout().flush()?;
            continue;
        }

        eprint!("  ...");
        match agent.process_turn(input).await {
            Ok(response) => {
                eprint!("\r     \r");
                println!();
                for line in response.lines() {
                    println!("  Assistant > {line}");
                }
                println!();
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
            }
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    let stats = agent.stats();
    println!();
    println!(
        "  {} turns, {} files written, {} edits refused.",
        stats.turns_completed, stats.directives_applied, stats.directives_failed
    );
    agent.end_session();
    println!("  Goodbye!");
    println!();

    Ok(())
}
