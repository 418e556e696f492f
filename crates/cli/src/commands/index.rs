//! `ragsmith index`: Build the chunk index and optionally query it.

use std::path::PathBuf;
use ragsmith_index::{Chunker, IndexBuilder};
use ragsmith_security::FileGuard;

pub async fn run(
    repo: PathBuf,
    query: Option<String>,
    top_k: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let (_provider, embedder) = super::provider_and_embedder(&config)?;

    // Validates the root the same way a chat session would
    let guard = FileGuard::new(&repo)?;
    let chunker = Chunker::from_config(guard.root(), &config.indexing);
    let builder = IndexBuilder::new(chunker, embedder, config.indexing.dimension);

    let built = builder.rebuild().await?;
    let stats = &built.stats;

    println!("Index for {}", guard.root().display());
    println!("=========={}", "=".repeat(guard.root().display().to_string().len()));
    println!("  Embedder:   {}", builder.embedder().name());
    println!("  Dimension:  {}", builder.dimension());
    println!("  Chunk size: {} chars", builder.chunker().chunk_size());
    println!("  Files:      {}", stats.files);
    println!("  Chunks:     {}", stats.chunks);
    println!("  Indexed:    {}", stats.added);
    println!("  Rejected:   {}", stats.rejected);
    println!("  Took:       {} ms", stats.duration_ms);

    let Some(query) = query else {
        return Ok(());
    };

    let k = top_k.unwrap_or(config.indexing.top_k);
    let vector = builder.embedder().embed(&query).await?;
    let hits = built.index.search_scored(&vector, k);

    println!();
    println!("  Nearest {} chunks for {:?}:", hits.len(), query);
    for (rank, hit) in hits.iter().enumerate() {
        let preview = hit
            .chunk
            .text
            .lines()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("")
            .trim();
        let preview: String = preview.chars().take(60).collect();
        println!(
            "  {:>3}. {}@{} (d={:.4})  {}",
            rank + 1,
            hit.chunk.source_path,
            hit.chunk.offset,
            hit.distance,
            preview
        );
    }

    Ok(())
}
