//! CLI subcommands.

pub mod chat;
pub mod index;
pub mod onboard;

use std::sync::Arc;
use ragsmith_config::AppConfig;
use ragsmith_core::{Embedder, Provider};
use ragsmith_providers::ProviderRouter;

/// Load config, failing with a readable message.
pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// The default completion provider and the embedder named in `[indexing]`.
pub fn provider_and_embedder(
    config: &AppConfig,
) -> Result<(Arc<dyn Provider>, Arc<dyn Embedder>), Box<dyn std::error::Error>> {
    let router = ProviderRouter::from_config(config);
    let provider = router
        .completion()
        .map_err(|e| format!("Default provider '{}': {e}", config.default_provider))?;
    let embedder = ragsmith_index::build_embedder(&config.indexing, &router)?;
    Ok((provider, embedder))
}

/// Print setup help and fail when no key is configured for a hosted provider.
pub fn require_api_key(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let local = matches!(
        config.default_provider.as_str(),
        "ollama" | "vllm" | "llamacpp" | "llama.cpp"
    );
    if config.has_api_key() || local {
        return Ok(());
    }

    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    OPENROUTER_API_KEY = 'sk-or-v1-...'   (recommended)");
    eprintln!("    OPENAI_API_KEY     = 'sk-...'         (for OpenAI direct)");
    eprintln!("    RAGSMITH_API_KEY   = 'sk-...'         (generic)");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_path().display());
    eprintln!();
    Err("No API key found. See above for setup instructions.".into())
}
