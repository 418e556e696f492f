//! Provider registry: every `[providers.*]` entry plus the default provider,
//! looked up by the names used in config.
//!
//! Completions go to the default provider. Embeddings go to whatever
//! `[indexing] embedding_provider` selects, which may be a different backend
//! (e.g. chat on OpenRouter, embeddings on a local Ollama).

use std::collections::HashMap;
use std::sync::Arc;
use ragsmith_config::AppConfig;
use ragsmith_core::error::ProviderError;
use ragsmith_core::provider::Provider;
use tracing::{debug, warn};
use crate::openai_compat::OpenAiCompatProvider;

/// Selector that means "whatever the default provider is".
pub const DEFAULT_SELECTOR: &str = "default";

/// Named providers with one marked as the default.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Build one OpenAI-compatible provider per configured entry, then make
    /// sure the default provider is present.
    ///
    /// Entries without `api_url` fall back to a well-known base URL; names
    /// with neither are skipped and fail later at [`resolve`](Self::resolve).
    pub fn from_config(config: &AppConfig) -> Self {
        let mut router = Self::new(&config.default_provider);

        for (name, entry) in &config.providers {
            let Some(base_url) = entry
                .api_url
                .clone()
                .or_else(|| well_known_base_url(name).map(String::from))
            else {
                warn!(provider = %name, "No api_url and no known endpoint, provider skipped");
                continue;
            };
            let api_key = entry
                .api_key
                .as_deref()
                .or(config.api_key.as_deref())
                .unwrap_or_default();
            router.register(name.clone(), Arc::new(OpenAiCompatProvider::new(name, &base_url, api_key)));
        }

        if !router.providers.contains_key(&config.default_provider) {
            if let Some(base_url) = well_known_base_url(&config.default_provider) {
                let api_key = config.api_key.as_deref().unwrap_or_default();
                router.register(
                    config.default_provider.clone(),
                    Arc::new(OpenAiCompatProvider::new(&config.default_provider, base_url, api_key)),
                );
            }
        }

        router
    }

    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        let name = name.into();
        debug!(provider = %name, "Provider registered");
        self.providers.insert(name, provider);
    }

    /// The provider used for completions.
    pub fn completion(&self) -> Result<Arc<dyn Provider>, ProviderError> {
        self.resolve(DEFAULT_SELECTOR)
    }

    /// Look up a provider by config selector: [`DEFAULT_SELECTOR`] or a
    /// registered name.
    pub fn resolve(&self, selector: &str) -> Result<Arc<dyn Provider>, ProviderError> {
        let name = if selector == DEFAULT_SELECTOR {
            self.default_provider.as_str()
        } else {
            selector
        };
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::NotConfigured(format!("no provider named '{name}'")))
    }
}

/// Base URLs of OpenAI-compatible endpoints that need no `api_url`.
pub fn well_known_base_url(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "openai" => Some("https://api.openai.com/v1"),
        "ollama" => Some("http://localhost:11434/v1"),
        "vllm" => Some("http://localhost:8000/v1"),
        "llamacpp" | "llama.cpp" => Some("http://localhost:8080/v1"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragsmith_config::ProviderConfig;

    #[test]
    fn default_config_routes_completions_to_openrouter() {
        let router = ProviderRouter::from_config(&AppConfig::default());
        assert_eq!(router.completion().unwrap().name(), "openrouter");
        assert_eq!(router.resolve("default").unwrap().name(), "openrouter");
    }

    #[test]
    fn embeddings_can_use_a_separate_backend() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "ollama".into(),
            ProviderConfig {
                api_key: None,
                api_url: None,
            },
        );
        let router = ProviderRouter::from_config(&config);
        assert_eq!(router.resolve("ollama").unwrap().name(), "ollama");
        assert_eq!(router.completion().unwrap().name(), "openrouter");
    }

    #[test]
    fn unknown_name_without_url_is_not_configured() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "mystery".into(),
            ProviderConfig {
                api_key: None,
                api_url: None,
            },
        );
        let router = ProviderRouter::from_config(&config);
        assert!(matches!(
            router.resolve("mystery"),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[test]
    fn custom_default_needs_an_entry() {
        let config = AppConfig {
            default_provider: "gpu-box".into(),
            ..AppConfig::default()
        };
        assert!(ProviderRouter::from_config(&config).completion().is_err());

        let mut config = config;
        config.providers.insert(
            "gpu-box".into(),
            ProviderConfig {
                api_key: Some("k".into()),
                api_url: Some("http://gpu-box:8000/v1".into()),
            },
        );
        assert_eq!(
            ProviderRouter::from_config(&config).completion().unwrap().name(),
            "gpu-box"
        );
    }

    #[test]
    fn well_known_urls() {
        assert!(well_known_base_url("openrouter").unwrap().contains("openrouter.ai"));
        assert!(well_known_base_url("ollama").unwrap().contains("localhost:11434"));
        assert!(well_known_base_url("nope").is_none());
    }
}
