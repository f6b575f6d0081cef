//! Provider router: selects the extraction model's backend from config.

use std::collections::HashMap;
use std::sync::Arc;
use resgenie_core::provider::Provider;
use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Routes extraction requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

fn build_provider(name: &str, base_url: Option<&str>, api_key: &str) -> Arc<dyn Provider> {
    match (name, base_url) {
        ("anthropic", _) => {
            let mut p = AnthropicProvider::new(api_key);
            if let Some(url) = base_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        ("ollama", _) => Arc::new(OpenAiCompatProvider::ollama(base_url)),
        ("openai", None) => Arc::new(OpenAiCompatProvider::openai(api_key)),
        _ => {
            let url = base_url
                .map(str::to_string)
                .unwrap_or_else(|| default_base_url(name));
            Arc::new(OpenAiCompatProvider::new(name, url, api_key))
        }
    }
}

/// Build providers from configuration.
pub fn build_from_config(config: &resgenie_config::AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        let provider = build_provider(name, provider_config.api_url.as_deref(), &api_key);
        router.register(name.clone(), provider);
    }

    // Ensure the default provider exists (even if not explicitly configured)
    if router.get(&config.default_provider).is_none() {
        let api_key = config.api_key.clone().unwrap_or_default();
        let provider = build_provider(&config.default_provider, None, &api_key);
        router.register(config.default_provider.clone(), provider);
    }

    router
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "anthropic" => "https://api.anthropic.com".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resgenie_config::{AppConfig, ProviderConfig};

    #[test]
    fn router_register_and_lookup() {
        let mut router = ProviderRouter::new("openai");
        router.register("openai", Arc::new(OpenAiCompatProvider::openai("sk-test")));

        assert!(router.get("openai").is_some());
        assert!(router.get("nonexistent").is_none());
        assert!(router.default().is_some());
    }

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").contains("openrouter.ai"));
        assert!(default_base_url("groq").contains("api.groq.com"));
    }

    #[test]
    fn local_and_openai_defaults_need_no_url() {
        let config = AppConfig {
            default_provider: "ollama".into(),
            ..AppConfig::default()
        };
        let router = build_from_config(&config);
        assert_eq!(router.default().unwrap().name(), "ollama");

        let config = AppConfig {
            default_provider: "openai".into(),
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        let router = build_from_config(&config);
        assert_eq!(router.default().unwrap().name(), "openai");
    }

    #[test]
    fn build_from_default_config() {
        let router = build_from_config(&AppConfig::default());
        let provider = router.default().unwrap();
        assert_eq!(provider.name(), "anthropic");
    }

    #[test]
    fn configured_providers_are_registered() {
        let mut config = AppConfig {
            default_provider: "ollama".into(),
            ..AppConfig::default()
        };
        config.providers.insert(
            "ollama".into(),
            ProviderConfig {
                api_key: None,
                api_url: Some("http://gpu-box:11434/v1".into()),
                default_model: Some("llama3".into()),
            },
        );

        let router = build_from_config(&config);
        assert_eq!(router.list(), vec!["ollama"]);
        assert_eq!(router.default().unwrap().name(), "ollama");
    }
}
