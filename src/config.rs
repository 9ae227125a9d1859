use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // Content store
    pub store_base_url: String,
    pub store_access_token: String,
    pub store_page_size: u32,

    // Translation endpoint
    pub translation_api_key: String,
    pub translation_api_url: String,
    pub translation_model: String,
    pub translation_max_tokens: u32,

    // Job defaults
    pub target_language: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            // Content store - bearer credential, required
            store_base_url: std::env::var("STORE_BASE_URL")
                .context("STORE_BASE_URL not set")?,
            store_access_token: std::env::var("STORE_ACCESS_TOKEN")
                .context("STORE_ACCESS_TOKEN not set")?,
            store_page_size: std::env::var("STORE_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),

            // Translation endpoint. The key is intentionally allowed to be
            // empty here: the orchestrator fail-fasts on it per operation.
            translation_api_key: std::env::var("TRANSLATION_API_KEY").unwrap_or_default(),
            translation_api_url: std::env::var("TRANSLATION_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            translation_model: std::env::var("TRANSLATION_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            translation_max_tokens: std::env::var("TRANSLATION_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2000),

            // Job defaults
            target_language: std::env::var("TARGET_LANGUAGE")
                .unwrap_or_else(|_| "es".to_string()),
        })
    }
}
