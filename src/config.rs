use dotenvy::dotenv;
use std::env;

const DEFAULT_DB_PATH: &str = "trackai.db";
const DEFAULT_PROVIDER: &str = "perplexity";
const DEFAULT_PERPLEXITY_BASE_URL: &str = "https://api.perplexity.ai";
const DEFAULT_PERPLEXITY_MODEL: &str = "sonar";

/// Application configuration loaded once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub ai_provider: String,
    pub perplexity_api_key: String,
    pub perplexity_base_url: String,
    pub perplexity_model: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            db_path: get("TRACKAI_DB_PATH", DEFAULT_DB_PATH),
            ai_provider: get("TRACKAI_AI_PROVIDER", DEFAULT_PROVIDER),
            perplexity_api_key: lookup("PERPLEXITY_API_KEY").unwrap_or_default(),
            perplexity_base_url: get("PERPLEXITY_BASE_URL", DEFAULT_PERPLEXITY_BASE_URL),
            perplexity_model: get("PERPLEXITY_MODEL", DEFAULT_PERPLEXITY_MODEL),
        }
    }
}
