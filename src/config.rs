use std::env;
use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::types::Result;

const GUARDIAN_BASE_URL: &str = "https://content.guardianapis.com";
const NYTIMES_BASE_URL: &str = "https://api.nytimes.com/svc/search/v2";
const NEWSORG_BASE_URL: &str = "https://newsapi.org/v2";

/// Credentials and endpoint for one external news API.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
}

/// Runtime configuration for the ingestion side, loaded from the
/// environment. A provider section is `None` when its API key is unset,
/// which excludes that provider from the run.
#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub guardian: Option<ProviderConfig>,
    pub nytimes: Option<ProviderConfig>,
    pub newsorg: Option<ProviderConfig>,
    pub request_timeout_seconds: u64,
    pub max_articles_per_source: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            guardian: None,
            nytimes: None,
            newsorg: None,
            request_timeout_seconds: 30,
            max_articles_per_source: 50,
        }
    }
}

impl NewsConfig {
    pub fn from_env() -> Self {
        Self {
            guardian: provider_from_env("GUARDIAN_API_KEY", "GUARDIAN_BASE_URL", GUARDIAN_BASE_URL),
            nytimes: provider_from_env("NYTIMES_API_KEY", "NYTIMES_BASE_URL", NYTIMES_BASE_URL),
            newsorg: provider_from_env("NEWSORG_API_KEY", "NEWSORG_BASE_URL", NEWSORG_BASE_URL),
            request_timeout_seconds: env_number("NEWS_REQUEST_TIMEOUT", 30),
            max_articles_per_source: env_number("NEWS_MAX_ARTICLES_PER_SOURCE", 50),
        }
    }

    /// Shared HTTP client for all provider adapters, with the configured
    /// request timeout applied.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.request_timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        Ok(client)
    }
}

fn provider_from_env(key_var: &str, base_var: &str, default_base: &str) -> Option<ProviderConfig> {
    let api_key = env::var(key_var).ok().filter(|key| !key.is_empty())?;

    let base_url = match env::var(base_var) {
        Ok(base) if Url::parse(&base).is_ok() => base,
        Ok(base) => {
            warn!(var = base_var, value = %base, "ignoring invalid base URL override");
            default_base.to_string()
        }
        Err(_) => default_base.to_string(),
    };

    Some(ProviderConfig { api_key, base_url })
}

fn env_number<T: std::str::FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
