use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use tracing::warn;

use crate::config::NewsConfig;
use crate::types::{ArticleDraft, NewsError, Result};
use crate::utils::parse_date;

pub mod guardian;
pub mod newsorg;
pub mod nytimes;

pub use guardian::Guardian;
pub use newsorg::NewsOrg;
pub use nytimes::NyTimes;

/// Fallback category label for providers that do not classify articles.
pub const GENERAL_CATEGORY: &str = "General";

/// One external news API, normalized to the draft shape.
///
/// Implementations own their request parameters and payload mapping; the
/// orchestrator only ever sees drafts or a [`NewsError::Provider`].
#[async_trait]
pub trait NewsProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_news(&self) -> Result<Vec<ArticleDraft>>;
}

/// Builds the run list from whichever API keys are configured, in fixed
/// registration order: Guardian, New York Times, NewsOrg.
pub fn configured(config: &NewsConfig, client: &Client) -> Vec<Box<dyn NewsProvider>> {
    let mut providers: Vec<Box<dyn NewsProvider>> = Vec::new();

    if config.guardian.is_some() {
        match Guardian::new(config, client.clone()) {
            Ok(provider) => providers.push(Box::new(provider)),
            Err(e) => warn!(error = %e, "skipping Guardian provider"),
        }
    }

    if config.nytimes.is_some() {
        match NyTimes::new(config, client.clone()) {
            Ok(provider) => providers.push(Box::new(provider)),
            Err(e) => warn!(error = %e, "skipping New York Times provider"),
        }
    }

    if config.newsorg.is_some() {
        match NewsOrg::new(config, client.clone()) {
            Ok(provider) => providers.push(Box::new(provider)),
            Err(e) => warn!(error = %e, "skipping NewsOrg provider"),
        }
    }

    providers
}

pub(crate) fn provider_error(
    provider: &str,
    message: impl Into<String>,
    status: Option<u16>,
) -> NewsError {
    NewsError::Provider {
        provider: provider.to_string(),
        message: message.into(),
        status,
    }
}

/// Parses a provider timestamp, logging and normalizing failures to "no
/// date" instead of failing the batch.
pub(crate) fn parse_published(raw: &str, provider: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }

    match parse_date(raw) {
        Some(dt) => Some(dt),
        None => {
            warn!(provider, date = raw, "failed to parse published date");
            None
        }
    }
}
