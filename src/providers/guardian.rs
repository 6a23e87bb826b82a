use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use super::{parse_published, provider_error, NewsProvider, GENERAL_CATEGORY};
use crate::config::NewsConfig;
use crate::types::{ArticleDraft, NewsError, Result};
use crate::utils::{clean_text, md5_hex};

pub const PROVIDER_NAME: &str = "The Guardian";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchBody,
}

#[derive(Debug, Default, Deserialize)]
struct SearchBody {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    id: String,
    #[serde(rename = "webTitle", default)]
    web_title: String,
    #[serde(rename = "webUrl", default)]
    web_url: String,
    #[serde(rename = "webPublicationDate", default)]
    web_publication_date: String,
    #[serde(rename = "sectionName")]
    section_name: Option<String>,
    #[serde(default)]
    fields: SearchFields,
}

#[derive(Debug, Default, Deserialize)]
struct SearchFields {
    #[serde(rename = "trailText")]
    trail_text: Option<String>,
    #[serde(rename = "bodyText")]
    body_text: Option<String>,
    thumbnail: Option<String>,
    byline: Option<String>,
}

/// Adapter for the Guardian content API (`/search`).
#[derive(Debug)]
pub struct Guardian {
    client: Client,
    api_key: String,
    base_url: String,
    page_size: usize,
}

impl Guardian {
    pub fn new(config: &NewsConfig, client: Client) -> Result<Self> {
        let provider = config.guardian.as_ref().ok_or(NewsError::Configuration {
            service: "Guardian News",
            missing_key: "GUARDIAN_API_KEY",
        })?;

        Ok(Self {
            client,
            api_key: provider.api_key.clone(),
            base_url: provider.base_url.trim_end_matches('/').to_string(),
            page_size: config.max_articles_per_source,
        })
    }

    fn normalize(&self, results: Vec<SearchResult>) -> Vec<ArticleDraft> {
        let mut drafts = Vec::with_capacity(results.len());

        for item in results {
            // An entry without a canonical URL is unusable downstream.
            if item.web_url.is_empty() {
                debug!(provider = PROVIDER_NAME, "dropping result without a web URL");
                continue;
            }

            let fields = item.fields;

            drafts.push(ArticleDraft {
                external_id: format!("guardian_{}", md5_hex(&item.id)),
                title: clean_text(&item.web_title),
                description: clean_text(fields.trail_text.as_deref().unwrap_or_default()),
                content: clean_text(fields.body_text.as_deref().unwrap_or_default()),
                url: item.web_url,
                image_url: fields.thumbnail,
                published_at: parse_published(&item.web_publication_date, PROVIDER_NAME),
                source_name: PROVIDER_NAME.to_string(),
                category_name: item
                    .section_name
                    .unwrap_or_else(|| GENERAL_CATEGORY.to_string()),
                author_name: fields.byline.unwrap_or_else(|| PROVIDER_NAME.to_string()),
            });
        }

        drafts.truncate(self.page_size);
        drafts
    }
}

#[async_trait]
impl NewsProvider for Guardian {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn fetch_news(&self) -> Result<Vec<ArticleDraft>> {
        let url = format!("{}/search", self.base_url);
        let params: Vec<(&str, String)> = vec![
            ("api-key", self.api_key.clone()),
            ("page-size", self.page_size.to_string()),
            ("show-fields", "all".to_string()),
            ("order-by", "newest".to_string()),
        ];

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| provider_error(PROVIDER_NAME, e.to_string(), None))?;

        let status = response.status();
        if !status.is_success() {
            error!(
                provider = PROVIDER_NAME,
                status = status.as_u16(),
                "API request failed"
            );
            return Err(provider_error(
                PROVIDER_NAME,
                format!("API request failed with status {}", status.as_u16()),
                Some(status.as_u16()),
            ));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| provider_error(PROVIDER_NAME, e.to_string(), None))?;

        Ok(self.normalize(body.response.results))
    }
}
