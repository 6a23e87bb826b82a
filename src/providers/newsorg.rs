use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use super::{parse_published, provider_error, NewsProvider, GENERAL_CATEGORY};
use crate::config::NewsConfig;
use crate::types::{ArticleDraft, NewsError, Result};
use crate::utils::{clean_text, md5_hex};

pub const PROVIDER_NAME: &str = "NewsOrg";

#[derive(Debug, Deserialize)]
struct HeadlinesResponse {
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    source: Option<RawSource>,
    author: Option<String>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "urlToImage")]
    url_to_image: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    name: Option<String>,
}

/// Adapter for the NewsAPI.org top-headlines endpoint.
pub struct NewsOrg {
    client: Client,
    api_key: String,
    base_url: String,
    page_size: usize,
}

impl NewsOrg {
    pub fn new(config: &NewsConfig, client: Client) -> Result<Self> {
        let provider = config.newsorg.as_ref().ok_or(NewsError::Configuration {
            service: "NewsOrg",
            missing_key: "NEWSORG_API_KEY",
        })?;

        Ok(Self {
            client,
            api_key: provider.api_key.clone(),
            base_url: provider.base_url.trim_end_matches('/').to_string(),
            page_size: config.max_articles_per_source,
        })
    }

    fn normalize(&self, articles: Vec<RawArticle>) -> Vec<ArticleDraft> {
        let mut drafts = Vec::with_capacity(articles.len());

        for item in articles {
            // Top headlines routinely contain removed articles with no
            // title or URL; those carry nothing worth storing.
            let (Some(title), Some(url)) = (&item.title, &item.url) else {
                debug!(provider = PROVIDER_NAME, "dropping article missing title or URL");
                continue;
            };
            if title.is_empty() || url.is_empty() {
                debug!(provider = PROVIDER_NAME, "dropping article missing title or URL");
                continue;
            }

            let author = clean_text(item.author.as_deref().unwrap_or_default());

            drafts.push(ArticleDraft {
                external_id: format!("newsorg_{}", md5_hex(url)),
                title: clean_text(title),
                description: clean_text(item.description.as_deref().unwrap_or_default()),
                content: clean_text(item.content.as_deref().unwrap_or_default()),
                url: url.clone(),
                image_url: item.url_to_image,
                published_at: parse_published(
                    item.published_at.as_deref().unwrap_or_default(),
                    PROVIDER_NAME,
                ),
                source_name: item
                    .source
                    .and_then(|source| source.name)
                    .unwrap_or_else(|| PROVIDER_NAME.to_string()),
                category_name: GENERAL_CATEGORY.to_string(),
                author_name: if author.is_empty() {
                    PROVIDER_NAME.to_string()
                } else {
                    author
                },
            });
        }

        drafts.truncate(self.page_size);
        drafts
    }
}

#[async_trait]
impl NewsProvider for NewsOrg {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn fetch_news(&self) -> Result<Vec<ArticleDraft>> {
        let url = format!("{}/top-headlines", self.base_url);
        let params: Vec<(&str, String)> = vec![
            ("apiKey", self.api_key.clone()),
            ("language", "en".to_string()),
            ("sortBy", "publishedAt".to_string()),
            ("pageSize", self.page_size.to_string()),
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

        let body: HeadlinesResponse = response
            .json()
            .await
            .map_err(|e| provider_error(PROVIDER_NAME, e.to_string(), None))?;

        Ok(self.normalize(body.articles))
    }
}
